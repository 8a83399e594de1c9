//! Student-t reference distribution for regression t-statistics.

use ks_core::{Error, Result};
use statrs::distribution::{ContinuousCDF, StudentsT};

fn standard_t(dof: f64) -> Result<StudentsT> {
    if !dof.is_finite() || dof <= 0.0 {
        return Err(Error::Validation(format!("dof must be finite and > 0, got {}", dof)));
    }
    StudentsT::new(0.0, 1.0, dof).map_err(|e| Error::Computation(format!("Student-t({dof}): {e}")))
}

/// Two-sided p-value `2 * P(T_dof > |t|)`.
pub fn two_sided_p_value(t: f64, dof: f64) -> Result<f64> {
    if t.is_nan() {
        return Err(Error::Computation("t-statistic is NaN".into()));
    }
    Ok((2.0 * standard_t(dof)?.sf(t.abs())).min(1.0))
}

/// Critical multiplier `t_{dof, 1-α/2}` for a two-sided interval at `confidence_level`.
pub fn critical_value(confidence_level: f64, dof: f64) -> Result<f64> {
    if !(confidence_level.is_finite() && confidence_level > 0.0 && confidence_level < 1.0) {
        return Err(Error::Validation(format!(
            "confidence_level must be in (0,1), got {confidence_level}"
        )));
    }
    let alpha = 1.0 - confidence_level;
    Ok(standard_t(dof)?.inverse_cdf(1.0 - alpha / 2.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_critical_small_dof() {
        // t_{10, 0.975} = 2.228139
        assert_abs_diff_eq!(critical_value(0.95, 10.0).unwrap(), 2.228_139, epsilon = 1e-4);
    }

    #[test]
    fn test_large_dof_approaches_normal() {
        let t = critical_value(0.95, 1e6).unwrap();
        assert_abs_diff_eq!(t, 1.959_964, epsilon = 1e-3);
    }

    #[test]
    fn test_p_value() {
        let p = two_sided_p_value(2.228_139, 10.0).unwrap();
        assert_abs_diff_eq!(p, 0.05, epsilon = 1e-4);
        assert!(two_sided_p_value(0.0, 5.0).unwrap() > 0.999);
    }

    #[test]
    fn test_invalid_params() {
        assert!(two_sided_p_value(1.0, 0.0).is_err());
        assert!(critical_value(0.95, -1.0).is_err());
        assert!(critical_value(2.0, 5.0).is_err());
    }
}
