//! Fisher–Snedecor F distribution for joint-significance tests.

use ks_core::{Error, Result};
use statrs::distribution::{ContinuousCDF, FisherSnedecor};

/// Upper-tail probability `P(F_{d1,d2} > f)`.
pub fn upper_tail(f: f64, d1: f64, d2: f64) -> Result<f64> {
    if !(d1.is_finite() && d1 > 0.0 && d2.is_finite() && d2 > 0.0) {
        return Err(Error::Validation(format!("F dof must be finite and > 0, got ({d1}, {d2})")));
    }
    if f.is_nan() {
        return Err(Error::Computation("F-statistic is NaN".into()));
    }
    if f <= 0.0 {
        return Ok(1.0);
    }
    let dist = FisherSnedecor::new(d1, d2)
        .map_err(|e| Error::Computation(format!("F({d1}, {d2}): {e}")))?;
    Ok(dist.sf(f))
}
