//! Standard normal reference distribution for z-statistics.

use ks_core::{Error, Result};
use statrs::distribution::{ContinuousCDF, Normal};

#[inline]
fn standard_normal() -> Result<Normal> {
    Normal::new(0.0, 1.0).map_err(|e| Error::Computation(format!("standard normal: {e}")))
}

/// Two-sided p-value `2 * P(Z > |z|)`.
pub fn two_sided_p_value(z: f64) -> Result<f64> {
    if z.is_nan() {
        return Err(Error::Computation("z-statistic is NaN".into()));
    }
    Ok((2.0 * standard_normal()?.sf(z.abs())).min(1.0))
}
