//! Bootstrap utilities.
//!
//! This module provides:
//! - a seeded, parallel resampler over unit indices,
//! - percentile intervals,
//! - the sample standard deviation used as the bootstrap standard error.
//!
//! Replicate `b` draws its indices from `StdRng::seed_from_u64(seed + b)`, and
//! results are collected in replicate order, so the output does not depend on
//! how rayon partitions the work.

use ks_core::{Error, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

/// Outcome of a bootstrap run.
#[derive(Debug, Clone, PartialEq)]
pub struct BootstrapRun {
    /// Statistics from replicates that succeeded, in replicate order.
    pub estimates: Vec<f64>,
    /// Replicates skipped because the statistic could not be computed.
    pub n_failed: usize,
}

/// Draw `n` indices uniformly with replacement from `0..n`.
pub fn resample_indices(n: usize, seed: u64) -> Vec<usize> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n).map(|_| rng.gen_range(0..n)).collect()
}

/// Run `n_replicates` bootstrap replicates of `statistic` over `n` units.
///
/// `statistic` receives the resampled unit indices. Replicates where it
/// returns an error or a non-finite value are skipped and counted.
pub fn bootstrap_replicates<F>(n: usize, n_replicates: usize, seed: u64, statistic: F) -> BootstrapRun
where
    F: Fn(&[usize]) -> Result<f64> + Sync,
{
    let results: Vec<Option<f64>> = (0..n_replicates)
        .into_par_iter()
        .with_min_len(8)
        .map(|b| {
            let idx = resample_indices(n, seed.wrapping_add(b as u64));
            statistic(&idx).ok().filter(|v| v.is_finite())
        })
        .collect();

    let n_failed = results.iter().filter(|r| r.is_none()).count();
    let estimates: Vec<f64> = results.into_iter().flatten().collect();
    if n_failed > 0 {
        tracing::warn!(n_failed, n_kept = estimates.len(), "bootstrap replicates skipped");
    } else {
        tracing::debug!(n_kept = estimates.len(), "bootstrap complete");
    }
    BootstrapRun { estimates, n_failed }
}

/// Sample standard deviation (`ddof = 1`).
pub fn sample_std(samples: &[f64]) -> Result<f64> {
    if samples.len() < 2 {
        return Err(Error::Computation(format!(
            "standard deviation needs at least 2 samples, got {}",
            samples.len()
        )));
    }
    let n = samples.len() as f64;
    let mean = samples.iter().sum::<f64>() / n;
    let ss: f64 = samples.iter().map(|v| (v - mean).powi(2)).sum();
    Ok((ss / (n - 1.0)).sqrt())
}

/// Quantile for sorted data via linear interpolation.
///
/// - `q=0` returns min
/// - `q=1` returns max
/// - empty input returns `NaN`
pub fn quantile_linear_sorted(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    if sorted.len() == 1 {
        return sorted[0];
    }

    let q = q.clamp(0.0, 1.0);
    let pos = q * (sorted.len() - 1) as f64;
    let i = pos.floor() as usize;
    let j = pos.ceil() as usize;
    if i == j {
        return sorted[i];
    }
    let t = pos - i as f64;
    (1.0 - t) * sorted[i] + t * sorted[j]
}

/// Percentile bootstrap interval.
pub fn percentile_interval(samples: &[f64], conf_level: f64) -> Result<(f64, f64)> {
    if samples.len() < 2 {
        return Err(Error::Computation(
            "percentile_interval requires at least 2 samples".to_string(),
        ));
    }
    if !(conf_level.is_finite() && conf_level > 0.0 && conf_level < 1.0) {
        return Err(Error::Validation(format!("conf_level must be in (0,1), got {conf_level}")));
    }

    let mut v = samples.to_vec();
    v.sort_by(f64::total_cmp);
    let alpha = (1.0 - conf_level) / 2.0;
    let lo = quantile_linear_sorted(&v, alpha);
    let hi = quantile_linear_sorted(&v, 1.0 - alpha);
    Ok((lo.min(hi), lo.max(hi)))
}
