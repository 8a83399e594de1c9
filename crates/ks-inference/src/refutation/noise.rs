//! Seeded perturbations used by refutation checks.
//!
//! Perturbations are returned as fresh vectors; the caller's data is never
//! written to.

use ks_core::TabularData;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand_distr::{Distribution, StandardNormal};

/// Base name of the injected noise covariate.
pub const NOISE_COLUMN: &str = "_rcc";

/// `NOISE_COLUMN`, prefixed with `_` until it does not clash with a data column.
pub fn noise_column_name(data: &dyn TabularData) -> String {
    let mut name = NOISE_COLUMN.to_string();
    while data.has_column(&name) {
        name.insert(0, '_');
    }
    name
}

/// `n` independent standard-normal draws.
pub fn standard_normal_noise(n: usize, seed: u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n).map(|_| StandardNormal.sample(&mut rng)).collect()
}

/// A random permutation of `values`.
pub fn permuted(values: &[f64], seed: u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut out = values.to_vec();
    out.shuffle(&mut rng);
    out
}
