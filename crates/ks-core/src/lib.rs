//! # ks-core
//!
//! Shared building blocks for Kausal:
//! - the workspace-wide [`Error`] / [`Result`] pair,
//! - the [`TabularData`] boundary through which estimators read columns,
//! - the in-memory [`Dataset`] implementation of that boundary,
//! - [`EstimationConfig`] and the fixed seeds used by randomized checks.

#![warn(missing_docs)]

/// Estimation thresholds, bootstrap size and refutation seeds.
pub mod config;
/// Error types.
pub mod error;
/// The tabular-data boundary trait.
pub mod traits;
/// Concrete data containers.
pub mod types;

pub use config::{
    BOOTSTRAP_SEED, EstimationConfig, PLACEBO_TIME_SEED, PLACEBO_TREATMENT_SEED,
    RANDOM_COMMON_CAUSE_SEED, RefutationSeeds,
};
pub use error::{Error, Result};
pub use traits::TabularData;
pub use types::Dataset;
