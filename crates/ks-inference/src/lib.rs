//! # ks-inference
//!
//! Causal effect estimation for Kausal.
//!
//! This crate provides:
//! - identification of the backdoor adjustment set from an [`AssumptionGraph`](ks_graph::AssumptionGraph)
//! - five estimator families behind one [`CausalEstimator`] trait
//! - deterministic refutation checks aggregated into a [`RefutationReport`]
//!
//! ## Lifecycle
//!
//! ```text
//! construct (roles checked against the graph) -> fit(data) -> CausalEstimate
//!                                              -> refute(estimate, data) -> RefutationReport
//! ```
//!
//! Estimators borrow the graph and never mutate it. Data is read through
//! [`ks_core::TabularData`]; perturbed columns used by checks are built on the
//! side and never written back.

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Bootstrap resampling, percentile intervals and bootstrap standard errors.
pub mod bootstrap_ci;
/// The five estimator families.
pub mod econometrics;
/// Fitted estimates, estimands and per-family details.
pub mod estimate;
/// The estimator trait shared by every family.
pub mod estimator;
/// Backdoor adjustment sets and instrument checks.
pub mod identification;
/// Logistic regression for propensity scores.
pub mod logistic;
/// Refutation checks and reports.
pub mod refutation;
/// Least-squares core and design matrices.
pub mod regression;
/// Variable roles bound to an estimator.
pub mod roles;

pub use econometrics::{
    AdjustedRegression, DifferenceInDifferences, InstrumentalVariables, PropensityMatching, RandomizedTrial,
};
pub use estimate::{Assumption, CausalEstimate, Estimand, EstimatorFamily, FamilyDetail};
pub use estimator::CausalEstimator;
pub use identification::{Identified, backdoor_set, identify};
pub use refutation::{CheckKind, RefutationCheck, RefutationReport};
pub use roles::{Role, RoleAssignment};
