//! Probability building blocks for Kausal.
//!
//! This crate hosts the probability math used by the estimators:
//! - small numeric helpers (stable sigmoid / log1pexp for logistic models)
//! - sampling distributions of test statistics (normal, Student-t, Fisher F)
//!   for p-values and confidence-interval multipliers

pub mod fisher;
pub mod math;
pub mod normal;
pub mod student_t;
