//! The five estimator families.
//!
//! - [`AdjustedRegression`]: OLS adjusted for the backdoor set (ATE).
//! - [`InstrumentalVariables`]: Wald / 2SLS with one instrument (LATE).
//! - [`PropensityMatching`]: 1:1 nearest-neighbour matching on a logistic
//!   propensity score, bootstrap standard errors (ATT).
//! - [`RandomizedTrial`]: difference in means with Welch standard error (ATE).
//! - [`DifferenceInDifferences`]: group × period interaction (ATT).

pub mod did;
pub mod iv;
pub mod matching;
pub mod ols;
pub mod rct;

pub use did::DifferenceInDifferences;
pub use iv::{InstrumentalVariables, IvFit, iv_2sls};
pub use matching::{PropensityMatching, nearest_neighbor_matches};
pub use ols::AdjustedRegression;
pub use rct::RandomizedTrial;

use ks_core::{Error, Result, TabularData};

use crate::roles::Role;

/// Column bound to `role`, or a validation error.
pub(crate) fn role_column<'d>(data: &'d dyn TabularData, role: Role, name: &str) -> Result<&'d [f64]> {
    data.column(name)
        .ok_or_else(|| Error::Validation(format!("{role} column '{name}' not found in the data")))
}

/// Columns for the named controls; all must be present.
pub(crate) fn control_columns<'d>(data: &'d dyn TabularData, names: &[String]) -> Result<Vec<&'d [f64]>> {
    names
        .iter()
        .map(|n| {
            data.column(n)
                .ok_or_else(|| Error::Validation(format!("control column '{n}' not found in the data")))
        })
        .collect()
}

/// Require a 0/1 indicator with both levels present.
pub(crate) fn require_binary(role: Role, name: &str, values: &[f64]) -> Result<()> {
    if let Some(bad) = values.iter().find(|&&v| v != 0.0 && v != 1.0) {
        return Err(Error::Validation(format!("{role} '{name}' must be binary (0/1); found {bad}")));
    }
    let ones = values.iter().filter(|&&v| v == 1.0).count();
    if ones == 0 || ones == values.len() {
        return Err(Error::Validation(format!("{role} '{name}' must contain both 0 and 1")));
    }
    Ok(())
}

/// Rows `idx` of `values`.
pub(crate) fn take(values: &[f64], idx: &[usize]) -> Vec<f64> {
    idx.iter().map(|&i| values[i]).collect()
}
