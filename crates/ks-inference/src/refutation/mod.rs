//! Refutation framework.
//!
//! Each estimator family has a fixed, ordered list of checks. Running a
//! report executes them in that order against a fitted estimate and the data
//! it was fitted on. A check that fails is data in the report, not an error;
//! a check whose refit breaks numerically (singular design, separated
//! propensity model) is recorded as a failed check carrying the error message.
//! Usage errors (missing columns, an estimate from a different estimator)
//! still propagate.
//!
//! Every randomized check draws from its own seed in
//! [`ks_core::RefutationSeeds`], so reports are reproducible bit for bit.

/// Check and report records.
pub mod check;
/// Seeded noise and permutations.
pub mod noise;

pub use check::{CheckKind, RefutationCheck, RefutationReport};

use ks_core::{Error, Result, TabularData};

use crate::estimate::{CausalEstimate, EstimatorFamily};
use crate::estimator::CausalEstimator;

/// Checks registered for a family, in run order.
pub fn registered_checks(family: EstimatorFamily) -> &'static [CheckKind] {
    match family {
        EstimatorFamily::AdjustedRegression => &[CheckKind::RandomCommonCause],
        EstimatorFamily::InstrumentalVariables => {
            &[CheckKind::FirstStageStrength, CheckKind::RandomCommonCause]
        }
        EstimatorFamily::PropensityMatching => {
            &[CheckKind::PlaceboTreatment, CheckKind::RandomCommonCause]
        }
        EstimatorFamily::RandomizedTrial => &[CheckKind::RandomCommonCause],
        EstimatorFamily::DifferenceInDifferences => {
            &[CheckKind::PlaceboGroup, CheckKind::PlaceboTime, CheckKind::RandomCommonCause]
        }
    }
}

/// Run every registered check of `estimator`'s family against `estimate`.
pub fn run<E: CausalEstimator + ?Sized>(
    estimator: &E,
    estimate: &CausalEstimate,
    data: &dyn TabularData,
) -> Result<RefutationReport> {
    let family = estimator.family();
    let treatment = estimator.roles().exposure()?;
    let outcome = estimator.roles().outcome()?;
    if estimate.family != family || estimate.treatment != treatment || estimate.outcome != outcome {
        return Err(Error::Validation(format!(
            "estimate ({}: {} -> {}) was not produced by this estimator ({}: {} -> {})",
            estimate.family, estimate.treatment, estimate.outcome, family, treatment, outcome
        )));
    }

    let mut checks = Vec::with_capacity(registered_checks(family).len());
    for &kind in registered_checks(family) {
        let check = match estimator.run_check(kind, estimate, data) {
            Ok(c) => c,
            Err(Error::Computation(msg)) => RefutationCheck::errored(kind, &msg),
            Err(e) => return Err(e),
        };
        tracing::debug!(check = kind.name(), passed = check.passed, detail = %check.detail, "refutation check");
        checks.push(check);
    }

    Ok(RefutationReport {
        family,
        treatment: treatment.to_string(),
        outcome: outcome.to_string(),
        checks,
    })
}

/// Error for a check a family does not register.
pub(crate) fn unsupported(kind: CheckKind, family: EstimatorFamily) -> Error {
    Error::Validation(format!("check '{}' is not registered for {}", kind.name(), family))
}
