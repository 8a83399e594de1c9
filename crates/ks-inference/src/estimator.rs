//! The estimator capability shared by every family.

use ks_core::{EstimationConfig, Result, TabularData};
use ks_graph::AssumptionGraph;

use crate::estimate::{CausalEstimate, EstimatorFamily};
use crate::refutation::{self, CheckKind, RefutationCheck, RefutationReport};
use crate::roles::RoleAssignment;

/// Lifecycle shared by all estimator families:
/// construct (roles validated against the graph) → [`fit`](Self::fit) →
/// [`refute`](Self::refute).
///
/// Construction never touches data. `fit` reads columns through
/// [`TabularData`] and returns an independent [`CausalEstimate`] each time.
/// Neither `fit` nor `refute` mutates the graph, the data or the estimate.
pub trait CausalEstimator {
    /// Estimator family.
    fn family(&self) -> EstimatorFamily;

    /// Role bindings validated at construction.
    fn roles(&self) -> &RoleAssignment;

    /// Assumption graph the estimator was built on.
    fn graph(&self) -> &AssumptionGraph;

    /// Thresholds, bootstrap size and seeds.
    fn config(&self) -> &EstimationConfig;

    /// Variables this estimator would control for on `data`, recomputed from the graph.
    fn adjustment_set(&self, data: &dyn TabularData) -> Result<Vec<String>>;

    /// Identify, then estimate.
    fn fit(&self, data: &dyn TabularData) -> Result<CausalEstimate>;

    /// Run one registered check.
    fn run_check(
        &self,
        kind: CheckKind,
        estimate: &CausalEstimate,
        data: &dyn TabularData,
    ) -> Result<RefutationCheck>;

    /// Checks this family runs, in order.
    fn checks(&self) -> &'static [CheckKind] {
        refutation::registered_checks(self.family())
    }

    /// Run every registered check against `estimate`.
    fn refute(&self, estimate: &CausalEstimate, data: &dyn TabularData) -> Result<RefutationReport> {
        refutation::run(self, estimate, data)
    }
}
