//! Randomized trial: difference in means (ATE).
//!
//! No adjustment set is computed; random assignment is taken to have balanced
//! the confounders already. The standard error is Welch's unpooled
//! `sqrt(s1²/n1 + s0²/n0)` with Welch–Satterthwaite degrees of freedom.

use ks_core::{EstimationConfig, Error, Result, TabularData};
use ks_graph::AssumptionGraph;

use super::{require_binary, role_column};
use crate::estimate::{CausalEstimate, EstimatorFamily, FamilyDetail, t_inference};
use crate::estimator::CausalEstimator;
use crate::refutation::noise::{noise_column_name, standard_normal_noise};
use crate::refutation::{CheckKind, RefutationCheck, unsupported};
use crate::regression::{Design, ols_fit};
use crate::roles::{Role, RoleAssignment};

/// Two-group summary used by the Welch test.
#[derive(Debug, Clone, Copy)]
struct GroupStats {
    n: usize,
    mean: f64,
    var: f64,
}

impl GroupStats {
    fn of(values: &[f64]) -> Self {
        let n = values.len();
        let mean = values.iter().sum::<f64>() / n as f64;
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n as f64 - 1.0);
        Self { n, mean, var }
    }
}

/// Welch standard error and Welch–Satterthwaite degrees of freedom.
fn welch(treated: GroupStats, control: GroupStats) -> (f64, f64) {
    let a = treated.var / treated.n as f64;
    let b = control.var / control.n as f64;
    let se = (a + b).sqrt();
    let dof = (a + b).powi(2) / (a * a / (treated.n as f64 - 1.0) + b * b / (control.n as f64 - 1.0));
    (se, dof)
}

/// Difference in means under random assignment.
#[derive(Debug, Clone)]
pub struct RandomizedTrial<'g> {
    graph: &'g AssumptionGraph,
    roles: RoleAssignment,
    config: EstimationConfig,
}

impl<'g> RandomizedTrial<'g> {
    /// Estimator with default configuration.
    pub fn new(graph: &'g AssumptionGraph, treatment: &str, outcome: &str) -> Result<Self> {
        Self::with_config(graph, treatment, outcome, EstimationConfig::default())
    }

    /// Estimator with explicit configuration.
    ///
    /// Fails if the graph declares causes of the treatment: that contradicts
    /// random assignment.
    pub fn with_config(
        graph: &'g AssumptionGraph,
        treatment: &str,
        outcome: &str,
        config: EstimationConfig,
    ) -> Result<Self> {
        config.validate()?;
        let roles = RoleAssignment::new(treatment, outcome);
        roles.validate(graph)?;
        let parents = graph.parents(treatment);
        if !parents.is_empty() {
            let listed: Vec<&str> = parents.iter().map(String::as_str).collect();
            return Err(Error::Validation(format!(
                "randomized treatment '{treatment}' has declared causes in the graph: {}",
                listed.join(", ")
            )));
        }
        Ok(Self { graph, roles, config })
    }

    fn treatment(&self) -> &str {
        self.roles.get(Role::Treatment).unwrap_or_default()
    }

    fn outcome(&self) -> &str {
        self.roles.get(Role::Outcome).unwrap_or_default()
    }
}

impl CausalEstimator for RandomizedTrial<'_> {
    fn family(&self) -> EstimatorFamily {
        EstimatorFamily::RandomizedTrial
    }

    fn roles(&self) -> &RoleAssignment {
        &self.roles
    }

    fn graph(&self) -> &AssumptionGraph {
        self.graph
    }

    fn config(&self) -> &EstimationConfig {
        &self.config
    }

    fn adjustment_set(&self, _data: &dyn TabularData) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    fn fit(&self, data: &dyn TabularData) -> Result<CausalEstimate> {
        let t = role_column(data, Role::Treatment, self.treatment())?;
        let y = role_column(data, Role::Outcome, self.outcome())?;
        require_binary(Role::Treatment, self.treatment(), t)?;

        let (y1, y0): (Vec<f64>, Vec<f64>) = {
            let (a, b): (Vec<_>, Vec<_>) = t.iter().zip(y).partition(|(ti, _)| **ti == 1.0);
            (a.into_iter().map(|(_, &v)| v).collect(), b.into_iter().map(|(_, &v)| v).collect())
        };
        if y1.len() < 2 || y0.len() < 2 {
            return Err(Error::Validation(format!(
                "each arm needs at least 2 units (treated: {}, control: {})",
                y1.len(),
                y0.len()
            )));
        }
        let treated = GroupStats::of(&y1);
        let control = GroupStats::of(&y0);
        let effect = treated.mean - control.mean;
        let (std_err, dof) = welch(treated, control);
        if !(std_err > 0.0) {
            return Err(Error::Computation("outcome has no variance within either arm".into()));
        }
        let (conf_int, p_value) = t_inference(effect, std_err, dof, self.config.confidence_level)?;
        tracing::debug!(
            treatment = self.treatment(),
            outcome = self.outcome(),
            effect,
            std_err,
            dof,
            "randomized trial fitted"
        );

        let family = self.family();
        Ok(CausalEstimate {
            family,
            estimand: family.estimand(),
            treatment: self.treatment().to_string(),
            outcome: self.outcome().to_string(),
            effect,
            std_err,
            conf_int,
            confidence_level: self.config.confidence_level,
            p_value,
            adjustment_set: Vec::new(),
            naive_effect: effect,
            n_obs: t.len(),
            assumptions: family.assumptions(),
            detail: FamilyDetail::RandomizedTrial {
                mean_treated: treated.mean,
                mean_control: control.mean,
                n_treated: treated.n,
                n_control: control.n,
                dof,
            },
        })
    }

    fn run_check(
        &self,
        kind: CheckKind,
        estimate: &CausalEstimate,
        data: &dyn TabularData,
    ) -> Result<RefutationCheck> {
        match kind {
            CheckKind::RandomCommonCause => {
                let t = role_column(data, Role::Treatment, self.treatment())?;
                let y = role_column(data, Role::Outcome, self.outcome())?;
                let name = noise_column_name(data);
                let noise = standard_normal_noise(data.n_rows(), self.config.seeds.random_common_cause);
                let mut design = Design::with_intercept(data.n_rows());
                design.push(self.treatment(), t)?.push(name, &noise)?;
                let refit = ols_fit(&design, y)?;
                Ok(RefutationCheck::stability(
                    kind,
                    estimate.effect,
                    refit.coefficients[1],
                    estimate.std_err,
                    self.config.random_common_cause_tolerance_se,
                ))
            }
            other => Err(unsupported(other, self.family())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ks_core::Dataset;

    fn graph() -> AssumptionGraph {
        AssumptionGraph::from_declarations([("t", vec!["y"])]).unwrap()
    }

    #[test]
    fn test_welch_by_hand() {
        // treated: mean 6, var 4; control: mean 2, var 1
        let g = graph();
        let d = Dataset::new([
            ("t", vec![1.0, 1.0, 1.0, 0.0, 0.0, 0.0]),
            ("y", vec![4.0, 6.0, 8.0, 1.0, 2.0, 3.0]),
        ])
        .unwrap();
        let est = RandomizedTrial::new(&g, "t", "y").unwrap().fit(&d).unwrap();
        assert_abs_diff_eq!(est.effect, 4.0, epsilon = 1e-12);
        assert_abs_diff_eq!(est.std_err, (5.0f64 / 3.0).sqrt(), epsilon = 1e-12);
        assert_eq!(est.naive_effect, est.effect);
        assert!(est.adjustment_set.is_empty());
        match est.detail {
            FamilyDetail::RandomizedTrial { dof, n_treated, .. } => {
                assert_abs_diff_eq!(dof, 50.0 / 17.0, epsilon = 1e-10);
                assert_eq!(n_treated, 3);
            }
            other => panic!("unexpected detail {other:?}"),
        }
    }

    #[test]
    fn test_caused_treatment_rejected() {
        let g = AssumptionGraph::from_declarations([("c", vec!["t", "y"]), ("t", vec!["y"])]).unwrap();
        assert!(matches!(RandomizedTrial::new(&g, "t", "y"), Err(Error::Validation(_))));
    }

    #[test]
    fn test_arm_too_small() {
        let g = graph();
        let d = Dataset::new([("t", vec![1.0, 0.0, 0.0]), ("y", vec![1.0, 2.0, 3.0])]).unwrap();
        assert!(matches!(RandomizedTrial::new(&g, "t", "y").unwrap().fit(&d), Err(Error::Validation(_))));
    }
}
