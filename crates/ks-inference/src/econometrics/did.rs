//! Difference-in-Differences (DiD), two groups by two periods (ATT).
//!
//! Estimates `y = α + β₁·group + β₂·post + δ·(group×post) + γ'controls + ε`
//! by OLS; δ is the ATT. Without controls δ equals
//! `(Ȳ_treat,post − Ȳ_treat,pre) − (Ȳ_ctrl,post − Ȳ_ctrl,pre)` exactly.
//! Parallel trends cannot be checked from the graph.
//!
//! # References
//!
//! - Angrist & Pischke, *Mostly Harmless Econometrics*, Ch. 5.

use ks_core::{EstimationConfig, Error, Result, TabularData};
use ks_graph::AssumptionGraph;

use super::{control_columns, require_binary, role_column};
use crate::estimate::{CausalEstimate, EstimatorFamily, FamilyDetail, t_inference};
use crate::estimator::CausalEstimator;
use crate::identification::require_observed;
use crate::refutation::noise::{noise_column_name, permuted, standard_normal_noise};
use crate::refutation::{CheckKind, RefutationCheck, unsupported};
use crate::regression::{Design, ols_fit};
use crate::roles::{Role, RoleAssignment};

/// Result of a canonical (2×2) DiD regression.
#[derive(Debug, Clone)]
pub struct DidFit {
    /// ATT estimate (coefficient on group×post).
    pub att: f64,
    /// OLS standard error of the ATT.
    pub se: f64,
    /// Residual degrees of freedom.
    pub dof: usize,
    /// Mean outcome: treated-post.
    pub mean_treated_post: f64,
    /// Mean outcome: treated-pre.
    pub mean_treated_pre: f64,
    /// Mean outcome: control-post.
    pub mean_control_post: f64,
    /// Mean outcome: control-pre.
    pub mean_control_pre: f64,
    /// Number of observations.
    pub n_obs: usize,
}

/// Canonical two-period DiD with optional controls.
///
/// `group` and `post` must be 0/1 with all four cells populated.
pub fn did_canonical(y: &[f64], group: &[f64], post: &[f64], controls: &[(&str, &[f64])]) -> Result<DidFit> {
    let n = y.len();
    if n == 0 {
        return Err(Error::Validation("y must be non-empty".into()));
    }
    if group.len() != n || post.len() != n {
        return Err(Error::Validation("group and post must have the same length as y".into()));
    }

    // [treated-post, treated-pre, control-post, control-pre]
    let mut sums = [0.0_f64; 4];
    let mut counts = [0usize; 4];
    for i in 0..n {
        let cell = match (group[i], post[i]) {
            (g, p) if g == 1.0 && p == 1.0 => 0,
            (g, p) if g == 1.0 && p == 0.0 => 1,
            (g, p) if g == 0.0 && p == 1.0 => 2,
            (g, p) if g == 0.0 && p == 0.0 => 3,
            _ => return Err(Error::Validation("group and post must be 0 or 1".into())),
        };
        sums[cell] += y[i];
        counts[cell] += 1;
    }
    if counts.contains(&0) {
        return Err(Error::Validation(format!(
            "all four group×period cells must have observations (treated-post {}, treated-pre {}, \
             control-post {}, control-pre {})",
            counts[0], counts[1], counts[2], counts[3]
        )));
    }
    let means: Vec<f64> = sums.iter().zip(&counts).map(|(s, &c)| s / c as f64).collect();

    let mut design = Design::with_intercept(n);
    design.push("group", group)?.push("post", post)?.push_interaction("group:post", group, post)?;
    for &(name, col) in controls {
        design.push(name, col)?;
    }
    let fit = ols_fit(&design, y)?;

    Ok(DidFit {
        att: fit.coefficients[3],
        se: fit.se[3],
        dof: fit.dof,
        mean_treated_post: means[0],
        mean_treated_pre: means[1],
        mean_control_post: means[2],
        mean_control_pre: means[3],
        n_obs: n,
    })
}

/// Refit failures inside a check are numerical, whatever their cause.
fn as_computation(e: Error) -> Error {
    match e {
        Error::Validation(msg) => Error::Computation(msg),
        other => other,
    }
}

/// Difference-in-differences on a group indicator and a period indicator.
#[derive(Debug, Clone)]
pub struct DifferenceInDifferences<'g> {
    graph: &'g AssumptionGraph,
    roles: RoleAssignment,
    config: EstimationConfig,
}

impl<'g> DifferenceInDifferences<'g> {
    /// Estimator with default configuration.
    pub fn new(graph: &'g AssumptionGraph, group: &str, time: &str, outcome: &str) -> Result<Self> {
        Self::with_config(graph, group, time, outcome, EstimationConfig::default())
    }

    /// Estimator with explicit configuration.
    pub fn with_config(
        graph: &'g AssumptionGraph,
        group: &str,
        time: &str,
        outcome: &str,
        config: EstimationConfig,
    ) -> Result<Self> {
        config.validate()?;
        let roles = RoleAssignment::panel(group, time, outcome);
        roles.validate(graph)?;
        Ok(Self { graph, roles, config })
    }

    fn var(&self, role: Role) -> &str {
        self.roles.get(role).unwrap_or_default()
    }

    fn columns<'d>(&self, data: &'d dyn TabularData) -> Result<(&'d [f64], &'d [f64], &'d [f64])> {
        let g = role_column(data, Role::Group, self.var(Role::Group))?;
        let time = role_column(data, Role::Time, self.var(Role::Time))?;
        let y = role_column(data, Role::Outcome, self.var(Role::Outcome))?;
        require_binary(Role::Group, self.var(Role::Group), g)?;
        require_binary(Role::Time, self.var(Role::Time), time)?;
        Ok((g, time, y))
    }
}

impl CausalEstimator for DifferenceInDifferences<'_> {
    fn family(&self) -> EstimatorFamily {
        EstimatorFamily::DifferenceInDifferences
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

    fn adjustment_set(&self, data: &dyn TabularData) -> Result<Vec<String>> {
        require_observed(self.graph, self.var(Role::Group), self.var(Role::Outcome), &[self.var(Role::Time)], data)
    }

    fn fit(&self, data: &dyn TabularData) -> Result<CausalEstimate> {
        let (g, time, y) = self.columns(data)?;
        let controls = self.adjustment_set(data)?;
        let cols = control_columns(data, &controls)?;
        let named: Vec<(&str, &[f64])> = controls.iter().map(String::as_str).zip(cols).collect();

        let did = did_canonical(y, g, time, &named)?;
        let (conf_int, p_value) = t_inference(did.att, did.se, did.dof as f64, self.config.confidence_level)?;
        let naive_effect = did.mean_treated_post - did.mean_control_post;
        tracing::debug!(
            group = self.var(Role::Group),
            time = self.var(Role::Time),
            outcome = self.var(Role::Outcome),
            att = did.att,
            se = did.se,
            n_obs = did.n_obs,
            "difference-in-differences fitted"
        );

        let family = self.family();
        Ok(CausalEstimate {
            family,
            estimand: family.estimand(),
            treatment: self.var(Role::Group).to_string(),
            outcome: self.var(Role::Outcome).to_string(),
            effect: did.att,
            std_err: did.se,
            conf_int,
            confidence_level: self.config.confidence_level,
            p_value,
            adjustment_set: controls,
            naive_effect,
            n_obs: did.n_obs,
            assumptions: family.assumptions(),
            detail: FamilyDetail::DifferenceInDifferences {
                time: self.var(Role::Time).to_string(),
                mean_treated_post: did.mean_treated_post,
                mean_treated_pre: did.mean_treated_pre,
                mean_control_post: did.mean_control_post,
                mean_control_pre: did.mean_control_pre,
            },
        })
    }

    fn run_check(
        &self,
        kind: CheckKind,
        estimate: &CausalEstimate,
        data: &dyn TabularData,
    ) -> Result<RefutationCheck> {
        let (g, time, y) = self.columns(data)?;
        let cols = control_columns(data, &estimate.adjustment_set)?;
        let named: Vec<(&str, &[f64])> = estimate.adjustment_set.iter().map(String::as_str).zip(cols).collect();
        let tolerance = self.config.placebo_tolerance_se;
        match kind {
            CheckKind::PlaceboGroup => {
                let placebo_g = permuted(g, self.config.seeds.placebo_treatment);
                let placebo = did_canonical(y, &placebo_g, time, &named).map_err(as_computation)?;
                Ok(RefutationCheck::placebo(kind, placebo.att, estimate.std_err, tolerance))
            }
            CheckKind::PlaceboTime => {
                let placebo_time = permuted(time, self.config.seeds.placebo_time);
                let placebo = did_canonical(y, g, &placebo_time, &named).map_err(as_computation)?;
                Ok(RefutationCheck::placebo(kind, placebo.att, estimate.std_err, tolerance))
            }
            CheckKind::RandomCommonCause => {
                let name = noise_column_name(data);
                let noise = standard_normal_noise(data.n_rows(), self.config.seeds.random_common_cause);
                let mut with_noise = named.clone();
                with_noise.push((name.as_str(), noise.as_slice()));
                let refit = did_canonical(y, g, time, &with_noise).map_err(as_computation)?;
                Ok(RefutationCheck::stability(
                    kind,
                    estimate.effect,
                    refit.att,
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

    #[test]
    fn test_did_canonical_exact() {
        // Control: pre=10, post=12 (trend = +2)
        // Treated: pre=10, post=15 (trend = +5, treatment effect = 3)
        let y = vec![10.0, 10.0, 12.0, 12.0, 10.0, 10.0, 15.0, 15.0];
        let group = vec![0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0];
        let post = vec![0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 1.0];

        let res = did_canonical(&y, &group, &post, &[]).unwrap();
        assert!((res.att - 3.0).abs() < 1e-10, "ATT={}, expected 3.0", res.att);
        assert_eq!(res.n_obs, 8);
        assert!((res.mean_treated_post - 15.0).abs() < 1e-10);
        assert!((res.mean_treated_pre - 10.0).abs() < 1e-10);
        assert!((res.mean_control_post - 12.0).abs() < 1e-10);
        assert!((res.mean_control_pre - 10.0).abs() < 1e-10);
    }

    #[test]
    fn test_did_validation() {
        assert!(did_canonical(&[], &[], &[], &[]).is_err());
        assert!(did_canonical(&[1.0], &[2.0], &[0.0], &[]).is_err());
        // control-pre cell empty
        assert!(did_canonical(&[1.0, 2.0, 3.0], &[1.0, 1.0, 0.0], &[0.0, 1.0, 1.0], &[]).is_err());
    }

    /// Ten units per cell; the wiggle averages to zero within each cell.
    fn panel() -> Dataset {
        let mut g = Vec::new();
        let mut p = Vec::new();
        let mut y = Vec::new();
        for i in 0..40 {
            let (gi, pi) = ((i / 20) as f64, ((i / 10) % 2) as f64);
            g.push(gi);
            p.push(pi);
            y.push(10.0 + 2.0 * gi + 1.5 * pi + 3.0 * gi * pi + 0.1 * ((i % 5) as f64 - 2.0));
        }
        Dataset::new([("group", g), ("post", p), ("y", y)]).unwrap()
    }

    #[test]
    fn test_estimator_matches_cell_means() {
        let graph = AssumptionGraph::from_declarations([("group", vec!["y"]), ("post", vec!["y"])]).unwrap();
        let est = DifferenceInDifferences::new(&graph, "group", "post", "y").unwrap().fit(&panel()).unwrap();
        assert_abs_diff_eq!(est.effect, 3.0, epsilon = 1e-9);
        assert_abs_diff_eq!(est.naive_effect, 5.0, epsilon = 1e-9);
        assert!(est.std_err > 0.0);
        assert_eq!(est.treatment, "group");
        assert!(est.is_significant());
    }

    #[test]
    fn test_time_role_must_be_in_graph() {
        let graph = AssumptionGraph::from_declarations([("group", vec!["y"])]).unwrap();
        assert!(matches!(
            DifferenceInDifferences::new(&graph, "group", "post", "y"),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_refutation_runs_registered_checks_in_order() {
        let graph = AssumptionGraph::from_declarations([("group", vec!["y"]), ("post", vec!["y"])]).unwrap();
        let did = DifferenceInDifferences::new(&graph, "group", "post", "y").unwrap();
        let data = panel();
        let est = did.fit(&data).unwrap();
        let report = did.refute(&est, &data).unwrap();
        let kinds: Vec<CheckKind> = report.checks.iter().map(|c| c.kind).collect();
        assert_eq!(kinds, vec![CheckKind::PlaceboGroup, CheckKind::PlaceboTime, CheckKind::RandomCommonCause]);
        assert_eq!(report, did.refute(&est, &data).unwrap());
    }
}
