//! Propensity-score matching (ATT).
//!
//! The propensity score is a logistic regression of the binary treatment on
//! the backdoor set. Each treated unit is matched, with replacement, to the
//! control with the nearest score; the ATT is the mean outcome difference
//! across matched pairs. There is no closed-form variance, so the standard
//! error is the standard deviation of the ATT over bootstrap resamples of the
//! units (the propensity model is refitted in every replicate).

use std::cmp::Ordering;

use ks_core::{EstimationConfig, Error, Result, TabularData};
use ks_graph::AssumptionGraph;

use super::{control_columns, require_binary, role_column, take};
use crate::bootstrap_ci::{bootstrap_replicates, percentile_interval, sample_std};
use crate::estimate::{CausalEstimate, EstimatorFamily, FamilyDetail, z_p_value};
use crate::estimator::CausalEstimator;
use crate::identification::require_observed;
use crate::logistic::logistic_fit;
use crate::refutation::noise::{noise_column_name, permuted, standard_normal_noise};
use crate::refutation::{CheckKind, RefutationCheck, unsupported};
use crate::regression::Design;
use crate::roles::{Role, RoleAssignment};

/// Nearest control (by propensity score) for every treated unit.
///
/// Returns an index into `control_ps` per entry of `treated_ps`. Ties, both
/// exact duplicates and equidistant neighbours, go to the lowest control
/// index, so the matching does not depend on input order beyond that.
pub fn nearest_neighbor_matches(treated_ps: &[f64], control_ps: &[f64]) -> Vec<usize> {
    if control_ps.is_empty() {
        return Vec::new();
    }
    let mut order: Vec<usize> = (0..control_ps.len()).collect();
    order.sort_by(|&a, &b| control_ps[a].total_cmp(&control_ps[b]).then(a.cmp(&b)));
    let sorted: Vec<f64> = order.iter().map(|&i| control_ps[i]).collect();

    treated_ps
        .iter()
        .map(|&p| {
            // first control with score >= p (lowest index among equal scores)
            let right = sorted.partition_point(|&c| c < p);
            let mut best: Option<(f64, usize)> = None;
            if right < sorted.len() {
                best = Some((sorted[right] - p, order[right]));
            }
            if right > 0 {
                let v = sorted[right - 1];
                let left = sorted.partition_point(|&c| c < v);
                let cand = (p - v, order[left]);
                best = match best {
                    Some(b) => Some(match cand.0.total_cmp(&b.0) {
                        Ordering::Less => cand,
                        Ordering::Equal if cand.1 < b.1 => cand,
                        _ => b,
                    }),
                    None => Some(cand),
                };
            }
            best.map(|(_, i)| i).unwrap_or(order[0])
        })
        .collect()
}

/// ATT by 1:1 nearest-neighbour matching on a freshly fitted propensity score.
fn matched_att(t: &[f64], y: &[f64], covariates: &[(&str, &[f64])]) -> Result<(f64, usize, usize)> {
    let mut design = Design::with_intercept(t.len());
    for &(name, col) in covariates {
        design.push(name, col)?;
    }
    let ps = logistic_fit(&design, t)?.fitted;

    let (mut treated, mut control) = (Vec::new(), Vec::new());
    for (i, &ti) in t.iter().enumerate() {
        if ti == 1.0 {
            treated.push(i);
        } else {
            control.push(i);
        }
    }
    if treated.is_empty() || control.is_empty() {
        return Err(Error::Computation("matching needs both treated and control units".into()));
    }

    let matches = nearest_neighbor_matches(&take(&ps, &treated), &take(&ps, &control));
    let total: f64 = treated.iter().zip(&matches).map(|(&i, &m)| y[i] - y[control[m]]).sum();
    Ok((total / treated.len() as f64, treated.len(), control.len()))
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (s, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    s / n as f64
}

/// 1:1 nearest-neighbour matching with replacement on a logistic propensity score.
#[derive(Debug, Clone)]
pub struct PropensityMatching<'g> {
    graph: &'g AssumptionGraph,
    roles: RoleAssignment,
    config: EstimationConfig,
}

impl<'g> PropensityMatching<'g> {
    /// Estimator with default configuration.
    pub fn new(graph: &'g AssumptionGraph, treatment: &str, outcome: &str) -> Result<Self> {
        Self::with_config(graph, treatment, outcome, EstimationConfig::default())
    }

    /// Estimator with explicit configuration.
    pub fn with_config(
        graph: &'g AssumptionGraph,
        treatment: &str,
        outcome: &str,
        config: EstimationConfig,
    ) -> Result<Self> {
        config.validate()?;
        let roles = RoleAssignment::new(treatment, outcome);
        roles.validate(graph)?;
        Ok(Self { graph, roles, config })
    }

    fn treatment(&self) -> &str {
        self.roles.get(Role::Treatment).unwrap_or_default()
    }

    fn outcome(&self) -> &str {
        self.roles.get(Role::Outcome).unwrap_or_default()
    }

    fn columns<'d>(&self, data: &'d dyn TabularData) -> Result<(&'d [f64], &'d [f64])> {
        let t = role_column(data, Role::Treatment, self.treatment())?;
        let y = role_column(data, Role::Outcome, self.outcome())?;
        require_binary(Role::Treatment, self.treatment(), t)?;
        Ok((t, y))
    }
}

impl CausalEstimator for PropensityMatching<'_> {
    fn family(&self) -> EstimatorFamily {
        EstimatorFamily::PropensityMatching
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
        require_observed(self.graph, self.treatment(), self.outcome(), &[], data)
    }

    fn fit(&self, data: &dyn TabularData) -> Result<CausalEstimate> {
        let (t, y) = self.columns(data)?;
        let controls = self.adjustment_set(data)?;
        let cols = control_columns(data, &controls)?;
        let covariates: Vec<(&str, &[f64])> = controls.iter().map(String::as_str).zip(cols.iter().copied()).collect();

        let (effect, n_treated, n_control) = matched_att(t, y, &covariates)?;
        let naive_effect = mean(t.iter().zip(y).filter(|(ti, _)| **ti == 1.0).map(|(_, &yi)| yi))
            - mean(t.iter().zip(y).filter(|(ti, _)| **ti == 0.0).map(|(_, &yi)| yi));

        let n = data.n_rows();
        let run = bootstrap_replicates(n, self.config.n_bootstrap, self.config.seeds.bootstrap, |idx| {
            let tb = take(t, idx);
            let yb = take(y, idx);
            let cb: Vec<Vec<f64>> = cols.iter().map(|c| take(c, idx)).collect();
            let covb: Vec<(&str, &[f64])> =
                controls.iter().map(String::as_str).zip(cb.iter().map(Vec::as_slice)).collect();
            matched_att(&tb, &yb, &covb).map(|(att, _, _)| att)
        });
        if run.estimates.len() < 2 {
            return Err(Error::Computation(format!(
                "bootstrap produced {} usable replicates out of {}",
                run.estimates.len(),
                self.config.n_bootstrap
            )));
        }
        let std_err = sample_std(&run.estimates)?;
        if !(std_err > 0.0) {
            return Err(Error::Computation("bootstrap standard error is zero".into()));
        }
        let conf_int = percentile_interval(&run.estimates, self.config.confidence_level)?;
        let p_value = z_p_value(effect, std_err)?;
        tracing::debug!(
            treatment = self.treatment(),
            outcome = self.outcome(),
            effect,
            std_err,
            n_treated,
            n_control,
            n_bootstrap_failed = run.n_failed,
            "propensity matching fitted"
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
            adjustment_set: controls,
            naive_effect,
            n_obs: n,
            assumptions: family.assumptions(),
            detail: FamilyDetail::Matching {
                n_treated,
                n_control,
                n_bootstrap: self.config.n_bootstrap,
                n_bootstrap_failed: run.n_failed,
                bootstrap_estimates: run.estimates,
            },
        })
    }

    fn run_check(
        &self,
        kind: CheckKind,
        estimate: &CausalEstimate,
        data: &dyn TabularData,
    ) -> Result<RefutationCheck> {
        let (t, y) = self.columns(data)?;
        let cols = control_columns(data, &estimate.adjustment_set)?;
        let covariates: Vec<(&str, &[f64])> =
            estimate.adjustment_set.iter().map(String::as_str).zip(cols.iter().copied()).collect();
        match kind {
            CheckKind::PlaceboTreatment => {
                let placebo_t = permuted(t, self.config.seeds.placebo_treatment);
                let (placebo, _, _) = matched_att(&placebo_t, y, &covariates)?;
                Ok(RefutationCheck::placebo(kind, placebo, estimate.std_err, self.config.placebo_tolerance_se))
            }
            CheckKind::RandomCommonCause => {
                let name = noise_column_name(data);
                let noise = standard_normal_noise(data.n_rows(), self.config.seeds.random_common_cause);
                let mut with_noise = covariates.clone();
                with_noise.push((name.as_str(), noise.as_slice()));
                let (refit, _, _) = matched_att(t, y, &with_noise)?;
                Ok(RefutationCheck::stability(
                    kind,
                    estimate.effect,
                    refit,
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
    fn test_exact_duplicates_go_to_lowest_index() {
        let m = nearest_neighbor_matches(&[0.5, 0.5], &[0.3, 0.5, 0.5, 0.7]);
        assert_eq!(m, vec![1, 1]);
    }

    #[test]
    fn test_equidistant_neighbours_go_to_lowest_index() {
        assert_eq!(nearest_neighbor_matches(&[0.5], &[0.75, 0.25]), vec![0]);
        assert_eq!(nearest_neighbor_matches(&[0.5], &[0.25, 0.75]), vec![0]);
        // left neighbour value has duplicates: earliest of them wins
        assert_eq!(nearest_neighbor_matches(&[0.5], &[0.9, 0.25, 0.25]), vec![1]);
    }

    #[test]
    fn test_out_of_range_scores() {
        let m = nearest_neighbor_matches(&[0.0, 1.0], &[0.4, 0.2, 0.8]);
        assert_eq!(m, vec![1, 2]);
        assert!(nearest_neighbor_matches(&[0.5], &[]).is_empty());
    }

    /// Three confounder strata with treatment shares 0.3 / 0.5 / 0.7;
    /// y = 1 + 2 t + 1.5 c + small bounded wiggle.
    fn data() -> Dataset {
        data_in_units(1.0)
    }

    /// Same units and outcomes, with the confounder column multiplied by `unit`.
    fn data_in_units(unit: f64) -> Dataset {
        let n = 90;
        let c: Vec<f64> = (0..n).map(|i| (i % 3) as f64).collect();
        let t: Vec<f64> = (0..n)
            .map(|i| if (i * 7) % 10 < 3 + 2 * (i % 3) { 1.0 } else { 0.0 })
            .collect();
        let y: Vec<f64> = (0..n)
            .map(|i| 1.0 + 2.0 * t[i] + 1.5 * c[i] + 0.1 * (((i * 13) % 5) as f64 - 2.0))
            .collect();
        let c: Vec<f64> = c.iter().map(|v| v * unit).collect();
        Dataset::new([("c", c), ("t", t), ("y", y)]).unwrap()
    }

    fn estimator(g: &AssumptionGraph) -> PropensityMatching<'_> {
        let config = EstimationConfig { n_bootstrap: 100, ..EstimationConfig::default() };
        PropensityMatching::with_config(g, "t", "y", config).unwrap()
    }

    #[test]
    fn test_matching_within_strata() {
        let g = AssumptionGraph::from_declarations([("c", vec!["t", "y"]), ("t", vec!["y"])]).unwrap();
        let est = estimator(&g).fit(&data()).unwrap();
        assert_abs_diff_eq!(est.effect, 2.0, epsilon = 0.45);
        assert!(est.naive_effect > 2.3, "naive {}", est.naive_effect);
        assert!(est.std_err > 0.0);
        match &est.detail {
            FamilyDetail::Matching { n_treated, n_control, bootstrap_estimates, n_bootstrap_failed, .. } => {
                assert_eq!(n_treated + n_control, 90);
                assert_eq!(bootstrap_estimates.len() + n_bootstrap_failed, 100);
            }
            other => panic!("unexpected detail {other:?}"),
        }
    }

    #[test]
    fn test_fit_is_reproducible() {
        let g = AssumptionGraph::from_declarations([("c", vec!["t", "y"]), ("t", vec!["y"])]).unwrap();
        let d = data();
        assert_eq!(estimator(&g).fit(&d).unwrap(), estimator(&g).fit(&d).unwrap());
    }

    #[test]
    fn test_confounder_units_do_not_change_the_estimate() {
        // At 0.01 the propensity slope is ~85 on the logit scale.
        let g = AssumptionGraph::from_declarations([("c", vec!["t", "y"]), ("t", vec!["y"])]).unwrap();
        let base = estimator(&g).fit(&data()).unwrap();
        let rescaled = estimator(&g).fit(&data_in_units(0.01)).unwrap();
        assert_abs_diff_eq!(rescaled.effect, base.effect, epsilon = 1e-12);
        assert_abs_diff_eq!(rescaled.std_err, base.std_err, epsilon = 1e-9);
    }

    #[test]
    fn test_non_binary_treatment_rejected() {
        let g = AssumptionGraph::from_declarations([("t", vec!["y"])]).unwrap();
        let d = Dataset::new([("t", vec![0.0, 1.0, 2.0]), ("y", vec![1.0, 2.0, 3.0])]).unwrap();
        assert!(matches!(estimator(&g).fit(&d), Err(Error::Validation(_))));
    }
}
