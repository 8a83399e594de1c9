//! Instrumental Variables / Two-Stage Least Squares (2SLS).
//!
//! With one endogenous treatment and one excluded instrument the 2SLS
//! coefficient equals the Wald ratio
//!
//! ```text
//! beta_IV = reduced-form coef (outcome on Z) / first-stage coef (treatment on Z)
//! ```
//!
//! with both regressions sharing the same exogenous controls. Standard errors
//! use second-stage `(X̂'X̂)^{-1}` and residuals from the *original*
//! treatment, not the fitted one.
//!
//! # References
//!
//! - Wooldridge, *Econometric Analysis of Cross Section and Panel Data*, Ch. 5.
//! - Stock & Yogo (2005), "Testing for weak instruments in linear IV regression."

use nalgebra::{DMatrix, DVector};
use ks_core::{EstimationConfig, Error, Result, TabularData};
use ks_graph::AssumptionGraph;

use super::{control_columns, role_column};
use crate::estimate::{CausalEstimate, EstimatorFamily, FamilyDetail, t_inference};
use crate::estimator::CausalEstimator;
use crate::identification::{identify, validate_instrument};
use crate::refutation::noise::{noise_column_name, standard_normal_noise};
use crate::refutation::{CheckKind, RefutationCheck, unsupported};
use crate::regression::{Design, check_full_rank, ols_fit, partial_f};
use crate::roles::{Role, RoleAssignment};

/// Result of a just-identified 2SLS fit.
#[derive(Debug, Clone)]
pub struct IvFit {
    /// Wald ratio `reduced_form_coef / first_stage_coef`.
    pub effect: f64,
    /// 2SLS standard error of the treatment coefficient.
    pub se: f64,
    /// Second-stage coefficients: exogenous columns, then the treatment.
    pub coefficients: Vec<f64>,
    /// Residual degrees of freedom of the second stage.
    pub dof: usize,
    /// Instrument coefficient in the first stage.
    pub first_stage_coef: f64,
    /// Instrument coefficient in the reduced form.
    pub reduced_form_coef: f64,
    /// First-stage partial F of the instrument.
    pub first_stage_f: f64,
    /// Residual degrees of freedom of the first stage.
    pub first_stage_dof: usize,
    /// Number of observations.
    pub n_obs: usize,
}

/// Two-Stage Least Squares with one endogenous regressor and one instrument.
///
/// # Arguments
///
/// - `y`: dependent variable (length n).
/// - `x_exog`: exogenous regressors, row-major (n × k₁). Include intercept column if desired.
/// - `k_exog`: number of exogenous columns.
/// - `x_endog`: endogenous regressor (length n).
/// - `z`: excluded instrument (length n).
pub fn iv_2sls(y: &[f64], x_exog: &[f64], k_exog: usize, x_endog: &[f64], z: &[f64]) -> Result<IvFit> {
    let n = y.len();
    if n == 0 {
        return Err(Error::Validation("y must be non-empty".into()));
    }
    if x_exog.len() != n * k_exog {
        return Err(Error::Validation(format!(
            "x_exog length ({}) != n*k_exog ({})",
            x_exog.len(),
            n * k_exog
        )));
    }
    if x_endog.len() != n || z.len() != n {
        return Err(Error::Validation("x_endog and z must have the same length as y".into()));
    }

    let y_vec = DVector::from_column_slice(y);
    let t_vec = DVector::from_column_slice(x_endog);

    // Full instrument matrix [X_exog | z] (n × (k₁ + 1)).
    let k_full_z = k_exog + 1;
    let z_full = DMatrix::from_fn(n, k_full_z, |i, j| if j < k_exog { x_exog[i * k_exog + j] } else { z[i] });
    check_full_rank(&z_full, "2SLS instrument matrix")?;
    let ztz_inv = (z_full.transpose() * &z_full)
        .try_inverse()
        .ok_or_else(|| Error::Computation("Z'Z singular in 2SLS".into()))?;

    // ---- First stage and reduced form share Z ----
    let gamma = &ztz_inv * (z_full.transpose() * &t_vec);
    let delta = &ztz_inv * (z_full.transpose() * &y_vec);
    let first_stage_coef = gamma[k_exog];
    let reduced_form_coef = delta[k_exog];
    if !(first_stage_coef.is_finite() && first_stage_coef != 0.0) {
        return Err(Error::Computation("first stage is degenerate: instrument coefficient is zero".into()));
    }

    let t_hat = &z_full * &gamma;
    let resid_fs = &t_vec - &t_hat;
    let rss_fs: f64 = resid_fs.iter().map(|r| r * r).sum();
    let rss_restricted = if k_exog > 0 {
        let x_exog_m = DMatrix::from_row_slice(n, k_exog, x_exog);
        let inv = (x_exog_m.transpose() * &x_exog_m)
            .try_inverse()
            .ok_or_else(|| Error::Computation("X_exog'X_exog singular in 2SLS first stage".into()))?;
        let fitted_r = &x_exog_m * (&inv * (x_exog_m.transpose() * &t_vec));
        (&t_vec - fitted_r).iter().map(|r| r * r).sum()
    } else {
        t_vec.iter().map(|v| v * v).sum()
    };
    let first_stage_dof = n - k_full_z;
    let first_stage_f = partial_f(rss_restricted, rss_fs, 1, first_stage_dof)?;

    // ---- Second stage: regress y on [X_exog | t̂] ----
    let k_total = k_exog + 1;
    let x2 = DMatrix::from_fn(n, k_total, |i, j| if j < k_exog { x_exog[i * k_exog + j] } else { t_hat[i] });
    check_full_rank(&x2, "2SLS second stage")?;
    let xtx2_inv = (x2.transpose() * &x2)
        .try_inverse()
        .ok_or_else(|| Error::Computation("X'X singular in 2SLS second stage".into()))?;
    let beta2 = &xtx2_inv * (x2.transpose() * &y_vec);

    // Residuals using ORIGINAL x_endog (not fitted values)
    let x_orig = DMatrix::from_fn(n, k_total, |i, j| if j < k_exog { x_exog[i * k_exog + j] } else { x_endog[i] });
    let resid = &y_vec - &x_orig * &beta2;
    let rss: f64 = resid.iter().map(|r| r * r).sum();
    let dof = n - k_total;
    let sigma2 = rss / dof as f64;
    let se = (sigma2 * xtx2_inv[(k_exog, k_exog)]).max(0.0).sqrt();

    Ok(IvFit {
        effect: reduced_form_coef / first_stage_coef,
        se,
        coefficients: beta2.iter().copied().collect(),
        dof,
        first_stage_coef,
        reduced_form_coef,
        first_stage_f,
        first_stage_dof,
        n_obs: n,
    })
}

/// Row-major `[1 | columns...]`.
fn exog_rows(n: usize, columns: &[&[f64]]) -> (Vec<f64>, usize) {
    let k = columns.len() + 1;
    let mut data = Vec::with_capacity(n * k);
    for i in 0..n {
        data.push(1.0);
        for c in columns {
            data.push(c[i]);
        }
    }
    (data, k)
}

/// Instrumented estimator (LATE).
///
/// The instrument is checked structurally at construction: it must cause the
/// treatment, must not reach the outcome except through the treatment, and must
/// not be caused by the outcome. Confounders with a column in the data are used
/// as exogenous controls in both stages; confounders without one are waived,
/// since the instrument is what handles them.
#[derive(Debug, Clone)]
pub struct InstrumentalVariables<'g> {
    graph: &'g AssumptionGraph,
    roles: RoleAssignment,
    config: EstimationConfig,
}

impl<'g> InstrumentalVariables<'g> {
    /// Estimator with default configuration.
    pub fn new(graph: &'g AssumptionGraph, treatment: &str, outcome: &str, instrument: &str) -> Result<Self> {
        Self::with_config(graph, treatment, outcome, instrument, EstimationConfig::default())
    }

    /// Estimator with explicit configuration.
    pub fn with_config(
        graph: &'g AssumptionGraph,
        treatment: &str,
        outcome: &str,
        instrument: &str,
        config: EstimationConfig,
    ) -> Result<Self> {
        config.validate()?;
        let roles = RoleAssignment::instrumented(treatment, outcome, instrument);
        roles.validate(graph)?;
        validate_instrument(graph, instrument, treatment, outcome)?;
        Ok(Self { graph, roles, config })
    }

    fn var(&self, role: Role) -> &str {
        self.roles.get(role).unwrap_or_default()
    }

    fn two_stage(&self, data: &dyn TabularData, controls: &[String], extra: Option<&[f64]>) -> Result<IvFit> {
        let t = role_column(data, Role::Treatment, self.var(Role::Treatment))?;
        let y = role_column(data, Role::Outcome, self.var(Role::Outcome))?;
        let z = role_column(data, Role::Instrument, self.var(Role::Instrument))?;
        let mut cols = control_columns(data, controls)?;
        if let Some(e) = extra {
            cols.push(e);
        }
        let (x_exog, k_exog) = exog_rows(data.n_rows(), &cols);
        iv_2sls(y, &x_exog, k_exog, t, z)
    }

    fn first_stage_f(&self, data: &dyn TabularData, controls: &[String]) -> Result<f64> {
        let t = role_column(data, Role::Treatment, self.var(Role::Treatment))?;
        let z = role_column(data, Role::Instrument, self.var(Role::Instrument))?;
        let cols = control_columns(data, controls)?;
        let mut restricted = Design::with_intercept(data.n_rows());
        for (name, col) in controls.iter().zip(&cols) {
            restricted.push(name.as_str(), col)?;
        }
        let mut full = restricted.clone();
        full.push(self.var(Role::Instrument), z)?;
        let fit_r = ols_fit(&restricted, t)?;
        let fit_u = ols_fit(&full, t)?;
        partial_f(fit_r.rss, fit_u.rss, 1, fit_u.dof)
    }
}

impl CausalEstimator for InstrumentalVariables<'_> {
    fn family(&self) -> EstimatorFamily {
        EstimatorFamily::InstrumentalVariables
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
        let z = self.var(Role::Instrument);
        Ok(identify(self.graph, self.var(Role::Treatment), self.var(Role::Outcome), &[z], data).observed)
    }

    fn fit(&self, data: &dyn TabularData) -> Result<CausalEstimate> {
        let (treatment, outcome, instrument) =
            (self.var(Role::Treatment), self.var(Role::Outcome), self.var(Role::Instrument));
        let t = role_column(data, Role::Treatment, treatment)?;
        let y = role_column(data, Role::Outcome, outcome)?;
        role_column(data, Role::Instrument, instrument)?;

        let id = identify(self.graph, treatment, outcome, &[instrument], data);
        if !id.missing.is_empty() {
            tracing::debug!(missing = ?id.missing, "unobserved confounders waived by the instrument");
        }
        let controls = id.observed;

        let iv = self.two_stage(data, &controls, None)?;
        let mut naive_design = Design::with_intercept(data.n_rows());
        naive_design.push(treatment, t)?;
        let naive = ols_fit(&naive_design, y)?;

        let (conf_int, p_value) = t_inference(iv.effect, iv.se, iv.dof as f64, self.config.confidence_level)?;
        let first_stage_f_p_value = ks_prob::fisher::upper_tail(iv.first_stage_f, 1.0, iv.first_stage_dof as f64)?;
        tracing::debug!(
            treatment,
            outcome,
            instrument,
            effect = iv.effect,
            se = iv.se,
            first_stage_f = iv.first_stage_f,
            n_obs = iv.n_obs,
            "2SLS fitted"
        );

        let family = self.family();
        Ok(CausalEstimate {
            family,
            estimand: family.estimand(),
            treatment: treatment.to_string(),
            outcome: outcome.to_string(),
            effect: iv.effect,
            std_err: iv.se,
            conf_int,
            confidence_level: self.config.confidence_level,
            p_value,
            adjustment_set: controls,
            naive_effect: naive.coefficients[1],
            n_obs: iv.n_obs,
            assumptions: family.assumptions(),
            detail: FamilyDetail::Instrumental {
                instrument: instrument.to_string(),
                first_stage_coef: iv.first_stage_coef,
                reduced_form_coef: iv.reduced_form_coef,
                first_stage_f: iv.first_stage_f,
                first_stage_f_p_value,
                unobserved_confounders: id.missing,
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
            CheckKind::FirstStageStrength => {
                let f = self.first_stage_f(data, &estimate.adjustment_set)?;
                Ok(RefutationCheck::first_stage(f, self.config.first_stage_f_threshold))
            }
            CheckKind::RandomCommonCause => {
                let name = noise_column_name(data);
                let noise = standard_normal_noise(data.n_rows(), self.config.seeds.random_common_cause);
                tracing::debug!(column = %name, "injecting random common cause");
                let refit = self.two_stage(data, &estimate.adjustment_set, Some(noise.as_slice()))?;
                Ok(RefutationCheck::stability(
                    kind,
                    estimate.effect,
                    refit.effect,
                    estimate.std_err,
                    self.config.random_common_cause_tolerance_se,
                ))
            }
            other => Err(unsupported(other, self.family())),
        }
    }
}
