//! Fitted causal estimates.

use std::fmt;

use ks_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Causal quantity an estimator targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Estimand {
    /// Average treatment effect over the whole population.
    Ate,
    /// Average treatment effect on the treated.
    Att,
    /// Local average treatment effect for instrument compliers.
    Late,
}

impl fmt::Display for Estimand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Estimand::Ate => "ATE",
            Estimand::Att => "ATT",
            Estimand::Late => "LATE",
        })
    }
}

/// The five estimator variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimatorFamily {
    /// Linear regression adjusted for the backdoor set.
    AdjustedRegression,
    /// Instrumented two-stage least squares.
    InstrumentalVariables,
    /// 1:1 nearest-neighbour propensity-score matching.
    PropensityMatching,
    /// Difference in means under random assignment.
    RandomizedTrial,
    /// Two-group two-period difference-in-differences.
    DifferenceInDifferences,
}

impl EstimatorFamily {
    /// Estimand targeted by this family.
    pub fn estimand(self) -> Estimand {
        match self {
            EstimatorFamily::AdjustedRegression | EstimatorFamily::RandomizedTrial => Estimand::Ate,
            EstimatorFamily::InstrumentalVariables => Estimand::Late,
            EstimatorFamily::PropensityMatching | EstimatorFamily::DifferenceInDifferences => Estimand::Att,
        }
    }

    /// Modelling assumptions a causal reading of the estimate depends on.
    pub fn assumptions(self) -> Vec<Assumption> {
        let list: &[(&str, bool)] = match self {
            EstimatorFamily::AdjustedRegression => &[
                ("No unobserved confounding: the graph lists every common cause of treatment and outcome", false),
                ("Linearity: the outcome is linear in treatment and confounders", true),
                ("Stable Unit Treatment Value Assumption (SUTVA)", false),
            ],
            EstimatorFamily::InstrumentalVariables => &[
                ("Relevance: the instrument strongly affects treatment", true),
                ("Exclusion restriction: instrument only affects outcome through treatment", false),
                ("Independence: instrument is uncorrelated with unobserved confounders", false),
                ("Monotonicity: instrument affects treatment in same direction for everyone", false),
            ],
            EstimatorFamily::PropensityMatching => &[
                ("Conditional independence: no unobserved confounders given matched variables", false),
                ("Common support: overlap exists in characteristics between groups", true),
                ("Correct specification of the matching variables", false),
                ("Stable Unit Treatment Value Assumption (SUTVA)", false),
            ],
            EstimatorFamily::RandomizedTrial => &[
                ("Random assignment of treatment", false),
                ("Excludability: assignment affects outcome only through treatment received", false),
                ("Stable Unit Treatment Value Assumption (SUTVA)", false),
            ],
            EstimatorFamily::DifferenceInDifferences => &[
                (
                    "Parallel trends: treated and control groups would have followed the same trend absent treatment",
                    false,
                ),
                ("No anticipation: treatment does not affect outcomes before it begins", false),
                ("Stable group composition: group membership does not change due to treatment", false),
                ("Stable Unit Treatment Value Assumption (SUTVA)", false),
            ],
        };
        list.iter().map(|&(name, testable)| Assumption { name: name.to_string(), testable }).collect()
    }
}

impl fmt::Display for EstimatorFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EstimatorFamily::AdjustedRegression => "adjusted regression",
            EstimatorFamily::InstrumentalVariables => "instrumental variables (2SLS)",
            EstimatorFamily::PropensityMatching => "propensity score matching",
            EstimatorFamily::RandomizedTrial => "randomized trial",
            EstimatorFamily::DifferenceInDifferences => "difference-in-differences",
        })
    }
}

/// A modelling assumption and whether the data can probe it at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assumption {
    /// Statement of the assumption.
    pub name: String,
    /// Whether some diagnostic can (partially) test it.
    pub testable: bool,
}

/// Family-specific quantities carried alongside the headline estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FamilyDetail {
    /// Adjusted regression.
    Regression {
        /// Standard error of the unadjusted coefficient.
        naive_std_err: f64,
    },
    /// Two-stage least squares.
    Instrumental {
        /// Instrument.
        instrument: String,
        /// Coefficient of the instrument in the first stage (treatment on instrument).
        first_stage_coef: f64,
        /// Coefficient of the instrument in the reduced form (outcome on instrument).
        reduced_form_coef: f64,
        /// Partial F-statistic of the instrument in the first stage.
        first_stage_f: f64,
        /// Upper-tail p-value of `first_stage_f`.
        first_stage_f_p_value: f64,
        /// Confounders in the graph without a column in the data (waived).
        unobserved_confounders: Vec<String>,
    },
    /// Propensity-score matching.
    Matching {
        /// Treated units.
        n_treated: usize,
        /// Control units.
        n_control: usize,
        /// Bootstrap replicates requested.
        n_bootstrap: usize,
        /// Replicates skipped as degenerate.
        n_bootstrap_failed: usize,
        /// ATT of every usable replicate, in replicate order.
        bootstrap_estimates: Vec<f64>,
    },
    /// Randomized trial.
    RandomizedTrial {
        /// Mean outcome among treated.
        mean_treated: f64,
        /// Mean outcome among controls.
        mean_control: f64,
        /// Treated units.
        n_treated: usize,
        /// Control units.
        n_control: usize,
        /// Welch–Satterthwaite degrees of freedom.
        dof: f64,
    },
    /// Difference-in-differences.
    DifferenceInDifferences {
        /// Period indicator.
        time: String,
        /// Mean outcome: treated group, post period.
        mean_treated_post: f64,
        /// Mean outcome: treated group, pre period.
        mean_treated_pre: f64,
        /// Mean outcome: control group, post period.
        mean_control_post: f64,
        /// Mean outcome: control group, pre period.
        mean_control_pre: f64,
    },
}

/// Immutable record of a successful fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CausalEstimate {
    /// Estimator that produced it.
    pub family: EstimatorFamily,
    /// Targeted estimand.
    pub estimand: Estimand,
    /// Treatment (the group indicator for difference-in-differences).
    pub treatment: String,
    /// Outcome.
    pub outcome: String,
    /// Point estimate.
    pub effect: f64,
    /// Standard error.
    pub std_err: f64,
    /// Confidence interval `(lower, upper)`.
    pub conf_int: (f64, f64),
    /// Level of `conf_int`.
    pub confidence_level: f64,
    /// Two-sided p-value for `H0: effect = 0`.
    pub p_value: f64,
    /// Variables actually controlled for (sorted).
    pub adjustment_set: Vec<String>,
    /// Unadjusted comparison estimate.
    pub naive_effect: f64,
    /// Observations used.
    pub n_obs: usize,
    /// Assumptions behind a causal reading.
    pub assumptions: Vec<Assumption>,
    /// Family-specific quantities.
    pub detail: FamilyDetail,
}

impl CausalEstimate {
    /// `naive_effect - effect`: how much adjustment moved the estimate.
    pub fn confounding_bias(&self) -> f64 {
        self.naive_effect - self.effect
    }

    /// Whether the interval excludes zero.
    pub fn is_significant(&self) -> bool {
        self.conf_int.0 > 0.0 || self.conf_int.1 < 0.0
    }
}

/// Interval and p-value from a Student-t reference with `dof` degrees of freedom.
pub(crate) fn t_inference(effect: f64, se: f64, dof: f64, level: f64) -> Result<((f64, f64), f64)> {
    if !(se.is_finite() && se >= 0.0) {
        return Err(Error::Computation(format!("standard error is not finite: {se}")));
    }
    let crit = ks_prob::student_t::critical_value(level, dof)?;
    let p = ks_prob::student_t::two_sided_p_value(effect / se, dof)?;
    Ok(((effect - crit * se, effect + crit * se), p))
}

/// Two-sided normal p-value for `effect / se`.
pub(crate) fn z_p_value(effect: f64, se: f64) -> Result<f64> {
    if !(se.is_finite() && se > 0.0) {
        return Err(Error::Computation(format!("standard error must be finite and > 0, got {se}")));
    }
    ks_prob::normal::two_sided_p_value(effect / se)
}
