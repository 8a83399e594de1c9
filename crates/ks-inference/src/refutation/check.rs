//! Check and report records.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::estimate::EstimatorFamily;

/// Kinds of diagnostic check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckKind {
    /// Refit with an injected pure-noise covariate; the estimate should not move.
    RandomCommonCause,
    /// First-stage partial F of the instrument must reach the threshold.
    FirstStageStrength,
    /// Refit with randomly permuted treatment labels; the effect should vanish.
    PlaceboTreatment,
    /// Refit with randomly permuted group labels; the effect should vanish.
    PlaceboGroup,
    /// Refit with randomly permuted period labels; the effect should vanish.
    PlaceboTime,
}

impl CheckKind {
    /// Human-readable name.
    pub fn name(self) -> &'static str {
        match self {
            CheckKind::RandomCommonCause => "Random common cause",
            CheckKind::FirstStageStrength => "First-stage F-statistic",
            CheckKind::PlaceboTreatment => "Placebo treatment",
            CheckKind::PlaceboGroup => "Placebo group",
            CheckKind::PlaceboTime => "Placebo time",
        }
    }
}

impl fmt::Display for CheckKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Verdict of one check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefutationCheck {
    /// Which check ran.
    pub kind: CheckKind,
    /// Display name.
    pub name: String,
    /// Pass/fail.
    pub passed: bool,
    /// Quantity compared against the threshold, when one was computed.
    pub statistic: Option<f64>,
    /// Threshold the statistic was compared with.
    pub threshold: Option<f64>,
    /// One-line explanation.
    pub detail: String,
}

impl RefutationCheck {
    /// Stability check: passes if `|refit - original| <= tolerance_se * se`.
    pub fn stability(kind: CheckKind, original: f64, refit: f64, se: f64, tolerance_se: f64) -> Self {
        let shift = (refit - original).abs();
        let bound = tolerance_se * se;
        let passed = shift <= bound;
        let detail = if passed {
            format!("estimate shifted by {shift:.4} (<= {tolerance_se} SE = {bound:.4})")
        } else {
            format!(
                "estimate shifted by {shift:.4} (> {tolerance_se} SE = {bound:.4}); \
                 a spurious covariate destabilised the estimate"
            )
        };
        Self { kind, name: kind.name().to_string(), passed, statistic: Some(shift), threshold: Some(bound), detail }
    }

    /// Placebo check: passes if `|placebo| <= tolerance_se * se`.
    pub fn placebo(kind: CheckKind, placebo: f64, se: f64, tolerance_se: f64) -> Self {
        let bound = tolerance_se * se;
        let passed = placebo.abs() <= bound;
        let detail = if passed {
            format!("placebo estimate = {placebo:.4} (|.| <= {tolerance_se} SE = {bound:.4})")
        } else {
            format!(
                "placebo estimate = {placebo:.4} (|.| > {tolerance_se} SE = {bound:.4}); \
                 randomly reassigned labels produced an effect, the original may be spurious"
            )
        };
        Self { kind, name: kind.name().to_string(), passed, statistic: Some(placebo), threshold: Some(bound), detail }
    }

    /// Instrument strength: passes if `f >= threshold`.
    pub fn first_stage(f: f64, threshold: f64) -> Self {
        let kind = CheckKind::FirstStageStrength;
        let passed = f >= threshold;
        let detail = if passed {
            format!("F = {f:.2} (threshold: F >= {threshold})")
        } else {
            format!(
                "F = {f:.2} (threshold: F >= {threshold}); weak instrument, \
                 the estimate may be badly biased and its interval unreliable"
            )
        };
        Self { kind, name: kind.name().to_string(), passed, statistic: Some(f), threshold: Some(threshold), detail }
    }

    /// A check whose refit failed numerically; recorded as not passing.
    pub fn errored(kind: CheckKind, message: &str) -> Self {
        Self {
            kind,
            name: kind.name().to_string(),
            passed: false,
            statistic: None,
            threshold: None,
            detail: format!("could not be computed: {message}"),
        }
    }
}

/// Ordered checks run against one estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefutationReport {
    /// Estimator family of the refuted estimate.
    pub family: EstimatorFamily,
    /// Treatment (group indicator for difference-in-differences).
    pub treatment: String,
    /// Outcome.
    pub outcome: String,
    /// Checks in the order they ran.
    pub checks: Vec<RefutationCheck>,
}

impl RefutationReport {
    /// `true` iff every check passed.
    pub fn passed(&self) -> bool {
        self.checks.iter().all(|c| c.passed)
    }

    /// Checks that did not pass.
    pub fn failed_checks(&self) -> Vec<&RefutationCheck> {
        self.checks.iter().filter(|c| !c.passed).collect()
    }

    /// Check of the given kind, if it ran.
    pub fn check(&self, kind: CheckKind) -> Option<&RefutationCheck> {
        self.checks.iter().find(|c| c.kind == kind)
    }
}

impl fmt::Display for RefutationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Refutation report ({}): {} -> {}", self.family, self.treatment, self.outcome)?;
        for c in &self.checks {
            let status = if c.passed { "PASS" } else { "FAIL" };
            write!(f, "\n  [{status}] {}: {}", c.name, c.detail)?;
        }
        let failed = self.failed_checks().len();
        if failed == 0 {
            write!(f, "\n  all {} checks passed", self.checks.len())
        } else {
            write!(f, "\n  {failed} of {} checks failed", self.checks.len())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stability_boundary_is_inclusive() {
        let c = RefutationCheck::stability(CheckKind::RandomCommonCause, 1.0, 1.5, 0.5, 1.0);
        assert!(c.passed);
        assert_eq!(c.threshold, Some(0.5));
        let c = RefutationCheck::stability(CheckKind::RandomCommonCause, 1.0, 1.6, 0.5, 1.0);
        assert!(!c.passed);
    }

    #[test]
    fn test_placebo_and_first_stage() {
        assert!(RefutationCheck::placebo(CheckKind::PlaceboGroup, -0.2, 0.3, 1.0).passed);
        assert!(!RefutationCheck::placebo(CheckKind::PlaceboGroup, 0.4, 0.3, 1.0).passed);
        assert!(RefutationCheck::first_stage(10.0, 10.0).passed);
        assert!(!RefutationCheck::first_stage(3.2, 10.0).passed);
    }

    #[test]
    fn test_report_aggregation_and_display() {
        let report = RefutationReport {
            family: EstimatorFamily::InstrumentalVariables,
            treatment: "t".into(),
            outcome: "y".into(),
            checks: vec![
                RefutationCheck::first_stage(3.0, 10.0),
                RefutationCheck::errored(CheckKind::RandomCommonCause, "singular"),
            ],
        };
        assert!(!report.passed());
        assert_eq!(report.failed_checks().len(), 2);
        let text = report.to_string();
        assert!(text.contains("[FAIL] First-stage F-statistic"));
        assert!(text.contains("2 of 2 checks failed"));
        assert!(report.check(CheckKind::PlaceboTime).is_none());
    }
}
