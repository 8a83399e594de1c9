//! Estimation and refutation configuration.
//!
//! # Seeds
//!
//! Every randomized routine inside Kausal draws from its own fixed seed. The
//! seeds are part of the refutation contract:
//!
//! - they are constant across calls, so a report is reproducible bit for bit;
//! - they are pairwise distinct, so the bootstrap, the injected noise column and
//!   the placebo permutations never share a random stream. Bootstrap replicate
//!   `b` seeds from `bootstrap + b` (wrapping), so the whole replicate range
//!   `[bootstrap, bootstrap + n_bootstrap)` must avoid the other seeds;
//! - none of them is a value callers commonly use to simulate data (0, 1, 7,
//!   42, 123, ...). Injecting noise from the same stream that generated a real
//!   covariate can make the two columns nearly collinear and the refit design
//!   matrix degenerate.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Seed for bootstrap resampling of unit indices.
pub const BOOTSTRAP_SEED: u64 = 0x6b73_0b00_7357_0001;
/// Seed for the injected random-common-cause column.
pub const RANDOM_COMMON_CAUSE_SEED: u64 = 0x6b73_00cc_5eed_0002;
/// Seed for the placebo treatment/group permutation.
pub const PLACEBO_TREATMENT_SEED: u64 = 0x6b73_0091_ace0_0003;
/// Seed for the placebo time permutation.
pub const PLACEBO_TIME_SEED: u64 = 0x6b73_0071_3e00_0004;

/// Seeds callers plausibly use for their own data generation.
const COMMON_CALLER_SEEDS: [u64; 8] = [0, 1, 7, 42, 123, 1234, 2024, 12345];

/// Seeds used by randomized checks and the bootstrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefutationSeeds {
    /// Bootstrap resampling (replicate `b` uses `bootstrap + b`).
    pub bootstrap: u64,
    /// Random common cause noise column.
    pub random_common_cause: u64,
    /// Placebo treatment / placebo group permutation.
    pub placebo_treatment: u64,
    /// Placebo time permutation.
    pub placebo_time: u64,
}

impl Default for RefutationSeeds {
    fn default() -> Self {
        Self {
            bootstrap: BOOTSTRAP_SEED,
            random_common_cause: RANDOM_COMMON_CAUSE_SEED,
            placebo_treatment: PLACEBO_TREATMENT_SEED,
            placebo_time: PLACEBO_TIME_SEED,
        }
    }
}

impl RefutationSeeds {
    fn as_array(&self) -> [(&'static str, u64); 4] {
        [
            ("bootstrap", self.bootstrap),
            ("random_common_cause", self.random_common_cause),
            ("placebo_treatment", self.placebo_treatment),
            ("placebo_time", self.placebo_time),
        ]
    }

    /// Reject overlapping seeds and well-known caller seeds.
    pub fn validate(&self) -> Result<()> {
        let seeds = self.as_array();
        for (i, (name_a, a)) in seeds.iter().enumerate() {
            if COMMON_CALLER_SEEDS.contains(a) {
                return Err(Error::Validation(format!(
                    "seed '{}' = {} is a common data-generation seed; pick a distinct value",
                    name_a, a
                )));
            }
            for (name_b, b) in &seeds[i + 1..] {
                if a == b {
                    return Err(Error::Validation(format!(
                        "seeds '{}' and '{}' must be distinct (both {})",
                        name_a, name_b, a
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Thresholds and sizes shared by every estimator and refutation check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimationConfig {
    /// Confidence level of reported intervals (default 0.95).
    pub confidence_level: f64,
    /// First-stage F threshold for instrument strength (default 10).
    pub first_stage_f_threshold: f64,
    /// Bootstrap replicate count for matching (default 500).
    pub n_bootstrap: usize,
    /// Allowed estimate shift under a random common cause, in standard errors.
    pub random_common_cause_tolerance_se: f64,
    /// Allowed |placebo estimate|, in standard errors of the original estimate.
    pub placebo_tolerance_se: f64,
    /// Fixed seeds.
    pub seeds: RefutationSeeds,
}

impl Default for EstimationConfig {
    fn default() -> Self {
        Self {
            confidence_level: 0.95,
            first_stage_f_threshold: 10.0,
            n_bootstrap: 500,
            random_common_cause_tolerance_se: 1.0,
            placebo_tolerance_se: 1.0,
            seeds: RefutationSeeds::default(),
        }
    }
}

impl EstimationConfig {
    /// Validate ranges and seed distinctness.
    pub fn validate(&self) -> Result<()> {
        let cl = self.confidence_level;
        if !(cl.is_finite() && cl > 0.0 && cl < 1.0) {
            return Err(Error::Validation(format!("confidence_level must be in (0,1), got {cl}")));
        }
        if !(self.first_stage_f_threshold.is_finite() && self.first_stage_f_threshold > 0.0) {
            return Err(Error::Validation(format!(
                "first_stage_f_threshold must be finite and > 0, got {}",
                self.first_stage_f_threshold
            )));
        }
        if self.n_bootstrap < 2 {
            return Err(Error::Validation(format!(
                "n_bootstrap must be >= 2, got {}",
                self.n_bootstrap
            )));
        }
        for (name, v) in [
            ("random_common_cause_tolerance_se", self.random_common_cause_tolerance_se),
            ("placebo_tolerance_se", self.placebo_tolerance_se),
        ] {
            if !(v.is_finite() && v > 0.0) {
                return Err(Error::Validation(format!("{name} must be finite and > 0, got {v}")));
            }
        }
        self.seeds.validate()?;
        self.validate_bootstrap_range()
    }

    /// Reject a replicate seed range that covers another seed or a caller seed.
    fn validate_bootstrap_range(&self) -> Result<()> {
        let start = self.seeds.bootstrap;
        let len = self.n_bootstrap as u64;
        let seeds = self.seeds.as_array();
        let others = seeds[1..]
            .iter()
            .copied()
            .chain(COMMON_CALLER_SEEDS.iter().map(|&s| ("common data-generation seed", s)));
        for (name, seed) in others {
            let offset = seed.wrapping_sub(start);
            if offset < len {
                return Err(Error::Validation(format!(
                    "bootstrap replicate {offset} would draw from seed {seed} ({name}); \
                     move the bootstrap seed or shrink n_bootstrap"
                )));
            }
        }
        Ok(())
    }

    /// Parse and validate a configuration from JSON. Missing fields take defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read, parse and validate a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}
