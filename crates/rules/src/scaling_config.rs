//! ScalingConfig config kind: per-domain curve parameters for the
//! magnitude scaler and tolerance factors for the confidence calculator.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::schema::CommonMetadata;

// ── YAML-level types ────────────────────────────────────────────────

/// Top-level ScalingConfig document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ScalingConfigRule {
    #[serde(rename = "apiVersion")]
    pub api_version: String,
    pub kind: String,
    pub metadata: CommonMetadata,
    pub spec: ScalingConfigSpec,
}

/// Specification section of a ScalingConfig document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ScalingConfigSpec {
    pub default: ScalingParams,
    #[serde(default)]
    pub domains: IndexMap<String, ScalingParams>,
}

/// Parameters for every scaling curve of one domain.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ScalingParams {
    pub sigmoid: SigmoidParams,
    pub min_max: MinMaxRange,
    pub tanh_scale: f64,
    #[serde(default = "default_arctan_scale")]
    pub arctan_scale: f64,
    #[serde(default = "default_log_scale")]
    pub log_scale: f64,
    #[serde(default)]
    pub tolerance: ToleranceFactors,
}

fn default_arctan_scale() -> f64 {
    10.0
}

fn default_log_scale() -> f64 {
    1.0
}

/// Logistic curve parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SigmoidParams {
    /// Steepness `k`.
    pub steepness: f64,
    /// Midpoint `x0` (maps to 0.5).
    pub midpoint: f64,
}

/// Expected magnitude range for min-max scaling.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct MinMaxRange {
    pub low: f64,
    pub high: f64,
}

/// Domain tolerance for the confidence goodness transforms.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ToleranceFactors {
    pub cv_factor: f64,
    pub mad_factor: f64,
    /// Relative deviation considered significant for this domain.
    pub deviation_threshold: f64,
}

impl Default for ToleranceFactors {
    fn default() -> Self {
        Self {
            cv_factor: 4.0,
            mad_factor: 6.0,
            deviation_threshold: 0.15,
        }
    }
}

impl Default for ScalingParams {
    fn default() -> Self {
        Self {
            sigmoid: SigmoidParams {
                steepness: 10.0,
                midpoint: 0.1,
            },
            min_max: MinMaxRange {
                low: 0.0,
                high: 0.2,
            },
            tanh_scale: 5.0,
            arctan_scale: default_arctan_scale(),
            log_scale: default_log_scale(),
            tolerance: ToleranceFactors::default(),
        }
    }
}

impl ScalingConfigSpec {
    /// Parameters for `domain`, falling back to `default`.
    pub fn params_for(&self, domain: &str) -> &ScalingParams {
        self.domains.get(domain).unwrap_or(&self.default)
    }
}
