//! DomainWeights config kind: per-domain embedding weights, change
//! thresholds, scaling-method policy, and descriptive metadata.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::schema::{ChangeThresholds, CommonMetadata, ScalingMethod};

/// Domains every DomainWeights document must configure (besides `default`).
pub const SUPPORTED_DOMAINS: &[&str] = &["port", "farm", "mine", "energy"];

/// Key of the fallback domain.
pub const DEFAULT_DOMAIN: &str = "default";

// ── YAML-level types ────────────────────────────────────────────────

/// Top-level DomainWeights document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DomainWeightsRule {
    #[serde(rename = "apiVersion")]
    pub api_version: String,
    pub kind: String,
    pub metadata: CommonMetadata,
    pub spec: DomainWeightsSpec,
}

/// Specification section of a DomainWeights document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DomainWeightsSpec {
    /// Free-form version of the weight set.
    pub version: String,
    /// Declared embedding dimensionality; every weight map must match it.
    pub embedding_dimensions: usize,
    /// Fallback configuration used for unknown domains.
    pub default: DomainEntry,
    /// Named operational domains.
    pub domains: IndexMap<String, DomainEntry>,
}

/// One domain's weights, thresholds and descriptive notes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DomainEntry {
    /// Human-readable domain name.
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// What the weighting emphasises.
    #[serde(default)]
    pub emphasis: Vec<String>,
    /// Scaling curve used by the scaled scoring path.
    #[serde(default)]
    pub scaling_method: ScalingMethod,
    pub thresholds: ChangeThresholds,
    /// Optional domain-specific alert raised by embedding analysis.
    #[serde(default)]
    pub alert: Option<AlertHint>,
    /// Dimension name → weight, in embedding order.
    pub weights: IndexMap<String, f64>,
}

/// Domain-specific alert attached to weighted embedding analysis.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct AlertHint {
    /// Weighted magnitude at or above which the alert fires.
    pub min_magnitude: f64,
    #[serde(default)]
    pub level: AlertLevel,
    pub message: String,
    pub action: String,
}

/// Severity of an embedding-analysis alert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertLevel {
    #[default]
    Info,
    Warning,
    Critical,
}
