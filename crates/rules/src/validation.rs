//! Structural validation for the DomainWeights and ScalingConfig kinds.
//!
//! Returns a [`ValidationResult`] with errors (block load) and warnings
//! (advisory, logged by the loader).

use serde::{Deserialize, Serialize};

use crate::domain_weights::{DomainEntry, DomainWeightsRule, DEFAULT_DOMAIN, SUPPORTED_DOMAINS};
use crate::scaling_config::{ScalingConfigRule, ScalingParams};
use crate::schema::{ChangeThresholds, API_VERSION};

// ── Result types ────────────────────────────────────────────────────

/// Overall validation outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

/// A blocking validation error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationError {
    /// Path-like location, e.g. `"spec.domains.port.thresholds"`.
    pub path: String,
    pub message: String,
}

/// A non-blocking advisory warning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationResult {
    fn new() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.valid = false;
        self.errors.push(ValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ValidationWarning {
            path: path.into(),
            message: message.into(),
        });
    }

    /// Errors rendered as `path: message` lines.
    pub fn error_messages(&self) -> Vec<String> {
        self.errors
            .iter()
            .map(|e| format!("{}: {}", e.path, e.message))
            .collect()
    }
}

// ── Common envelope ─────────────────────────────────────────────────

fn validate_envelope(api_version: &str, kind: &str, expected_kind: &str, id: &str, result: &mut ValidationResult) {
    if api_version != API_VERSION {
        result.error(
            "apiVersion",
            format!("apiVersion must be '{}', got '{}'", API_VERSION, api_version),
        );
    }
    if kind != expected_kind {
        result.error(
            "kind",
            format!("kind must be '{}', got '{}'", expected_kind, kind),
        );
    }
    if id.trim().is_empty() {
        result.error("metadata.id", "metadata.id must not be empty");
    }
}

// ── DomainWeights ───────────────────────────────────────────────────

/// Validate a parsed DomainWeights document.
pub fn validate_domain_weights(rule: &DomainWeightsRule) -> ValidationResult {
    let mut result = ValidationResult::new();
    validate_envelope(
        &rule.api_version,
        &rule.kind,
        "DomainWeights",
        &rule.metadata.id,
        &mut result,
    );

    let spec = &rule.spec;
    if spec.embedding_dimensions == 0 {
        result.error("spec.embedding_dimensions", "embedding_dimensions must be positive");
    }

    for required in SUPPORTED_DOMAINS {
        if !spec.domains.contains_key(*required) {
            result.error(
                "spec.domains",
                format!("missing required domain '{}'", required),
            );
        }
    }
    if spec.domains.contains_key(DEFAULT_DOMAIN) {
        result.error(
            "spec.domains.default",
            "'default' is configured under spec.default, not spec.domains",
        );
    }

    validate_entry("spec.default", &spec.default, spec.embedding_dimensions, None, &mut result);
    for (key, entry) in &spec.domains {
        let path = format!("spec.domains.{}", key);
        validate_entry(
            &path,
            entry,
            spec.embedding_dimensions,
            Some(&spec.default),
            &mut result,
        );
    }

    result
}

fn validate_entry(
    path: &str,
    entry: &DomainEntry,
    dimensions: usize,
    reference: Option<&DomainEntry>,
    result: &mut ValidationResult,
) {
    if entry.name.trim().is_empty() {
        result.error(format!("{}.name", path), "name must not be empty");
    }

    if entry.weights.len() != dimensions {
        result.error(
            format!("{}.weights", path),
            format!(
                "has {} weights, expected {}",
                entry.weights.len(),
                dimensions
            ),
        );
    } else if let Some(reference) = reference {
        // Dimension names and order must line up with `default` so the
        // compiled weight vectors are index-aligned.
        let mismatch = entry
            .weights
            .keys()
            .zip(reference.weights.keys())
            .position(|(a, b)| a != b);
        if let Some(i) = mismatch {
            result.error(
                format!("{}.weights", path),
                format!(
                    "dimension #{} is '{}' but default lists '{}'",
                    i,
                    entry.weights.get_index(i).map(|(k, _)| k.as_str()).unwrap_or(""),
                    reference.weights.get_index(i).map(|(k, _)| k.as_str()).unwrap_or("")
                ),
            );
        }
    }

    for (dim, w) in &entry.weights {
        if !w.is_finite() {
            result.error(
                format!("{}.weights.{}", path, dim),
                format!("weight must be finite, got {}", w),
            );
        }
    }

    validate_thresholds(&format!("{}.thresholds", path), &entry.thresholds, result);

    if let Some(alert) = &entry.alert {
        if !alert.min_magnitude.is_finite() || alert.min_magnitude < 0.0 {
            result.error(
                format!("{}.alert.min_magnitude", path),
                "min_magnitude must be a non-negative number",
            );
        }
    }
}

fn validate_thresholds(path: &str, t: &ChangeThresholds, result: &mut ValidationResult) {
    let values = t.as_array();
    if values.iter().any(|v| !v.is_finite() || *v < 0.0) {
        result.error(path, "thresholds must be finite and non-negative");
        return;
    }
    if !values.windows(2).all(|w| w[0] < w[1]) {
        result.error(
            path,
            format!(
                "thresholds must be strictly increasing (minor < moderate < major < critical), got {:?}",
                values
            ),
        );
    }
}

// ── ScalingConfig ───────────────────────────────────────────────────

/// Validate a parsed ScalingConfig document, cross-checking its domain
/// keys against the weights document it will be compiled with.
pub fn validate_scaling_config(
    rule: &ScalingConfigRule,
    weights: &DomainWeightsRule,
) -> ValidationResult {
    let mut result = ValidationResult::new();
    validate_envelope(
        &rule.api_version,
        &rule.kind,
        "ScalingConfig",
        &rule.metadata.id,
        &mut result,
    );

    validate_params("spec.default", &rule.spec.default, &mut result);
    for (key, params) in &rule.spec.domains {
        validate_params(&format!("spec.domains.{}", key), params, &mut result);
        if !weights.spec.domains.contains_key(key) {
            result.warn(
                format!("spec.domains.{}", key),
                format!("scaling parameters for '{}' have no matching weights domain", key),
            );
        }
    }
    for key in weights.spec.domains.keys() {
        if !rule.spec.domains.contains_key(key) {
            result.warn(
                format!("spec.domains.{}", key),
                format!("domain '{}' has no scaling parameters, using default", key),
            );
        }
    }

    result
}

fn validate_params(path: &str, p: &ScalingParams, result: &mut ValidationResult) {
    let positive = [
        ("sigmoid.steepness", p.sigmoid.steepness),
        ("tanh_scale", p.tanh_scale),
        ("arctan_scale", p.arctan_scale),
        ("log_scale", p.log_scale),
        ("tolerance.cv_factor", p.tolerance.cv_factor),
        ("tolerance.mad_factor", p.tolerance.mad_factor),
    ];
    for (field, v) in positive {
        if !(v.is_finite() && v > 0.0) {
            result.error(
                format!("{}.{}", path, field),
                format!("must be a positive number, got {}", v),
            );
        }
    }

    let finite = [
        ("sigmoid.midpoint", p.sigmoid.midpoint),
        ("min_max.low", p.min_max.low),
        ("min_max.high", p.min_max.high),
        ("tolerance.deviation_threshold", p.tolerance.deviation_threshold),
    ];
    for (field, v) in finite {
        if !v.is_finite() {
            result.error(
                format!("{}.{}", path, field),
                format!("must be finite, got {}", v),
            );
        }
    }

    // A degenerate range is tolerated (the scaler returns 0.5) but flagged.
    if p.min_max.high <= p.min_max.low {
        result.warn(
            format!("{}.min_max", path),
            "high <= low, min-max scaling will return 0.5 for every value",
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WEIGHTS: &str = include_str!("../../../data/config/domain-weights.yml");
    const SCALING: &str = include_str!("../../../data/config/scaling-config.yml");

    fn weights() -> DomainWeightsRule {
        serde_yaml::from_str(WEIGHTS).unwrap()
    }

    fn scaling() -> ScalingConfigRule {
        serde_yaml::from_str(SCALING).unwrap()
    }

    #[test]
    fn shipped_config_is_valid() {
        let w = weights();
        let r = validate_domain_weights(&w);
        assert!(r.valid, "{:?}", r.errors);
        let s = validate_scaling_config(&scaling(), &w);
        assert!(s.valid, "{:?}", s.errors);
        assert!(s.warnings.is_empty(), "{:?}", s.warnings);
    }

    #[test]
    fn wrong_dimension_count_is_rejected() {
        let mut w = weights();
        w.spec.domains["port"].weights.pop();
        let r = validate_domain_weights(&w);
        assert!(!r.valid);
        assert!(r.errors.iter().any(|e| e.path == "spec.domains.port.weights"
            && e.message.contains("has 63 weights, expected 64")));
    }

    #[test]
    fn missing_required_domain_is_rejected() {
        let mut w = weights();
        w.spec.domains.shift_remove("mine");
        let r = validate_domain_weights(&w);
        assert!(!r.valid);
        assert!(r.errors.iter().any(|e| e.message.contains("missing required domain 'mine'")));
    }

    #[test]
    fn non_increasing_thresholds_are_rejected() {
        let mut w = weights();
        w.spec.domains["farm"].thresholds.major_change = 0.06;
        let r = validate_domain_weights(&w);
        assert!(!r.valid);
        assert!(r.errors.iter().any(|e| e.path == "spec.domains.farm.thresholds"));
    }

    #[test]
    fn negative_threshold_is_rejected() {
        let mut w = weights();
        w.spec.default.thresholds.minor_change = -0.01;
        assert!(!validate_domain_weights(&w).valid);
    }

    #[test]
    fn misaligned_dimension_names_are_rejected() {
        let mut w = weights();
        let port = &mut w.spec.domains["port"].weights;
        let (_, v) = port.shift_remove_index(0).unwrap();
        port.insert("Z99".to_string(), v);
        let r = validate_domain_weights(&w);
        assert!(!r.valid);
        assert!(r.errors.iter().any(|e| e.message.contains("default lists 'A00'")));
    }

    #[test]
    fn wrong_kind_and_version() {
        let mut w = weights();
        w.kind = "ScoringConfig".into();
        w.api_version = "v2".into();
        let r = validate_domain_weights(&w);
        assert_eq!(r.errors.len(), 2);
    }

    #[test]
    fn non_finite_weight_is_rejected() {
        let mut w = weights();
        w.spec.domains["energy"].weights["A10"] = f64::INFINITY;
        let r = validate_domain_weights(&w);
        assert!(r.errors.iter().any(|e| e.path == "spec.domains.energy.weights.A10"));
    }

    #[test]
    fn scaling_requires_positive_scales() {
        let mut s = scaling();
        s.spec.default.tanh_scale = 0.0;
        let r = validate_scaling_config(&s, &weights());
        assert!(!r.valid);
        assert!(r.errors.iter().any(|e| e.path == "spec.default.tanh_scale"));
    }

    #[test]
    fn scaling_missing_domain_is_a_warning() {
        let mut s = scaling();
        s.spec.domains.shift_remove("energy");
        let r = validate_scaling_config(&s, &weights());
        assert!(r.valid);
        assert_eq!(r.warnings.len(), 1);
    }

    #[test]
    fn degenerate_min_max_is_a_warning() {
        let mut s = scaling();
        s.spec.default.min_max.high = 0.0;
        let r = validate_scaling_config(&s, &weights());
        assert!(r.valid);
        assert!(r.warnings.iter().any(|w| w.path == "spec.default.min_max"));
    }
}
