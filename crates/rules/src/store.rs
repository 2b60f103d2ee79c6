//! Compiled, immutable Domain Weight Store.
//!
//! Built once from a validated DomainWeights + ScalingConfig pair. Every
//! lookup that names an unknown domain falls back to `default`; nothing in
//! here mutates after construction, so a store can be shared freely behind
//! an `Arc` and replaced wholesale on reload.

use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, warn};

use crate::detect::detect_domain;
use crate::domain_weights::{AlertHint, DomainEntry, DomainWeightsRule, DEFAULT_DOMAIN};
use crate::loader::{ConfigError, Result};
use crate::scaling_config::{ScalingConfigRule, ScalingParams, ToleranceFactors};
use crate::schema::{ChangeThresholds, CommonMetadata, ScalingMethod};
use crate::validation::{validate_domain_weights, validate_scaling_config};

/// Multipliers above this are legal but logged.
const MULTIPLIER_WARN_LEVEL: f64 = 2.0;

/// Everything the engine knows about one domain.
#[derive(Debug, Clone, Serialize)]
pub struct DomainProfile {
    /// Configuration key, e.g. `port`.
    pub key: String,
    pub name: String,
    pub description: Option<String>,
    pub emphasis: Vec<String>,
    /// Weights in canonical dimension order.
    pub weights: Vec<f64>,
    pub thresholds: ChangeThresholds,
    pub multiplier: f64,
    pub scaling_method: ScalingMethod,
    pub scaling: ScalingParams,
    pub alert: Option<AlertHint>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl DomainProfile {
    fn compile(
        key: &str,
        entry: &DomainEntry,
        scaling: ScalingParams,
        dimensions: &[String],
    ) -> Self {
        let weights: Vec<f64> = entry.weights.values().copied().collect();
        let multiplier = if key == DEFAULT_DOMAIN {
            1.0
        } else {
            domain_multiplier(&weights, dimensions.len())
        };
        if multiplier > MULTIPLIER_WARN_LEVEL {
            warn!(domain = %key, multiplier, "domain multiplier is unusually large");
        }
        Self {
            key: key.to_string(),
            name: entry.name.clone(),
            description: entry.description.clone(),
            emphasis: entry.emphasis.clone(),
            weights,
            thresholds: entry.thresholds,
            multiplier,
            scaling_method: entry.scaling_method,
            scaling,
            alert: entry.alert.clone(),
            index: dimensions
                .iter()
                .enumerate()
                .map(|(i, d)| (d.clone(), i))
                .collect(),
        }
    }

    /// Weight of a named dimension; 1.0 for names outside the configuration.
    pub fn weight_for(&self, dimension: &str) -> f64 {
        self.index
            .get(dimension)
            .and_then(|&i| self.weights.get(i))
            .copied()
            .unwrap_or(1.0)
    }

    pub fn tolerance(&self) -> &ToleranceFactors {
        &self.scaling.tolerance
    }
}

/// `1 + (non_default_count / dims) * mean(|non_default|) * 0.5`.
///
/// A weight is non-default when it differs from 1.0. With no non-default
/// weights the multiplier is exactly 1.0.
pub fn domain_multiplier(weights: &[f64], dimensions: usize) -> f64 {
    let non_default: Vec<f64> = weights.iter().copied().filter(|&w| w != 1.0).collect();
    if non_default.is_empty() || dimensions == 0 {
        return 1.0;
    }
    let specialization = non_default.len() as f64 / dimensions as f64;
    let avg_magnitude = non_default.iter().map(|w| w.abs()).sum::<f64>() / non_default.len() as f64;
    1.0 + specialization * avg_magnitude * 0.5
}

/// Validated, compiled configuration shared read-only by every scorer.
#[derive(Debug, Clone, Serialize)]
pub struct DomainWeightStore {
    pub version: String,
    pub metadata: CommonMetadata,
    pub embedding_dimensions: usize,
    /// Canonical dimension names, in embedding order.
    pub dimensions: Vec<String>,
    default: DomainProfile,
    domains: HashMap<String, DomainProfile>,
    /// Configuration order of `domains`.
    order: Vec<String>,
}

impl DomainWeightStore {
    /// Validate both documents and compile them into a store.
    ///
    /// Any validation error aborts the whole compile; warnings are logged.
    pub fn compile(weights: &DomainWeightsRule, scaling: &ScalingConfigRule) -> Result<Self> {
        let w_result = validate_domain_weights(weights);
        let s_result = validate_scaling_config(scaling, weights);
        for w in w_result.warnings.iter().chain(s_result.warnings.iter()) {
            warn!(path = %w.path, "{}", w.message);
        }
        let mut errors = w_result.error_messages();
        errors.extend(s_result.error_messages());
        if !errors.is_empty() {
            return Err(ConfigError::Validation(errors));
        }

        let spec = &weights.spec;
        let dimensions: Vec<String> = spec.default.weights.keys().cloned().collect();
        let default = DomainProfile::compile(
            DEFAULT_DOMAIN,
            &spec.default,
            scaling.spec.default.clone(),
            &dimensions,
        );
        let mut domains = HashMap::with_capacity(spec.domains.len());
        let mut order = Vec::with_capacity(spec.domains.len());
        for (key, entry) in &spec.domains {
            let params = scaling.spec.params_for(key).clone();
            domains.insert(
                key.clone(),
                DomainProfile::compile(key, entry, params, &dimensions),
            );
            order.push(key.clone());
        }

        Ok(Self {
            version: spec.version.clone(),
            metadata: weights.metadata.clone(),
            embedding_dimensions: spec.embedding_dimensions,
            dimensions,
            default,
            domains,
            order,
        })
    }

    /// Profile for `domain`, falling back to `default` for unknown names.
    pub fn profile(&self, domain: &str) -> &DomainProfile {
        if domain == DEFAULT_DOMAIN {
            return &self.default;
        }
        match self.domains.get(domain) {
            Some(p) => p,
            None => {
                debug!(domain = %domain, "unknown domain, using default");
                &self.default
            }
        }
    }

    /// Profile for an optional domain; `None` means `default`.
    pub fn resolve(&self, domain: Option<&str>) -> &DomainProfile {
        match domain {
            Some(d) => self.profile(d),
            None => &self.default,
        }
    }

    pub fn default_profile(&self) -> &DomainProfile {
        &self.default
    }

    pub fn contains(&self, domain: &str) -> bool {
        domain == DEFAULT_DOMAIN || self.domains.contains_key(domain)
    }

    /// Weight vector for a domain (default fallback, logged).
    pub fn get_weights(&self, domain: &str) -> &[f64] {
        if !self.contains(domain) {
            warn!(domain = %domain, "domain not found, using default weights");
        }
        &self.profile(domain).weights
    }

    /// Change thresholds for a domain (default fallback).
    pub fn get_thresholds(&self, domain: &str) -> &ChangeThresholds {
        &self.profile(domain).thresholds
    }

    pub fn multiplier(&self, domain: &str) -> f64 {
        self.profile(domain).multiplier
    }

    /// All configured domain keys followed by `default`.
    pub fn domains(&self) -> Vec<&str> {
        self.order
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(DEFAULT_DOMAIN))
            .collect()
    }

    /// Every domain's multiplier, `default` included.
    pub fn multipliers(&self) -> Vec<(&str, f64)> {
        self.domains()
            .into_iter()
            .map(|d| (d, self.multiplier(d)))
            .collect()
    }

    /// Detect the domain of an AOI identifier and return its profile.
    pub fn profile_for_aoi(&self, aoi_id: &str) -> &DomainProfile {
        match detect_domain(aoi_id) {
            Some(d) => self.profile(d),
            None => &self.default,
        }
    }

    /// Weights for an AOI identifier via domain detection.
    pub fn weights_for_aoi(&self, aoi_id: &str) -> &[f64] {
        &self.profile_for_aoi(aoi_id).weights
    }
}
