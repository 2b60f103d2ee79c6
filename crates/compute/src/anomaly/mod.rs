//! Anomaly Scorer: domain-weighted scoring of raw change magnitudes.
//!
//! Three ways in:
//! - basic: `raw × multiplier × confidence factor`, capped at 1.0
//! - scaled: the weighted magnitude is passed through the domain's
//!   configured scaling curve before the confidence factor
//! - contextual / combined: see [`contextual`] and [`priority`]
//!
//! Sub-modules:
//! - [`contextual`]: z-score amplification against a history
//! - [`priority`]: the anomaly × confidence priority matrix

pub mod contextual;
pub mod priority;

use std::sync::Arc;

use rayon::prelude::*;
use serde::Serialize;
use tracing::debug;

use geowatch_core::config::HistoryConfig;
use geowatch_core::{AnomalyLevel, CoarseConfidence, Magnitude};
use geowatch_rules::{ChangeThresholds, DomainProfile, DomainWeightStore, ScalingMethod};

use crate::confidence::{ConfidenceCalculator, ConfidenceResult};
use crate::scaling::{self, MagnitudeScaler};

// ── Re-exports ────────────────────────────────────────────────────────
pub use contextual::{significance_label, ContextualResult, StatisticalContext};
pub use priority::{priority_decision, reliability_label, CombinedAssessment, PriorityDecision};

/// Score breakpoints for the percentile estimate, ascending.
const PERCENTILE_BREAKPOINTS: [(f64, &str); 5] = [
    (0.02, "Below 50th percentile (typical)"),
    (0.05, "50-75th percentile (slightly elevated)"),
    (0.10, "75-90th percentile (elevated)"),
    (0.15, "90-95th percentile (high)"),
    (0.20, "95-99th percentile (very high)"),
];

/// Classify a score against a domain's four thresholds.
///
/// A score exactly on a threshold lands in the higher band.
pub fn classify(score: f64, thresholds: &ChangeThresholds) -> AnomalyLevel {
    if score < thresholds.minor_change {
        AnomalyLevel::Normal
    } else if score < thresholds.moderate_change {
        AnomalyLevel::Low
    } else if score < thresholds.major_change {
        AnomalyLevel::Medium
    } else if score < thresholds.critical_change {
        AnomalyLevel::High
    } else {
        AnomalyLevel::Critical
    }
}

/// Rough percentile band for an anomaly score.
pub fn percentile_estimate(score: f64) -> &'static str {
    PERCENTILE_BREAKPOINTS
        .iter()
        .find(|(limit, _)| score < *limit)
        .map(|(_, label)| *label)
        .unwrap_or("Above 99th percentile (extreme)")
}

/// Human-facing explanation attached to every [`ScoringResult`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Interpretation {
    pub description: String,
    pub recommended_action: &'static str,
    pub domain_impact: String,
    pub percentile_estimate: &'static str,
}

impl Interpretation {
    pub fn new(score: f64, level: AnomalyLevel, profile: &DomainProfile) -> Self {
        let name = &profile.name;
        let description = match level {
            AnomalyLevel::Normal => format!("Normal activity patterns in {}", name),
            AnomalyLevel::Low => format!("Minor deviations detected in {}", name),
            AnomalyLevel::Medium => format!("Moderate anomalies detected in {}", name),
            AnomalyLevel::High => format!("Significant anomalies detected in {}", name),
            AnomalyLevel::Critical => {
                format!("Critical anomalies requiring immediate attention in {}", name)
            }
        };
        let recommended_action = match level {
            AnomalyLevel::Normal => "Continue routine monitoring",
            AnomalyLevel::Low => "Note for trend analysis",
            AnomalyLevel::Medium => "Schedule detailed review within 48 hours",
            AnomalyLevel::High => "Initiate investigation within 24 hours",
            AnomalyLevel::Critical => "Immediate investigation required",
        };
        Self {
            description,
            recommended_action,
            domain_impact: format!(
                "Domain multiplier of {:.2}x applied for {}",
                profile.multiplier, name
            ),
            percentile_estimate: percentile_estimate(score),
        }
    }
}

/// Outcome of one scoring call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoringResult {
    /// Set by [`AnomalyScorer::batch_score`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aoi_id: Option<String>,
    pub raw_magnitude: f64,
    pub domain: String,
    pub domain_multiplier: f64,
    /// Present on the scaled path only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weighted_magnitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scaled_magnitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scaling_method: Option<ScalingMethod>,
    pub confidence_factor: f64,
    pub anomaly_score: f64,
    pub anomaly_level: AnomalyLevel,
    pub requires_attention: bool,
    pub interpretation: Interpretation,
}

impl ScoringResult {
    fn build(raw: f64, score: f64, factor: f64, profile: &DomainProfile) -> Self {
        let level = classify(score, &profile.thresholds);
        Self {
            aoi_id: None,
            raw_magnitude: raw,
            domain: profile.key.clone(),
            domain_multiplier: profile.multiplier,
            weighted_magnitude: None,
            scaled_magnitude: None,
            scaling_method: None,
            confidence_factor: factor,
            anomaly_score: score,
            anomaly_level: level,
            requires_attention: level.requires_attention(),
            interpretation: Interpretation::new(score, level, profile),
        }
    }

    /// Replace the score and re-derive everything that depends on it.
    pub(crate) fn rescore(&mut self, score: f64, profile: &DomainProfile) {
        let level = classify(score, &profile.thresholds);
        self.anomaly_score = score;
        self.anomaly_level = level;
        self.requires_attention = level.requires_attention();
        self.interpretation = Interpretation::new(score, level, profile);
    }
}

/// One entry of a batch scoring request.
#[derive(Debug, Clone, PartialEq, Serialize, serde::Deserialize)]
pub struct BatchItem {
    pub aoi_id: String,
    pub raw_magnitude: Magnitude,
    #[serde(default)]
    pub domain: Option<String>,
}

/// Domain-aware anomaly scorer over a shared, read-only weight store.
#[derive(Debug, Clone)]
pub struct AnomalyScorer {
    store: Arc<DomainWeightStore>,
    confidence: ConfidenceCalculator,
}

impl AnomalyScorer {
    pub fn new(store: Arc<DomainWeightStore>, history: HistoryConfig) -> Self {
        let confidence = ConfidenceCalculator::new(Arc::clone(&store), history);
        Self { store, confidence }
    }

    pub fn store(&self) -> &DomainWeightStore {
        &self.store
    }

    pub fn history_config(&self) -> &HistoryConfig {
        self.confidence.history_config()
    }

    pub fn multiplier(&self, domain: Option<&str>) -> f64 {
        self.store.resolve(domain).multiplier
    }

    /// Basic path: `min(1, raw × multiplier × factor)`.
    pub fn score(
        &self,
        raw_magnitude: Magnitude,
        domain: Option<&str>,
        confidence: Option<CoarseConfidence>,
    ) -> ScoringResult {
        let raw_magnitude = raw_magnitude.value();
        let profile = self.store.resolve(domain);
        let factor = confidence.map_or(1.0, CoarseConfidence::factor);
        let score = (raw_magnitude * profile.multiplier * factor).min(1.0);
        ScoringResult::build(raw_magnitude, score, factor, profile)
    }

    /// Scaled path: the weighted magnitude goes through the domain's
    /// scaling policy first.
    ///
    /// With `adaptive` set, a min-max domain and a non-empty `history`, the
    /// range comes from the weighted history plus the current value.
    pub fn score_scaled(
        &self,
        raw_magnitude: Magnitude,
        domain: Option<&str>,
        confidence: Option<CoarseConfidence>,
        history: Option<&[f64]>,
        adaptive: bool,
    ) -> ScoringResult {
        let raw_magnitude = raw_magnitude.value();
        let profile = self.store.resolve(domain);
        let factor = confidence.map_or(1.0, CoarseConfidence::factor);
        let weighted = raw_magnitude * profile.multiplier;
        let method = profile.scaling_method;

        let adaptive_history = history.filter(|h| {
            adaptive && method == ScalingMethod::MinMax && !h.is_empty()
        });
        let scaled = match adaptive_history {
            Some(h) => {
                let mut batch: Vec<f64> = h.iter().map(|m| m * profile.multiplier).collect();
                batch.push(weighted);
                let scaled = MagnitudeScaler::new(&self.store).batch_scale(
                    &batch,
                    &profile.key,
                    method,
                    true,
                );
                debug!(domain = %profile.key, batch = batch.len(), "adaptive min-max scaling");
                scaled.last().copied().unwrap_or(0.0)
            }
            None => scaling::apply(method, weighted, &profile.scaling),
        };

        let score = (scaled * factor).min(1.0);
        let mut result = ScoringResult::build(raw_magnitude, score, factor, profile);
        result.weighted_magnitude = Some(weighted);
        result.scaled_magnitude = Some(scaled);
        result.scaling_method = Some(method);
        result
    }

    /// Confidence of a history under this scorer's domain tolerances.
    pub fn confidence(
        &self,
        history: &[f64],
        current: Option<f64>,
        domain: Option<&str>,
    ) -> ConfidenceResult {
        self.confidence.calculate(history, current, domain)
    }

    /// Score many AOIs in parallel, highest score first.
    pub fn batch_score(&self, items: &[BatchItem]) -> Vec<ScoringResult> {
        let mut results: Vec<ScoringResult> = items
            .par_iter()
            .map(|item| {
                let mut r = self.score(item.raw_magnitude, item.domain.as_deref(), None);
                r.aoi_id = Some(item.aoi_id.clone());
                r
            })
            .collect();
        results.sort_by(|a, b| b.anomaly_score.total_cmp(&a.anomaly_score));
        results
    }
}
