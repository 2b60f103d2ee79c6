//! Confidence Calculator: turns the stability of a magnitude history into
//! a confidence score and level.
//!
//! Each stability metric is mapped to a [0, 1] goodness score, the five
//! scores are averaged with fixed weights, and the composite is optionally
//! damped by how far the current observation sits from the history.

use std::sync::Arc;

use serde::Serialize;

use geowatch_core::config::HistoryConfig;
use geowatch_core::ConfidenceLevel;
use geowatch_rules::scaling_config::ToleranceFactors;
use geowatch_rules::DomainWeightStore;

use crate::stability::{mean, sample_std_dev, StabilityMetrics};

/// Goodness weights: cv, mad, trend, volatility, outliers.
pub const WEIGHT_CV: f64 = 0.25;
pub const WEIGHT_MAD: f64 = 0.20;
pub const WEIGHT_TREND: f64 = 0.20;
pub const WEIGHT_VOLATILITY: f64 = 0.20;
pub const WEIGHT_OUTLIERS: f64 = 0.15;

/// Centre and steepness of the current-value deviation curve.
const DEVIATION_CENTER: f64 = 1.5;
const DEVIATION_STEEPNESS: f64 = 1.5;

const EPS: f64 = 1e-10;

/// Per-metric goodness scores, each in [0, 1] (higher is better).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GoodnessScores {
    pub cv: f64,
    pub mad: f64,
    pub trend: f64,
    pub volatility: f64,
    pub outliers: f64,
}

impl GoodnessScores {
    pub fn from_metrics(m: &StabilityMetrics, tolerance: &ToleranceFactors) -> Self {
        let cv = if m.coefficient_of_variation.is_finite() {
            1.0 / (1.0 + m.coefficient_of_variation * tolerance.cv_factor)
        } else {
            0.0
        };
        let mad = if m.mean > 0.0 {
            1.0 / (1.0 + (m.mean_absolute_deviation / m.mean) * tolerance.mad_factor)
        } else {
            0.5
        };
        Self {
            cv,
            mad,
            trend: m.trend_stability,
            volatility: 1.0 - m.volatility,
            outliers: 1.0 - m.outlier_ratio,
        }
    }

    /// Weighted average, normalised by the weight sum and clamped.
    pub fn composite(&self) -> f64 {
        let total = WEIGHT_CV + WEIGHT_MAD + WEIGHT_TREND + WEIGHT_VOLATILITY + WEIGHT_OUTLIERS;
        let sum = self.cv * WEIGHT_CV
            + self.mad * WEIGHT_MAD
            + self.trend * WEIGHT_TREND
            + self.volatility * WEIGHT_VOLATILITY
            + self.outliers * WEIGHT_OUTLIERS;
        (sum / total).clamp(0.0, 1.0)
    }
}

/// Outcome of a confidence calculation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfidenceResult {
    pub confidence_level: ConfidenceLevel,
    pub confidence_score: f64,
    pub observation_count: usize,
    /// Absent when there were too few observations.
    pub metrics: Option<StabilityMetrics>,
    pub goodness: Option<GoodnessScores>,
    /// Multiplier applied for the current value, when one was given.
    pub deviation_factor: Option<f64>,
    pub stability_assessment: Option<String>,
    pub interpretation: String,
}

impl ConfidenceResult {
    pub fn insufficient(observation_count: usize, interpretation: impl Into<String>) -> Self {
        Self {
            confidence_level: ConfidenceLevel::InsufficientData,
            confidence_score: 0.0,
            observation_count,
            metrics: None,
            goodness: None,
            deviation_factor: None,
            stability_assessment: None,
            interpretation: interpretation.into(),
        }
    }
}

/// Confidence multiplier for `current` relative to `history`, in (0, 1].
pub fn deviation_factor(history: &[f64], current: f64) -> f64 {
    if history.is_empty() {
        return 1.0;
    }
    let m = mean(history);
    let std = sample_std_dev(history);
    if std < EPS {
        return if (current - m).abs() < EPS { 1.0 } else { 0.5 };
    }
    let z = (current - m).abs() / std;
    1.0 / (1.0 + (DEVIATION_STEEPNESS * (z - DEVIATION_CENTER)).exp())
}

/// Compute confidence with explicit tolerance factors.
///
/// `history` is trimmed to the most recent `cfg.window` values first.
pub fn confidence_from_history(
    history: &[f64],
    current: Option<f64>,
    tolerance: &ToleranceFactors,
    cfg: &HistoryConfig,
) -> ConfidenceResult {
    let start = history.len().saturating_sub(cfg.window);
    let history = &history[start..];

    if history.len() < cfg.min_observations.max(1) {
        return ConfidenceResult::insufficient(
            history.len(),
            format!(
                "Insufficient data (need at least {} observations)",
                cfg.min_observations
            ),
        );
    }

    let metrics = StabilityMetrics::compute(history, cfg);
    let goodness = GoodnessScores::from_metrics(&metrics, tolerance);
    let mut score = goodness.composite();

    let factor = current.map(|c| deviation_factor(history, c));
    if let Some(f) = factor {
        score *= f;
    }

    let level = ConfidenceLevel::from_score(score);
    ConfidenceResult {
        confidence_level: level,
        confidence_score: score,
        observation_count: history.len(),
        interpretation: interpret(level, &metrics, current),
        stability_assessment: Some(metrics.label().to_string()),
        metrics: Some(metrics),
        goodness: Some(goodness),
        deviation_factor: factor,
    }
}

fn interpret(level: ConfidenceLevel, m: &StabilityMetrics, current: Option<f64>) -> String {
    let base = match level {
        ConfidenceLevel::VeryHigh => "Very high confidence - consistent and stable observations",
        ConfidenceLevel::High => "High confidence - generally stable with minor variations",
        ConfidenceLevel::Medium => "Medium confidence - moderate variability in observations",
        ConfidenceLevel::Low => "Low confidence - significant variability detected",
        ConfidenceLevel::VeryLow => "Very low confidence - highly unstable or erratic patterns",
        ConfidenceLevel::InsufficientData => "Insufficient data for confidence assessment",
    };

    let mut insights = Vec::new();
    let cv = m.coefficient_of_variation;
    if cv.is_finite() {
        if cv < 0.1 {
            insights.push("very low variation".to_string());
        } else if cv > 0.5 {
            insights.push("high variation".to_string());
        }
    }
    if m.outlier_ratio > 0.2 {
        insights.push(format!("{}% outliers detected", (m.outlier_ratio * 100.0) as u32));
    }
    if let Some(c) = current {
        if m.mean != 0.0 {
            let pct = (c - m.mean).abs() / m.mean * 100.0;
            if pct > 20.0 {
                insights.push(format!("current value deviates {:.1}% from mean", pct));
            }
        }
    }

    if insights.is_empty() {
        base.to_string()
    } else {
        format!("{} ({})", base, insights.join(", "))
    }
}

/// Domain-aware confidence calculator.
#[derive(Debug, Clone)]
pub struct ConfidenceCalculator {
    store: Arc<DomainWeightStore>,
    cfg: HistoryConfig,
}

impl ConfidenceCalculator {
    pub fn new(store: Arc<DomainWeightStore>, cfg: HistoryConfig) -> Self {
        Self { store, cfg }
    }

    pub fn history_config(&self) -> &HistoryConfig {
        &self.cfg
    }

    /// Confidence of `history`, optionally judging `current` against it.
    ///
    /// Tolerance factors come from `domain` (falling back to `default`).
    pub fn calculate(
        &self,
        history: &[f64],
        current: Option<f64>,
        domain: Option<&str>,
    ) -> ConfidenceResult {
        let tolerance = self.store.resolve(domain).tolerance();
        confidence_from_history(history, current, tolerance, &self.cfg)
    }
}
