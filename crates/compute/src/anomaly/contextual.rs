//! Contextual scoring: the basic score, amplified when the current
//! magnitude is a statistical outlier against its own history.

use serde::Serialize;

use geowatch_core::Magnitude;

use super::{AnomalyScorer, ScoringResult};
use crate::stability::{mean, sample_std_dev, EPS};

/// |z| above which the score is amplified.
const AMPLIFY_ABOVE_Z: f64 = 2.0;
/// Extra score per standard deviation beyond [`AMPLIFY_ABOVE_Z`].
const AMPLIFY_PER_SIGMA: f64 = 0.1;
/// Keeps the deviation percentage finite for a zero mean.
const MEAN_OFFSET: f64 = 0.001;

/// Where the current magnitude sits relative to its history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StatisticalContext {
    pub historical_mean: f64,
    /// Sample standard deviation.
    pub historical_std: f64,
    pub z_score: f64,
    pub deviation_percentage: f64,
    pub sample_size: usize,
}

impl StatisticalContext {
    pub fn compute(current: f64, history: &[f64]) -> Self {
        let m = mean(history);
        let std = sample_std_dev(history);
        let z_score = if std > EPS { (current - m) / std } else { 0.0 };
        Self {
            historical_mean: m,
            historical_std: std,
            z_score,
            deviation_percentage: (current - m).abs() / (m + MEAN_OFFSET) * 100.0,
            sample_size: history.len(),
        }
    }

    /// Multiplier applied to the basic score; 1.0 within two sigma.
    pub fn amplification(&self) -> f64 {
        let z = self.z_score.abs();
        if z > AMPLIFY_ABOVE_Z {
            1.0 + (z - AMPLIFY_ABOVE_Z) * AMPLIFY_PER_SIGMA
        } else {
            1.0
        }
    }
}

pub fn significance_label(z_score: f64) -> &'static str {
    let z = z_score.abs();
    if z > 3.0 {
        "Highly significant (>3σ)"
    } else if z > 2.0 {
        "Significant (>2σ)"
    } else if z > 1.0 {
        "Notable (>1σ)"
    } else {
        "Within normal range"
    }
}

/// A basic scoring result plus its historical context.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextualResult {
    #[serde(flatten)]
    pub result: ScoringResult,
    /// Basic score before amplification.
    pub base_score: f64,
    /// Absent for an empty history.
    pub statistical_context: Option<StatisticalContext>,
    pub statistical_significance: Option<&'static str>,
}

impl AnomalyScorer {
    /// Score `current` against its own history.
    ///
    /// The amplified score is re-classified, so amplification can raise
    /// the anomaly level.
    pub fn score_contextual(
        &self,
        current: Magnitude,
        history: &[f64],
        domain: Option<&str>,
    ) -> ContextualResult {
        let mut result = self.score(current, domain, None);
        let base_score = result.anomaly_score;
        if history.is_empty() {
            return ContextualResult {
                result,
                base_score,
                statistical_context: None,
                statistical_significance: None,
            };
        }

        let context = StatisticalContext::compute(current.value(), history);
        let amplification = context.amplification();
        if amplification > 1.0 {
            let amplified = (base_score * amplification).min(1.0);
            result.rescore(amplified, self.store().resolve(domain));
        }
        ContextualResult {
            result,
            base_score,
            statistical_significance: Some(significance_label(context.z_score)),
            statistical_context: Some(context),
        }
    }
}
