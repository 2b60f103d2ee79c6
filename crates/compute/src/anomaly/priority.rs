//! Combined anomaly × confidence assessment.
//!
//! The priority matrix is total over the five anomaly levels and six
//! confidence levels: anomaly tier picks the row, a high / medium / other
//! split of confidence picks the column.

use serde::Serialize;
use tracing::debug;

use geowatch_core::{AnomalyLevel, ConfidenceLevel, Magnitude, Priority};

use super::{AnomalyScorer, ScoringResult};
use crate::confidence::ConfidenceResult;

/// One cell of the priority matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PriorityDecision {
    pub priority: Priority,
    pub label: &'static str,
    pub recommended_action: &'static str,
}

impl PriorityDecision {
    const fn new(priority: Priority, label: &'static str, action: &'static str) -> Self {
        Self {
            priority,
            label,
            recommended_action: action,
        }
    }
}

/// Look up the priority for an anomaly / confidence pair.
pub fn priority_decision(anomaly: AnomalyLevel, confidence: ConfidenceLevel) -> PriorityDecision {
    let confident = matches!(confidence, ConfidenceLevel::VeryHigh | ConfidenceLevel::High);
    match anomaly {
        AnomalyLevel::Critical | AnomalyLevel::High => {
            if confident {
                PriorityDecision::new(
                    Priority::Critical,
                    "CRITICAL - High confidence anomaly detected",
                    "Immediate investigation required",
                )
            } else if confidence == ConfidenceLevel::Medium {
                PriorityDecision::new(
                    Priority::High,
                    "HIGH - Anomaly detected with moderate confidence",
                    "Investigation recommended within 24 hours",
                )
            } else {
                PriorityDecision::new(
                    Priority::Medium,
                    "MEDIUM - Anomaly detected but low confidence",
                    "Monitor closely and gather more data",
                )
            }
        }
        AnomalyLevel::Medium => {
            if confident {
                PriorityDecision::new(
                    Priority::Medium,
                    "MEDIUM - Confirmed moderate anomaly",
                    "Schedule review within 48 hours",
                )
            } else {
                PriorityDecision::new(
                    Priority::Low,
                    "LOW - Uncertain moderate anomaly",
                    "Continue monitoring",
                )
            }
        }
        AnomalyLevel::Low | AnomalyLevel::Normal => {
            if confident {
                PriorityDecision::new(
                    Priority::Low,
                    "LOW - Normal behavior confirmed",
                    "Routine monitoring",
                )
            } else {
                PriorityDecision::new(
                    Priority::Info,
                    "INFO - Normal behavior but uncertain",
                    "Gather more observations",
                )
            }
        }
    }
}

/// Reliability of a detection, from the confidence score alone.
pub fn reliability_label(confidence_score: f64, anomaly: AnomalyLevel) -> &'static str {
    if confidence_score >= 0.7 {
        "High reliability"
    } else if confidence_score >= 0.5 {
        if anomaly.requires_attention() {
            "Moderate reliability - verify anomaly"
        } else {
            "Moderate reliability"
        }
    } else {
        "Low reliability - insufficient data"
    }
}

/// High / critical anomalies and untrustworthy confidence both need a person.
pub fn requires_human_review(anomaly: AnomalyLevel, confidence: ConfidenceLevel) -> bool {
    anomaly.requires_attention()
        || matches!(
            confidence,
            ConfidenceLevel::VeryLow | ConfidenceLevel::InsufficientData
        )
}

/// Anomaly score, confidence and the priority derived from both.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CombinedAssessment {
    pub anomaly: ScoringResult,
    pub confidence: ConfidenceResult,
    pub priority: Priority,
    pub priority_label: &'static str,
    pub recommended_action: &'static str,
    /// The confidence score that weighed into the priority.
    pub confidence_weight: f64,
    pub requires_human_review: bool,
    pub reliability: &'static str,
}

impl CombinedAssessment {
    pub fn new(anomaly: ScoringResult, confidence: ConfidenceResult) -> Self {
        let level = anomaly.anomaly_level;
        let decision = priority_decision(level, confidence.confidence_level);
        Self {
            priority: decision.priority,
            priority_label: decision.label,
            recommended_action: decision.recommended_action,
            confidence_weight: confidence.confidence_score,
            requires_human_review: requires_human_review(level, confidence.confidence_level),
            reliability: reliability_label(confidence.confidence_score, level),
            anomaly,
            confidence,
        }
    }
}

impl AnomalyScorer {
    /// Combined path: confidence from `history`, fed back into the
    /// anomaly score as a coarse factor, then the priority matrix.
    ///
    /// `adaptive` is forwarded to the scaled path together with `history`.
    pub fn assess(
        &self,
        raw_magnitude: Magnitude,
        history: &[f64],
        domain: Option<&str>,
        use_scaling: bool,
        adaptive: bool,
    ) -> CombinedAssessment {
        let confidence = self.confidence(history, Some(raw_magnitude.value()), domain);
        let coarse = Some(confidence.confidence_level.coarse());
        let anomaly = if use_scaling {
            self.score_scaled(raw_magnitude, domain, coarse, Some(history), adaptive)
        } else {
            self.score(raw_magnitude, domain, coarse)
        };
        let assessment = CombinedAssessment::new(anomaly, confidence);
        debug!(
            domain = %assessment.anomaly.domain,
            anomaly = %assessment.anomaly.anomaly_level,
            confidence = %assessment.confidence.confidence_level,
            priority = %assessment.priority,
            "combined assessment"
        );
        assessment
    }
}
