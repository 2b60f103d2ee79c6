//! Discrete classifications shared by the scoring engine and its callers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::GeoWatchError;

// ── Anomaly level ─────────────────────────────────────────────

/// Severity band of an anomaly score, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyLevel {
    Normal,
    Low,
    Medium,
    High,
    Critical,
}

impl AnomalyLevel {
    pub const ALL: [AnomalyLevel; 5] = [
        AnomalyLevel::Normal,
        AnomalyLevel::Low,
        AnomalyLevel::Medium,
        AnomalyLevel::High,
        AnomalyLevel::Critical,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AnomalyLevel::Normal => "normal",
            AnomalyLevel::Low => "low",
            AnomalyLevel::Medium => "medium",
            AnomalyLevel::High => "high",
            AnomalyLevel::Critical => "critical",
        }
    }

    /// High and critical anomalies need an operator.
    pub fn requires_attention(self) -> bool {
        matches!(self, AnomalyLevel::High | AnomalyLevel::Critical)
    }
}

impl fmt::Display for AnomalyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnomalyLevel {
    type Err = GeoWatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AnomalyLevel::ALL
            .into_iter()
            .find(|l| l.as_str() == s)
            .ok_or_else(|| GeoWatchError::Other(format!("invalid anomaly level '{}'", s)))
    }
}

// ── Confidence level ──────────────────────────────────────────

/// Reliability classification derived from historical stability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLevel {
    VeryHigh,
    High,
    Medium,
    Low,
    VeryLow,
    InsufficientData,
}

impl ConfidenceLevel {
    pub const ALL: [ConfidenceLevel; 6] = [
        ConfidenceLevel::VeryHigh,
        ConfidenceLevel::High,
        ConfidenceLevel::Medium,
        ConfidenceLevel::Low,
        ConfidenceLevel::VeryLow,
        ConfidenceLevel::InsufficientData,
    ];

    /// Map a composite confidence score onto the fixed breakpoints.
    pub fn from_score(score: f64) -> Self {
        if score >= 0.85 {
            ConfidenceLevel::VeryHigh
        } else if score >= 0.70 {
            ConfidenceLevel::High
        } else if score >= 0.50 {
            ConfidenceLevel::Medium
        } else if score >= 0.30 {
            ConfidenceLevel::Low
        } else {
            ConfidenceLevel::VeryLow
        }
    }

    /// Collapse onto the three-step input understood by the scorer.
    pub fn coarse(self) -> CoarseConfidence {
        match self {
            ConfidenceLevel::VeryHigh | ConfidenceLevel::High => CoarseConfidence::High,
            ConfidenceLevel::Medium => CoarseConfidence::Medium,
            ConfidenceLevel::Low | ConfidenceLevel::VeryLow | ConfidenceLevel::InsufficientData => {
                CoarseConfidence::Low
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ConfidenceLevel::VeryHigh => "very_high",
            ConfidenceLevel::High => "high",
            ConfidenceLevel::Medium => "medium",
            ConfidenceLevel::Low => "low",
            ConfidenceLevel::VeryLow => "very_low",
            ConfidenceLevel::InsufficientData => "insufficient_data",
        }
    }
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Coarse confidence ─────────────────────────────────────────

/// Caller-supplied qualitative confidence that damps an anomaly score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoarseConfidence {
    High,
    Medium,
    Low,
}

impl CoarseConfidence {
    pub fn factor(self) -> f64 {
        match self {
            CoarseConfidence::High => 1.0,
            CoarseConfidence::Medium => 0.9,
            CoarseConfidence::Low => 0.75,
        }
    }
}

impl FromStr for CoarseConfidence {
    type Err = GeoWatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "high" => Ok(CoarseConfidence::High),
            "medium" => Ok(CoarseConfidence::Medium),
            "low" => Ok(CoarseConfidence::Low),
            other => Err(GeoWatchError::Other(format!(
                "invalid confidence '{}' (expected high, medium or low)",
                other
            ))),
        }
    }
}

// ── Priority ──────────────────────────────────────────────────

/// Combined priority produced by the anomaly × confidence matrix.
///
/// Variant order is urgency order, so sorting ascending puts CRITICAL first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Critical,
    High,
    Medium,
    Low,
    Info,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Critical => "CRITICAL",
            Priority::High => "HIGH",
            Priority::Medium => "MEDIUM",
            Priority::Low => "LOW",
            Priority::Info => "INFO",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anomaly_levels_are_ordered() {
        assert!(AnomalyLevel::Normal < AnomalyLevel::Low);
        assert!(AnomalyLevel::High < AnomalyLevel::Critical);
    }

    #[test]
    fn requires_attention_only_for_high_and_critical() {
        let flagged: Vec<_> = AnomalyLevel::ALL
            .into_iter()
            .filter(|l| l.requires_attention())
            .collect();
        assert_eq!(flagged, vec![AnomalyLevel::High, AnomalyLevel::Critical]);
    }

    #[test]
    fn confidence_breakpoints() {
        assert_eq!(ConfidenceLevel::from_score(0.85), ConfidenceLevel::VeryHigh);
        assert_eq!(ConfidenceLevel::from_score(0.8499), ConfidenceLevel::High);
        assert_eq!(ConfidenceLevel::from_score(0.70), ConfidenceLevel::High);
        assert_eq!(ConfidenceLevel::from_score(0.5), ConfidenceLevel::Medium);
        assert_eq!(ConfidenceLevel::from_score(0.3), ConfidenceLevel::Low);
        assert_eq!(ConfidenceLevel::from_score(0.29), ConfidenceLevel::VeryLow);
        assert_eq!(ConfidenceLevel::from_score(0.0), ConfidenceLevel::VeryLow);
    }

    #[test]
    fn coarse_mapping() {
        assert_eq!(ConfidenceLevel::VeryHigh.coarse(), CoarseConfidence::High);
        assert_eq!(ConfidenceLevel::Medium.coarse(), CoarseConfidence::Medium);
        assert_eq!(ConfidenceLevel::InsufficientData.coarse(), CoarseConfidence::Low);
    }

    #[test]
    fn serde_names_match_wire_format() {
        assert_eq!(
            serde_json::to_string(&ConfidenceLevel::InsufficientData).unwrap(),
            "\"insufficient_data\""
        );
        assert_eq!(serde_json::to_string(&Priority::Info).unwrap(), "\"INFO\"");
        assert_eq!(serde_json::to_string(&AnomalyLevel::Critical).unwrap(), "\"critical\"");
    }

    #[test]
    fn parse_levels() {
        assert_eq!("medium".parse::<AnomalyLevel>().unwrap(), AnomalyLevel::Medium);
        assert!("severe".parse::<AnomalyLevel>().is_err());
        assert_eq!("low".parse::<CoarseConfidence>().unwrap(), CoarseConfidence::Low);
    }
}
