//! Weighted Embedding Analyzer: domain weights applied directly to a
//! pair of embeddings instead of a pre-reduced magnitude.
//!
//! Magnitude is `(1 − cos) / 2` of the weighted vectors, so identical
//! directions give 0 and opposite directions give 1. A zero-norm weighted
//! vector is treated as identical to the other one.

use std::sync::Arc;

use indexmap::IndexMap;
use serde::Serialize;
use tracing::debug;

use geowatch_core::{CoarseConfidence, GeoWatchError, Result};
use geowatch_rules::{AlertLevel, ChangeThresholds, DomainProfile, DomainWeightStore};

/// Contributors listed in [`EmbeddingAnalysis::top_contributors`].
const TOP_CONTRIBUTORS: usize = 5;
/// Dimensions listed in [`WeightedVector::dominant_dimensions`].
const DOMINANT_DIMENSIONS: usize = 10;
/// Magnitude preferred by [`WeightedEmbeddingAnalyzer::compare_domains`].
const PREFERRED_MAGNITUDE: f64 = 0.1;

/// Change band of a weighted embedding magnitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeLevel {
    Negligible,
    Minor,
    Moderate,
    Major,
    Critical,
}

impl ChangeLevel {
    pub fn classify(magnitude: f64, t: &ChangeThresholds) -> Self {
        if magnitude < t.minor_change {
            ChangeLevel::Negligible
        } else if magnitude < t.moderate_change {
            ChangeLevel::Minor
        } else if magnitude < t.major_change {
            ChangeLevel::Moderate
        } else if magnitude < t.critical_change {
            ChangeLevel::Major
        } else {
            ChangeLevel::Critical
        }
    }

    /// Small changes are measured reliably, large ones less so.
    pub fn confidence_hint(self) -> CoarseConfidence {
        match self {
            ChangeLevel::Negligible | ChangeLevel::Minor => CoarseConfidence::High,
            ChangeLevel::Moderate | ChangeLevel::Major => CoarseConfidence::Medium,
            ChangeLevel::Critical => CoarseConfidence::Low,
        }
    }

    fn capitalized(self) -> &'static str {
        match self {
            ChangeLevel::Negligible => "Negligible",
            ChangeLevel::Minor => "Minor",
            ChangeLevel::Moderate => "Moderate",
            ChangeLevel::Major => "Major",
            ChangeLevel::Critical => "Critical",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alert {
    pub level: AlertLevel,
    pub message: String,
    pub action: String,
}

/// Weighted absolute change of one dimension.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DimensionContribution {
    pub dimension: String,
    pub change: f64,
    pub weight: f64,
    pub current: f64,
    pub baseline: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbeddingAnalysis {
    pub domain: String,
    pub domain_name: String,
    pub magnitude: f64,
    pub cosine_similarity: f64,
    pub change_level: ChangeLevel,
    pub confidence: CoarseConfidence,
    pub description: String,
    pub thresholds: ChangeThresholds,
    pub emphasis: Vec<String>,
    /// Every dimension, largest change first.
    pub contributions: Vec<DimensionContribution>,
    pub top_contributors: Vec<DimensionContribution>,
    pub alerts: Vec<Alert>,
}

/// Analyses of one embedding pair under every domain.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DomainComparison {
    pub recommended_domain: String,
    pub analyses: IndexMap<String, EmbeddingAnalysis>,
    pub all_magnitudes: IndexMap<String, f64>,
}

/// A single embedding with domain weights applied.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeightedVector {
    pub domain: String,
    pub weighted: Vec<f64>,
    /// L2 norm of `weighted`.
    pub weighted_magnitude: f64,
    pub dominant_dimensions: Vec<String>,
}

/// Threshold alerts plus the domain's configured alert hint.
fn alerts_for(magnitude: f64, profile: &DomainProfile) -> Vec<Alert> {
    let t = &profile.thresholds;
    let key = &profile.key;
    let mut alerts = Vec::new();
    let threshold_alert = if magnitude >= t.critical_change {
        Some((
            AlertLevel::Critical,
            format!("Critical change detected in {} area", key),
            "Immediate investigation required",
        ))
    } else if magnitude >= t.major_change {
        Some((
            AlertLevel::Warning,
            format!("Major change detected in {} area", key),
            "Schedule detailed analysis within 24 hours",
        ))
    } else if magnitude >= t.moderate_change {
        Some((
            AlertLevel::Info,
            format!("Moderate change detected in {} area", key),
            "Monitor for continued changes",
        ))
    } else {
        None
    };
    if let Some((level, message, action)) = threshold_alert {
        alerts.push(Alert {
            level,
            message,
            action: action.to_string(),
        });
    }
    if let Some(hint) = profile.alert.as_ref().filter(|h| magnitude >= h.min_magnitude) {
        alerts.push(Alert {
            level: hint.level,
            message: hint.message.clone(),
            action: hint.action.clone(),
        });
    }
    alerts
}

fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b = b.iter().map(|y| y * y).sum::<f64>().sqrt();
    if norm_a > 0.0 && norm_b > 0.0 {
        (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
    } else {
        1.0
    }
}

#[derive(Debug, Clone)]
pub struct WeightedEmbeddingAnalyzer {
    store: Arc<DomainWeightStore>,
}

impl WeightedEmbeddingAnalyzer {
    pub fn new(store: Arc<DomainWeightStore>) -> Self {
        Self { store }
    }

    /// Analyze two embeddings in canonical dimension order.
    pub fn analyze(
        &self,
        current: &[f64],
        baseline: &[f64],
        domain: Option<&str>,
    ) -> Result<EmbeddingAnalysis> {
        self.analyze_named(&self.store.dimensions, current, baseline, domain)
    }

    /// Analyze two embeddings aligned by `dimensions`.
    ///
    /// Names outside the configuration weigh 1.0.
    pub fn analyze_named(
        &self,
        dimensions: &[String],
        current: &[f64],
        baseline: &[f64],
        domain: Option<&str>,
    ) -> Result<EmbeddingAnalysis> {
        if current.len() != baseline.len() {
            return Err(GeoWatchError::InvalidEmbedding(format!(
                "current has {} values, baseline has {}",
                current.len(),
                baseline.len()
            )));
        }
        check_names(dimensions, current.len())?;

        let profile = self.store.resolve(domain);
        let weights: Vec<f64> = dimensions.iter().map(|d| profile.weight_for(d)).collect();
        let weighted_current: Vec<f64> = current.iter().zip(&weights).map(|(v, w)| v * w).collect();
        let weighted_baseline: Vec<f64> =
            baseline.iter().zip(&weights).map(|(v, w)| v * w).collect();

        let cos = cosine_similarity(&weighted_current, &weighted_baseline);
        let magnitude = (1.0 - cos) / 2.0;
        let change_level = ChangeLevel::classify(magnitude, &profile.thresholds);

        let mut contributions: Vec<DimensionContribution> = dimensions
            .iter()
            .enumerate()
            .map(|(i, name)| DimensionContribution {
                dimension: name.clone(),
                change: (current[i] - baseline[i]).abs() * weights[i],
                weight: weights[i],
                current: current[i],
                baseline: baseline[i],
            })
            .collect();
        contributions.sort_by(|a, b| b.change.total_cmp(&a.change));
        let top_contributors = contributions.iter().take(TOP_CONTRIBUTORS).cloned().collect();

        debug!(domain = %profile.key, magnitude, level = ?change_level, "weighted embedding analysis");

        Ok(EmbeddingAnalysis {
            domain: profile.key.clone(),
            domain_name: profile.name.clone(),
            magnitude,
            cosine_similarity: cos,
            change_level,
            confidence: change_level.confidence_hint(),
            description: format!(
                "{} change detected in {}",
                change_level.capitalized(),
                profile.name.to_lowercase()
            ),
            thresholds: profile.thresholds,
            emphasis: profile.emphasis.clone(),
            contributions,
            top_contributors,
            alerts: alerts_for(magnitude, profile),
        })
    }

    /// Analyze under every domain and recommend the best fit.
    ///
    /// The best fit has a high-confidence change level and, among those, a
    /// magnitude closest to 0.1. Ties go to the earlier domain.
    pub fn compare_domains(&self, current: &[f64], baseline: &[f64]) -> Result<DomainComparison> {
        let mut analyses = IndexMap::new();
        let mut best: Option<(&str, (bool, f64))> = None;
        for domain in self.store.domains() {
            let analysis = self.analyze(current, baseline, Some(domain))?;
            let key = (
                analysis.confidence == CoarseConfidence::High,
                -(analysis.magnitude - PREFERRED_MAGNITUDE).abs(),
            );
            let better = match best {
                None => true,
                Some((_, b)) => key.0 > b.0 || (key.0 == b.0 && key.1 > b.1),
            };
            if better {
                best = Some((domain, key));
            }
            analyses.insert(domain.to_string(), analysis);
        }
        let recommended_domain = best
            .map(|(d, _)| d.to_string())
            .unwrap_or_else(|| self.store.default_profile().key.clone());
        let all_magnitudes = analyses
            .iter()
            .map(|(d, a)| (d.clone(), a.magnitude))
            .collect();
        Ok(DomainComparison {
            recommended_domain,
            analyses,
            all_magnitudes,
        })
    }

    /// Weight a single embedding in canonical dimension order.
    pub fn apply_weights(&self, values: &[f64], domain: Option<&str>) -> Result<WeightedVector> {
        check_names(&self.store.dimensions, values.len())?;
        let profile = self.store.resolve(domain);
        let weighted: Vec<f64> = values
            .iter()
            .zip(&profile.weights)
            .map(|(v, w)| v * w)
            .collect();
        let weighted_magnitude = weighted.iter().map(|v| v * v).sum::<f64>().sqrt();

        let mut ranked: Vec<(usize, f64)> = weighted.iter().map(|v| v.abs()).enumerate().collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        let dominant_dimensions = ranked
            .into_iter()
            .take(DOMINANT_DIMENSIONS)
            .map(|(i, _)| self.store.dimensions[i].clone())
            .collect();

        Ok(WeightedVector {
            domain: profile.key.clone(),
            weighted,
            weighted_magnitude,
            dominant_dimensions,
        })
    }
}

fn check_names(dimensions: &[String], len: usize) -> Result<()> {
    if dimensions.len() != len {
        return Err(GeoWatchError::InvalidEmbedding(format!(
            "expected {} values, got {}",
            dimensions.len(),
            len
        )));
    }
    Ok(())
}
