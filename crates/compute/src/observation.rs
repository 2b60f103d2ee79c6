//! Per-AOI observations: one current magnitude plus its history, processed
//! into an anomaly / confidence / priority outcome.

use std::collections::BTreeMap;
use std::time::Instant;

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use geowatch_core::{
    AnomalyLevel, ConfidenceLevel, GeoWatchError, Magnitude, Priority, Result,
};
use geowatch_rules::detect_domain;

use crate::anomaly::{priority_decision, AnomalyScorer};
use crate::stability::StabilityMetrics;

/// Processing state of an observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservationStatus {
    Pending,
    Processed,
    AnomalyDetected,
    InsufficientData,
}

/// Everything `process` derives for one observation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObservationOutcome {
    pub domain_multiplier: f64,
    pub weighted_magnitude: Option<f64>,
    pub scaled_magnitude: Option<f64>,
    pub anomaly_score: f64,
    pub anomaly_level: AnomalyLevel,
    pub requires_attention: bool,
    pub confidence_level: ConfidenceLevel,
    pub confidence_score: f64,
    pub stability: Option<String>,
    pub observation_count: usize,
    pub priority: Priority,
    pub recommended_action: &'static str,
    pub reliability: &'static str,
    pub statistics: Option<StabilityMetrics>,
}

/// Wire form of an observation, as read from a batch file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ObservationRequest {
    pub aoi_id: String,
    pub raw_magnitude: f64,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub history: Vec<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AoiObservation {
    pub observation_id: Uuid,
    pub aoi_id: String,
    pub timestamp: DateTime<Utc>,
    pub raw_magnitude: Magnitude,
    pub domain: String,
    pub history: Vec<Magnitude>,
    pub status: ObservationStatus,
    pub processing_time_ms: Option<f64>,
    pub outcome: Option<ObservationOutcome>,
}

impl AoiObservation {
    /// Validate and create a pending observation.
    ///
    /// Without an explicit domain the AOI id is run through detection,
    /// falling back to `default`.
    pub fn new(aoi_id: impl Into<String>, raw_magnitude: f64, domain: Option<&str>) -> Result<Self> {
        let aoi_id = aoi_id.into();
        if aoi_id.trim().is_empty() {
            return Err(GeoWatchError::EmptyIdentifier);
        }
        let raw_magnitude = Magnitude::new(raw_magnitude)?;
        let domain = domain
            .or_else(|| detect_domain(&aoi_id))
            .unwrap_or("default")
            .to_string();
        Ok(Self {
            observation_id: Uuid::new_v4(),
            aoi_id,
            timestamp: Utc::now(),
            raw_magnitude,
            domain,
            history: Vec::new(),
            status: ObservationStatus::Pending,
            processing_time_ms: None,
            outcome: None,
        })
    }

    pub fn from_request(req: &ObservationRequest) -> Result<Self> {
        let mut obs = Self::new(req.aoi_id.clone(), req.raw_magnitude, req.domain.as_deref())?;
        obs.history = Magnitude::validate_all(&req.history)?;
        Ok(obs)
    }

    /// Append one historical magnitude.
    pub fn add_history(&mut self, magnitude: f64) -> Result<&mut Self> {
        self.history.push(Magnitude::new(magnitude)?);
        Ok(self)
    }

    fn history_values(&self) -> Vec<f64> {
        self.history.iter().map(|m| m.value()).collect()
    }

    /// Score the observation.
    ///
    /// With enough history the combined path runs; otherwise only the basic
    /// score is computed and confidence is `insufficient_data`.
    pub fn process(&mut self, scorer: &AnomalyScorer, use_scaling: bool) -> &ObservationOutcome {
        let started = Instant::now();
        let raw = self.raw_magnitude;
        let domain = Some(self.domain.as_str());
        let min_observations = scorer.history_config().min_observations;

        let (outcome, status) = if self.history.len() >= min_observations {
            let a = scorer.assess(raw, &self.history_values(), domain, use_scaling, false);
            let status = if a.anomaly.requires_attention {
                ObservationStatus::AnomalyDetected
            } else {
                ObservationStatus::Processed
            };
            let outcome = ObservationOutcome {
                domain_multiplier: a.anomaly.domain_multiplier,
                weighted_magnitude: a.anomaly.weighted_magnitude,
                scaled_magnitude: a.anomaly.scaled_magnitude,
                anomaly_score: a.anomaly.anomaly_score,
                anomaly_level: a.anomaly.anomaly_level,
                requires_attention: a.anomaly.requires_attention,
                confidence_level: a.confidence.confidence_level,
                confidence_score: a.confidence.confidence_score,
                stability: a.confidence.stability_assessment.clone(),
                observation_count: a.confidence.observation_count,
                priority: a.priority,
                recommended_action: a.recommended_action,
                reliability: a.reliability,
                statistics: a.confidence.metrics,
            };
            (outcome, status)
        } else {
            let r = scorer.score(raw, domain, None);
            let decision = priority_decision(r.anomaly_level, ConfidenceLevel::InsufficientData);
            let outcome = ObservationOutcome {
                domain_multiplier: r.domain_multiplier,
                weighted_magnitude: None,
                scaled_magnitude: None,
                anomaly_score: r.anomaly_score,
                anomaly_level: r.anomaly_level,
                requires_attention: r.requires_attention,
                confidence_level: ConfidenceLevel::InsufficientData,
                confidence_score: 0.0,
                stability: None,
                observation_count: self.history.len(),
                priority: decision.priority,
                recommended_action: decision.recommended_action,
                reliability: "Low reliability - insufficient data",
                statistics: None,
            };
            (outcome, ObservationStatus::InsufficientData)
        };

        self.status = status;
        self.processing_time_ms = Some(started.elapsed().as_secs_f64() * 1000.0);
        debug!(
            aoi_id = %self.aoi_id,
            domain = %self.domain,
            status = ?status,
            anomaly = %outcome.anomaly_level,
            "observation processed"
        );
        self.outcome.insert(outcome)
    }

    /// Whether the anomaly level reaches `threshold`. Pending observations
    /// count as normal.
    pub fn is_anomalous(&self, threshold: AnomalyLevel) -> bool {
        self.anomaly_level() >= threshold
    }

    pub fn is_reliable(&self, min_confidence: f64) -> bool {
        self.confidence_score() >= min_confidence
    }

    pub fn anomaly_level(&self) -> AnomalyLevel {
        self.outcome
            .as_ref()
            .map_or(AnomalyLevel::Normal, |o| o.anomaly_level)
    }

    pub fn anomaly_score(&self) -> f64 {
        self.outcome.as_ref().map_or(0.0, |o| o.anomaly_score)
    }

    pub fn confidence_score(&self) -> f64 {
        self.outcome.as_ref().map_or(0.0, |o| o.confidence_score)
    }

    /// Pending observations sort after every processed priority.
    fn priority(&self) -> Option<Priority> {
        self.outcome.as_ref().map(|o| o.priority)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProcessingStats {
    pub total: usize,
    pub processed: usize,
    pub processing_time_ms: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchSummary {
    pub total_observations: usize,
    pub mean_anomaly_score: f64,
    pub max_anomaly_score: f64,
    pub min_anomaly_score: f64,
    pub anomaly_levels: BTreeMap<String, usize>,
    pub mean_confidence_score: f64,
    pub confidence_levels: BTreeMap<String, usize>,
    pub domains: BTreeMap<String, usize>,
    pub requiring_attention: usize,
}

/// A set of observations processed and summarized together.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ObservationBatch {
    pub observations: Vec<AoiObservation>,
}

impl ObservationBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, observation: AoiObservation) -> &mut Self {
        self.observations.push(observation);
        self
    }

    /// Build, validate and add one observation.
    pub fn create_and_add(
        &mut self,
        aoi_id: &str,
        raw_magnitude: f64,
        domain: Option<&str>,
        history: &[f64],
    ) -> Result<&AoiObservation> {
        let mut obs = AoiObservation::new(aoi_id, raw_magnitude, domain)?;
        obs.history = Magnitude::validate_all(history)?;
        self.observations.push(obs);
        Ok(&self.observations[self.observations.len() - 1])
    }

    pub fn from_requests(requests: &[ObservationRequest]) -> Result<Self> {
        let observations = requests
            .iter()
            .map(AoiObservation::from_request)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { observations })
    }

    /// Process every pending observation in parallel.
    pub fn process_all(&mut self, scorer: &AnomalyScorer, use_scaling: bool) -> ProcessingStats {
        let started = Instant::now();
        let processed = self
            .observations
            .par_iter_mut()
            .filter(|o| o.status == ObservationStatus::Pending)
            .map(|o| {
                o.process(scorer, use_scaling);
            })
            .count();
        let stats = ProcessingStats {
            total: self.observations.len(),
            processed,
            processing_time_ms: started.elapsed().as_secs_f64() * 1000.0,
        };
        info!(
            total = stats.total,
            processed = stats.processed,
            elapsed_ms = stats.processing_time_ms,
            "observation batch processed"
        );
        stats
    }

    pub fn anomalies(&self, threshold: AnomalyLevel) -> Vec<&AoiObservation> {
        self.observations
            .iter()
            .filter(|o| o.is_anomalous(threshold))
            .collect()
    }

    pub fn reliable_anomalies(&self, threshold: AnomalyLevel, min_confidence: f64) -> Vec<&AoiObservation> {
        self.observations
            .iter()
            .filter(|o| o.is_anomalous(threshold) && o.is_reliable(min_confidence))
            .collect()
    }

    /// CRITICAL first, then by anomaly score descending.
    pub fn sort_by_priority(&mut self) -> &mut Self {
        self.observations.sort_by(|a, b| {
            let pa = a.priority().map_or(usize::MAX, |p| p as usize);
            let pb = b.priority().map_or(usize::MAX, |p| p as usize);
            pa.cmp(&pb)
                .then_with(|| b.anomaly_score().total_cmp(&a.anomaly_score()))
        });
        self
    }

    /// Aggregate statistics; `None` for an empty batch.
    pub fn summary(&self) -> Option<BatchSummary> {
        if self.observations.is_empty() {
            return None;
        }
        let n = self.observations.len() as f64;
        let scores: Vec<f64> = self.observations.iter().map(|o| o.anomaly_score()).collect();

        let mut anomaly_levels = BTreeMap::new();
        let mut confidence_levels = BTreeMap::new();
        let mut domains = BTreeMap::new();
        for o in &self.observations {
            *anomaly_levels.entry(o.anomaly_level().to_string()).or_insert(0) += 1;
            let confidence = o
                .outcome
                .as_ref()
                .map_or("pending", |out| out.confidence_level.as_str());
            *confidence_levels.entry(confidence.to_string()).or_insert(0) += 1;
            *domains.entry(o.domain.clone()).or_insert(0) += 1;
        }

        Some(BatchSummary {
            total_observations: self.observations.len(),
            mean_anomaly_score: scores.iter().sum::<f64>() / n,
            max_anomaly_score: scores.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            min_anomaly_score: scores.iter().copied().fold(f64::INFINITY, f64::min),
            anomaly_levels,
            mean_confidence_score: self
                .observations
                .iter()
                .map(|o| o.confidence_score())
                .sum::<f64>()
                / n,
            confidence_levels,
            domains,
            requiring_attention: self
                .observations
                .iter()
                .filter(|o| o.outcome.as_ref().is_some_and(|out| out.requires_attention))
                .count(),
        })
    }
}
