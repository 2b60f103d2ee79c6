//! Scoring engine: scaling, stability, confidence and anomaly assessment
//! over a shared [`geowatch_rules::DomainWeightStore`].

pub mod anomaly;
pub mod confidence;
pub mod embedding;
pub mod history;
pub mod observation;
pub mod scaling;
pub mod stability;

pub use anomaly::{AnomalyScorer, BatchItem, CombinedAssessment, ContextualResult, ScoringResult};
pub use confidence::{ConfidenceCalculator, ConfidenceResult};
pub use embedding::{EmbeddingAnalysis, WeightedEmbeddingAnalyzer};
pub use history::HistoryTracker;
pub use observation::{AoiObservation, ObservationBatch, ObservationStatus};
pub use scaling::MagnitudeScaler;
pub use stability::{assess_stability, StabilityMetrics};

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use geowatch_rules::loader::from_yaml_strs;
    use geowatch_rules::DomainWeightStore;

    const WEIGHTS: &str = include_str!("../../../data/config/domain-weights.yml");
    const SCALING: &str = include_str!("../../../data/config/scaling-config.yml");

    /// The shipped configuration, compiled.
    pub fn store() -> Arc<DomainWeightStore> {
        Arc::new(from_yaml_strs(WEIGHTS, SCALING).unwrap())
    }
}
