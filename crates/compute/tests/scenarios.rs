//! End-to-end scoring scenarios against the shipped configuration.

use std::sync::Arc;

use geowatch_compute::{AnomalyScorer, ConfidenceCalculator, HistoryTracker};
use geowatch_core::config::HistoryConfig;
use geowatch_core::{AnomalyLevel, ConfidenceLevel, Magnitude, Priority};
use geowatch_rules::loader::from_yaml_strs;
use geowatch_rules::DomainWeightStore;

const WEIGHTS: &str = include_str!("../../../data/config/domain-weights.yml");
const SCALING: &str = include_str!("../../../data/config/scaling-config.yml");

const STABLE: [f64; 7] = [0.10, 0.11, 0.10, 0.09, 0.11, 0.10, 0.10];
const ERRATIC: [f64; 7] = [0.05, 0.15, 0.08, 0.20, 0.06, 0.18, 0.09];

fn store() -> Arc<DomainWeightStore> {
    Arc::new(from_yaml_strs(WEIGHTS, SCALING).unwrap())
}

fn scorer() -> AnomalyScorer {
    AnomalyScorer::new(store(), HistoryConfig::default())
}

fn m(v: f64) -> Magnitude {
    Magnitude::new(v).unwrap()
}

#[test]
fn port_magnitude_lands_in_configured_band() {
    let s = scorer();
    let r = s.score(m(0.08), Some("port"), None);
    let multiplier = s.multiplier(Some("port"));
    assert!((1.1..=1.2).contains(&multiplier));
    assert!((0.09..=0.10).contains(&r.anomaly_score), "{}", r.anomaly_score);

    let t = s.store().get_thresholds("port");
    let expected = if r.anomaly_score < t.moderate_change {
        AnomalyLevel::Low
    } else {
        AnomalyLevel::Medium
    };
    assert_eq!(r.anomaly_level, expected);
    assert_eq!(r.anomaly_level, AnomalyLevel::Medium);
}

#[test]
fn stable_history_has_low_variation() {
    let c = ConfidenceCalculator::new(store(), HistoryConfig::default());
    let r = c.calculate(&STABLE, Some(0.10), None);
    let metrics = r.metrics.unwrap();
    assert!(metrics.coefficient_of_variation < 0.1);
    assert_eq!(r.stability_assessment.as_deref(), Some("Stable"));
    // The short window keeps trend fit and volatility goodness modest, so
    // the composite settles in the medium band.
    assert_eq!(r.confidence_level, ConfidenceLevel::Medium);
}

#[test]
fn erratic_history_has_low_confidence() {
    let c = ConfidenceCalculator::new(store(), HistoryConfig::default());
    let r = c.calculate(&ERRATIC, Some(0.25), None);
    assert!(matches!(
        r.confidence_level,
        ConfidenceLevel::Low | ConfidenceLevel::VeryLow
    ));
    assert!(r.metrics.unwrap().coefficient_of_variation > 0.5);
}

#[test]
fn contextual_outlier_beats_plain_score() {
    let s = scorer();
    let history = [0.05, 0.06, 0.04, 0.05, 0.07, 0.05];
    let plain = s.score(m(0.15), None, None);
    let contextual = s.score_contextual(m(0.15), &history, None);
    assert!(contextual.statistical_context.unwrap().z_score > 2.0);
    assert!(contextual.result.anomaly_score > plain.anomaly_score);
}

#[test]
fn specialised_domain_scores_at_least_default() {
    let s = scorer();
    let port = s.score(m(0.10), Some("port"), None);
    let default = s.score(m(0.10), Some("default"), None);
    assert!(s.multiplier(Some("port")) > 1.0);
    assert!(port.anomaly_score >= default.anomaly_score);
}

#[test]
fn tracked_history_drives_combined_assessment() {
    let store = store();
    let tracker = HistoryTracker::new(ConfidenceCalculator::new(
        Arc::clone(&store),
        HistoryConfig::default(),
    ));
    tracker
        .record_batch("Rotterdam-Harbor", &ERRATIC, Some("port"))
        .unwrap();
    let snapshot = tracker.snapshot("Rotterdam-Harbor").unwrap();

    let s = AnomalyScorer::new(store, HistoryConfig::default());
    let a = s.assess(m(0.3), &snapshot.values, snapshot.domain.as_deref(), true, false);
    assert_eq!(a.anomaly.domain, "port");
    assert!(a.anomaly.requires_attention);
    assert!(a.requires_human_review);
    // Erratic history never yields a CRITICAL priority.
    assert_ne!(a.priority, Priority::Critical);
    assert_eq!(
        tracker.confidence("Rotterdam-Harbor", Some(0.3)).confidence_score,
        a.confidence.confidence_score
    );
}
