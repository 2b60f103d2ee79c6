//! Property tests for the scoring engine.

use std::sync::Arc;

use geowatch_compute::anomaly::priority_decision;
use geowatch_compute::confidence::confidence_from_history;
use geowatch_compute::scaling::{apply, inverse};
use geowatch_compute::AnomalyScorer;
use geowatch_core::config::HistoryConfig;
use geowatch_core::{AnomalyLevel, CoarseConfidence, ConfidenceLevel, Magnitude, Priority};
use geowatch_rules::loader::from_yaml_strs;
use geowatch_rules::scaling_config::ToleranceFactors;
use geowatch_rules::{DomainWeightStore, ScalingMethod};
use proptest::prelude::*;

const WEIGHTS: &str = include_str!("../../../data/config/domain-weights.yml");
const SCALING: &str = include_str!("../../../data/config/scaling-config.yml");

fn store() -> Arc<DomainWeightStore> {
    Arc::new(from_yaml_strs(WEIGHTS, SCALING).unwrap())
}

fn arb_domain() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("port"),
        Just("farm"),
        Just("mine"),
        Just("energy"),
        Just("default"),
        Just("unknown"),
    ]
}

fn arb_method() -> impl Strategy<Value = ScalingMethod> {
    prop::sample::select(ScalingMethod::ALL.to_vec())
}

fn arb_confidence() -> impl Strategy<Value = Option<CoarseConfidence>> {
    prop_oneof![
        Just(None),
        Just(Some(CoarseConfidence::High)),
        Just(Some(CoarseConfidence::Medium)),
        Just(Some(CoarseConfidence::Low)),
    ]
}

// ── Scaling range ────────────────────────────────────────────────────

proptest! {
    #[test]
    fn scaled_values_stay_in_unit_interval(
        x in prop::num::f64::ANY,
        method in arb_method(),
        domain in arb_domain(),
    ) {
        let store = store();
        let y = apply(method, x, &store.profile(domain).scaling);
        prop_assert!((0.0..=1.0).contains(&y), "{:?}({}) = {}", method, x, y);
    }
}

// ── Monotonicity ─────────────────────────────────────────────────────

proptest! {
    #[test]
    fn score_is_non_decreasing_in_magnitude(
        a in 0.0f64..=1.0,
        b in 0.0f64..=1.0,
        domain in arb_domain(),
        confidence in arb_confidence(),
    ) {
        let scorer = AnomalyScorer::new(store(), HistoryConfig::default());
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let s_lo = scorer.score(Magnitude::new(lo).unwrap(), Some(domain), confidence);
        let s_hi = scorer.score(Magnitude::new(hi).unwrap(), Some(domain), confidence);
        prop_assert!(s_lo.anomaly_score <= s_hi.anomaly_score);
        prop_assert!(s_lo.anomaly_level <= s_hi.anomaly_level);

        let scaled_lo = scorer.score_scaled(Magnitude::new(lo).unwrap(), Some(domain), confidence, None, false);
        let scaled_hi = scorer.score_scaled(Magnitude::new(hi).unwrap(), Some(domain), confidence, None, false);
        prop_assert!(scaled_lo.anomaly_score <= scaled_hi.anomaly_score);
    }
}

// ── Approximate inverse ──────────────────────────────────────────────

proptest! {
    #[test]
    fn sigmoid_and_min_max_invert(
        t in 0.0f64..=1.0,
        domain in arb_domain(),
        method in prop_oneof![Just(ScalingMethod::Sigmoid), Just(ScalingMethod::MinMax)],
    ) {
        let store = store();
        let params = &store.profile(domain).scaling;
        // Inside the domain's expected range.
        let x = params.min_max.low + t * (params.min_max.high - params.min_max.low);
        let y = apply(method, x, params);
        let round_trip = apply(method, inverse(method, y, params), params);
        prop_assert!((round_trip - y).abs() < 1e-9, "{} vs {}", round_trip, y);
    }
}

// ── Confidence insufficiency ─────────────────────────────────────────

proptest! {
    #[test]
    fn short_history_is_always_insufficient(
        history in prop::collection::vec(prop::num::f64::ANY, 0..3),
        current in prop::option::of(0.0f64..=1.0),
    ) {
        let r = confidence_from_history(
            &history,
            current,
            &ToleranceFactors::default(),
            &HistoryConfig::default(),
        );
        prop_assert_eq!(r.confidence_level, ConfidenceLevel::InsufficientData);
        prop_assert_eq!(r.confidence_score, 0.0);
    }

    #[test]
    fn confidence_score_is_bounded(
        history in prop::collection::vec(0.0f64..=1.0, 3..40),
        current in prop::option::of(0.0f64..=1.0),
    ) {
        let r = confidence_from_history(
            &history,
            current,
            &ToleranceFactors::default(),
            &HistoryConfig::default(),
        );
        prop_assert!((0.0..=1.0).contains(&r.confidence_score));
        prop_assert!(r.observation_count <= 30);
        prop_assert_eq!(r.confidence_level, ConfidenceLevel::from_score(r.confidence_score));
    }
}

// ── Priority matrix totality ─────────────────────────────────────────

#[test]
fn every_level_pair_has_a_priority() {
    let labels = [
        Priority::Critical,
        Priority::High,
        Priority::Medium,
        Priority::Low,
        Priority::Info,
    ];
    for a in AnomalyLevel::ALL {
        for c in ConfidenceLevel::ALL {
            let d = priority_decision(a, c);
            assert!(labels.contains(&d.priority));
            assert!(!d.recommended_action.is_empty());
        }
    }
}

#[test]
fn default_multiplier_is_exactly_one() {
    assert_eq!(store().multiplier("default"), 1.0);
}
