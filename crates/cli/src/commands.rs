use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use geowatch_compute::observation::ObservationRequest;
use geowatch_compute::{
    AnomalyScorer, AoiObservation, BatchItem, ConfidenceCalculator, MagnitudeScaler, ObservationBatch,
    WeightedEmbeddingAnalyzer,
};
use geowatch_core::config::{Config, HistoryConfig};
use geowatch_core::{AnomalyLevel, Magnitude};
use geowatch_rules::domain_weights::DomainWeightsRule;
use geowatch_rules::loader::{self, read_document};
use geowatch_rules::scaling_config::ScalingConfigRule;
use geowatch_rules::validation::{validate_domain_weights, validate_scaling_config};
use geowatch_rules::{detect_domain, ConfigPaths, DomainWeightStore, WeightStoreHandle};

use crate::cli::Command;
use crate::config::read_json;

/// JSON body for stdout plus whether the command succeeded.
pub struct Report {
    pub body: Value,
    pub ok: bool,
}

impl Report {
    fn ok(body: Value) -> Self {
        Self { body, ok: true }
    }
}

/// Current/baseline embedding pair for `analyze`.
#[derive(Debug, Deserialize)]
pub struct EmbeddingInput {
    pub current: Vec<f64>,
    pub baseline: Vec<f64>,
    #[serde(default)]
    pub domain: Option<String>,
    /// Used for domain detection when `domain` is absent.
    #[serde(default)]
    pub aoi_id: Option<String>,
    /// Dimension names aligned with the vectors; canonical order when absent.
    #[serde(default)]
    pub dimensions: Option<Vec<String>>,
}

pub fn run(command: Command, paths: &ConfigPaths, config: &Config) -> Result<Report> {
    match command {
        Command::Validate => validate(paths),
        Command::Watch { interval_secs } => watch(paths.clone(), interval_secs, config.files.watch),
        other => {
            let store = Arc::new(loader::load(paths).context("failed to load domain configuration")?);
            run_with_store(other, store, &config.history)
        }
    }
}

/// Commands that only need a compiled store.
pub fn run_with_store(command: Command, store: Arc<DomainWeightStore>, cfg: &HistoryConfig) -> Result<Report> {
    let scorer = AnomalyScorer::new(Arc::clone(&store), cfg.clone());
    let body = match command {
        Command::Domains => domains(&store),

        Command::Detect { aoi } => {
            let detected = detect_domain(&aoi);
            let profile = store.profile_for_aoi(&aoi);
            json!({
                "aoi_id": aoi,
                "detected_domain": detected,
                "domain": profile.key,
                "domain_name": profile.name,
                "multiplier": profile.multiplier,
            })
        }

        Command::Scale { value, domain, method } => {
            let scaler = MagnitudeScaler::new(&store);
            match method {
                Some(m) => json!({
                    "value": value,
                    "scaled": scaler.scale(value, &domain, m),
                    "info": scaler.scaling_info(&domain, m),
                }),
                None => {
                    let profile = store.profile(&domain);
                    json!({
                        "value": value,
                        "domain": profile.key,
                        "policy": profile.scaling_method,
                        "scaled": scaler.scale_for_domain(value, &domain),
                        "methods": scaler.compare_methods(value, &domain),
                    })
                }
            }
        }

        Command::Score { magnitude, domain, aoi, confidence, scaled, history, adaptive } => {
            let raw = Magnitude::new(magnitude)?;
            Magnitude::validate_all(&history)?;
            let domain = domain.or_else(|| aoi.as_deref().and_then(detect_domain).map(str::to_string));
            let mut result = if scaled {
                let h = (!history.is_empty()).then_some(history.as_slice());
                scorer.score_scaled(raw, domain.as_deref(), confidence, h, adaptive)
            } else {
                scorer.score(raw, domain.as_deref(), confidence)
            };
            result.aoi_id = aoi;
            serde_json::to_value(result)?
        }

        Command::Contextual { magnitude, history, domain } => {
            let raw = Magnitude::new(magnitude)?;
            Magnitude::validate_all(&history)?;
            let result = scorer.score_contextual(raw, &history, domain.as_deref());
            serde_json::to_value(result)?
        }

        Command::Confidence { history, current, domain } => {
            Magnitude::validate_all(&history)?;
            let current = current.map(Magnitude::new).transpose()?.map(Magnitude::value);
            let calculator = ConfidenceCalculator::new(Arc::clone(&store), cfg.clone());
            serde_json::to_value(calculator.calculate(&history, current, domain.as_deref()))?
        }

        Command::Assess { magnitude, history, domain, no_scaling, adaptive } => {
            let raw = Magnitude::new(magnitude)?;
            Magnitude::validate_all(&history)?;
            let assessment = scorer.assess(raw, &history, domain.as_deref(), !no_scaling, adaptive);
            serde_json::to_value(assessment)?
        }

        Command::Analyze { input, domain, compare } => analyze(&input, domain, compare, &store)?,

        Command::Batch { input, no_scaling, threshold, min_confidence } => {
            batch(&input, &scorer, !no_scaling, threshold, min_confidence)?
        }

        Command::Rank { input } => {
            let items: Vec<BatchItem> = read_json(&input)?;
            serde_json::to_value(scorer.batch_score(&items))?
        }

        Command::Validate | Command::Watch { .. } => {
            anyhow::bail!("command needs the configuration files, not a compiled store")
        }
    };
    Ok(Report::ok(body))
}

fn validate(paths: &ConfigPaths) -> Result<Report> {
    let weights: DomainWeightsRule = read_document(&paths.weights, "DomainWeights")
        .with_context(|| format!("failed to read {}", paths.weights.display()))?;
    let scaling: ScalingConfigRule = read_document(&paths.scaling, "ScalingConfig")
        .with_context(|| format!("failed to read {}", paths.scaling.display()))?;
    let w = validate_domain_weights(&weights);
    let s = validate_scaling_config(&scaling, &weights);
    let ok = w.valid && s.valid;
    info!(valid = ok, errors = w.errors.len() + s.errors.len(), "validated configuration");
    Ok(Report {
        body: json!({
            "valid": ok,
            "weights": { "path": paths.weights, "result": w },
            "scaling": { "path": paths.scaling, "result": s },
        }),
        ok,
    })
}

fn domains(store: &DomainWeightStore) -> Value {
    let domains: Vec<Value> = store
        .domains()
        .into_iter()
        .map(|d| {
            let p = store.profile(d);
            json!({
                "key": p.key,
                "name": p.name,
                "description": p.description,
                "multiplier": p.multiplier,
                "thresholds": p.thresholds,
                "scaling_method": p.scaling_method,
                "emphasis": p.emphasis,
                "alert": p.alert,
            })
        })
        .collect();
    json!({
        "version": store.version,
        "embedding_dimensions": store.embedding_dimensions,
        "domains": domains,
    })
}

fn analyze(input: &Path, domain: Option<String>, compare: bool, store: &Arc<DomainWeightStore>) -> Result<Value> {
    let pair: EmbeddingInput = read_json(input)?;
    let analyzer = WeightedEmbeddingAnalyzer::new(Arc::clone(store));
    if compare {
        return Ok(serde_json::to_value(analyzer.compare_domains(&pair.current, &pair.baseline)?)?);
    }
    let domain = domain
        .or(pair.domain)
        .or_else(|| pair.aoi_id.as_deref().and_then(detect_domain).map(str::to_string));
    let analysis = match &pair.dimensions {
        Some(names) => analyzer.analyze_named(names, &pair.current, &pair.baseline, domain.as_deref())?,
        None => analyzer.analyze(&pair.current, &pair.baseline, domain.as_deref())?,
    };
    Ok(serde_json::to_value(analysis)?)
}

fn batch(
    input: &Path,
    scorer: &AnomalyScorer,
    use_scaling: bool,
    threshold: AnomalyLevel,
    min_confidence: f64,
) -> Result<Value> {
    let requests: Vec<ObservationRequest> = read_json(input)?;
    let mut batch = ObservationBatch::from_requests(&requests).context("invalid observation in batch")?;
    let stats = batch.process_all(scorer, use_scaling);
    batch.sort_by_priority();

    let ids = |obs: Vec<&AoiObservation>| -> Vec<String> {
        obs.into_iter().map(|o| o.aoi_id.clone()).collect()
    };
    Ok(json!({
        "stats": stats,
        "summary": batch.summary(),
        "anomalies": ids(batch.anomalies(threshold)),
        "reliable_anomalies": ids(batch.reliable_anomalies(threshold, min_confidence)),
        "observations": batch.observations,
    }))
}

/// Open the store, installing a filesystem watcher when `notify_changes` is set.
fn open_handle(paths: ConfigPaths, notify_changes: bool) -> Result<WeightStoreHandle> {
    let mut handle = WeightStoreHandle::open(paths).context("failed to load domain configuration")?;
    if notify_changes {
        handle.watch().context("failed to watch configuration files")?;
    }
    Ok(handle)
}

fn watch(paths: ConfigPaths, interval_secs: u64, notify_changes: bool) -> Result<Report> {
    let handle = open_handle(paths, notify_changes)?;
    let interval = Duration::from_secs(interval_secs.max(1));
    loop {
        // Without a watcher the files are re-read every tick.
        if !handle.is_watching() {
            if let Err(e) = handle.reload() {
                warn!(error = %e, "reload failed, keeping previous configuration");
            }
        }
        let store = handle.snapshot();
        info!(
            version = %store.version,
            domains = store.domains().len(),
            multipliers = ?store.multipliers(),
            "active domain configuration"
        );
        thread::sleep(interval);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use geowatch_core::CoarseConfidence;
    use geowatch_rules::loader::from_yaml_strs;
    use geowatch_rules::ScalingMethod;

    const WEIGHTS: &str = include_str!("../../../data/config/domain-weights.yml");
    const SCALING: &str = include_str!("../../../data/config/scaling-config.yml");

    fn store() -> Arc<DomainWeightStore> {
        Arc::new(from_yaml_strs(WEIGHTS, SCALING).unwrap())
    }

    fn exec(command: Command) -> Value {
        run_with_store(command, store(), &HistoryConfig::default()).unwrap().body
    }

    fn json_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", contents).unwrap();
        file
    }

    #[test]
    fn test_domains_lists_default_last() {
        let body = exec(Command::Domains);
        let domains = body["domains"].as_array().unwrap();
        assert_eq!(domains.len(), 5);
        assert_eq!(domains[4]["key"], "default");
        assert_eq!(domains[4]["multiplier"], 1.0);
    }

    #[test]
    fn test_score_detects_domain_from_aoi() {
        let body = exec(Command::Score {
            magnitude: 0.08,
            domain: None,
            aoi: Some("rotterdam-harbor".into()),
            confidence: None,
            scaled: false,
            history: vec![],
            adaptive: false,
        });
        assert_eq!(body["domain"], "port");
        assert_eq!(body["aoi_id"], "rotterdam-harbor");
        assert_eq!(body["anomaly_level"], "medium");
    }

    #[test]
    fn test_score_rejects_out_of_range_magnitude() {
        let err = run_with_store(
            Command::Score {
                magnitude: 1.5,
                domain: None,
                aoi: None,
                confidence: Some(CoarseConfidence::High),
                scaled: false,
                history: vec![],
                adaptive: false,
            },
            store(),
            &HistoryConfig::default(),
        )
        .err()
        .unwrap();
        assert!(err.to_string().contains("1.5"));
    }

    #[test]
    fn test_confidence_short_history() {
        let body = exec(Command::Confidence {
            history: vec![0.1, 0.2],
            current: None,
            domain: None,
        });
        assert_eq!(body["confidence_level"], "insufficient_data");
        assert_eq!(body["confidence_score"], 0.0);
    }

    #[test]
    fn test_scale_compares_methods_without_explicit_method() {
        let body = exec(Command::Scale {
            value: 0.1,
            domain: "farm".into(),
            method: None,
        });
        assert_eq!(body["policy"], "min_max");
        assert_eq!(body["methods"].as_array().unwrap().len(), 5);
        let explicit = exec(Command::Scale {
            value: 0.1,
            domain: "farm".into(),
            method: Some(ScalingMethod::None),
        });
        assert_eq!(explicit["scaled"], 0.1);
    }

    #[test]
    fn test_batch_ranks_observations() {
        let file = json_file(
            r#"[
                {"aoi_id": "city-a", "raw_magnitude": 0.01},
                {"aoi_id": "port-b", "raw_magnitude": 0.3, "domain": "port",
                 "history": [0.10, 0.11, 0.10, 0.09, 0.11, 0.10, 0.10]}
            ]"#,
        );
        let body = exec(Command::Batch {
            input: file.path().to_path_buf(),
            no_scaling: false,
            threshold: AnomalyLevel::Medium,
            min_confidence: 0.6,
        });
        assert_eq!(body["stats"]["processed"], 2);
        assert_eq!(body["observations"][0]["aoi_id"], "port-b");
        assert_eq!(body["anomalies"], json!(["port-b"]));
    }

    #[test]
    fn test_rank_orders_by_score() {
        let file = json_file(
            r#"[
                {"aoi_id": "a", "raw_magnitude": 0.02},
                {"aoi_id": "b", "raw_magnitude": 0.2, "domain": "mine"}
            ]"#,
        );
        let body = exec(Command::Rank { input: file.path().to_path_buf() });
        assert_eq!(body[0]["aoi_id"], "b");
        assert_eq!(body[1]["aoi_id"], "a");
    }

    #[test]
    fn test_rank_rejects_negative_magnitude() {
        let file = json_file(r#"[{"aoi_id": "a", "raw_magnitude": -0.5}]"#);
        let result = run_with_store(
            Command::Rank { input: file.path().to_path_buf() },
            store(),
            &HistoryConfig::default(),
        );
        let err = result.err().unwrap();
        assert!(format!("{:#}", err).contains("-0.5"));
    }

    #[test]
    fn test_watch_setting_controls_file_watcher() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ConfigPaths::new(dir.path().join("weights.yml"), dir.path().join("scaling.yml"));
        std::fs::write(&paths.weights, WEIGHTS).unwrap();
        std::fs::write(&paths.scaling, SCALING).unwrap();

        let polling = open_handle(paths.clone(), false).unwrap();
        assert!(!polling.is_watching());
        polling.reload().unwrap();

        let notified = open_handle(paths, true).unwrap();
        assert!(notified.is_watching());
    }

    #[test]
    fn test_analyze_rejects_length_mismatch() {
        let file = json_file(r#"{"current": [0.1, 0.2], "baseline": [0.1]}"#);
        let result = run_with_store(
            Command::Analyze {
                input: file.path().to_path_buf(),
                domain: None,
                compare: false,
            },
            store(),
            &HistoryConfig::default(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_shipped_files() {
        let dir = tempfile::tempdir().unwrap();
        let weights = dir.path().join("domain-weights.yml");
        let scaling = dir.path().join("scaling-config.yml");
        std::fs::write(&weights, WEIGHTS).unwrap();
        std::fs::write(&scaling, SCALING).unwrap();
        let report = validate(&ConfigPaths::new(weights, scaling)).unwrap();
        assert!(report.ok);
        assert_eq!(report.body["valid"], true);
    }
}
