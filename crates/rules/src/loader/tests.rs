//! Tests for the configuration loader module.

use std::fs;

use notify::event::{DataChange, ModifyKind, RemoveKind};
use notify::{Event, EventKind};
use tempfile::TempDir;

use super::core::reload_into;
use super::watcher::handle_fs_event;
use super::*;

const WEIGHTS: &str = include_str!("../../../../data/config/domain-weights.yml");
const SCALING: &str = include_str!("../../../../data/config/scaling-config.yml");

fn temp_config() -> (TempDir, ConfigPaths) {
    let dir = TempDir::new().expect("create tempdir");
    let paths = ConfigPaths::new(
        dir.path().join("domain-weights.yml"),
        dir.path().join("scaling-config.yml"),
    );
    fs::write(&paths.weights, WEIGHTS).unwrap();
    fs::write(&paths.scaling, SCALING).unwrap();
    (dir, paths)
}

/// The shipped weights with one port weight changed.
fn edited_weights() -> String {
    WEIGHTS.replacen("A05: 1.5", "A05: 3.5", 1)
}

#[test]
fn load_shipped_configuration() {
    let (_dir, paths) = temp_config();
    let store = load(&paths).unwrap();
    assert_eq!(store.embedding_dimensions, 64);
    assert_eq!(store.domains().len(), 5);
}

#[test]
fn from_strings_matches_file_load() {
    let (_dir, paths) = temp_config();
    let a = load(&paths).unwrap();
    let b = from_yaml_strs(WEIGHTS, SCALING).unwrap();
    assert_eq!(a.multiplier("farm"), b.multiplier("farm"));
}

#[test]
fn missing_file_is_reported() {
    let (dir, paths) = temp_config();
    fs::remove_file(&paths.scaling).unwrap();
    match load(&paths) {
        Err(ConfigError::Missing(p)) => assert_eq!(p, dir.path().join("scaling-config.yml")),
        other => panic!("expected Missing, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn malformed_yaml_is_a_parse_error() {
    let (_dir, paths) = temp_config();
    fs::write(&paths.weights, "apiVersion: v1\nkind: [unclosed").unwrap();
    assert!(matches!(load(&paths), Err(ConfigError::Parse(_))));
}

#[test]
fn swapped_files_are_wrong_kind() {
    let (_dir, paths) = temp_config();
    let swapped = ConfigPaths::new(&paths.scaling, &paths.weights);
    match load(&swapped) {
        Err(ConfigError::WrongKind { expected, found }) => {
            assert_eq!(expected, "DomainWeights");
            assert_eq!(found, "ScalingConfig");
        }
        other => panic!("expected WrongKind, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn missing_domain_is_a_validation_error() {
    let mut rule: crate::domain_weights::DomainWeightsRule = serde_yaml::from_str(WEIGHTS).unwrap();
    rule.spec.domains.shift_remove("energy");
    let yaml = serde_yaml::to_string(&rule).unwrap();
    match from_yaml_strs(&yaml, SCALING) {
        Err(ConfigError::Validation(errors)) => {
            assert!(errors.iter().any(|e| e.contains("energy")), "{:?}", errors);
        }
        other => panic!("expected Validation, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn reload_swaps_store() {
    let (_dir, paths) = temp_config();
    let handle = WeightStoreHandle::open(paths.clone()).unwrap();
    let before = handle.snapshot();

    fs::write(&paths.weights, edited_weights()).unwrap();
    handle.reload().unwrap();

    let after = handle.snapshot();
    assert_eq!(before.profile("port").weight_for("A05"), 1.5);
    assert_eq!(after.profile("port").weight_for("A05"), 3.5);
    assert!(after.multiplier("port") > before.multiplier("port"));
}

#[test]
fn failed_reload_keeps_previous_store() {
    let (_dir, paths) = temp_config();
    let handle = WeightStoreHandle::open(paths.clone()).unwrap();

    fs::write(&paths.weights, "not: [valid").unwrap();
    assert!(handle.reload().is_err());
    assert_eq!(handle.snapshot().profile("port").weight_for("A05"), 1.5);
}

#[test]
fn modify_event_triggers_reload() {
    let (_dir, paths) = temp_config();
    let handle = WeightStoreHandle::open(paths.clone()).unwrap();
    fs::write(&paths.weights, edited_weights()).unwrap();

    let event = Event::new(EventKind::Modify(ModifyKind::Data(DataChange::Content)))
        .add_path(paths.weights.clone());
    handle_fs_event(&event, &paths, handle.current());

    assert_eq!(handle.snapshot().profile("port").weight_for("A05"), 3.5);
}

#[test]
fn unrelated_and_remove_events_leave_store_alone() {
    let (dir, paths) = temp_config();
    let handle = WeightStoreHandle::open(paths.clone()).unwrap();
    fs::write(&paths.weights, edited_weights()).unwrap();

    let other = Event::new(EventKind::Modify(ModifyKind::Data(DataChange::Content)))
        .add_path(dir.path().join("notes.yml"));
    handle_fs_event(&other, &paths, handle.current());
    let removed = Event::new(EventKind::Remove(RemoveKind::File)).add_path(paths.weights.clone());
    handle_fs_event(&removed, &paths, handle.current());

    assert_eq!(handle.snapshot().profile("port").weight_for("A05"), 1.5);
}

#[test]
fn reload_into_reports_error() {
    let (_dir, paths) = temp_config();
    let handle = WeightStoreHandle::open(paths.clone()).unwrap();
    fs::remove_file(&paths.weights).unwrap();
    assert!(reload_into(&paths, handle.current()).is_err());
}

#[test]
fn watch_installs_watcher() {
    let (_dir, paths) = temp_config();
    let mut handle = WeightStoreHandle::open(paths).unwrap();
    handle.watch().unwrap();
    assert!(handle.is_watching());
}
