//! Loading functions and the swappable [`WeightStoreHandle`].

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use serde::de::DeserializeOwned;
use tracing::{info, warn};

use crate::domain_weights::DomainWeightsRule;
use crate::scaling_config::ScalingConfigRule;
use crate::schema::DocumentEnvelope;
use crate::store::DomainWeightStore;

use super::error::{ConfigError, Result};
use super::watcher::handle_fs_event;

/// Locations of the two configuration documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigPaths {
    pub weights: PathBuf,
    pub scaling: PathBuf,
}

impl ConfigPaths {
    pub fn new(weights: impl Into<PathBuf>, scaling: impl Into<PathBuf>) -> Self {
        Self {
            weights: weights.into(),
            scaling: scaling.into(),
        }
    }

    pub(super) fn contains(&self, path: &Path) -> bool {
        same_file(path, &self.weights) || same_file(path, &self.scaling)
    }
}

/// Event paths may be absolute while configured paths are relative, so
/// compare by file name once the full paths differ.
fn same_file(event_path: &Path, configured: &Path) -> bool {
    if event_path == configured {
        return true;
    }
    match (event_path.file_name(), configured.file_name()) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// Parse a YAML document, checking its `kind` in a first pass.
pub fn parse_document<T: DeserializeOwned>(contents: &str, expected_kind: &str) -> Result<T> {
    let envelope: DocumentEnvelope = serde_yaml::from_str(contents)?;
    if envelope.kind != expected_kind {
        return Err(ConfigError::WrongKind {
            expected: expected_kind.to_string(),
            found: envelope.kind,
        });
    }
    Ok(serde_yaml::from_str(contents)?)
}

/// Read and parse one configuration file.
pub fn read_document<T: DeserializeOwned>(path: &Path, expected_kind: &str) -> Result<T> {
    if !path.exists() {
        return Err(ConfigError::Missing(path.to_path_buf()));
    }
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_document(&contents, expected_kind)
}

/// Compile a store from in-memory YAML.
pub fn from_yaml_strs(weights: &str, scaling: &str) -> Result<DomainWeightStore> {
    let weights: DomainWeightsRule = parse_document(weights, "DomainWeights")?;
    let scaling: ScalingConfigRule = parse_document(scaling, "ScalingConfig")?;
    DomainWeightStore::compile(&weights, &scaling)
}

/// Read, validate and compile both configuration files.
pub fn load(paths: &ConfigPaths) -> Result<DomainWeightStore> {
    let weights: DomainWeightsRule = read_document(&paths.weights, "DomainWeights")?;
    let scaling: ScalingConfigRule = read_document(&paths.scaling, "ScalingConfig")?;
    let store = DomainWeightStore::compile(&weights, &scaling)?;
    info!(
        version = %store.version,
        domains = store.domains().len(),
        dimensions = store.embedding_dimensions,
        path = %paths.weights.display(),
        "loaded domain weights"
    );
    Ok(store)
}

/// Load into `current`, leaving it untouched on failure.
pub(super) fn reload_into(paths: &ConfigPaths, current: &ArcSwap<DomainWeightStore>) -> Result<()> {
    match load(paths) {
        Ok(store) => {
            current.store(Arc::new(store));
            info!(path = %paths.weights.display(), "reloaded domain weights");
            Ok(())
        }
        Err(e) => {
            warn!(error = %e, "failed to reload configuration, keeping previous version");
            Err(e)
        }
    }
}

/// Shared, atomically swappable handle to the active store.
pub struct WeightStoreHandle {
    paths: ConfigPaths,
    current: Arc<ArcSwap<DomainWeightStore>>,
    /// Active filesystem watcher (held to keep it alive).
    _watcher: Option<RecommendedWatcher>,
}

impl WeightStoreHandle {
    /// Load both files and wrap the result.
    pub fn open(paths: ConfigPaths) -> Result<Self> {
        let store = load(&paths)?;
        Ok(Self::from_store(store, paths))
    }

    /// Wrap an already compiled store; `paths` is used by later reloads.
    pub fn from_store(store: DomainWeightStore, paths: ConfigPaths) -> Self {
        Self {
            paths,
            current: Arc::new(ArcSwap::from_pointee(store)),
            _watcher: None,
        }
    }

    /// The store active right now. Holding the `Arc` pins that version.
    pub fn snapshot(&self) -> Arc<DomainWeightStore> {
        self.current.load_full()
    }

    /// Re-read both files and swap the store in one step.
    ///
    /// On error the previous store stays active and the error is returned.
    pub fn reload(&self) -> Result<()> {
        reload_into(&self.paths, &self.current)
    }

    /// Watch the configuration files and reload on change.
    ///
    /// Reload failures are logged as warnings; the previous store is kept.
    pub fn watch(&mut self) -> Result<()> {
        let current = Arc::clone(&self.current);
        let paths = self.paths.clone();

        let mut watcher = notify::recommended_watcher(
            move |res: std::result::Result<notify::Event, notify::Error>| match res {
                Ok(event) => handle_fs_event(&event, &paths, &current),
                Err(e) => warn!(error = %e, "filesystem watcher error"),
            },
        )?;
        // Only polling backends honour the interval, and only before watching starts.
        if let Err(e) =
            watcher.configure(notify::Config::default().with_poll_interval(Duration::from_millis(500)))
        {
            warn!(error = %e, "failed to configure watcher poll interval");
        }

        let mut dirs: Vec<PathBuf> = [&self.paths.weights, &self.paths.scaling]
            .iter()
            .map(|p| match p.parent() {
                Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
                _ => PathBuf::from("."),
            })
            .collect();
        dirs.dedup();
        for dir in &dirs {
            watcher.watch(dir, RecursiveMode::NonRecursive)?;
        }

        info!(
            weights = %self.paths.weights.display(),
            scaling = %self.paths.scaling.display(),
            "watching configuration files for changes"
        );
        self._watcher = Some(watcher);
        Ok(())
    }

    pub fn paths(&self) -> &ConfigPaths {
        &self.paths
    }

    pub fn is_watching(&self) -> bool {
        self._watcher.is_some()
    }

    #[cfg(test)]
    pub(super) fn current(&self) -> &ArcSwap<DomainWeightStore> {
        &self.current
    }
}
