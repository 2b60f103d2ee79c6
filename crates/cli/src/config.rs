use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use tracing::debug;

use geowatch_core::Config;
use geowatch_rules::ConfigPaths;

/// Resolve the configuration document paths.
/// Priority: command-line flag (or its env var) > profiled env > built-in default.
pub fn resolve_paths(weights: Option<&Path>, scaling: Option<&Path>, config: &Config) -> ConfigPaths {
    let pick = |flag: Option<&Path>, fallback: &PathBuf| -> PathBuf {
        flag.map(Path::to_path_buf).unwrap_or_else(|| fallback.clone())
    };
    ConfigPaths::new(
        pick(weights, &config.files.weights),
        pick(scaling, &config.files.scaling),
    )
}

/// Read a JSON input file.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    debug!(path = %path.display(), "reading input");
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read input: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("failed to parse input: {}", path.display()))
}
