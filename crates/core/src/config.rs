use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_bool(profile: &str, key: &str, default: bool) -> bool {
    match profiled_env_opt(profile, key) {
        Some(v) => matches!(v.as_str(), "true" | "1"),
        None => default,
    }
}

fn profiled_env_usize(profile: &str, key: &str, default: usize) -> usize {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_f64(profile: &str, key: &str, default: f64) -> f64 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub files: ConfigFiles,
    pub history: HistoryConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `GEOWATCH_PROFILE`. When set (e.g. `PROD`),
    /// every key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("GEOWATCH_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            files: ConfigFiles::from_env_profiled(p),
            history: HistoryConfig::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!("  weights:  {}", self.files.weights.display());
        tracing::info!("  scaling:  {}", self.files.scaling.display());
        tracing::info!("  watch:    {}", self.files.watch);
        tracing::info!(
            "  history:  window={}, min_observations={}, volatility_window={}, outlier_z={}",
            self.history.window,
            self.history.min_observations,
            self.history.volatility_window,
            self.history.outlier_z_threshold
        );
    }
}

// ── Configuration files ───────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigFiles {
    /// DomainWeights YAML document.
    pub weights: PathBuf,
    /// ScalingConfig YAML document.
    pub scaling: PathBuf,
    /// Reload on filesystem notifications instead of re-reading on a timer.
    pub watch: bool,
}

impl ConfigFiles {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            weights: PathBuf::from(profiled_env_or(
                p,
                "WEIGHTS_FILE",
                "data/config/domain-weights.yml",
            )),
            scaling: PathBuf::from(profiled_env_or(
                p,
                "SCALING_FILE",
                "data/config/scaling-config.yml",
            )),
            watch: profiled_env_bool(p, "WATCH_CONFIG", false),
        }
    }
}

// ── Observation history ───────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryConfig {
    /// Maximum observations retained per entity (FIFO).
    pub window: usize,
    /// Observations required before stability statistics are meaningful.
    pub min_observations: usize,
    /// Rolling window for the volatility metric.
    pub volatility_window: usize,
    /// |z| above which a point counts as an outlier.
    pub outlier_z_threshold: f64,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            window: 30,
            min_observations: 3,
            volatility_window: 3,
            outlier_z_threshold: 2.0,
        }
    }
}

impl HistoryConfig {
    fn from_env_profiled(p: &str) -> Self {
        let d = Self::default();
        Self {
            window: profiled_env_usize(p, "HISTORY_WINDOW", d.window).max(1),
            min_observations: profiled_env_usize(p, "MIN_OBSERVATIONS", d.min_observations),
            volatility_window: profiled_env_usize(p, "VOLATILITY_WINDOW", d.volatility_window)
                .max(1),
            outlier_z_threshold: profiled_env_f64(p, "OUTLIER_Z_THRESHOLD", d.outlier_z_threshold),
        }
    }
}
