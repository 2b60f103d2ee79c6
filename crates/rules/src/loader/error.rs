//! Error type for configuration loading.

use std::path::PathBuf;

/// Errors that can occur while loading or reloading engine configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Configuration file does not exist.
    #[error("configuration file not found: {0}")]
    Missing(PathBuf),

    /// Filesystem I/O error.
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parse/deserialization error.
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// Document has the wrong `kind`.
    #[error("expected kind '{expected}', found '{found}'")]
    WrongKind { expected: String, found: String },

    /// One or more validation errors.
    #[error("validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    /// Filesystem watcher error.
    #[error("Notify watcher error: {0}")]
    Notify(#[from] notify::Error),
}

/// Result alias for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;
