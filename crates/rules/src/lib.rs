//! YAML configuration for the anomaly scoring engine.
//!
//! This crate provides:
//! - `DomainWeights` and `ScalingConfig` document types with serde deserialization
//! - Structural validation with errors and warnings
//! - The compiled, read-only [`DomainWeightStore`]
//! - A file loader with atomic hot-reload via `notify` watcher
//! - AOI-identifier domain detection

pub mod detect;
pub mod domain_weights;
pub mod loader;
pub mod scaling_config;
pub mod schema;
pub mod store;
pub mod validation;

pub use detect::detect_domain;
pub use domain_weights::{AlertHint, AlertLevel};
pub use loader::{ConfigError, ConfigPaths, WeightStoreHandle};
pub use schema::{ChangeThresholds, ScalingMethod};
pub use store::{DomainProfile, DomainWeightStore};
