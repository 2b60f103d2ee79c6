//! Configuration loader with atomic hot-reload via `notify` watcher.
//!
//! Reads the DomainWeights and ScalingConfig documents, compiles them into a
//! [`DomainWeightStore`](crate::store::DomainWeightStore) and publishes it
//! through an `ArcSwap` so readers never observe a half-updated store.

mod core;
mod error;
mod watcher;

#[cfg(test)]
mod tests;

pub use self::core::{
    from_yaml_strs, load, parse_document, read_document, ConfigPaths, WeightStoreHandle,
};
pub use self::error::{ConfigError, Result};
