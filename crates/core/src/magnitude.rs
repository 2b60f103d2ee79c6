use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{GeoWatchError, Result};

/// A raw change magnitude between two embeddings, guaranteed to lie in [0, 1].
///
/// Construction is the validation boundary: out-of-range or NaN values are
/// rejected here instead of being clamped further down the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Magnitude(f64);

impl Magnitude {
    pub const ZERO: Magnitude = Magnitude(0.0);

    pub fn new(value: f64) -> Result<Self> {
        if (0.0..=1.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(GeoWatchError::InvalidMagnitude(value))
        }
    }

    /// Magnitude from cosine similarity: `(1 - cos) / 2`.
    pub fn from_cosine_similarity(cosine: f64) -> Result<Self> {
        Self::new((1.0 - cosine.clamp(-1.0, 1.0)) / 2.0)
    }

    /// Validate a whole history at once.
    pub fn validate_all(values: &[f64]) -> Result<Vec<Magnitude>> {
        values.iter().map(|&v| Self::new(v)).collect()
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for Magnitude {
    type Error = GeoWatchError;

    fn try_from(value: f64) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Magnitude> for f64 {
    fn from(m: Magnitude) -> f64 {
        m.0
    }
}

impl fmt::Display for Magnitude {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}", self.0)
    }
}
