use thiserror::Error;

#[derive(Error, Debug)]
pub enum GeoWatchError {
    #[error("Serialization error: {0}")]
    Serialize(String),

    #[error("Magnitude must be between 0 and 1, got {0}")]
    InvalidMagnitude(f64),

    #[error("Invalid embedding: {0}")]
    InvalidEmbedding(String),

    #[error("AOI ID is required")]
    EmptyIdentifier,

    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for GeoWatchError {
    fn from(e: serde_json::Error) -> Self {
        GeoWatchError::Serialize(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, GeoWatchError>;
