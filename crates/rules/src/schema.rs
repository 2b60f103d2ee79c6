//! Shared YAML document types: the `apiVersion / kind / metadata` envelope
//! and the small value types reused by several configuration kinds.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The only supported `apiVersion`.
pub const API_VERSION: &str = "v1";

/// Metadata block common to every configuration document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CommonMetadata {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

/// Lightweight first-pass header used to route a file to its kind.
#[derive(Debug, Clone, Deserialize)]
pub struct DocumentEnvelope {
    #[serde(rename = "apiVersion")]
    pub api_version: String,
    pub kind: String,
}

/// Ascending change thresholds demarcating the five severity bands.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ChangeThresholds {
    /// Scores below this are Normal.
    pub minor_change: f64,
    /// Scores between minor and this are Low.
    pub moderate_change: f64,
    /// Scores between moderate and this are Medium.
    pub major_change: f64,
    /// Scores between major and this are High; at or above is Critical.
    pub critical_change: f64,
}

impl ChangeThresholds {
    pub fn as_array(&self) -> [f64; 4] {
        [
            self.minor_change,
            self.moderate_change,
            self.major_change,
            self.critical_change,
        ]
    }
}

/// Curve used to squash a weighted magnitude into [0, 1].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalingMethod {
    Sigmoid,
    MinMax,
    #[default]
    Tanh,
    Arctan,
    Log,
    None,
}

impl ScalingMethod {
    pub const ALL: [ScalingMethod; 6] = [
        ScalingMethod::Sigmoid,
        ScalingMethod::MinMax,
        ScalingMethod::Tanh,
        ScalingMethod::Arctan,
        ScalingMethod::Log,
        ScalingMethod::None,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ScalingMethod::Sigmoid => "sigmoid",
            ScalingMethod::MinMax => "min_max",
            ScalingMethod::Tanh => "tanh",
            ScalingMethod::Arctan => "arctan",
            ScalingMethod::Log => "log",
            ScalingMethod::None => "none",
        }
    }
}

impl fmt::Display for ScalingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScalingMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "log_scale" => Ok(ScalingMethod::Log),
            other => ScalingMethod::ALL
                .into_iter()
                .find(|m| m.as_str() == other)
                .ok_or_else(|| format!("unknown scaling method '{}'", other)),
        }
    }
}
