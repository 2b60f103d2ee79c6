use std::path::PathBuf;

use clap::{Parser, Subcommand};

use geowatch_core::{AnomalyLevel, CoarseConfidence};
use geowatch_rules::ScalingMethod;

/// Domain-weighted anomaly and confidence scoring for AOI change magnitudes.
///
/// Every subcommand prints pretty JSON to stdout; logs go to stderr.
#[derive(Parser, Debug)]
#[command(name = "geowatch", version, about = "Domain-weighted anomaly scoring for AOI monitoring")]
pub struct CliArgs {
    /// DomainWeights document (default: WEIGHTS_FILE or data/config/domain-weights.yml)
    #[arg(long, global = true, env = "WEIGHTS_FILE")]
    pub weights: Option<PathBuf>,

    /// ScalingConfig document (default: SCALING_FILE or data/config/scaling-config.yml)
    #[arg(long, global = true, env = "SCALING_FILE")]
    pub scaling: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Validate both configuration documents without compiling them.
    Validate,

    /// List configured domains with multipliers, thresholds and scaling policy.
    Domains,

    /// Guess the domain of an AOI identifier.
    Detect {
        #[arg(long)]
        aoi: String,
    },

    /// Scale a value with one method, or compare every method.
    Scale {
        #[arg(long)]
        value: f64,
        #[arg(long, default_value = "default")]
        domain: String,
        /// sigmoid, min_max, tanh, arctan, log or none
        #[arg(long)]
        method: Option<ScalingMethod>,
    },

    /// Score one raw magnitude.
    Score {
        #[arg(long)]
        magnitude: f64,
        #[arg(long, conflicts_with = "aoi")]
        domain: Option<String>,
        /// Detect the domain from this AOI identifier.
        #[arg(long)]
        aoi: Option<String>,
        /// high, medium or low
        #[arg(long)]
        confidence: Option<CoarseConfidence>,
        /// Pass the weighted magnitude through the domain's scaling policy.
        #[arg(long)]
        scaled: bool,
        /// Comma-separated history, used for adaptive min-max scaling.
        #[arg(long, value_delimiter = ',')]
        history: Vec<f64>,
        #[arg(long, requires = "scaled")]
        adaptive: bool,
    },

    /// Score a magnitude against its own history.
    Contextual {
        #[arg(long)]
        magnitude: f64,
        #[arg(long, value_delimiter = ',', required = true)]
        history: Vec<f64>,
        #[arg(long)]
        domain: Option<String>,
    },

    /// Confidence of a magnitude history.
    Confidence {
        #[arg(long, value_delimiter = ',', required = true)]
        history: Vec<f64>,
        #[arg(long)]
        current: Option<f64>,
        #[arg(long)]
        domain: Option<String>,
    },

    /// Combined anomaly score, confidence and priority.
    Assess {
        #[arg(long)]
        magnitude: f64,
        #[arg(long, value_delimiter = ',', required = true)]
        history: Vec<f64>,
        #[arg(long)]
        domain: Option<String>,
        /// Use the basic multiplier path instead of the scaling policy.
        #[arg(long)]
        no_scaling: bool,
        #[arg(long)]
        adaptive: bool,
    },

    /// Analyze a current/baseline embedding pair from a JSON file.
    Analyze {
        #[arg(long)]
        input: PathBuf,
        /// Overrides the domain given in the file.
        #[arg(long)]
        domain: Option<String>,
        /// Analyze under every domain and recommend one.
        #[arg(long)]
        compare: bool,
    },

    /// Process a JSON array of observations and rank them by priority.
    Batch {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        no_scaling: bool,
        /// Lowest level reported in `anomalies`.
        #[arg(long, default_value = "medium")]
        threshold: AnomalyLevel,
        /// Confidence score required for `reliable_anomalies`.
        #[arg(long, default_value_t = 0.6)]
        min_confidence: f64,
    },

    /// Score a JSON array of `{aoi_id, raw_magnitude, domain}` items, highest first.
    Rank {
        #[arg(long)]
        input: PathBuf,
    },

    /// Keep running and reload the configuration whenever it changes on disk.
    Watch {
        /// Seconds between summaries of the active store.
        #[arg(long, default_value_t = 30)]
        interval_secs: u64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_command_definition() {
        CliArgs::command().debug_assert();
    }

    #[test]
    fn test_history_is_comma_separated() {
        let args = CliArgs::try_parse_from([
            "geowatch",
            "confidence",
            "--history",
            "0.1,0.11,0.09",
            "--current",
            "0.1",
        ])
        .unwrap();
        match args.command {
            Command::Confidence { history, current, domain } => {
                assert_eq!(history, vec![0.1, 0.11, 0.09]);
                assert_eq!(current, Some(0.1));
                assert!(domain.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_typed_values_parse() {
        let args = CliArgs::try_parse_from([
            "geowatch",
            "score",
            "--magnitude",
            "0.08",
            "--domain",
            "port",
            "--confidence",
            "medium",
        ])
        .unwrap();
        assert!(matches!(
            args.command,
            Command::Score {
                confidence: Some(CoarseConfidence::Medium),
                scaled: false,
                ..
            }
        ));

        let args = CliArgs::try_parse_from(["geowatch", "scale", "--value", "0.1", "--method", "min_max"])
            .unwrap();
        assert!(matches!(
            args.command,
            Command::Scale { method: Some(ScalingMethod::MinMax), .. }
        ));
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(CliArgs::try_parse_from(["geowatch", "score", "--magnitude", "0.1", "--confidence", "sure"]).is_err());
        assert!(CliArgs::try_parse_from(["geowatch", "scale", "--value", "0.1", "--method", "cubic"]).is_err());
        // --domain and --aoi are exclusive.
        assert!(CliArgs::try_parse_from([
            "geowatch", "score", "--magnitude", "0.1", "--domain", "port", "--aoi", "farm-1"
        ])
        .is_err());
    }

    #[test]
    fn test_global_paths_after_subcommand() {
        let args = CliArgs::try_parse_from(["geowatch", "domains", "--weights", "w.yml"]).unwrap();
        assert_eq!(args.weights, Some(PathBuf::from("w.yml")));
    }
}
