mod cli;
mod commands;
mod config;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::debug;

use geowatch_core::config::{load_dotenv, Config};

use crate::cli::CliArgs;
use crate::commands::run;
use crate::config::resolve_paths;

fn main() -> Result<()> {
    load_dotenv();

    // Logs go to stderr so stdout stays pure JSON.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = CliArgs::parse();
    let config = Config::from_env();
    config.log_summary();

    let paths = resolve_paths(args.weights.as_deref(), args.scaling.as_deref(), &config);
    debug!(weights = %paths.weights.display(), scaling = %paths.scaling.display(), "resolved configuration paths");

    let report = run(args.command, &paths, &config)?;
    let out = serde_json::to_string_pretty(&report.body).context("failed to serialize output")?;
    println!("{}", out);

    if !report.ok {
        anyhow::bail!("configuration is invalid");
    }
    Ok(())
}
