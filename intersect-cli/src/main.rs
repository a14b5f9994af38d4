//! Intersect CI
//!
//! Command-line interface for the NSDF Intersect CI pipeline: test the
//! dashboard, build service images and publish them to a registry.

mod commands;
mod config;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use std::path::PathBuf;
use tracing::warn;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "intersect-ci")]
#[command(about = "NSDF Intersect CI pipeline", long_about = None)]
struct Cli {
    /// Container engine binary (podman or a docker-compatible CLI)
    #[arg(long, global = true)]
    engine: Option<String>,

    /// Directory holding one subdirectory per service
    #[arg(long, global = true)]
    source_root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout carries only command output
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "intersect_cli=info,intersect_runner=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = config::load_config(cli.engine, cli.source_root)?;

    // Dropping the command future kills engine processes and removes containers
    tokio::select! {
        result = handle_command(cli.command, config) => result,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, pipeline cancelled");
            anyhow::bail!("interrupted")
        }
    }
}
