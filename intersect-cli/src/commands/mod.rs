//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod build;
mod dashboard;
mod publish;

pub use build::BuildArgs;
pub use publish::PublishArgs;

use anyhow::{Context, Result};
use clap::Subcommand;
use intersect_runner::{Config, ContainerEngine, Pipeline, PodmanEngine};
use std::path::PathBuf;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Prepare the dashboard test environment (install uv, sync dependencies)
    TestEnv {
        /// Source tree to mount (default: the dashboard under the source root)
        #[arg(short, long)]
        source: Option<PathBuf>,
    },
    /// Run the dashboard test suite and print its output
    Test {
        /// Source tree to test (default: the dashboard under the source root)
        #[arg(short, long)]
        source: Option<PathBuf>,
    },
    /// Build a container image from a build descriptor
    Build(BuildArgs),
    /// Build a service image and push it to a registry
    Publish(PublishArgs),
}

/// Handle a CLI command
///
/// Checks that the container engine works, then routes the command to
/// its handler module.
///
/// # Arguments
/// * `command` - The command to execute
/// * `config` - The runner configuration
pub async fn handle_command(command: Commands, config: Config) -> Result<()> {
    let engine = PodmanEngine::new(config.engine.clone());
    engine
        .version()
        .await
        .with_context(|| format!("Container engine '{}' is not available", config.engine))?;

    match command {
        Commands::TestEnv { source } => {
            dashboard::handle_test_env(&Pipeline::new(engine, config), source).await
        }
        Commands::Test { source } => {
            dashboard::handle_test(&Pipeline::new(engine, config), source).await
        }
        Commands::Build(args) => build::handle_build(&Pipeline::new(engine, config), args).await,
        Commands::Publish(args) => {
            let config = args.configure(config);
            publish::handle_publish(&Pipeline::new(engine, config), args).await
        }
    }
}
