//! Configuration module
//!
//! Loads the runner configuration from the environment and applies
//! command-line overrides.

use anyhow::{Context, Result};
use intersect_runner::Config;
use std::path::PathBuf;
use tracing::info;

/// Loads configuration from `INTERSECT_*` variables, then applies flags
pub fn load_config(engine: Option<String>, source_root: Option<PathBuf>) -> Result<Config> {
    let mut config = Config::from_env().context("Failed to load configuration")?;

    if let Some(engine) = engine {
        config.engine = engine;
    }

    if let Some(source_root) = source_root {
        config.source_root = source_root;
    }

    config.validate()?;
    info!(
        "Loaded configuration: engine={}, source_root={}",
        config.engine,
        config.source_root.display()
    );

    Ok(config)
}
