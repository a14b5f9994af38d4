//! Dashboard test command handlers

use anyhow::{Context, Result};
use colored::*;
use intersect_core::domain::SourceTree;
use intersect_runner::{ContainerEngine, Pipeline};
use std::path::PathBuf;

/// Prepare the test environment and report what was set up
pub async fn handle_test_env<E: ContainerEngine>(
    pipeline: &Pipeline<E>,
    source: Option<PathBuf>,
) -> Result<()> {
    let env = pipeline
        .prepare_test_env(source.map(SourceTree::new))
        .await
        .context("Failed to prepare the test environment")?;

    println!("{}", "✓ Test environment ready".green().bold());
    println!("  Image:   {}", env.base_image().cyan());
    for mount in env.mounts() {
        println!(
            "  Mount:   {} → {}",
            mount.source.path().display(),
            mount.target.bold()
        );
        if !mount.source.exclude().is_empty() {
            println!("  Exclude: {}", mount.source.exclude().join(", ").dimmed());
        }
    }
    for step in env.steps() {
        println!("  {} {}", "▸".cyan(), step);
    }

    Ok(())
}

/// Run the dashboard tests, printing the runner's output as is
pub async fn handle_test<E: ContainerEngine>(
    pipeline: &Pipeline<E>,
    source: Option<PathBuf>,
) -> Result<()> {
    let output = pipeline
        .test_dashboard(source.map(SourceTree::new))
        .await
        .context("Dashboard tests did not pass")?;

    print!("{}", output);
    println!("{}", "✓ Dashboard tests passed".green().bold());

    Ok(())
}
