//! Build command handler

use anyhow::{Context, Result};
use clap::Args;
use colored::*;
use intersect_core::domain::{Provenance, Service, SourceTree};
use intersect_runner::{ContainerEngine, Pipeline};
use std::path::PathBuf;

/// Arguments of `intersect-ci build`
#[derive(Args)]
pub struct BuildArgs {
    /// Service to build (intersect-dashboard, intersect-service, intersect-storage)
    #[arg(long, required_unless_present = "source")]
    service: Option<String>,

    /// Directory containing the build descriptor (overrides the service directory)
    #[arg(short, long)]
    source: Option<PathBuf>,

    /// Version passed as the VERSION build argument
    #[arg(long, requires = "sha")]
    version: Option<String>,

    /// Commit SHA passed as the GIT_SHA build argument
    #[arg(long, requires = "version")]
    sha: Option<String>,
}

/// Build an image and print its local identifier
pub async fn handle_build<E: ContainerEngine>(
    pipeline: &Pipeline<E>,
    args: BuildArgs,
) -> Result<()> {
    let service = args
        .service
        .as_deref()
        .map(str::parse::<Service>)
        .transpose()?;

    let provenance = match (args.version, args.sha) {
        (Some(version), Some(sha)) => Some(Provenance::new(version, sha)),
        _ => None,
    };

    let source = match (args.source, service) {
        (Some(path), _) => SourceTree::new(path),
        (None, Some(service)) => pipeline.service_source(service),
        (None, None) => anyhow::bail!("either --service or --source is required"),
    };
    let context = source.path().display().to_string();

    let image = match (service, &provenance) {
        // Plain service builds go through the per-service wrappers
        (Some(Service::Dashboard), None) => pipeline.build_dashboard_container(Some(source)).await,
        (Some(Service::Service), None) => pipeline.build_service_container(Some(source)).await,
        (Some(Service::Storage), None) => pipeline.build_storage_container(Some(source)).await,
        _ => pipeline.build_from_dockerfile(source, provenance.as_ref()).await,
    }
    .with_context(|| format!("Failed to build {}", context))?;

    println!("{}", "✓ Image built successfully!".green().bold());
    println!("  Image:   {}", image.id().cyan());
    println!("  Context: {}", context.dimmed());
    if let Some(provenance) = &provenance {
        println!("  Version: {}", provenance.version);
        println!("  Commit:  {}", provenance.commit_sha.dimmed());
    }

    Ok(())
}
