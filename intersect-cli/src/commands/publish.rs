//! Publish command handler

use anyhow::{Context, Result};
use clap::Args;
use colored::*;
use intersect_core::domain::{PublishMode, Secret, SourceTree, TagSet, is_default_registry};
use intersect_runner::{Config, ContainerEngine, Pipeline, PublishRequest};
use tracing::warn;

/// Arguments of `intersect-ci publish`
#[derive(Args)]
pub struct PublishArgs {
    /// Service to publish (intersect-dashboard, intersect-service, intersect-storage)
    name: String,

    /// Tags or versions to publish, repeatable or comma-separated (default: latest)
    #[arg(short, long = "tag", value_delimiter = ',')]
    tags: Vec<String>,

    /// Commit SHA stamped into the image
    #[arg(long)]
    sha: Option<String>,

    /// Target registry (default: INTERSECT_REGISTRY or ttl.sh)
    #[arg(short, long)]
    registry: Option<String>,

    /// Registry username
    #[arg(short, long, env = "INTERSECT_REGISTRY_USERNAME", default_value = "")]
    username: String,

    /// Environment variable holding the registry password
    #[arg(long, default_value = "INTERSECT_REGISTRY_PASSWORD")]
    password_env: String,

    /// Publish a single tag or every tag given
    #[arg(long)]
    mode: Option<PublishMode>,

    /// Stamp version, commit SHA and creation time into the image
    #[arg(long)]
    embed_provenance: Option<bool>,

    /// Print published references as JSON
    #[arg(long)]
    json: bool,
}

impl PublishArgs {
    /// Applies the publish-specific overrides to the configuration
    pub fn configure(&self, mut config: Config) -> Config {
        if let Some(mode) = self.mode {
            config.publish_mode = mode;
        }
        if let Some(embed) = self.embed_provenance {
            config.embed_provenance = embed;
        }
        config
    }
}

/// Publish a service image and print the published references
pub async fn handle_publish<E: ContainerEngine>(
    pipeline: &Pipeline<E>,
    args: PublishArgs,
) -> Result<()> {
    let password = std::env::var(&args.password_env)
        .map(Secret::from)
        .unwrap_or_default();

    let registry = args
        .registry
        .as_deref()
        .unwrap_or(pipeline.config().registry.as_str());
    if !is_default_registry(registry) && password.is_empty() {
        warn!(
            "{} is not set; logging in to {} with an empty password",
            args.password_env, registry
        );
    }

    let mut request = PublishRequest::for_name(&args.name)?
        .with_tags(TagSet::new(args.tags))
        .with_credentials(args.username, password)
        .with_source_root(SourceTree::new(&pipeline.config().source_root));
    if let Some(registry) = args.registry {
        request = request.with_registry(registry);
    }
    if let Some(sha) = args.sha {
        request = request.with_commit_sha(sha);
    }

    let outcome = pipeline
        .publish_image(&request)
        .await
        .with_context(|| format!("Failed to publish {}", request.service))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    let references = outcome.references();
    println!(
        "{}",
        format!("✓ Published {} image(s)", references.len())
            .green()
            .bold()
    );
    for reference in references {
        println!("  {} {}", "▸".cyan(), reference.bold());
    }

    Ok(())
}
