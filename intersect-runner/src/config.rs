//! Runner configuration
//!
//! Defines the pipeline's process-wide settings: which container engine to
//! drive, the test environment's base image, where service sources live and
//! how images are published.

use intersect_core::constants::{
    DEFAULT_BASE_IMAGE, DEFAULT_EXCLUDES, DEFAULT_REGISTRY, DEFAULT_SOURCE_ROOT,
};
use intersect_core::domain::PublishMode;
use std::path::PathBuf;

use crate::error::{PipelineError, Result};

/// Runner configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Container engine binary (podman or a docker-compatible CLI)
    pub engine: String,

    /// Base image of the test environment
    pub base_image: String,

    /// Directory holding one subdirectory per service
    pub source_root: PathBuf,

    /// Registry used when a publish request names none
    pub registry: String,

    /// Stamp version, commit SHA and creation time into published images
    pub embed_provenance: bool,

    /// Publish one tag per call or every tag given
    pub publish_mode: PublishMode,

    /// Entries never mounted into the test environment
    pub excludes: Vec<String>,
}

impl Config {
    /// Creates a new configuration with defaults
    pub fn new(engine: String) -> Self {
        Self {
            engine,
            base_image: DEFAULT_BASE_IMAGE.to_string(),
            source_root: PathBuf::from(DEFAULT_SOURCE_ROOT),
            registry: DEFAULT_REGISTRY.to_string(),
            embed_provenance: true,
            publish_mode: PublishMode::Multi,
            excludes: DEFAULT_EXCLUDES.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Expected environment variables (all optional):
    /// - INTERSECT_ENGINE (default: podman)
    /// - INTERSECT_BASE_IMAGE (default: python:3.10-slim)
    /// - INTERSECT_SOURCE_ROOT (default: services)
    /// - INTERSECT_REGISTRY (default: ttl.sh)
    /// - INTERSECT_EMBED_PROVENANCE (true/false, default: true)
    /// - INTERSECT_PUBLISH_MODE (single/multi, default: multi)
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Config::from_env`] with a custom variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(engine) = lookup("INTERSECT_ENGINE") {
            config.engine = engine;
        }

        if let Some(base_image) = lookup("INTERSECT_BASE_IMAGE") {
            config.base_image = base_image;
        }

        if let Some(source_root) = lookup("INTERSECT_SOURCE_ROOT") {
            config.source_root = PathBuf::from(source_root);
        }

        if let Some(registry) = lookup("INTERSECT_REGISTRY") {
            config.registry = registry;
        }

        if let Some(value) = lookup("INTERSECT_EMBED_PROVENANCE") {
            config.embed_provenance = parse_bool(&value).ok_or_else(|| {
                PipelineError::Config(format!(
                    "INTERSECT_EMBED_PROVENANCE must be true or false, got '{}'",
                    value
                ))
            })?;
        }

        if let Some(value) = lookup("INTERSECT_PUBLISH_MODE") {
            config.publish_mode = value
                .parse()
                .map_err(|e| PipelineError::Config(format!("INTERSECT_PUBLISH_MODE: {}", e)))?;
        }

        Ok(config)
    }

    pub fn with_publish_mode(mut self, mode: PublishMode) -> Self {
        self.publish_mode = mode;
        self
    }

    pub fn with_embed_provenance(mut self, embed: bool) -> Self {
        self.embed_provenance = embed;
        self
    }

    pub fn with_registry(mut self, registry: impl Into<String>) -> Self {
        self.registry = registry.into();
        self
    }

    pub fn with_source_root(mut self, source_root: impl Into<PathBuf>) -> Self {
        self.source_root = source_root.into();
        self
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<()> {
        if self.engine.trim().is_empty() {
            return Err(PipelineError::Config("engine cannot be empty".to_string()));
        }

        if self.base_image.trim().is_empty() {
            return Err(PipelineError::Config(
                "base_image cannot be empty".to_string(),
            ));
        }

        if self.registry.trim().is_empty() {
            return Err(PipelineError::Config("registry cannot be empty".to_string()));
        }

        if self.source_root.as_os_str().is_empty() {
            return Err(PipelineError::Config(
                "source_root cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new("podman".to_string())
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
