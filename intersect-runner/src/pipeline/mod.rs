//! Pipeline operations
//!
//! [`Pipeline`] ties a [`ContainerEngine`] to a [`Config`] and exposes the
//! operations of the CI pipeline:
//! - Test environment: describe and prepare the dashboard's test environment
//! - Tests: run the dashboard test suite and capture its output
//! - Images: build images from a source tree's build descriptor
//! - Publish: build and push a service image for one or more tags
//!
//! Control flow is strictly top-down (publish → build → engine) and every
//! step runs sequentially.

mod environment;
mod image;
mod publish;

pub use publish::PublishRequest;

use intersect_core::domain::{Service, SourceTree};

use crate::config::Config;
use crate::engine::ContainerEngine;

/// The CI pipeline, bound to a container engine
pub struct Pipeline<E: ContainerEngine> {
    engine: E,
    config: Config,
}

impl<E: ContainerEngine> Pipeline<E> {
    /// Creates a pipeline driving `engine` with `config`
    pub fn new(engine: E, config: Config) -> Self {
        Self { engine, config }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Source tree of a service under the configured source root
    pub fn service_source(&self, service: Service) -> SourceTree {
        SourceTree::new(&self.config.source_root).directory(service.subdirectory())
    }
}
