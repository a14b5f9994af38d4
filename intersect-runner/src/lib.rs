//! Intersect Runner
//!
//! Executes the NSDF Intersect CI pipeline against a container engine.
//!
//! Architecture:
//! - Configuration: defaults, environment overrides and validation
//! - Engine: the [`ContainerEngine`] trait and its podman-backed implementation
//! - Pipeline: the test, build and publish operations, written against the
//!   engine trait so they can run without a real engine
//!
//! Every operation runs its steps sequentially. Dropping an operation's future
//! cancels it: engine processes are killed and containers removed.

pub mod config;
pub mod engine;
pub mod error;
pub mod pipeline;
pub mod podman;

#[cfg(test)]
mod test_support;

pub use config::Config;
pub use engine::{ContainerEngine, StepOutput};
pub use error::{PipelineError, Result};
pub use pipeline::{Pipeline, PublishRequest};
pub use podman::PodmanEngine;
