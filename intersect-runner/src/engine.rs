//! Container engine abstraction
//!
//! The pipeline never talks to an engine directly. It describes what it
//! wants (an [`ExecEnvironment`], an [`ImageRecipe`], a push target) and an
//! implementation of [`ContainerEngine`] carries it out.

use async_trait::async_trait;
use intersect_core::domain::{ExecEnvironment, Image, ImageRecipe};

use crate::error::Result;

/// Captured result of one exec step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutput {
    /// The command as it was run
    pub command: String,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl StepOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Everything the command printed, for error reports
    pub fn diagnostics(&self) -> String {
        join_output(&self.stdout, &self.stderr)
    }
}

/// Joins stdout and stderr, skipping whichever is blank
pub(crate) fn join_output(stdout: &str, stderr: &str) -> String {
    [stdout.trim(), stderr.trim()]
        .iter()
        .filter(|s| !s.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("\n")
}

/// Operations the pipeline needs from a container engine
#[async_trait]
pub trait ContainerEngine: Send + Sync {
    /// Reports the engine's version, failing if it is not usable
    async fn version(&self) -> Result<String>;

    /// Materializes the environment and runs its steps in order
    ///
    /// Stops after the first step that exits non-zero. Returns one output per
    /// step that ran, so a failed run ends with the failing step. An error is
    /// only returned when the environment itself could not be started.
    async fn run(&self, env: &ExecEnvironment) -> Result<Vec<StepOutput>>;

    /// Builds an image from the recipe's build descriptor
    async fn build(&self, recipe: &ImageRecipe) -> Result<Image>;

    /// Pushes the image to `reference`, logging in first if the image has
    /// registry credentials attached, and discards the local image
    ///
    /// Returns the reference that was pushed.
    async fn publish(&self, image: &Image, reference: &str) -> Result<String>;
}
