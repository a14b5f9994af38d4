//! Error types for pipeline operations

use intersect_core::CoreError;
use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors that can occur while running the pipeline
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Invalid domain input (unknown service, malformed tag, ...)
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The execution environment could not be prepared
    #[error("Environment setup failed at '{step}' (exit code {exit_code}): {diagnostics}")]
    EnvironmentSetup {
        /// Command that failed
        step: String,
        exit_code: i32,
        /// Captured output of the failed command
        diagnostics: String,
    },

    /// The test command exited non-zero
    #[error("Tests failed (exit code {exit_code}):\n{diagnostics}")]
    TestFailed { exit_code: i32, diagnostics: String },

    /// Image build failed
    #[error("Build of '{context}' failed: {diagnostics}")]
    Build { context: String, diagnostics: String },

    /// Registry login or push failed
    #[error("Publish to '{reference}' failed: {diagnostics}")]
    Publish {
        reference: String,
        diagnostics: String,
    },

    /// Request is well-formed but inconsistent with the configuration
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Configuration value missing or malformed
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// The engine binary could not be spawned
    #[error("Failed to run '{command}': {source}")]
    Engine {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The engine is installed but not working
    #[error("Container engine unavailable: {0}")]
    EngineUnavailable(String),
}

impl PipelineError {
    /// Create an engine error for a command that could not be spawned
    pub fn engine(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::Engine {
            command: command.into(),
            source,
        }
    }

    /// Check if this error rejected a service name
    pub fn is_unknown_service(&self) -> bool {
        matches!(self, Self::Core(CoreError::UnknownService { .. }))
    }

    /// Check if this error came from the test command itself
    pub fn is_test_failure(&self) -> bool {
        matches!(self, Self::TestFailed { .. })
    }
}
