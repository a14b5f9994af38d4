//! Error types for domain values

use thiserror::Error;

/// Result type alias for domain operations
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors raised while parsing or validating domain values
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    /// Service name is not one of the known publish targets
    #[error("Unknown service '{name}' (expected one of: {expected})")]
    UnknownService {
        /// The name that failed to resolve
        name: String,
        /// Comma-separated list of known names
        expected: String,
    },

    /// Publish mode string is neither `single` nor `multi`
    #[error("Invalid publish mode '{0}' (expected 'single' or 'multi')")]
    InvalidPublishMode(String),

    /// A tag is empty or contains characters a registry rejects
    #[error("Invalid image tag '{0}'")]
    InvalidTag(String),
}
