//! Domain error types
//!
//! Validation failures for domain newtypes and entity construction.

use thiserror::Error;

/// Errors that can occur while constructing or validating domain values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// An identifier was empty or otherwise malformed.
    #[error("invalid id: {0}")]
    InvalidId(String),

    /// A URI did not match the stable-identifier shape a source requires.
    #[error("invalid uri: {0}")]
    InvalidUri(String),

    /// A scheduled task's interval was not positive.
    #[error("invalid interval: {0}")]
    InvalidInterval(String),

    /// A chunk position was invalid for its document.
    #[error("invalid chunk position: {0}")]
    InvalidPosition(String),

    /// Generic validation failure with a human-readable reason.
    #[error("validation failed: {0}")]
    ValidationFailed(String),
}
