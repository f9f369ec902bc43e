//! CLI error types

use keywatch_sync::{SyncError, TransportError, ValidationError};
use thiserror::Error;

/// CLI error types
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Refused before anything was sent
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Transport setup failed
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Sync(#[from] SyncError),

    /// The dashboard reported a failure for a request
    #[error("{0}")]
    Rejected(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;
