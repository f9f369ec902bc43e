//! Error types shared across keywatch crates

use thiserror::Error;

/// A server answer whose envelope carried `code != 0`.
///
/// These describe a state the operator has to re-observe (stale review,
/// missing item, permission denial) and are never retried automatically.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("server rejected request (code {code}): {message}")]
pub struct ApplicationError {
    /// Application-level error code, never zero
    pub code: i64,
    /// Human readable reason, shown verbatim
    pub message: String,
}

impl ApplicationError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}
