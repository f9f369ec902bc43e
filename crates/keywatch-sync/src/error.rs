//! Error taxonomy of the synchronization core
//!
//! Nothing here is fatal. Every failure ends as "view stays on prior data,
//! operator notified, retry available".

use keywatch_types::{ApplicationError, ListKind, ReviewItemId, ReviewStatus};
use thiserror::Error;

use crate::dashboard::ScanCommand;

/// Channel or fetch drop
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Could not reach the server
    #[error("connection failed: {0}")]
    Connect(String),

    /// The request was sent but no usable answer came back
    #[error("request failed: {0}")]
    Request(String),

    /// Non-envelope HTTP failure
    #[error("unexpected HTTP status {status}")]
    Status { status: u16 },

    /// The answer could not be decoded
    #[error("malformed response: {0}")]
    Decode(String),

    /// The push connection dropped
    #[error("channel closed: {0}")]
    Closed(String),
}

/// Rejected locally, before any request is sent
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("a reviewer identity is required")]
    MissingReviewer,

    #[error("rejecting a finding requires a rationale")]
    MissingRationale,

    #[error("finding {id} is {status}; no review decision is offered")]
    TransitionNotOffered {
        id: ReviewItemId,
        status: ReviewStatus,
    },

    #[error("a review decision for finding {id} is still awaiting the server")]
    ReviewInFlight { id: ReviewItemId },

    #[error("finding {id} is not approved (status: {status})")]
    DisclosureNotApproved {
        id: ReviewItemId,
        status: ReviewStatus,
    },

    #[error("finding {id} is not loaded; refresh the review queue first")]
    UnknownItem { id: ReviewItemId },

    #[error("a disclosure for finding {id} was already requested")]
    DisclosureAlreadyRequested { id: ReviewItemId },

    #[error("a disclosure request for finding {id} is still in flight")]
    DisclosureInFlight { id: ReviewItemId },

    #[error("disclosure confirmation for finding {id} is stale or was never issued")]
    ConfirmationMismatch { id: ReviewItemId },

    #[error("view {kind} has no filter named '{name}'")]
    UnknownFilter { kind: ListKind, name: String },

    #[error("invalid value '{value}' for filter '{name}'")]
    InvalidFilterValue { name: String, value: String },

    #[error("items of view {kind} cannot be deleted")]
    DeleteUnsupported { kind: ListKind },

    #[error("scan {command} is not available in the current scan state")]
    ScanControlUnavailable { command: ScanCommand },
}

/// Any failure the core reports
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Application(#[from] ApplicationError),
}

impl SyncError {
    /// Text shown in an inline notice. Application errors are passed through
    /// verbatim.
    pub fn user_message(&self) -> String {
        match self {
            SyncError::Application(err) => err.message.clone(),
            other => other.to_string(),
        }
    }
}

/// Result type for core operations
pub type SyncResult<T> = Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_application_message_is_verbatim() {
        let err = SyncError::from(ApplicationError::new(1003, "already reviewed"));
        assert_eq!(err.user_message(), "already reviewed");
    }

    #[test]
    fn test_validation_message() {
        let err = SyncError::from(ValidationError::MissingRationale);
        assert_eq!(
            err.user_message(),
            "rejecting a finding requires a rationale"
        );
    }
}
