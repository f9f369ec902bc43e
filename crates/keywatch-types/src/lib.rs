//! keywatch core types
//!
//! The data model shared by the synchronization core, the transports and the
//! operator CLI:
//!
//! - [`ApiEnvelope`]: the `{code, message, data}` convention every pull and
//!   command endpoint answers with
//! - [`SummaryStats`]: storage counters and scan progress
//! - [`Credential`] and [`ReviewItem`]: the two kinds of listed items
//! - [`ListQuery`] / [`ListResult`]: reproducible, idempotent page fetches
//! - [`PushEvent`] / [`ChannelState`]: the live push channel vocabulary

pub mod credential;
pub mod envelope;
pub mod error;
pub mod ids;
pub mod list;
pub mod push;
pub mod review;
pub mod stats;

pub use credential::{Credential, CredentialFilter, CredentialKind};
pub use envelope::{ApiEnvelope, CredentialPage, DisclosureReceipt, ReviewPage};
pub use error::ApplicationError;
pub use ids::{CredentialId, ReviewItemId};
pub use list::{
    total_pages, ListKind, ListQuery, ListResult, FILTER_REPO, FILTER_SEVERITY, FILTER_SOURCE,
    FILTER_STATUS,
};
pub use push::{ChannelState, LogRecord, PushEvent, StatsPatch};
pub use review::{ReviewAction, ReviewDecision, ReviewItem, ReviewStatus, Severity};
pub use stats::{ScanStats, StorageStats, SummaryStats};
