//! Transport seams
//!
//! The core never talks to the network directly. Pull/command endpoints sit
//! behind [`DashboardApi`], the push connection behind [`PushConnector`].

use async_trait::async_trait;
use futures::stream::BoxStream;
use keywatch_types::{
    Credential, CredentialFilter, CredentialId, CredentialKind, DisclosureReceipt, ReviewDecision,
    ReviewItem, ReviewItemId, ReviewStatus, Severity, SummaryStats,
};

use crate::error::{SyncResult, TransportError};

/// A page of items plus the server-side total
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
}

/// Pull and command endpoints of the dashboard server
#[async_trait]
pub trait DashboardApi: Send + Sync {
    /// Storage counters and scan progress
    async fn fetch_stats(&self) -> SyncResult<SummaryStats>;

    async fn list_credentials(
        &self,
        kind: CredentialKind,
        filter: &CredentialFilter,
        limit: u32,
        offset: u64,
    ) -> SyncResult<Page<Credential>>;

    async fn delete_credential(&self, kind: CredentialKind, id: CredentialId) -> SyncResult<()>;

    async fn list_review_items(
        &self,
        status: Option<ReviewStatus>,
        severity: Option<Severity>,
        limit: u32,
        offset: u64,
    ) -> SyncResult<Page<ReviewItem>>;

    async fn fetch_review_item(&self, id: ReviewItemId) -> SyncResult<ReviewItem>;

    async fn submit_review(&self, id: ReviewItemId, decision: &ReviewDecision) -> SyncResult<()>;

    /// Ask the server to create the public disclosure of an approved finding
    async fn request_disclosure(&self, id: ReviewItemId) -> SyncResult<DisclosureReceipt>;

    async fn start_scan(&self) -> SyncResult<()>;

    async fn stop_scan(&self) -> SyncResult<()>;
}

/// Raw text frames of an open push connection
pub type PushStream = BoxStream<'static, Result<String, TransportError>>;

/// Opens push connections
#[async_trait]
pub trait PushConnector: Send + Sync {
    /// Perform the handshake. The returned stream ends when the server closes
    /// the connection.
    async fn connect(&self) -> Result<PushStream, TransportError>;
}
