//! In-memory server doubles for the synchronization core

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::StreamExt;
use keywatch_sync::{
    DashboardApi, Page, PushConnector, PushStream, SyncConfig, SyncResult, TransportError,
};
use keywatch_types::{
    ApplicationError, Credential, CredentialFilter, CredentialId, CredentialKind,
    DisclosureReceipt, ReviewAction, ReviewDecision, ReviewItem, ReviewItemId, ReviewStatus,
    Severity, SummaryStats,
};
use tokio::sync::{mpsc, oneshot, Notify};

pub fn credential(id: i64) -> Credential {
    Credential {
        id: CredentialId::new(id),
        key: format!("AIzaSyFixtureKey{id:08}"),
        provider: Some("gemini".into()),
        source: "github".into(),
        repo_name: format!("octo/repo-{id}"),
        file_path: ".env".into(),
        file_url: String::new(),
        sha: String::new(),
        tier: None,
        tier_confidence: None,
        reason: None,
        validated_at: None,
        created_at: None,
    }
}

pub fn config() -> SyncConfig {
    SyncConfig {
        reconnect_delay_ms: 5_000,
        fallback_poll_interval_ms: 3_000,
        ..SyncConfig::default()
    }
}

/// Request counters
#[derive(Debug, Default)]
pub struct Calls {
    pub stats: AtomicUsize,
    pub list_credentials: AtomicUsize,
    pub delete: AtomicUsize,
    pub list_review: AtomicUsize,
    pub fetch_item: AtomicUsize,
    pub review: AtomicUsize,
    pub disclosure: AtomicUsize,
    pub scan: AtomicUsize,
}

impl Calls {
    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
struct Data {
    valid: Vec<Credential>,
    limited: Vec<Credential>,
    issues: Vec<ReviewItem>,
    stats: SummaryStats,
    next_issue_url: u32,
}

/// A dashboard server kept in memory.
///
/// While holding, every request parks until released, so tests decide the
/// order in which answers arrive.
#[derive(Default)]
pub struct FakeApi {
    data: Mutex<Data>,
    holding: Mutex<bool>,
    held: Mutex<Vec<Option<oneshot::Sender<()>>>>,
    parked: Notify,
    pub calls: Calls,
}

impl FakeApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn seed_valid_keys(&self, count: i64) {
        self.data.lock().unwrap().valid = (1..=count).map(credential).collect();
    }

    pub fn seed_issue(&self, item: ReviewItem) {
        self.data.lock().unwrap().issues.push(item);
    }

    pub fn set_stats(&self, stats: SummaryStats) {
        self.data.lock().unwrap().stats = stats;
    }

    pub fn issue(&self, id: i64) -> Option<ReviewItem> {
        self.data
            .lock()
            .unwrap()
            .issues
            .iter()
            .find(|i| i.id.get() == id)
            .cloned()
    }

    pub fn hold(&self) {
        *self.holding.lock().unwrap() = true;
    }

    /// Wait until `count` requests are parked in total
    pub async fn parked(&self, count: usize) {
        loop {
            let notified = self.parked.notified();
            if self.held.lock().unwrap().len() >= count {
                return;
            }
            notified.await;
        }
    }

    /// Let the `index`-th parked request (0-based, in arrival order) answer
    pub fn release(&self, index: usize) {
        if let Some(tx) = self.held.lock().unwrap()[index].take() {
            let _ = tx.send(());
        }
    }

    async fn gate(&self) {
        if !*self.holding.lock().unwrap() {
            return;
        }
        let (tx, rx) = oneshot::channel();
        self.held.lock().unwrap().push(Some(tx));
        self.parked.notify_waiters();
        let _ = rx.await;
    }

    fn failure(code: i64, message: &str) -> keywatch_sync::SyncError {
        ApplicationError::new(code, message).into()
    }
}

fn page<T: Clone>(items: &[T], limit: u32, offset: u64) -> Page<T> {
    Page {
        items: items
            .iter()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect(),
        total: items.len() as u64,
    }
}

#[async_trait]
impl DashboardApi for FakeApi {
    async fn fetch_stats(&self) -> SyncResult<SummaryStats> {
        self.calls.stats.fetch_add(1, Ordering::SeqCst);
        self.gate().await;
        Ok(self.data.lock().unwrap().stats.clone())
    }

    async fn list_credentials(
        &self,
        kind: CredentialKind,
        filter: &CredentialFilter,
        limit: u32,
        offset: u64,
    ) -> SyncResult<Page<Credential>> {
        self.calls.list_credentials.fetch_add(1, Ordering::SeqCst);
        self.gate().await;
        let data = self.data.lock().unwrap();
        let rows = match kind {
            CredentialKind::Valid => &data.valid,
            CredentialKind::RateLimited => &data.limited,
        };
        let rows: Vec<_> = rows
            .iter()
            .filter(|c| filter.repo.as_ref().map_or(true, |r| c.repo_name.contains(r.as_str())))
            .filter(|c| filter.source.as_ref().map_or(true, |s| &c.source == s))
            .cloned()
            .collect();
        Ok(page(&rows, limit, offset))
    }

    async fn delete_credential(&self, kind: CredentialKind, id: CredentialId) -> SyncResult<()> {
        self.calls.delete.fetch_add(1, Ordering::SeqCst);
        self.gate().await;
        let mut data = self.data.lock().unwrap();
        let rows = match kind {
            CredentialKind::Valid => &mut data.valid,
            CredentialKind::RateLimited => &mut data.limited,
        };
        let before = rows.len();
        rows.retain(|c| c.id != id);
        if rows.len() == before {
            return Err(Self::failure(1, "key not found"));
        }
        Ok(())
    }

    async fn list_review_items(
        &self,
        status: Option<ReviewStatus>,
        severity: Option<Severity>,
        limit: u32,
        offset: u64,
    ) -> SyncResult<Page<ReviewItem>> {
        self.calls.list_review.fetch_add(1, Ordering::SeqCst);
        self.gate().await;
        let data = self.data.lock().unwrap();
        let rows: Vec<_> = data
            .issues
            .iter()
            .filter(|i| status.map_or(true, |s| i.status == s))
            .filter(|i| severity.map_or(true, |s| i.severity == s))
            .cloned()
            .collect();
        Ok(page(&rows, limit, offset))
    }

    async fn fetch_review_item(&self, id: ReviewItemId) -> SyncResult<ReviewItem> {
        self.calls.fetch_item.fetch_add(1, Ordering::SeqCst);
        self.gate().await;
        self.issue(id.get())
            .ok_or_else(|| Self::failure(1, "issue not found"))
    }

    async fn submit_review(&self, id: ReviewItemId, decision: &ReviewDecision) -> SyncResult<()> {
        self.calls.review.fetch_add(1, Ordering::SeqCst);
        self.gate().await;
        let mut data = self.data.lock().unwrap();
        let item = data
            .issues
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| Self::failure(1, "issue not found"))?;
        if item.status != ReviewStatus::Pending {
            return Err(Self::failure(1, "issue already reviewed"));
        }
        item.status = match decision.action {
            ReviewAction::Approve => ReviewStatus::Approved,
            ReviewAction::Reject => ReviewStatus::Rejected,
        };
        item.reviewer = Some(decision.reviewed_by.clone());
        item.note = Some(decision.review_note.clone()).filter(|n| !n.is_empty());
        Ok(())
    }

    async fn request_disclosure(&self, id: ReviewItemId) -> SyncResult<DisclosureReceipt> {
        self.calls.disclosure.fetch_add(1, Ordering::SeqCst);
        self.gate().await;
        let mut data = self.data.lock().unwrap();
        data.next_issue_url += 1;
        let url = format!("https://tracker.example/issues/{}", data.next_issue_url);
        let item = data
            .issues
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| Self::failure(1, "issue not found"))?;
        if item.status != ReviewStatus::Approved {
            return Err(Self::failure(1, "issue must be approved before creating"));
        }
        if item.disclosure_ref.is_some() {
            return Err(Self::failure(1, "issue already created"));
        }
        item.status = ReviewStatus::Created;
        item.disclosure_ref = Some(url.clone());
        Ok(DisclosureReceipt {
            issue_url: Some(url),
        })
    }

    async fn start_scan(&self) -> SyncResult<()> {
        self.calls.scan.fetch_add(1, Ordering::SeqCst);
        self.gate().await;
        self.data.lock().unwrap().stats.scan.is_active = true;
        Ok(())
    }

    async fn stop_scan(&self) -> SyncResult<()> {
        self.calls.scan.fetch_add(1, Ordering::SeqCst);
        self.gate().await;
        self.data.lock().unwrap().stats.scan.is_active = false;
        Ok(())
    }
}

/// Push connector driven by the test.
///
/// Each `connect()` consumes the next scripted outcome; with nothing
/// scripted it fails.
#[derive(Default)]
pub struct ScriptedConnector {
    script: Mutex<VecDeque<Result<mpsc::UnboundedReceiver<String>, TransportError>>>,
    pub attempts: AtomicUsize,
}

impl ScriptedConnector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Script a successful handshake. Frames sent on the returned sender are
    /// delivered; dropping it closes the connection.
    pub fn accept(&self) -> mpsc::UnboundedSender<String> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.script.lock().unwrap().push_back(Ok(rx));
        tx
    }

    pub fn refuse(&self) {
        self.script
            .lock()
            .unwrap()
            .push_back(Err(TransportError::Connect("refused".into())));
    }
}

#[async_trait]
impl PushConnector for ScriptedConnector {
    async fn connect(&self) -> Result<PushStream, TransportError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(Ok(rx)) => Ok(futures::stream::unfold(rx, |mut rx| async move {
                rx.recv().await.map(|frame| (Ok(frame), rx))
            })
            .boxed()),
            Some(Err(err)) => Err(err),
            None => Err(TransportError::Connect("no server".into())),
        }
    }
}
