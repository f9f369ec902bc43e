//! Dashboard actor
//!
//! One logical actor owns every piece of dashboard state: the three list
//! views, the review workflow, summary stats, the log ring and notices.
//! Network calls run on spawned tasks and report back through a completion
//! queue; state is only ever touched from the actor's own methods, so no
//! locks are needed. Ordering comes from per-view sequence numbers.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use keywatch_types::{
    ChannelState, Credential, CredentialId, CredentialKind, DisclosureReceipt, ListKind,
    ListResult, LogRecord, PushEvent, ReviewAction, ReviewItem, ReviewItemId, ReviewStatus,
    ScanStats, StatsPatch, SummaryStats,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::api::DashboardApi;
use crate::channel::ChannelNotice;
use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult, ValidationError};
use crate::notice::{NoticeBoard, NoticeLevel};
use crate::pagination::PageLink;
use crate::review::{DisclosureConfirmation, PendingBadge, ReviewWorkflow};
use crate::view::{FetchTicket, ViewController, ViewOutcome};

/// Scan control commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScanCommand {
    Start,
    Stop,
}

impl fmt::Display for ScanCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanCommand::Start => f.write_str("start"),
            ScanCommand::Stop => f.write_str("stop"),
        }
    }
}

/// Scan affordances, derived from server-confirmed state only
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScanControls {
    pub can_start: bool,
    pub can_stop: bool,
    /// A start or stop request is awaiting the server
    pub busy: bool,
}

#[derive(Debug)]
enum Completion {
    Credentials {
        kind: CredentialKind,
        seq: u64,
        answer: SyncResult<ListResult<Credential>>,
    },
    ReviewQueue {
        seq: u64,
        answer: SyncResult<ListResult<ReviewItem>>,
    },
    PendingCount {
        seq: u64,
        answer: SyncResult<u64>,
    },
    Stats {
        seq: u64,
        fallback: bool,
        answer: SyncResult<SummaryStats>,
    },
    Deleted {
        kind: CredentialKind,
        id: CredentialId,
        answer: SyncResult<()>,
    },
    Reviewed {
        id: ReviewItemId,
        action: ReviewAction,
        answer: SyncResult<()>,
    },
    Disclosed {
        id: ReviewItemId,
        answer: SyncResult<DisclosureReceipt>,
    },
    ItemLoaded {
        id: ReviewItemId,
        answer: SyncResult<ReviewItem>,
    },
    Scan {
        command: ScanCommand,
        answer: SyncResult<()>,
    },
    /// A superseded request was cancelled before answering
    Aborted,
}

/// Requests where only the latest one matters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum FetchSlot {
    View(ListKind),
    PendingCount,
}

enum Step {
    Channel(ChannelNotice),
    ChannelGone,
    Completed(Completion),
    Stop,
}

/// Dashboard state and the operations that change it
pub struct Dashboard {
    api: Arc<dyn DashboardApi>,
    page_window: u32,

    valid: ViewController<Credential>,
    limited: ViewController<Credential>,
    queue: ViewController<ReviewItem>,
    workflow: ReviewWorkflow,
    pending: PendingBadge,

    stats: Option<SummaryStats>,
    stats_seq: u64,
    stats_loading: bool,
    scan_request: Option<ScanCommand>,

    logs: VecDeque<LogRecord>,
    log_capacity: usize,
    logs_received: u64,
    channel: ChannelState,
    notices: NoticeBoard,

    tx: mpsc::UnboundedSender<Completion>,
    rx: mpsc::UnboundedReceiver<Completion>,
    cancel: CancellationToken,
    slots: HashMap<FetchSlot, CancellationToken>,
    in_flight: usize,
}

impl Dashboard {
    /// Create a dashboard. `cancel` scopes every request task it spawns.
    pub fn new(api: Arc<dyn DashboardApi>, config: &SyncConfig, cancel: CancellationToken) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            api,
            page_window: config.page_window,
            valid: ViewController::new(ListKind::ValidCredentials, config.page_size),
            limited: ViewController::new(ListKind::RateLimitedCredentials, config.page_size),
            queue: ViewController::new(ListKind::ReviewQueue, config.page_size),
            workflow: ReviewWorkflow::new(),
            pending: PendingBadge::default(),
            stats: None,
            stats_seq: 0,
            stats_loading: false,
            scan_request: None,
            logs: VecDeque::new(),
            log_capacity: config.log_capacity.max(1),
            logs_received: 0,
            channel: ChannelState::Closed,
            notices: NoticeBoard::new(config.notice_capacity),
            tx,
            rx,
            cancel,
            slots: HashMap::new(),
            in_flight: 0,
        }
    }

    // ------------------------------------------------------------------
    // Views
    // ------------------------------------------------------------------

    pub fn credentials(&self, kind: CredentialKind) -> &ViewController<Credential> {
        match kind {
            CredentialKind::Valid => &self.valid,
            CredentialKind::RateLimited => &self.limited,
        }
    }

    pub fn review_queue(&self) -> &ViewController<ReviewItem> {
        &self.queue
    }

    pub fn page_links(&self, kind: ListKind) -> Vec<PageLink> {
        match kind {
            ListKind::ValidCredentials => self.valid.page_window(self.page_window),
            ListKind::RateLimitedCredentials => self.limited.page_window(self.page_window),
            ListKind::ReviewQueue => self.queue.page_window(self.page_window),
        }
    }

    /// Re-issue the current query of a view
    pub fn refresh(&mut self, kind: ListKind) {
        let ticket = match kind {
            ListKind::ValidCredentials => self.valid.refresh(),
            ListKind::RateLimitedCredentials => self.limited.refresh(),
            ListKind::ReviewQueue => self.queue.refresh(),
        };
        self.dispatch(ticket);
    }

    pub fn set_page(&mut self, kind: ListKind, page: u32) {
        let ticket = match kind {
            ListKind::ValidCredentials => self.valid.set_page(page),
            ListKind::RateLimitedCredentials => self.limited.set_page(page),
            ListKind::ReviewQueue => self.queue.set_page(page),
        };
        self.dispatch(ticket);
    }

    /// Set (`Some`) or clear (`None`) a filter and go back to page 1
    pub fn set_filter(
        &mut self,
        kind: ListKind,
        name: &str,
        value: Option<&str>,
    ) -> Result<(), ValidationError> {
        let ticket = match kind {
            ListKind::ValidCredentials => self.valid.set_filter(name, value),
            ListKind::RateLimitedCredentials => self.limited.set_filter(name, value),
            ListKind::ReviewQueue => self.queue.set_filter(name, value),
        };
        let ticket = self.validated(ticket)?;
        self.dispatch(ticket);
        Ok(())
    }

    /// Apply filter changes and jump to `page` with a single fetch
    pub fn configure_view(
        &mut self,
        kind: ListKind,
        filters: &[(&str, Option<&str>)],
        page: u32,
    ) -> Result<(), ValidationError> {
        let ticket = match kind {
            ListKind::ValidCredentials => self.valid.configure(filters, page),
            ListKind::RateLimitedCredentials => self.limited.configure(filters, page),
            ListKind::ReviewQueue => self.queue.configure(filters, page),
        };
        let ticket = self.validated(ticket)?;
        self.dispatch(ticket);
        Ok(())
    }

    /// Delete a credential. The view is re-fetched once the server confirms;
    /// nothing is removed locally.
    #[instrument(skip_all, fields(view = %kind, %id))]
    pub fn delete_item(&mut self, kind: ListKind, id: CredentialId) -> Result<(), ValidationError> {
        let Some(credential_kind) = kind.credential_kind() else {
            return self.validated(Err(ValidationError::DeleteUnsupported { kind }));
        };
        let api = self.api.clone();
        self.spawn(async move {
            let answer = api.delete_credential(credential_kind, id).await;
            Completion::Deleted {
                kind: credential_kind,
                id,
                answer,
            }
        });
        Ok(())
    }

    // ------------------------------------------------------------------
    // Review workflow
    // ------------------------------------------------------------------

    pub fn workflow(&self) -> &ReviewWorkflow {
        &self.workflow
    }

    /// Pending findings, if known
    pub fn pending_count(&self) -> Option<u64> {
        self.pending.count()
    }

    pub fn pending_badge(&self) -> &PendingBadge {
        &self.pending
    }

    /// Validate and send a review decision
    #[instrument(skip_all, fields(%id, %action))]
    pub fn submit_review(
        &mut self,
        id: ReviewItemId,
        action: ReviewAction,
        reviewer: &str,
        note: Option<&str>,
    ) -> Result<(), ValidationError> {
        let decision = self.workflow.prepare_review(id, action, reviewer, note);
        let decision = self.validated(decision)?;
        let api = self.api.clone();
        self.spawn(async move {
            let answer = api.submit_review(id, &decision).await;
            Completion::Reviewed { id, action, answer }
        });
        Ok(())
    }

    /// First disclosure step: returns the confirmation the operator must give
    pub fn request_disclosure(
        &mut self,
        id: ReviewItemId,
    ) -> Result<DisclosureConfirmation, ValidationError> {
        let armed = self.workflow.arm_disclosure(id);
        self.validated(armed)
    }

    /// Second disclosure step: sends the single disclosure request
    #[instrument(skip_all, fields(id = %confirmation.id()))]
    pub fn confirm_disclosure(
        &mut self,
        confirmation: &DisclosureConfirmation,
    ) -> Result<(), ValidationError> {
        let confirmed = self.workflow.confirm_disclosure(confirmation);
        let id = self.validated(confirmed)?;
        let api = self.api.clone();
        self.spawn(async move {
            let answer = api.request_disclosure(id).await;
            Completion::Disclosed { id, answer }
        });
        Ok(())
    }

    pub fn cancel_disclosure(&mut self, id: ReviewItemId) -> bool {
        self.workflow.cancel_disclosure(id)
    }

    /// Fetch one finding into the workflow cache
    pub fn load_review_item(&mut self, id: ReviewItemId) {
        let api = self.api.clone();
        self.spawn(async move {
            let answer = api.fetch_review_item(id).await;
            Completion::ItemLoaded { id, answer }
        });
    }

    // ------------------------------------------------------------------
    // Stats and scan control
    // ------------------------------------------------------------------

    /// Last server-confirmed summary stats
    pub fn stats(&self) -> Option<&SummaryStats> {
        self.stats.as_ref()
    }

    pub fn stats_loading(&self) -> bool {
        self.stats_loading
    }

    pub fn refresh_stats(&mut self) {
        self.fetch_stats(false);
    }

    pub fn scan_controls(&self) -> ScanControls {
        let busy = self.scan_request.is_some();
        let active = self.stats.as_ref().map(|s| s.scan.is_active);
        ScanControls {
            can_start: !busy && active == Some(false),
            can_stop: !busy && active == Some(true),
            busy,
        }
    }

    pub fn start_scan(&mut self) -> Result<(), ValidationError> {
        self.scan(ScanCommand::Start)
    }

    pub fn stop_scan(&mut self) -> Result<(), ValidationError> {
        self.scan(ScanCommand::Stop)
    }

    fn scan(&mut self, command: ScanCommand) -> Result<(), ValidationError> {
        let controls = self.scan_controls();
        let offered = match command {
            ScanCommand::Start => controls.can_start,
            ScanCommand::Stop => controls.can_stop,
        };
        if !offered {
            return self.validated(Err(ValidationError::ScanControlUnavailable { command }));
        }

        self.scan_request = Some(command);
        let api = self.api.clone();
        self.spawn(async move {
            let answer = match command {
                ScanCommand::Start => api.start_scan().await,
                ScanCommand::Stop => api.stop_scan().await,
            };
            Completion::Scan { command, answer }
        });
        Ok(())
    }

    // ------------------------------------------------------------------
    // Push channel
    // ------------------------------------------------------------------

    pub fn channel_state(&self) -> ChannelState {
        self.channel
    }

    /// Retained log lines, oldest first
    pub fn logs(&self) -> impl Iterator<Item = &LogRecord> {
        self.logs.iter()
    }

    /// Log lines received since creation, including evicted ones
    pub fn logs_received(&self) -> u64 {
        self.logs_received
    }

    /// Consume one notice from the live channel
    pub fn handle_channel(&mut self, notice: ChannelNotice) {
        match notice {
            ChannelNotice::Event(event) => self.handle_event(event),
            ChannelNotice::StateChanged(status) => {
                debug!(state = %status.state, retry_count = status.retry_count, "channel state observed");
                self.channel = status.state;
            }
            ChannelNotice::FallbackTick => {
                if self.channel == ChannelState::Open {
                    debug!("ignoring fallback tick, channel is open");
                } else {
                    self.fetch_stats(true);
                }
            }
        }
    }

    fn handle_event(&mut self, event: PushEvent) {
        match event {
            PushEvent::StatsUpdate(patch) => self.apply_pushed_stats(patch),
            PushEvent::ScanUpdate(scan) => self.apply_pushed_scan(scan),
            PushEvent::LogEntry(record) => {
                if self.logs.len() == self.log_capacity {
                    self.logs.pop_front();
                }
                self.logs.push_back(record);
                self.logs_received += 1;
            }
        }
    }

    fn apply_pushed_stats(&mut self, patch: StatsPatch) {
        if patch.is_empty() {
            return;
        }
        let stats = self.superseding_stats();
        patch.apply_to(stats);
        self.invalidate_active_views();
    }

    fn apply_pushed_scan(&mut self, scan: ScanStats) {
        self.superseding_stats().scan = scan;
        self.invalidate_active_views();
    }

    /// Pushed stats are newer than any pull still in flight.
    fn superseding_stats(&mut self) -> &mut SummaryStats {
        self.stats_seq += 1;
        self.stats_loading = false;
        self.stats.get_or_insert_with(SummaryStats::default)
    }

    fn invalidate_active_views(&mut self) {
        for kind in ListKind::ALL {
            let active = match kind {
                ListKind::ValidCredentials => self.valid.is_active(),
                ListKind::RateLimitedCredentials => self.limited.is_active(),
                ListKind::ReviewQueue => self.queue.is_active(),
            };
            if active {
                self.refresh(kind);
            }
        }
    }

    // ------------------------------------------------------------------
    // Notices
    // ------------------------------------------------------------------

    pub fn notices(&self) -> &NoticeBoard {
        &self.notices
    }

    pub fn dismiss_notice(&mut self, id: u64) -> bool {
        self.notices.dismiss(id)
    }

    // ------------------------------------------------------------------
    // Event loop
    // ------------------------------------------------------------------

    /// Requests sent and not yet applied
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Apply the next request completion. Returns false once torn down.
    pub async fn step(&mut self) -> bool {
        let completion = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return false,
            completion = self.rx.recv() => completion,
        };
        match completion {
            Some(completion) => {
                self.apply(completion);
                true
            }
            None => false,
        }
    }

    /// Apply completions until nothing is in flight, including any follow-up
    /// requests they trigger.
    pub async fn settle(&mut self) {
        while self.in_flight > 0 {
            if !self.step().await {
                break;
            }
        }
    }

    /// Drive the dashboard from channel notices and request completions until
    /// torn down. `on_change` runs after every applied input.
    pub async fn run<F>(&mut self, mut notices: mpsc::UnboundedReceiver<ChannelNotice>, mut on_change: F)
    where
        F: FnMut(&Dashboard),
    {
        let mut channel_open = true;
        loop {
            let step = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => Step::Stop,
                notice = notices.recv(), if channel_open => match notice {
                    Some(notice) => Step::Channel(notice),
                    None => Step::ChannelGone,
                },
                Some(completion) = self.rx.recv() => Step::Completed(completion),
            };
            match step {
                Step::Channel(notice) => self.handle_channel(notice),
                Step::ChannelGone => {
                    warn!("live channel subscription ended");
                    channel_open = false;
                    continue;
                }
                Step::Completed(completion) => self.apply(completion),
                Step::Stop => break,
            }
            on_change(self);
        }
        debug!("dashboard loop stopped");
    }

    /// Cancel every request task; their answers are never applied.
    pub fn teardown(&mut self) {
        if !self.cancel.is_cancelled() {
            info!(in_flight = self.in_flight, "tearing down dashboard");
        }
        self.cancel.cancel();
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn spawn<F>(&mut self, request: F)
    where
        F: Future<Output = Completion> + Send + 'static,
    {
        let scope = self.cancel.clone();
        self.spawn_scoped(scope, request);
    }

    /// Every spawned task reports exactly once so `in_flight` stays exact.
    fn spawn_scoped<F>(&mut self, scope: CancellationToken, request: F)
    where
        F: Future<Output = Completion> + Send + 'static,
    {
        self.in_flight += 1;
        let tx = self.tx.clone();
        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = scope.cancelled() => {
                    let _ = tx.send(Completion::Aborted);
                }
                completion = request => {
                    let _ = tx.send(completion);
                }
            }
        });
    }

    /// Cancel the previous request in `slot` and scope a new one.
    fn supersede(&mut self, slot: FetchSlot) -> CancellationToken {
        let scope = self.cancel.child_token();
        if let Some(previous) = self.slots.insert(slot, scope.clone()) {
            previous.cancel();
        }
        scope
    }

    /// Report a local refusal as a notice and hand it back to the caller.
    fn validated<T>(&mut self, result: Result<T, ValidationError>) -> Result<T, ValidationError> {
        if let Err(err) = &result {
            debug!(error = %err, "refused locally");
            self.notices.push(NoticeLevel::Error, err.to_string());
        }
        result
    }

    fn report(&mut self, err: &SyncError) {
        self.notices.push(NoticeLevel::Error, err.user_message());
    }

    fn dispatch(&mut self, ticket: FetchTicket) {
        let api = self.api.clone();
        let FetchTicket { seq, query } = ticket;
        debug!(view = %query.kind, seq, page = query.page, "fetching page");
        let scope = self.supersede(FetchSlot::View(query.kind));

        match query.kind.credential_kind() {
            Some(kind) => self.spawn_scoped(scope, async move {
                let filter = query.credential_filter();
                let answer = api
                    .list_credentials(kind, &filter, query.limit(), query.offset())
                    .await
                    .map(|page| ListResult::new(page.items, page.total, query));
                Completion::Credentials { kind, seq, answer }
            }),
            None => self.spawn_scoped(scope, async move {
                let answer = api
                    .list_review_items(
                        query.review_status(),
                        query.review_severity(),
                        query.limit(),
                        query.offset(),
                    )
                    .await
                    .map(|page| ListResult::new(page.items, page.total, query));
                Completion::ReviewQueue { seq, answer }
            }),
        }
    }

    fn fetch_stats(&mut self, fallback: bool) {
        self.stats_seq += 1;
        self.stats_loading = true;
        let seq = self.stats_seq;
        let api = self.api.clone();
        debug!(seq, fallback, "fetching summary stats");
        self.spawn(async move {
            let answer = api.fetch_stats().await;
            Completion::Stats {
                seq,
                fallback,
                answer,
            }
        });
    }

    fn count_pending(&mut self) {
        let seq = self.pending.issue_count();
        let api = self.api.clone();
        let scope = self.supersede(FetchSlot::PendingCount);
        self.spawn_scoped(scope, async move {
            let answer = api
                .list_review_items(Some(ReviewStatus::Pending), None, 1, 0)
                .await
                .map(|page| page.total);
            Completion::PendingCount { seq, answer }
        });
    }

    /// Review data changed on the server: re-fetch the queue, or just the
    /// badge when no queue is shown. A rendered queue recounts on its own.
    fn invalidate_review_queue(&mut self) {
        if self.queue.is_active() {
            self.refresh(ListKind::ReviewQueue);
        } else {
            self.count_pending();
        }
    }

    fn apply(&mut self, completion: Completion) {
        self.in_flight = self.in_flight.saturating_sub(1);

        match completion {
            Completion::Credentials { kind, seq, answer } => {
                let outcome = match kind {
                    CredentialKind::Valid => self.valid.apply(seq, answer),
                    CredentialKind::RateLimited => self.limited.apply(seq, answer),
                };
                self.view_outcome(outcome);
            }
            Completion::ReviewQueue { seq, answer } => {
                let outcome = self.queue.apply(seq, answer);
                if outcome == ViewOutcome::Rendered {
                    let mut counted = false;
                    if let Some(result) = self.queue.rendered() {
                        self.workflow.observe(&result.items);
                        self.workflow.retain_visible(&result.items);
                        counted = self.pending.observe_queue(result);
                    }
                    if counted {
                        if let Some(count) = self.slots.remove(&FetchSlot::PendingCount) {
                            count.cancel();
                        }
                    } else {
                        // Another status is shown, so the badge needs its own count.
                        self.count_pending();
                    }
                }
                self.view_outcome(outcome);
            }
            Completion::PendingCount { seq, answer } => {
                self.pending.apply_count(seq, &answer);
            }
            Completion::Stats {
                seq,
                fallback,
                answer,
            } => {
                if seq != self.stats_seq {
                    debug!(seq, latest = self.stats_seq, "dropping superseded stats");
                    return;
                }
                self.stats_loading = false;
                match answer {
                    Ok(stats) => self.stats = Some(stats),
                    Err(err) if fallback => {
                        warn!(error = %err, "fallback stats refresh failed, retrying on next tick");
                        self.notices.push(
                            NoticeLevel::Warning,
                            format!("Live updates unavailable and stats refresh failed: {}", err.user_message()),
                        );
                    }
                    Err(err) => {
                        warn!(error = %err, "stats refresh failed");
                        self.report(&err);
                    }
                }
            }
            Completion::Deleted { kind, id, answer } => match answer {
                Ok(()) => {
                    info!(%id, %kind, "credential deleted");
                    self.notices
                        .push(NoticeLevel::Success, format!("Deleted {kind} key {id}"));
                    self.refresh(ListKind::from(kind));
                }
                Err(err) => {
                    warn!(%id, %kind, error = %err, "delete failed");
                    self.report(&err);
                }
            },
            Completion::Reviewed { id, action, answer } => {
                self.workflow.review_settled(id, &answer);
                match answer {
                    Ok(()) => {
                        let verb = match action {
                            ReviewAction::Approve => "approved",
                            ReviewAction::Reject => "rejected",
                        };
                        self.notices
                            .push(NoticeLevel::Success, format!("Finding {id} {verb}"));
                        self.invalidate_review_queue();
                    }
                    Err(err) => self.report(&err),
                }
            }
            Completion::Disclosed { id, answer } => {
                self.workflow.disclosure_settled(id, &answer);
                match answer {
                    Ok(receipt) => {
                        let message = match receipt.reference() {
                            Some(reference) => format!("Disclosure for {id} requested: {reference}"),
                            None => format!("Disclosure for {id} requested"),
                        };
                        self.notices.push(NoticeLevel::Success, message);
                        self.invalidate_review_queue();
                    }
                    Err(err) => self.report(&err),
                }
            }
            Completion::ItemLoaded { id, answer } => match answer {
                Ok(item) => self.workflow.observe([&item]),
                Err(err) => {
                    warn!(%id, error = %err, "loading finding failed");
                    self.report(&err);
                }
            },
            Completion::Aborted => debug!("superseded request aborted"),
            Completion::Scan { command, answer } => {
                self.scan_request = None;
                match answer {
                    Ok(()) => {
                        info!(%command, "scan command accepted");
                        self.notices
                            .push(NoticeLevel::Success, format!("Scan {command} requested"));
                    }
                    Err(err) => {
                        warn!(%command, error = %err, "scan command failed");
                        self.report(&err);
                    }
                }
                self.refresh_stats();
            }
        }
    }

    fn view_outcome(&mut self, outcome: ViewOutcome) {
        match outcome {
            ViewOutcome::Rendered | ViewOutcome::Superseded => {}
            ViewOutcome::Reissued(ticket) => self.dispatch(ticket),
            ViewOutcome::Failed(err) => self.report(&err),
        }
    }
}

impl Drop for Dashboard {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
