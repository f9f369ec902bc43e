//! Dashboard scenarios against an in-memory server

mod support;

use std::sync::Arc;

use keywatch_sync::{
    ChannelNotice, ChannelStatus, Dashboard, NoticeLevel, PendingSource, ScanCommand, SyncConfig,
    ValidationError,
};
use keywatch_types::{
    ChannelState, CredentialId, CredentialKind, ListKind, LogRecord, PushEvent, ReviewAction,
    ReviewItem, ReviewItemId, ReviewStatus, Severity, StatsPatch, StorageStats, SummaryStats,
};
use support::{config, Calls, FakeApi};
use tokio_util::sync::CancellationToken;

fn dashboard(api: &Arc<FakeApi>) -> Dashboard {
    dashboard_with(api, config())
}

fn dashboard_with(api: &Arc<FakeApi>, config: SyncConfig) -> Dashboard {
    Dashboard::new(api.clone(), &config, CancellationToken::new())
}

fn pending_critical(id: i64) -> ReviewItem {
    ReviewItem::new(ReviewItemId::new(id), Severity::Critical, ReviewStatus::Pending)
}

fn first_id(dash: &Dashboard) -> i64 {
    dash.credentials(CredentialKind::Valid).items()[0].id.get()
}

fn has_notice(dash: &Dashboard, level: NoticeLevel) -> bool {
    dash.notices().iter().any(|n| n.level == level)
}

#[tokio::test]
async fn test_latest_page_request_wins_over_an_older_one() {
    let api = FakeApi::new();
    api.seed_valid_keys(60);
    api.hold();
    let mut dash = dashboard(&api);

    dash.set_page(ListKind::ValidCredentials, 1);
    api.parked(1).await;
    dash.set_page(ListKind::ValidCredentials, 2);
    api.parked(2).await;

    // the page 1 request was aborted, letting its server answer go is a no-op
    api.release(0);
    api.release(1);
    dash.settle().await;

    let view = dash.credentials(CredentialKind::Valid);
    assert_eq!(view.rendered().unwrap().query.page, 2);
    assert_eq!(first_id(&dash), 21);
    assert_eq!(dash.in_flight(), 0);
    assert!(!view.is_loading());
}

#[tokio::test]
async fn test_repeated_refresh_keeps_one_fetch_running() {
    let api = FakeApi::new();
    api.seed_valid_keys(3);
    api.hold();
    let mut dash = dashboard(&api);

    for _ in 0..5 {
        dash.refresh(ListKind::ValidCredentials);
    }
    assert_eq!(dash.in_flight(), 5);
    api.parked(1).await;
    api.release(0);
    dash.settle().await;

    assert_eq!(Calls::get(&api.calls.list_credentials), 1);
    assert_eq!(dash.credentials(CredentialKind::Valid).items().len(), 3);
    assert_eq!(dash.in_flight(), 0);
}

#[tokio::test]
async fn test_configuring_a_view_sends_one_list_request() {
    let api = FakeApi::new();
    for n in 1..=25 {
        api.seed_issue(ReviewItem::new(
            ReviewItemId::new(n),
            Severity::High,
            ReviewStatus::Pending,
        ));
    }
    api.seed_issue(pending_critical(26));
    let mut dash = dashboard(&api);

    dash.configure_view(
        ListKind::ReviewQueue,
        &[("status", Some("pending")), ("severity", Some("high"))],
        2,
    )
    .unwrap();
    dash.settle().await;

    // the severity filter hides pending findings, so the badge counts apart
    assert_eq!(Calls::get(&api.calls.list_review), 2);
    assert_eq!(dash.pending_count(), Some(26));
    let rendered = dash.review_queue().rendered().unwrap();
    assert_eq!(rendered.query.page, 2);
    assert_eq!(rendered.total, 25);
    assert_eq!(rendered.items.len(), 5);

    let err = dash
        .configure_view(ListKind::ReviewQueue, &[("severity", Some("urgent"))], 1)
        .unwrap_err();
    assert!(matches!(err, ValidationError::InvalidFilterValue { .. }));
    assert_eq!(dash.in_flight(), 0);
    assert_eq!(dash.review_queue().query().page, 2);
}

#[tokio::test]
async fn test_page_past_the_end_is_clamped_before_fetch() {
    let api = FakeApi::new();
    api.seed_valid_keys(47);
    let mut dash = dashboard(&api);

    dash.refresh(ListKind::ValidCredentials);
    dash.settle().await;
    assert_eq!(dash.credentials(CredentialKind::Valid).total_pages(), Some(3));

    dash.set_page(ListKind::ValidCredentials, 5);
    assert_eq!(dash.credentials(CredentialKind::Valid).query().page, 3);
    dash.settle().await;

    let rendered = dash.credentials(CredentialKind::Valid).rendered().unwrap();
    assert_eq!(rendered.query.page, 3);
    assert_eq!(rendered.items.len(), 7);
    assert_eq!(Calls::get(&api.calls.list_credentials), 2);
}

#[tokio::test]
async fn test_deleting_only_item_on_last_page_moves_to_previous_page() {
    let api = FakeApi::new();
    api.seed_valid_keys(41);
    let mut dash = dashboard(&api);

    dash.refresh(ListKind::ValidCredentials);
    dash.settle().await;
    dash.set_page(ListKind::ValidCredentials, 3);
    dash.settle().await;
    assert_eq!(first_id(&dash), 41);

    dash.delete_item(ListKind::ValidCredentials, CredentialId::new(41))
        .unwrap();
    // nothing is spliced out before the server confirms
    assert_eq!(dash.credentials(CredentialKind::Valid).items().len(), 1);
    dash.settle().await;

    let rendered = dash.credentials(CredentialKind::Valid).rendered().unwrap();
    assert_eq!(rendered.query.page, 2);
    assert_eq!(rendered.total, 40);
    assert_eq!(rendered.items.len(), 20);
    assert!(has_notice(&dash, NoticeLevel::Success));
    // refresh, page 3, refresh after delete, re-clamped page 2
    assert_eq!(Calls::get(&api.calls.list_credentials), 4);
}

#[tokio::test]
async fn test_failed_delete_keeps_item_visible() {
    let api = FakeApi::new();
    api.seed_valid_keys(3);
    let mut dash = dashboard(&api);
    dash.refresh(ListKind::ValidCredentials);
    dash.settle().await;

    dash.delete_item(ListKind::ValidCredentials, CredentialId::new(99))
        .unwrap();
    dash.settle().await;

    assert_eq!(dash.credentials(CredentialKind::Valid).items().len(), 3);
    let notice = dash.notices().latest().unwrap();
    assert_eq!(notice.level, NoticeLevel::Error);
    assert_eq!(notice.message, "key not found");
}

#[tokio::test]
async fn test_review_items_cannot_be_deleted() {
    let api = FakeApi::new();
    let mut dash = dashboard(&api);
    let err = dash
        .delete_item(ListKind::ReviewQueue, CredentialId::new(1))
        .unwrap_err();
    assert!(matches!(err, ValidationError::DeleteUnsupported { .. }));
    assert_eq!(Calls::get(&api.calls.delete), 0);
}

#[tokio::test]
async fn test_reject_without_note_issues_no_request() {
    let api = FakeApi::new();
    api.seed_issue(pending_critical(1));
    let mut dash = dashboard(&api);
    dash.refresh(ListKind::ReviewQueue);
    dash.settle().await;

    let err = dash
        .submit_review(ReviewItemId::new(1), ReviewAction::Reject, "alice", Some(""))
        .unwrap_err();

    assert_eq!(err, ValidationError::MissingRationale);
    assert_eq!(Calls::get(&api.calls.review), 0);
    assert_eq!(dash.in_flight(), 0);
    assert!(has_notice(&dash, NoticeLevel::Error));
}

#[tokio::test]
async fn test_approve_without_note_issues_exactly_one_request() {
    let api = FakeApi::new();
    api.seed_issue(pending_critical(1));
    let mut dash = dashboard(&api);
    dash.refresh(ListKind::ReviewQueue);
    dash.settle().await;
    assert_eq!(dash.pending_count(), Some(1));

    dash.submit_review(ReviewItemId::new(1), ReviewAction::Approve, "alice", None)
        .unwrap();
    dash.settle().await;

    assert_eq!(Calls::get(&api.calls.review), 1);
    assert_eq!(api.issue(1).unwrap().status, ReviewStatus::Approved);
    // the pending queue was re-fetched and the badge follows its total
    assert!(dash.review_queue().items().is_empty());
    assert_eq!(dash.pending_count(), Some(0));
    assert_eq!(
        dash.pending_badge().source(),
        Some(PendingSource::QueueTotal)
    );
}

#[tokio::test]
async fn test_badge_counts_pending_while_queue_shows_another_status() {
    let api = FakeApi::new();
    api.seed_issue(pending_critical(1));
    api.seed_issue(ReviewItem::new(
        ReviewItemId::new(2),
        Severity::High,
        ReviewStatus::Approved,
    ));
    let mut dash = dashboard(&api);

    dash.set_filter(ListKind::ReviewQueue, "status", Some("approved"))
        .unwrap();
    dash.settle().await;
    assert_eq!(dash.review_queue().rendered().unwrap().total, 1);
    assert_eq!(dash.pending_count(), Some(1));
    assert_eq!(
        dash.pending_badge().source(),
        Some(PendingSource::CountQuery)
    );

    api.seed_issue(pending_critical(3));
    dash.refresh(ListKind::ReviewQueue);
    dash.settle().await;
    assert_eq!(dash.pending_count(), Some(2));

    api.seed_issue(pending_critical(4));
    dash.handle_channel(ChannelNotice::Event(PushEvent::ScanUpdate(Default::default())));
    dash.settle().await;
    assert_eq!(dash.pending_count(), Some(3));
    // one queue fetch and one count per round
    assert_eq!(Calls::get(&api.calls.list_review), 6);
}

#[tokio::test]
async fn test_second_reviewer_gets_server_reason() {
    let api = FakeApi::new();
    api.seed_issue(pending_critical(1));
    let mut alice = dashboard(&api);
    let mut bob = dashboard(&api);
    alice.refresh(ListKind::ReviewQueue);
    bob.refresh(ListKind::ReviewQueue);
    alice.settle().await;
    bob.settle().await;

    alice
        .submit_review(ReviewItemId::new(1), ReviewAction::Approve, "alice", None)
        .unwrap();
    alice.settle().await;
    bob.submit_review(
        ReviewItemId::new(1),
        ReviewAction::Reject,
        "bob",
        Some("false positive"),
    )
    .unwrap();
    bob.settle().await;

    assert_eq!(bob.notices().latest().unwrap().message, "issue already reviewed");
    assert_eq!(api.issue(1).unwrap().status, ReviewStatus::Approved);
    // bob's cache is not advanced locally
    assert_eq!(
        bob.workflow().item(ReviewItemId::new(1)).unwrap().status,
        ReviewStatus::Pending
    );
}

#[tokio::test]
async fn test_critical_finding_from_approval_to_disclosure() {
    let api = FakeApi::new();
    api.seed_issue(pending_critical(1));
    let id = ReviewItemId::new(1);
    let mut dash = dashboard(&api);

    dash.refresh(ListKind::ReviewQueue);
    dash.settle().await;
    assert_eq!(dash.review_queue().items()[0].severity, Severity::Critical);

    dash.submit_review(id, ReviewAction::Approve, "alice", None)
        .unwrap();
    dash.settle().await;

    dash.set_filter(ListKind::ReviewQueue, "status", Some("approved"))
        .unwrap();
    dash.settle().await;
    let item = &dash.review_queue().items()[0];
    assert_eq!(item.status, ReviewStatus::Approved);
    assert_eq!(item.reviewer.as_deref(), Some("alice"));
    assert!(dash.workflow().offered_actions(id).disclose);

    let confirmation = dash.request_disclosure(id).unwrap();
    assert_eq!(Calls::get(&api.calls.disclosure), 0);
    dash.confirm_disclosure(&confirmation).unwrap();
    dash.settle().await;
    assert!(dash.workflow().disclosure_ref(id).is_some());

    dash.set_filter(ListKind::ReviewQueue, "status", Some("created"))
        .unwrap();
    dash.settle().await;
    let item = &dash.review_queue().items()[0];
    assert_eq!(item.status, ReviewStatus::Created);
    assert!(!item.disclosure_ref.as_deref().unwrap_or("").is_empty());

    let err = dash.request_disclosure(id).unwrap_err();
    assert_eq!(err, ValidationError::DisclosureAlreadyRequested { id });
    assert_eq!(Calls::get(&api.calls.disclosure), 1);
    assert_eq!(dash.pending_count(), Some(0));
}

#[tokio::test]
async fn test_double_confirmation_sends_one_disclosure() {
    let api = FakeApi::new();
    api.seed_issue(ReviewItem::new(
        ReviewItemId::new(4),
        Severity::High,
        ReviewStatus::Approved,
    ));
    let id = ReviewItemId::new(4);
    let mut dash = dashboard(&api);
    dash.set_filter(ListKind::ReviewQueue, "status", Some("approved"))
        .unwrap();
    dash.settle().await;

    let confirmation = dash.request_disclosure(id).unwrap();
    dash.confirm_disclosure(&confirmation).unwrap();
    assert_eq!(
        dash.confirm_disclosure(&confirmation).unwrap_err(),
        ValidationError::DisclosureInFlight { id }
    );
    assert_eq!(
        dash.request_disclosure(id).unwrap_err(),
        ValidationError::DisclosureInFlight { id }
    );
    dash.settle().await;

    assert_eq!(Calls::get(&api.calls.disclosure), 1);
    // the pending badge came from its own query, the queue shows approved items
    assert_eq!(
        dash.pending_badge().source(),
        Some(PendingSource::CountQuery)
    );
}

#[tokio::test]
async fn test_disclosure_needs_an_observed_approval() {
    let api = FakeApi::new();
    api.seed_issue(pending_critical(1));
    let id = ReviewItemId::new(1);
    let mut dash = dashboard(&api);
    dash.refresh(ListKind::ReviewQueue);
    dash.settle().await;

    dash.submit_review(id, ReviewAction::Approve, "alice", None)
        .unwrap();
    // approval answer not applied yet
    assert_eq!(
        dash.request_disclosure(id).unwrap_err(),
        ValidationError::ReviewInFlight { id }
    );
    dash.settle().await;

    // the server approved it, but this dashboard has not re-observed the item
    assert!(matches!(
        dash.request_disclosure(id).unwrap_err(),
        ValidationError::DisclosureNotApproved { .. }
    ));

    dash.load_review_item(id);
    dash.settle().await;
    assert!(dash.request_disclosure(id).is_ok());
}

#[tokio::test]
async fn test_fallback_fetch_superseded_by_push_update() {
    let api = FakeApi::new();
    api.set_stats(SummaryStats {
        storage: StorageStats {
            valid_keys: 1,
            ..StorageStats::default()
        },
        ..SummaryStats::default()
    });
    api.hold();
    let mut dash = dashboard(&api);

    dash.handle_channel(ChannelNotice::FallbackTick);
    api.parked(1).await;
    dash.handle_channel(ChannelNotice::Event(PushEvent::StatsUpdate(StatsPatch {
        storage: Some(StorageStats {
            valid_keys: 5,
            ..StorageStats::default()
        }),
        scan: None,
    })));
    assert_eq!(dash.stats().unwrap().storage.valid_keys, 5);

    api.release(0);
    assert!(dash.step().await);
    assert_eq!(dash.stats().unwrap().storage.valid_keys, 5);
    assert_eq!(Calls::get(&api.calls.stats), 1);
}

#[tokio::test]
async fn test_fallback_tick_ignored_while_open() {
    let api = FakeApi::new();
    let mut dash = dashboard(&api);
    dash.handle_channel(ChannelNotice::StateChanged(ChannelStatus {
        state: ChannelState::Open,
        retry_count: 0,
        next_retry_at: None,
    }));
    dash.handle_channel(ChannelNotice::FallbackTick);

    assert_eq!(dash.channel_state(), ChannelState::Open);
    assert_eq!(dash.in_flight(), 0);
    assert_eq!(Calls::get(&api.calls.stats), 0);
}

#[tokio::test]
async fn test_push_update_refreshes_only_active_views() {
    let api = FakeApi::new();
    api.seed_valid_keys(3);
    let mut dash = dashboard(&api);
    dash.refresh(ListKind::ValidCredentials);
    dash.settle().await;

    api.seed_valid_keys(5);
    dash.handle_channel(ChannelNotice::Event(PushEvent::ScanUpdate(Default::default())));
    dash.settle().await;

    assert_eq!(dash.credentials(CredentialKind::Valid).items().len(), 5);
    assert_eq!(Calls::get(&api.calls.list_credentials), 2);
    assert_eq!(Calls::get(&api.calls.list_review), 0);
}

#[tokio::test]
async fn test_scan_controls_reflect_confirmed_state_only() {
    let api = FakeApi::new();
    let mut dash = dashboard(&api);
    assert!(!dash.scan_controls().can_start);

    dash.refresh_stats();
    dash.settle().await;
    assert!(dash.scan_controls().can_start);

    dash.start_scan().unwrap();
    let controls = dash.scan_controls();
    assert!(controls.busy);
    assert!(!controls.can_start && !controls.can_stop);
    assert!(!dash.stats().unwrap().scan.is_active);

    dash.settle().await;
    assert!(dash.stats().unwrap().scan.is_active);
    assert!(dash.scan_controls().can_stop);
    assert_eq!(
        dash.start_scan().unwrap_err(),
        ValidationError::ScanControlUnavailable {
            command: ScanCommand::Start
        }
    );
    assert_eq!(Calls::get(&api.calls.scan), 1);
}

#[tokio::test]
async fn test_log_ring_is_bounded() {
    let api = FakeApi::new();
    let mut dash = dashboard_with(
        &api,
        SyncConfig {
            log_capacity: 2,
            ..config()
        },
    );
    for message in ["one", "two", "three"] {
        dash.handle_channel(ChannelNotice::Event(PushEvent::LogEntry(LogRecord {
            level: "info".into(),
            message: message.into(),
            timestamp: None,
        })));
    }
    let kept: Vec<_> = dash.logs().map(|r| r.message.as_str()).collect();
    assert_eq!(kept, vec!["two", "three"]);
}

#[tokio::test]
async fn test_notices_are_dismissible() {
    let api = FakeApi::new();
    let mut dash = dashboard(&api);
    let _ = dash.set_filter(ListKind::ValidCredentials, "severity", Some("high"));
    let id = dash.notices().latest().unwrap().id;
    assert!(dash.dismiss_notice(id));
    assert!(dash.notices().is_empty());
}

#[tokio::test]
async fn test_teardown_discards_outstanding_answers() {
    let api = FakeApi::new();
    api.seed_valid_keys(3);
    api.hold();
    let mut dash = dashboard(&api);
    dash.refresh(ListKind::ValidCredentials);
    api.parked(1).await;

    dash.teardown();
    api.release(0);
    assert!(!dash.step().await);
    assert!(dash.credentials(CredentialKind::Valid).rendered().is_none());
}
