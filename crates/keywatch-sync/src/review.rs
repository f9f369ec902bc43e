//! Review Workflow Engine
//!
//! Gates the public disclosure of a finding behind an attributable approval:
//!
//! ```text
//! pending  --approve(reviewer, note?)--> approved
//! pending  --reject(reviewer, note!)-->  rejected
//! approved --disclose()-->               created
//! ```
//!
//! The engine only proposes transitions. Statuses come from the server and
//! are never advanced locally; a successful disclosure stores the returned
//! reference and waits for the next fetch to show `created`.
//!
//! Disclosure takes two steps. [`ReviewWorkflow::arm_disclosure`] hands out a
//! [`DisclosureConfirmation`], and only [`ReviewWorkflow::confirm_disclosure`]
//! with that token lets the request go out. Once a request is in flight or has
//! succeeded, every further attempt for the same item is refused locally.

use std::collections::{HashMap, HashSet};

use keywatch_types::{
    DisclosureReceipt, ListResult, ReviewAction, ReviewDecision, ReviewItem, ReviewItemId,
    ReviewStatus,
};
use tracing::{debug, info, warn};

use crate::error::{SyncResult, ValidationError};

/// Proof that the operator saw the disclosure prompt for one item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisclosureConfirmation {
    id: ReviewItemId,
    token: u64,
}

impl DisclosureConfirmation {
    pub fn id(&self) -> ReviewItemId {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum DisclosureGate {
    Armed { token: u64 },
    InFlight,
    Requested { reference: Option<String> },
}

/// Affordances for one cached item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OfferedActions {
    pub review: bool,
    pub disclose: bool,
}

/// Per-item review and disclosure gating
#[derive(Debug, Default)]
pub struct ReviewWorkflow {
    cache: HashMap<ReviewItemId, ReviewItem>,
    reviews_in_flight: HashSet<ReviewItemId>,
    gates: HashMap<ReviewItemId, DisclosureGate>,
    next_token: u64,
}

impl ReviewWorkflow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refresh the read cache from server data.
    pub fn observe<'a>(&mut self, items: impl IntoIterator<Item = &'a ReviewItem>) {
        for item in items {
            let id = item.id;
            if item.is_disclosed() {
                // The cached item blocks disclosure by itself; only a local
                // gate needs settling.
                if self.gates.contains_key(&id) {
                    let reference = item
                        .disclosure_ref
                        .clone()
                        .or_else(|| self.disclosure_ref(id).map(str::to_string));
                    self.gates.insert(id, DisclosureGate::Requested { reference });
                }
            } else if item.status != ReviewStatus::Approved {
                if let Some(DisclosureGate::Armed { .. }) = self.gates.get(&id) {
                    debug!(%id, status = %item.status, "item left approved, disarming disclosure");
                    self.gates.remove(&id);
                }
            }
            self.cache.insert(id, item.clone());
        }
    }

    /// Forget cached items that left the rendered page.
    ///
    /// Items with a review in flight or a disclosure gate are kept. Gates only
    /// come from operator actions, so they are not pruned.
    pub fn retain_visible(&mut self, visible: &[ReviewItem]) {
        let visible: HashSet<ReviewItemId> = visible.iter().map(|item| item.id).collect();
        let reviews_in_flight = &self.reviews_in_flight;
        let gates = &self.gates;
        let cached = self.cache.len();

        self.cache.retain(|id, _| {
            visible.contains(id) || reviews_in_flight.contains(id) || gates.contains_key(id)
        });

        let pruned = cached - self.cache.len();
        if pruned > 0 {
            debug!(pruned, cached = self.cache.len(), "pruned findings no longer shown");
        }
    }

    pub fn item(&self, id: ReviewItemId) -> Option<&ReviewItem> {
        self.cache.get(&id)
    }

    /// What the operator may do with an item right now
    pub fn offered_actions(&self, id: ReviewItemId) -> OfferedActions {
        let Some(item) = self.cache.get(&id) else {
            return OfferedActions::default();
        };
        let in_flight = self.reviews_in_flight.contains(&id);
        OfferedActions {
            review: item.status == ReviewStatus::Pending && !in_flight,
            disclose: item.status == ReviewStatus::Approved
                && !in_flight
                && !item.is_disclosed()
                && !matches!(
                    self.gates.get(&id),
                    Some(DisclosureGate::InFlight | DisclosureGate::Requested { .. })
                ),
        }
    }

    /// Validate a review decision and mark it in flight.
    ///
    /// An item missing from the cache is allowed through; the server decides.
    pub fn prepare_review(
        &mut self,
        id: ReviewItemId,
        action: ReviewAction,
        reviewer: &str,
        note: Option<&str>,
    ) -> Result<ReviewDecision, ValidationError> {
        let reviewer = reviewer.trim();
        if reviewer.is_empty() {
            return Err(ValidationError::MissingReviewer);
        }
        let note = note.map(str::trim).unwrap_or_default();
        if action.requires_note() && note.is_empty() {
            return Err(ValidationError::MissingRationale);
        }
        if let Some(item) = self.cache.get(&id) {
            if !item.status.can_advance_to(action.target_status()) {
                return Err(ValidationError::TransitionNotOffered {
                    id,
                    status: item.status,
                });
            }
        }
        if !self.reviews_in_flight.insert(id) {
            return Err(ValidationError::ReviewInFlight { id });
        }

        Ok(ReviewDecision {
            action,
            reviewed_by: reviewer.to_string(),
            review_note: note.to_string(),
        })
    }

    /// Record the server's answer to a review decision. The cached status is
    /// left alone either way; the next fetch carries the truth.
    pub fn review_settled(&mut self, id: ReviewItemId, result: &SyncResult<()>) {
        self.reviews_in_flight.remove(&id);
        match result {
            Ok(()) => info!(%id, "review decision accepted"),
            Err(err) => warn!(%id, error = %err, "review decision refused"),
        }
    }

    /// First disclosure step. Returns the token the confirmation must present.
    pub fn arm_disclosure(
        &mut self,
        id: ReviewItemId,
    ) -> Result<DisclosureConfirmation, ValidationError> {
        if self.reviews_in_flight.contains(&id) {
            return Err(ValidationError::ReviewInFlight { id });
        }
        self.gate_open(id)?;

        let item = self
            .cache
            .get(&id)
            .ok_or(ValidationError::UnknownItem { id })?;
        if item.is_disclosed() {
            return Err(ValidationError::DisclosureAlreadyRequested { id });
        }
        if item.status != ReviewStatus::Approved {
            return Err(ValidationError::DisclosureNotApproved {
                id,
                status: item.status,
            });
        }

        self.next_token += 1;
        let token = self.next_token;
        self.gates.insert(id, DisclosureGate::Armed { token });
        debug!(%id, "disclosure armed");
        Ok(DisclosureConfirmation { id, token })
    }

    /// Second disclosure step. On success the request is in flight and the
    /// caller must send exactly one disclosure request for the returned id.
    pub fn confirm_disclosure(
        &mut self,
        confirmation: &DisclosureConfirmation,
    ) -> Result<ReviewItemId, ValidationError> {
        let id = confirmation.id;
        self.gate_open(id)?;
        match self.gates.get(&id) {
            Some(DisclosureGate::Armed { token }) if *token == confirmation.token => {}
            _ => return Err(ValidationError::ConfirmationMismatch { id }),
        }
        if let Some(item) = self.cache.get(&id) {
            if item.status != ReviewStatus::Approved {
                self.gates.remove(&id);
                return Err(ValidationError::DisclosureNotApproved {
                    id,
                    status: item.status,
                });
            }
        }

        self.gates.insert(id, DisclosureGate::InFlight);
        info!(%id, "disclosure confirmed");
        Ok(id)
    }

    /// Drop an armed confirmation. Returns false if nothing was armed.
    pub fn cancel_disclosure(&mut self, id: ReviewItemId) -> bool {
        if let Some(DisclosureGate::Armed { .. }) = self.gates.get(&id) {
            self.gates.remove(&id);
            true
        } else {
            false
        }
    }

    /// Record the server's answer to a disclosure request.
    ///
    /// A failure reopens the gate so the operator can retry after
    /// re-observing the item; the server refuses a second creation anyway.
    pub fn disclosure_settled(&mut self, id: ReviewItemId, result: &SyncResult<DisclosureReceipt>) {
        match result {
            Ok(receipt) => {
                let reference = receipt.reference().map(str::to_string);
                info!(%id, reference = reference.as_deref().unwrap_or("-"), "disclosure requested");
                self.gates.insert(id, DisclosureGate::Requested { reference });
            }
            Err(err) => {
                warn!(%id, error = %err, "disclosure request failed");
                self.gates.remove(&id);
            }
        }
    }

    /// Known disclosure reference, from the request answer or a later fetch
    pub fn disclosure_ref(&self, id: ReviewItemId) -> Option<&str> {
        match self.gates.get(&id) {
            Some(DisclosureGate::Requested {
                reference: Some(reference),
            }) => Some(reference.as_str()),
            _ => self
                .cache
                .get(&id)
                .and_then(|item| item.disclosure_ref.as_deref()),
        }
    }

    pub fn disclosure_requested(&self, id: ReviewItemId) -> bool {
        matches!(self.gates.get(&id), Some(DisclosureGate::Requested { .. }))
            || self.cache.get(&id).is_some_and(ReviewItem::is_disclosed)
    }

    fn gate_open(&self, id: ReviewItemId) -> Result<(), ValidationError> {
        match self.gates.get(&id) {
            Some(DisclosureGate::Requested { .. }) => {
                Err(ValidationError::DisclosureAlreadyRequested { id })
            }
            Some(DisclosureGate::InFlight) => Err(ValidationError::DisclosureInFlight { id }),
            _ => Ok(()),
        }
    }
}

/// Where the pending badge number came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingSource {
    /// Total of a review queue page filtered on `status=pending`
    QueueTotal,
    /// Separate count-only query
    CountQuery,
}

/// Number of pending findings
///
/// Taken from the review queue total only when the queue is filtered on
/// `pending` alone; otherwise from its own count query. The two paths are
/// sequenced independently so neither overwrites a newer value of the other.
#[derive(Debug, Clone, Default)]
pub struct PendingBadge {
    count: Option<u64>,
    source: Option<PendingSource>,
    count_seq: u64,
}

impl PendingBadge {
    pub fn count(&self) -> Option<u64> {
        self.count
    }

    pub fn source(&self) -> Option<PendingSource> {
        self.source
    }

    /// Take the count from a rendered queue page if it lists every pending
    /// finding, i.e. it is filtered on `pending` and nothing else.
    pub fn observe_queue(&mut self, result: &ListResult<ReviewItem>) -> bool {
        let query = &result.query;
        if query.review_status() != Some(ReviewStatus::Pending)
            || query.review_severity().is_some()
        {
            return false;
        }
        // A queue total is at least as fresh as any count query in flight.
        self.count_seq += 1;
        self.count = Some(result.total);
        self.source = Some(PendingSource::QueueTotal);
        true
    }

    /// Start a count query and return its sequence number
    pub fn issue_count(&mut self) -> u64 {
        self.count_seq += 1;
        self.count_seq
    }

    /// Apply a count query answer. Returns true if it became the badge value.
    pub fn apply_count(&mut self, seq: u64, answer: &SyncResult<u64>) -> bool {
        if seq != self.count_seq {
            return false;
        }
        match answer {
            Ok(total) => {
                self.count = Some(*total);
                self.source = Some(PendingSource::CountQuery);
                true
            }
            Err(err) => {
                warn!(error = %err, "pending count query failed");
                false
            }
        }
    }
}
