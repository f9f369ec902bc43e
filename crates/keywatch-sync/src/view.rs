//! View State Controller
//!
//! One controller per list view. It owns the view's [`ListQuery`] and the last
//! rendered [`ListResult`], and hands out a [`FetchTicket`] for every query it
//! wants executed. Tickets carry a per-view sequence number; only the answer
//! to the most recently issued ticket may touch rendered state. Answers to
//! superseded tickets are dropped.

use keywatch_types::{
    total_pages, ListKind, ListQuery, ListResult, ReviewStatus, Severity, FILTER_SEVERITY,
    FILTER_STATUS,
};
use tracing::{debug, warn};

use crate::error::{SyncError, SyncResult, ValidationError};
use crate::pagination::{clamp_page, page_window, PageLink};

/// A query the controller wants executed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    pub seq: u64,
    pub query: ListQuery,
}

impl FetchTicket {
    pub fn kind(&self) -> ListKind {
        self.query.kind
    }
}

/// What happened when a fetch answer was applied
#[derive(Debug, Clone, PartialEq)]
pub enum ViewOutcome {
    /// The answer is now the rendered state
    Rendered,
    /// The answer belonged to an older query and was dropped
    Superseded,
    /// The requested page lies past the end; a clamped query was issued instead
    Reissued(FetchTicket),
    /// The fetch failed; the previously rendered page is kept
    Failed(SyncError),
}

/// Filter, pagination and rendered state of one list view
#[derive(Debug, Clone)]
pub struct ViewController<T> {
    query: ListQuery,
    issued_seq: u64,
    in_flight: bool,
    rendered: Option<ListResult<T>>,
    known_total: Option<u64>,
}

impl<T> ViewController<T> {
    pub fn new(kind: ListKind, page_size: u32) -> Self {
        Self {
            query: ListQuery::new(kind, page_size),
            issued_seq: 0,
            in_flight: false,
            rendered: None,
            known_total: None,
        }
    }

    pub fn kind(&self) -> ListKind {
        self.query.kind
    }

    /// The latest requested query
    pub fn query(&self) -> &ListQuery {
        &self.query
    }

    /// Whether the view has ever asked for data
    pub fn is_active(&self) -> bool {
        self.issued_seq > 0
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight
    }

    pub fn rendered(&self) -> Option<&ListResult<T>> {
        self.rendered.as_ref()
    }

    pub fn items(&self) -> &[T] {
        self.rendered
            .as_ref()
            .map(|r| r.items.as_slice())
            .unwrap_or(&[])
    }

    /// Total pages as last confirmed by the server
    pub fn total_pages(&self) -> Option<u32> {
        self.known_total
            .map(|total| total_pages(total, self.query.page_size))
    }

    /// Pagination bar of the rendered page
    pub fn page_window(&self, width: u32) -> Vec<PageLink> {
        match &self.rendered {
            Some(result) => page_window(result.query.page, result.total, result.query.page_size, width),
            None => Vec::new(),
        }
    }

    /// Set or clear a filter and go back to page 1.
    ///
    /// Clearing the review queue status filter restores `pending`; the queue is
    /// never requested without an explicit status.
    pub fn set_filter(
        &mut self,
        name: &str,
        value: Option<&str>,
    ) -> Result<FetchTicket, ValidationError> {
        self.configure(&[(name, value)], 1)
    }

    /// Apply several filter changes and a page in one go, issuing a single
    /// ticket. Nothing changes if any filter is refused.
    pub fn configure(
        &mut self,
        filters: &[(&str, Option<&str>)],
        page: u32,
    ) -> Result<FetchTicket, ValidationError> {
        let staged = filters
            .iter()
            .map(|(name, value)| Ok((*name, self.normalize_filter(name, *value)?)))
            .collect::<Result<Vec<_>, ValidationError>>()?;

        for (name, value) in staged {
            match value {
                Some(value) => self.query.filters.insert(name.to_string(), value),
                None => self.query.filters.remove(name),
            };
        }
        if filters.is_empty() {
            return Ok(self.set_page(page));
        }
        self.query.page = page.max(1);
        // A different filter set means a different total.
        self.known_total = None;
        Ok(self.issue())
    }

    fn normalize_filter(
        &self,
        name: &str,
        value: Option<&str>,
    ) -> Result<Option<String>, ValidationError> {
        let kind = self.kind();
        if !kind.accepts_filter(name) {
            return Err(ValidationError::UnknownFilter {
                kind,
                name: name.to_string(),
            });
        }

        let value = value.map(str::trim).filter(|v| !v.is_empty());
        Ok(match (name, value) {
            (FILTER_STATUS, None) => Some(ReviewStatus::Pending.as_str().to_string()),
            (FILTER_STATUS, Some(raw)) => Some(
                raw.parse::<ReviewStatus>()
                    .map_err(|_| invalid(name, raw))?
                    .as_str()
                    .to_string(),
            ),
            (FILTER_SEVERITY, Some(raw)) => Some(
                raw.parse::<Severity>()
                    .map_err(|_| invalid(name, raw))?
                    .as_str()
                    .to_string(),
            ),
            (_, other) => other.map(str::to_string),
        })
    }

    /// Move to `page`, clamped to the last known page count.
    pub fn set_page(&mut self, page: u32) -> FetchTicket {
        self.query.page = match self.total_pages() {
            Some(pages) => clamp_page(page, pages),
            None => page.max(1),
        };
        self.issue()
    }

    /// Re-issue the current query.
    pub fn refresh(&mut self) -> FetchTicket {
        if let Some(pages) = self.total_pages() {
            self.query.page = clamp_page(self.query.page, pages);
        }
        self.issue()
    }

    /// Apply the answer of ticket `seq`.
    pub fn apply(&mut self, seq: u64, answer: SyncResult<ListResult<T>>) -> ViewOutcome {
        let kind = self.kind();
        if seq != self.issued_seq {
            debug!(view = %kind, seq, latest = self.issued_seq, "dropping superseded answer");
            return ViewOutcome::Superseded;
        }
        self.in_flight = false;

        match answer {
            Ok(result) => {
                self.known_total = Some(result.total);
                if result.overshoots() {
                    let pages = result.total_pages();
                    debug!(
                        view = %kind,
                        page = result.query.page,
                        pages,
                        "page past the end, re-clamping"
                    );
                    self.query.page = clamp_page(result.query.page, pages);
                    return ViewOutcome::Reissued(self.issue());
                }
                debug!(
                    view = %kind,
                    seq,
                    page = result.query.page,
                    items = result.items.len(),
                    total = result.total,
                    "rendering page"
                );
                self.rendered = Some(result);
                ViewOutcome::Rendered
            }
            Err(err) => {
                warn!(view = %kind, seq, error = %err, "list fetch failed, keeping previous page");
                ViewOutcome::Failed(err)
            }
        }
    }

    fn issue(&mut self) -> FetchTicket {
        self.issued_seq += 1;
        self.in_flight = true;
        FetchTicket {
            seq: self.issued_seq,
            query: self.query.clone(),
        }
    }
}

fn invalid(name: &str, value: &str) -> ValidationError {
    ValidationError::InvalidFilterValue {
        name: name.to_string(),
        value: value.to_string(),
    }
}
