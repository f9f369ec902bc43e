//! List queries and their results
//!
//! A [`ListQuery`] fully identifies a page fetch: issuing the same query twice
//! yields the same answer as long as the server state did not change.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::credential::{CredentialFilter, CredentialKind};
use crate::review::{ReviewStatus, Severity};

/// Filter key of the review queue status
pub const FILTER_STATUS: &str = "status";
/// Filter key of the review queue severity
pub const FILTER_SEVERITY: &str = "severity";
/// Filter key of the credential repository
pub const FILTER_REPO: &str = "repo";
/// Filter key of the credential source
pub const FILTER_SOURCE: &str = "source";

/// The list views of the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ListKind {
    ValidCredentials,
    RateLimitedCredentials,
    ReviewQueue,
}

impl ListKind {
    pub const ALL: [ListKind; 3] = [
        ListKind::ValidCredentials,
        ListKind::RateLimitedCredentials,
        ListKind::ReviewQueue,
    ];

    /// Filters this view understands
    pub fn filter_names(&self) -> &'static [&'static str] {
        match self {
            ListKind::ValidCredentials | ListKind::RateLimitedCredentials => {
                &[FILTER_REPO, FILTER_SOURCE]
            }
            ListKind::ReviewQueue => &[FILTER_STATUS, FILTER_SEVERITY],
        }
    }

    pub fn accepts_filter(&self, name: &str) -> bool {
        self.filter_names().contains(&name)
    }

    /// Credential list backing this view, if it is a credential view
    pub fn credential_kind(&self) -> Option<CredentialKind> {
        match self {
            ListKind::ValidCredentials => Some(CredentialKind::Valid),
            ListKind::RateLimitedCredentials => Some(CredentialKind::RateLimited),
            ListKind::ReviewQueue => None,
        }
    }
}

impl From<CredentialKind> for ListKind {
    fn from(kind: CredentialKind) -> Self {
        match kind {
            CredentialKind::Valid => ListKind::ValidCredentials,
            CredentialKind::RateLimited => ListKind::RateLimitedCredentials,
        }
    }
}

impl fmt::Display for ListKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListKind::ValidCredentials => f.write_str("credentials-valid"),
            ListKind::RateLimitedCredentials => f.write_str("credentials-limited"),
            ListKind::ReviewQueue => f.write_str("review-queue"),
        }
    }
}

/// A reproducible page request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListQuery {
    pub kind: ListKind,
    pub filters: BTreeMap<String, String>,
    /// 1-based page number
    pub page: u32,
    pub page_size: u32,
}

impl ListQuery {
    /// First page of `kind` with default filters.
    ///
    /// The review queue always carries an explicit status filter.
    pub fn new(kind: ListKind, page_size: u32) -> Self {
        let mut filters = BTreeMap::new();
        if kind == ListKind::ReviewQueue {
            filters.insert(
                FILTER_STATUS.to_string(),
                ReviewStatus::Pending.as_str().to_string(),
            );
        }
        Self {
            kind,
            filters,
            page: 1,
            page_size: page_size.max(1),
        }
    }

    /// Row offset of the first item on this page
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.page_size)
    }

    pub fn limit(&self) -> u32 {
        self.page_size
    }

    pub fn filter(&self, name: &str) -> Option<&str> {
        self.filters.get(name).map(String::as_str)
    }

    /// Credential filters carried by this query
    pub fn credential_filter(&self) -> CredentialFilter {
        CredentialFilter {
            repo: self.filter(FILTER_REPO).map(str::to_string),
            source: self.filter(FILTER_SOURCE).map(str::to_string),
        }
    }

    /// Review status filter, `None` if absent or unparsable
    pub fn review_status(&self) -> Option<ReviewStatus> {
        self.filter(FILTER_STATUS).and_then(|s| s.parse().ok())
    }

    pub fn review_severity(&self) -> Option<Severity> {
        self.filter(FILTER_SEVERITY).and_then(|s| s.parse().ok())
    }
}

/// One page of items answering a [`ListQuery`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub query: ListQuery,
}

impl<T> ListResult<T> {
    pub fn new(items: Vec<T>, total: u64, query: ListQuery) -> Self {
        Self {
            items,
            total,
            query,
        }
    }

    pub fn total_pages(&self) -> u32 {
        total_pages(self.total, self.query.page_size)
    }

    /// The page lies past the last item while items still exist.
    pub fn overshoots(&self) -> bool {
        self.items.is_empty() && self.total > 0 && self.query.page > self.total_pages()
    }
}

/// `ceil(total / page_size)`, saturating at `u32::MAX`.
pub fn total_pages(total: u64, page_size: u32) -> u32 {
    let size = u64::from(page_size.max(1));
    let pages = total.div_ceil(size);
    u32::try_from(pages).unwrap_or(u32::MAX)
}
