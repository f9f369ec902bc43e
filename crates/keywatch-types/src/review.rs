//! Security findings awaiting human review before public disclosure
//!
//! The lifecycle is a directed graph without cycles:
//!
//! ```text
//! pending  --approve(reviewer, note?)-->  approved
//! pending  --reject(reviewer, note!)-->   rejected
//! approved --create disclosure-->         created
//! ```
//!
//! `rejected` and `created` are terminal. Only the server moves an item along
//! an edge; clients propose.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ids::ReviewItemId;

/// Review status of a finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    Pending,
    Approved,
    Rejected,
    Created,
}

impl ReviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewStatus::Pending => "pending",
            ReviewStatus::Approved => "approved",
            ReviewStatus::Rejected => "rejected",
            ReviewStatus::Created => "created",
        }
    }

    /// Whether `next` is a forward edge of the lifecycle graph.
    pub fn can_advance_to(&self, next: ReviewStatus) -> bool {
        matches!(
            (self, next),
            (ReviewStatus::Pending, ReviewStatus::Approved)
                | (ReviewStatus::Pending, ReviewStatus::Rejected)
                | (ReviewStatus::Approved, ReviewStatus::Created)
        )
    }

    /// No outgoing edges
    pub fn is_terminal(&self) -> bool {
        matches!(self, ReviewStatus::Rejected | ReviewStatus::Created)
    }
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReviewStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(ReviewStatus::Pending),
            "approved" => Ok(ReviewStatus::Approved),
            "rejected" => Ok(ReviewStatus::Rejected),
            "created" => Ok(ReviewStatus::Created),
            other => Err(format!("unknown review status: {other}")),
        }
    }
}

/// Severity of a finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "critical" => Ok(Severity::Critical),
            "high" => Ok(Severity::High),
            "medium" => Ok(Severity::Medium),
            other => Err(format!("unknown severity: {other}")),
        }
    }
}

/// A reviewer's decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewAction {
    Approve,
    Reject,
}

impl ReviewAction {
    /// Status the server moves a pending item to on success
    pub fn target_status(&self) -> ReviewStatus {
        match self {
            ReviewAction::Approve => ReviewStatus::Approved,
            ReviewAction::Reject => ReviewStatus::Rejected,
        }
    }

    /// Whether the decision must carry a rationale
    pub fn requires_note(&self) -> bool {
        matches!(self, ReviewAction::Reject)
    }
}

impl fmt::Display for ReviewAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReviewAction::Approve => f.write_str("approve"),
            ReviewAction::Reject => f.write_str("reject"),
        }
    }
}

/// Request body of a review submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewDecision {
    pub action: ReviewAction,
    pub reviewed_by: String,
    #[serde(default)]
    pub review_note: String,
}

/// A finding in the review queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewItem {
    pub id: ReviewItemId,

    pub severity: Severity,

    pub status: ReviewStatus,

    /// Identity that decided the item
    #[serde(
        default,
        rename = "reviewed_by",
        alias = "reviewer",
        deserialize_with = "blank_as_none"
    )]
    pub reviewer: Option<String>,

    #[serde(
        default,
        rename = "review_note",
        alias = "note",
        deserialize_with = "blank_as_none"
    )]
    pub note: Option<String>,

    /// Handle of the public disclosure once created
    #[serde(
        default,
        rename = "issue_url",
        alias = "disclosure_ref",
        deserialize_with = "blank_as_none"
    )]
    pub disclosure_ref: Option<String>,

    #[serde(default)]
    pub key_type: String,

    #[serde(default)]
    pub provider: String,

    #[serde(default)]
    pub repo_name: String,

    #[serde(default)]
    pub file_path: String,

    #[serde(default)]
    pub file_url: String,

    #[serde(default)]
    pub key_preview: String,

    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl ReviewItem {
    /// Minimal item, mostly useful for fixtures
    pub fn new(id: ReviewItemId, severity: Severity, status: ReviewStatus) -> Self {
        Self {
            id,
            severity,
            status,
            reviewer: None,
            note: None,
            disclosure_ref: None,
            key_type: String::new(),
            provider: String::new(),
            repo_name: String::new(),
            file_path: String::new(),
            file_url: String::new(),
            key_preview: String::new(),
            created_at: None,
        }
    }

    /// A disclosure exists or is known to have been created
    pub fn is_disclosed(&self) -> bool {
        self.status == ReviewStatus::Created || self.disclosure_ref.is_some()
    }
}

fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}
