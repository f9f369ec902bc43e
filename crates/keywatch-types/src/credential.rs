//! Discovered credentials

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ids::CredentialId;

/// Which credential list an item belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CredentialKind {
    /// Validated, working credentials
    Valid,
    /// Credentials whose validation hit a rate limit
    RateLimited,
}

impl CredentialKind {
    /// Path segment used by the list and delete endpoints
    pub fn path_segment(&self) -> &'static str {
        match self {
            CredentialKind::Valid => "valid",
            CredentialKind::RateLimited => "rate-limited",
        }
    }
}

impl fmt::Display for CredentialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path_segment())
    }
}

impl FromStr for CredentialKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "valid" => Ok(CredentialKind::Valid),
            "rate-limited" | "rate_limited" | "limited" => Ok(CredentialKind::RateLimited),
            other => Err(format!("unknown credential kind: {other}")),
        }
    }
}

/// Optional narrowing of a credential listing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialFilter {
    /// Repository name substring
    pub repo: Option<String>,
    /// Discovery source
    pub source: Option<String>,
}

/// A discovered credential row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    pub id: CredentialId,

    /// Raw key material; masking is a display concern
    pub key: String,

    #[serde(default)]
    pub provider: Option<String>,

    #[serde(default)]
    pub source: String,

    #[serde(default)]
    pub repo_name: String,

    #[serde(default)]
    pub file_path: String,

    #[serde(default)]
    pub file_url: String,

    #[serde(default)]
    pub sha: String,

    /// Tier classification of a valid key (free, paid, unknown)
    #[serde(default)]
    pub tier: Option<String>,

    #[serde(default)]
    pub tier_confidence: Option<f64>,

    /// Rate-limit reason, rate-limited keys only
    #[serde(default)]
    pub reason: Option<String>,

    #[serde(default)]
    pub validated_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}
