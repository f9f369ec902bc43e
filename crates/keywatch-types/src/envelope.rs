//! The `{code, message, data}` response envelope
//!
//! Every pull and command endpoint answers with the same shape: `code == 0`
//! is success, anything else is an application-level failure whose `message`
//! is meant for the operator.

use serde::{Deserialize, Deserializer, Serialize};

use crate::credential::Credential;
use crate::error::ApplicationError;
use crate::review::ReviewItem;

/// Generic response envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    /// Zero on success
    pub code: i64,

    /// Operator-facing message
    #[serde(default)]
    pub message: String,

    /// Payload, absent for pure commands
    #[serde(default = "Option::default", skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiEnvelope<T> {
    /// Successful envelope carrying a payload
    pub fn ok(data: T) -> Self {
        Self {
            code: 0,
            message: "success".to_string(),
            data: Some(data),
        }
    }

    /// Failed envelope
    pub fn failure(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == 0
    }

    /// Split the envelope into its payload or an [`ApplicationError`].
    pub fn into_result(self) -> Result<Option<T>, ApplicationError> {
        if self.is_success() {
            return Ok(self.data);
        }
        let message = if self.message.trim().is_empty() {
            "request failed".to_string()
        } else {
            self.message
        };
        Err(ApplicationError::new(self.code, message))
    }
}

impl ApiEnvelope<()> {
    /// Successful envelope without payload
    pub fn done(message: impl Into<String>) -> Self {
        Self {
            code: 0,
            message: message.into(),
            data: None,
        }
    }
}

/// `data` of a credential listing
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CredentialPage {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub keys: Vec<Credential>,
    #[serde(default)]
    pub total: u64,
}

/// `data` of a review queue listing
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReviewPage {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub issues: Vec<ReviewItem>,
    #[serde(default)]
    pub total: u64,
}

/// `data` of a successful disclosure request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisclosureReceipt {
    /// Handle of the external resource that was created, when the server
    /// already knows it
    #[serde(default, alias = "disclosure_ref")]
    pub issue_url: Option<String>,
}

impl DisclosureReceipt {
    /// Non-empty reference, if any
    pub fn reference(&self) -> Option<&str> {
        self.issue_url
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

// Go-style servers encode empty slices as `null`.
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
