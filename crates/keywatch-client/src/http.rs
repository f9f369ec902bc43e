//! HTTP client for the dashboard server

use std::time::Duration;

use async_trait::async_trait;
use keywatch_sync::{DashboardApi, Page, SyncResult, TransportError};
use keywatch_types::{
    ApiEnvelope, Credential, CredentialFilter, CredentialId, CredentialKind, CredentialPage,
    DisclosureReceipt, ReviewDecision, ReviewItem, ReviewItemId, ReviewPage, ReviewStatus,
    Severity, SummaryStats,
};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::{debug, trace};

/// [`DashboardApi`] over HTTP
#[derive(Debug, Clone)]
pub struct HttpDashboardApi {
    client: Client,
    base_url: String,
}

impl HttpDashboardApi {
    /// Create a client for the server at `endpoint`, e.g. `http://localhost:8080`
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(transport_error)?;

        Ok(Self {
            client,
            base_url: endpoint.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a request and unwrap the envelope.
    ///
    /// Failure envelopes come with 4xx/5xx statuses, so the body is decoded
    /// before the status is looked at.
    async fn call<T: DeserializeOwned>(&self, request: RequestBuilder) -> SyncResult<Option<T>> {
        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        let url = response.url().path().to_string();
        let body = response.bytes().await.map_err(transport_error)?;
        trace!(%url, status = status.as_u16(), bytes = body.len(), "response received");

        match serde_json::from_slice::<ApiEnvelope<T>>(&body) {
            Ok(envelope) => {
                if !envelope.is_success() {
                    debug!(%url, code = envelope.code, message = %envelope.message, "server refused request");
                }
                Ok(envelope.into_result()?)
            }
            Err(err) if status.is_success() => Err(TransportError::Decode(err.to_string()).into()),
            Err(_) => Err(TransportError::Status {
                status: status.as_u16(),
            }
            .into()),
        }
    }

    /// Like [`Self::call`] for endpoints that must return data
    async fn fetch<T: DeserializeOwned>(&self, request: RequestBuilder) -> SyncResult<T> {
        self.call(request)
            .await?
            .ok_or_else(|| TransportError::Decode("response carried no data".into()).into())
    }

    /// Like [`Self::call`] for commands; any payload is ignored
    async fn command(&self, request: RequestBuilder) -> SyncResult<()> {
        self.call::<serde_json::Value>(request).await.map(|_| ())
    }
}

fn transport_error(err: reqwest::Error) -> TransportError {
    if err.is_connect() {
        TransportError::Connect(err.to_string())
    } else if err.is_decode() {
        TransportError::Decode(err.to_string())
    } else {
        TransportError::Request(err.to_string())
    }
}

#[async_trait]
impl DashboardApi for HttpDashboardApi {
    async fn fetch_stats(&self) -> SyncResult<SummaryStats> {
        self.fetch(self.client.get(self.url("/api/stats"))).await
    }

    async fn list_credentials(
        &self,
        kind: CredentialKind,
        filter: &CredentialFilter,
        limit: u32,
        offset: u64,
    ) -> SyncResult<Page<Credential>> {
        let mut query = vec![("limit", limit.to_string()), ("offset", offset.to_string())];
        if let Some(repo) = &filter.repo {
            query.push(("repo", repo.clone()));
        }
        if let Some(source) = &filter.source {
            query.push(("source", source.clone()));
        }

        let request = self
            .client
            .get(self.url(&format!("/api/keys/{}", kind.path_segment())))
            .query(&query);
        let page: CredentialPage = self.call(request).await?.unwrap_or_default();
        Ok(Page {
            items: page.keys,
            total: page.total,
        })
    }

    async fn delete_credential(&self, kind: CredentialKind, id: CredentialId) -> SyncResult<()> {
        let path = format!("/api/keys/{}/{}", kind.path_segment(), id.get());
        self.command(self.client.delete(self.url(&path))).await
    }

    async fn list_review_items(
        &self,
        status: Option<ReviewStatus>,
        severity: Option<Severity>,
        limit: u32,
        offset: u64,
    ) -> SyncResult<Page<ReviewItem>> {
        let mut query = vec![("limit", limit.to_string()), ("offset", offset.to_string())];
        if let Some(status) = status {
            query.push(("status", status.as_str().to_string()));
        }
        if let Some(severity) = severity {
            query.push(("severity", severity.as_str().to_string()));
        }

        let request = self
            .client
            .get(self.url("/api/security/pending"))
            .query(&query);
        let page: ReviewPage = self.call(request).await?.unwrap_or_default();
        Ok(Page {
            items: page.issues,
            total: page.total,
        })
    }

    async fn fetch_review_item(&self, id: ReviewItemId) -> SyncResult<ReviewItem> {
        let path = format!("/api/security/issue/{}", id.get());
        self.fetch(self.client.get(self.url(&path))).await
    }

    async fn submit_review(&self, id: ReviewItemId, decision: &ReviewDecision) -> SyncResult<()> {
        let path = format!("/api/security/review/{}", id.get());
        self.command(self.client.post(self.url(&path)).json(decision))
            .await
    }

    async fn request_disclosure(&self, id: ReviewItemId) -> SyncResult<DisclosureReceipt> {
        let path = format!("/api/security/create-issue/{}", id.get());
        let receipt = self.call(self.client.post(self.url(&path))).await?;
        Ok(receipt.unwrap_or_default())
    }

    async fn start_scan(&self) -> SyncResult<()> {
        self.command(self.client.post(self.url("/api/scan/start")))
            .await
    }

    async fn stop_scan(&self) -> SyncResult<()> {
        self.command(self.client.post(self.url("/api/scan/stop")))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let api = HttpDashboardApi::new("http://localhost:8080", Duration::from_secs(5)).unwrap();
        assert_eq!(api.base_url(), "http://localhost:8080");
    }

    #[test]
    fn test_endpoint_normalization() {
        let api = HttpDashboardApi::new("http://localhost:8080/", Duration::from_secs(5)).unwrap();
        assert_eq!(api.url("/api/stats"), "http://localhost:8080/api/stats");
    }
}
