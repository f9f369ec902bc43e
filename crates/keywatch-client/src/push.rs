//! WebSocket push connector

use async_trait::async_trait;
use futures::StreamExt;
use keywatch_sync::{PushConnector, PushStream, TransportError};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, trace};

/// Opens the server's push channel at `/api/ws`
#[derive(Debug, Clone)]
pub struct WsConnector {
    url: String,
}

impl WsConnector {
    /// Connect to an explicit `ws://` or `wss://` URL
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    /// Derive the push URL from the HTTP endpoint of the server
    pub fn from_endpoint(endpoint: &str) -> Result<Self, TransportError> {
        let endpoint = endpoint.trim_end_matches('/');
        let base = if let Some(rest) = endpoint.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = endpoint.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            return Err(TransportError::Connect(format!(
                "endpoint must start with http:// or https://: {endpoint}"
            )));
        };
        Ok(Self::new(format!("{base}/api/ws")))
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl PushConnector for WsConnector {
    async fn connect(&self) -> Result<PushStream, TransportError> {
        let (socket, _) = connect_async(self.url.as_str())
            .await
            .map_err(|err| TransportError::Connect(err.to_string()))?;
        debug!(url = %self.url, "push socket connected");

        // Text frames only. A close frame or a read error ends the stream.
        let frames = futures::stream::unfold(Some(socket), |socket| async move {
            let mut socket = socket?;
            loop {
                match socket.next().await {
                    Some(Ok(Message::Text(text))) => return Some((Ok(text), Some(socket))),
                    Some(Ok(Message::Close(frame))) => {
                        debug!(?frame, "server closed push socket");
                        return None;
                    }
                    Some(Ok(other)) => trace!(kind = ?other, "ignoring non-text frame"),
                    Some(Err(err)) => {
                        return Some((Err(TransportError::Closed(err.to_string())), None))
                    }
                    None => return None,
                }
            }
        });

        Ok(frames.boxed())
    }
}
