//! Session context
//!
//! Everything that lives for the whole operator session: the API handle, the
//! single push channel and the configuration. Components receive what they
//! need from here instead of reaching for globals. Teardown cancels one root
//! token, which stops the reconnect loop, the fallback ticker and every
//! request task of every dashboard created from the session.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::api::{DashboardApi, PushConnector};
use crate::channel::LiveChannel;
use crate::config::SyncConfig;
use crate::dashboard::Dashboard;

pub struct Session {
    api: Arc<dyn DashboardApi>,
    channel: LiveChannel,
    config: SyncConfig,
    cancel: CancellationToken,
}

impl Session {
    pub fn new(
        api: Arc<dyn DashboardApi>,
        connector: Arc<dyn PushConnector>,
        config: SyncConfig,
    ) -> Self {
        let cancel = CancellationToken::new();
        let channel = LiveChannel::new(connector, &config, cancel.child_token());
        Self {
            api,
            channel,
            config,
            cancel,
        }
    }

    pub fn api(&self) -> Arc<dyn DashboardApi> {
        self.api.clone()
    }

    /// The session-wide push channel. Components subscribe; only the session
    /// starts or stops it.
    pub fn channel(&self) -> &LiveChannel {
        &self.channel
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Open the push channel. Must be called from within a tokio runtime.
    pub fn start(&self) {
        self.channel.connect();
    }

    /// A dashboard bound to this session's lifetime
    pub fn dashboard(&self) -> Dashboard {
        Dashboard::new(self.api.clone(), &self.config, self.cancel.child_token())
    }

    pub fn is_torn_down(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Cancel all timers and requests owned by the session and wait for the
    /// channel tasks to exit.
    pub async fn teardown(&self) {
        if !self.cancel.is_cancelled() {
            info!("tearing down session");
        }
        self.cancel.cancel();
        self.channel.join().await;
    }
}
