//! CLI command implementations

pub mod keys;
pub mod review;
pub mod scan;
pub mod stats;
pub mod watch;

use std::sync::Arc;

use keywatch_client::HttpDashboardApi;
use keywatch_sync::{Dashboard, DashboardApi, NoticeLevel, SyncConfig};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::output::{print_notice, OutputFormat};

/// Everything a command needs to talk to the server
pub struct Context {
    api: Arc<dyn DashboardApi>,
    pub endpoint: String,
    pub reviewer: Option<String>,
    pub sync: SyncConfig,
    pub format: OutputFormat,
}

impl Context {
    pub fn new(
        endpoint: String,
        reviewer: Option<String>,
        config: &CliConfig,
        format: OutputFormat,
    ) -> CliResult<Self> {
        let api = HttpDashboardApi::new(&endpoint, config.request_timeout())?;
        debug!(endpoint = %endpoint, reviewer = ?reviewer, "dashboard context ready");
        Ok(Self {
            api: Arc::new(api),
            endpoint,
            reviewer,
            sync: config.sync.clone(),
            format,
        })
    }

    pub fn api(&self) -> Arc<dyn DashboardApi> {
        self.api.clone()
    }

    /// A dashboard for one command; dropped with it
    pub fn dashboard(&self) -> Dashboard {
        Dashboard::new(self.api(), &self.sync, CancellationToken::new())
    }

    pub fn reviewer(&self) -> &str {
        self.reviewer.as_deref().unwrap_or_default()
    }
}

/// Wait for every outstanding request, print the notices it produced and
/// fail on the first error notice.
pub async fn settle(dash: &mut Dashboard) -> CliResult<()> {
    dash.settle().await;

    let mut failure = None;
    let shown: Vec<u64> = dash.notices().iter().map(|n| n.id).collect();
    for notice in dash.notices().iter() {
        match notice.level {
            NoticeLevel::Error => {
                failure.get_or_insert_with(|| notice.message.clone());
            }
            level => print_notice(level, &notice.message),
        }
    }
    for id in shown {
        dash.dismiss_notice(id);
    }

    match failure {
        Some(message) => Err(CliError::Rejected(message)),
        None => Ok(()),
    }
}
