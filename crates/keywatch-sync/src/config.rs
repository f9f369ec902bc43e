//! Tunables of the synchronization core

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Synchronization configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Delay before reconnecting a closed push channel
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_ms: u64,

    /// Stats poll interval while the push channel is not open
    #[serde(default = "default_fallback_poll_interval")]
    pub fallback_poll_interval_ms: u64,

    /// Items per page
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Page numbers shown around the current page
    #[serde(default = "default_page_window")]
    pub page_window: u32,

    /// Retained log lines
    #[serde(default = "default_log_capacity")]
    pub log_capacity: usize,

    /// Retained inline notices
    #[serde(default = "default_notice_capacity")]
    pub notice_capacity: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            reconnect_delay_ms: default_reconnect_delay(),
            fallback_poll_interval_ms: default_fallback_poll_interval(),
            page_size: default_page_size(),
            page_window: default_page_window(),
            log_capacity: default_log_capacity(),
            notice_capacity: default_notice_capacity(),
        }
    }
}

impl SyncConfig {
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms.max(1))
    }

    pub fn fallback_poll_interval(&self) -> Duration {
        Duration::from_millis(self.fallback_poll_interval_ms.max(1))
    }
}

fn default_reconnect_delay() -> u64 {
    5_000
}

fn default_fallback_poll_interval() -> u64 {
    10_000
}

fn default_page_size() -> u32 {
    20
}

fn default_page_window() -> u32 {
    5
}

fn default_log_capacity() -> usize {
    200
}

fn default_notice_capacity() -> usize {
    20
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SyncConfig::default();
        assert_eq!(config.reconnect_delay(), Duration::from_secs(5));
        assert_eq!(config.fallback_poll_interval(), Duration::from_secs(10));
        assert_eq!(config.page_size, 20);
        assert_eq!(config.page_window, 5);
    }

    #[test]
    fn test_partial_deserialization_keeps_defaults() {
        let config: SyncConfig = serde_json::from_str(r#"{"page_size": 50}"#).unwrap();
        assert_eq!(config.page_size, 50);
        assert_eq!(config.reconnect_delay_ms, 5_000);
    }
}
