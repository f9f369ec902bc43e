//! Summary statistics shown on the dashboard header

use serde::{Deserialize, Serialize};

/// Storage counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageStats {
    #[serde(default)]
    pub valid_keys: u64,
    #[serde(default)]
    pub rate_limited_keys: u64,
    #[serde(default)]
    pub total_files_scanned: u64,
}

/// Progress of the background scan
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStats {
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub total_queries: u64,
    #[serde(default)]
    pub processed_queries: u64,
    #[serde(default)]
    pub current_query: String,
    #[serde(default)]
    pub processed_files: u64,
    #[serde(default)]
    pub error_count: u64,
}

impl ScanStats {
    /// Query progress in percent, `None` until the scan knows its query count.
    pub fn progress_percent(&self) -> Option<f64> {
        if self.total_queries == 0 {
            return None;
        }
        let done = self.processed_queries.min(self.total_queries) as f64;
        Some(done / self.total_queries as f64 * 100.0)
    }
}

/// `data` of the stats endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryStats {
    #[serde(default)]
    pub storage: StorageStats,
    #[serde(default)]
    pub scan: ScanStats,
}
