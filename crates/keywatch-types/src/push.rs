//! Push channel vocabulary
//!
//! Frames arrive as `{"type": "...", "data": ...}`. Only the three known
//! message types are modelled; anything else is skipped without error so a
//! newer server can add message kinds without breaking older dashboards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::stats::{ScanStats, StorageStats, SummaryStats};

/// Liveness of the push connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelState {
    Connecting,
    Open,
    Closed,
}

impl fmt::Display for ChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelState::Connecting => write!(f, "connecting"),
            ChannelState::Open => write!(f, "open"),
            ChannelState::Closed => write!(f, "closed"),
        }
    }
}

/// Partial stats carried by a `stats_update` frame
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsPatch {
    #[serde(default)]
    pub storage: Option<StorageStats>,
    #[serde(default)]
    pub scan: Option<ScanStats>,
}

impl StatsPatch {
    /// Merge the patch into the current snapshot.
    pub fn apply_to(&self, stats: &mut SummaryStats) {
        if let Some(storage) = &self.storage {
            stats.storage = storage.clone();
        }
        if let Some(scan) = &self.scan {
            stats.scan = scan.clone();
        }
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_none() && self.scan.is_none()
    }

    fn from_value(data: serde_json::Value) -> Result<Self, serde_json::Error> {
        let has_sections = data
            .as_object()
            .map(|obj| obj.contains_key("storage") || obj.contains_key("scan"))
            .unwrap_or(false);
        if has_sections {
            return serde_json::from_value(data);
        }
        // Some servers push the bare scan snapshot.
        let scan: ScanStats = serde_json::from_value(data)?;
        Ok(StatsPatch {
            storage: None,
            scan: Some(scan),
        })
    }
}

/// A log line streamed by the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

fn default_level() -> String {
    "info".to_string()
}

/// A decoded push message, consumed once
#[derive(Debug, Clone, PartialEq)]
pub enum PushEvent {
    StatsUpdate(StatsPatch),
    ScanUpdate(ScanStats),
    LogEntry(LogRecord),
}

#[derive(Deserialize)]
struct RawFrame {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: serde_json::Value,
}

impl PushEvent {
    /// Wire name of the message type
    pub fn type_name(&self) -> &'static str {
        match self {
            PushEvent::StatsUpdate(_) => "stats_update",
            PushEvent::ScanUpdate(_) => "scan_update",
            PushEvent::LogEntry(_) => "log_entry",
        }
    }

    /// Decode a text frame.
    ///
    /// Returns `Ok(None)` for well-formed frames of an unknown type.
    pub fn from_frame(frame: &str) -> Result<Option<PushEvent>, serde_json::Error> {
        let raw: RawFrame = serde_json::from_str(frame)?;
        let event = match raw.kind.as_str() {
            "stats_update" => PushEvent::StatsUpdate(StatsPatch::from_value(raw.data)?),
            "scan_update" => PushEvent::ScanUpdate(serde_json::from_value(raw.data)?),
            "log_entry" => PushEvent::LogEntry(serde_json::from_value(raw.data)?),
            _ => return Ok(None),
        };
        Ok(Some(event))
    }

    /// Encode as a text frame
    pub fn to_frame(&self) -> Result<String, serde_json::Error> {
        let data = match self {
            PushEvent::StatsUpdate(patch) => serde_json::to_value(patch)?,
            PushEvent::ScanUpdate(scan) => serde_json::to_value(scan)?,
            PushEvent::LogEntry(record) => serde_json::to_value(record)?,
        };
        serde_json::to_string(&serde_json::json!({
            "type": self.type_name(),
            "data": data,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_type_is_ignored() {
        let event = PushEvent::from_frame(r#"{"type":"heartbeat","data":{}}"#).unwrap();
        assert!(event.is_none());
    }

    #[test]
    fn test_malformed_frame_is_an_error() {
        assert!(PushEvent::from_frame("not json").is_err());
        assert!(PushEvent::from_frame(r#"{"data":{}}"#).is_err());
    }

    #[test]
    fn test_stats_update_with_sections() {
        let frame = r#"{"type":"stats_update","data":{"storage":{"valid_keys":5},"scan":{"is_active":true}}}"#;
        let Some(PushEvent::StatsUpdate(patch)) = PushEvent::from_frame(frame).unwrap() else {
            panic!("expected stats update");
        };
        assert_eq!(patch.storage.unwrap().valid_keys, 5);
        assert!(patch.scan.unwrap().is_active);
    }

    #[test]
    fn test_bare_scan_snapshot_is_scan_only_patch() {
        let frame = r#"{"type":"stats_update","data":{"is_active":true,"total_queries":10,"processed_queries":4}}"#;
        let Some(PushEvent::StatsUpdate(patch)) = PushEvent::from_frame(frame).unwrap() else {
            panic!("expected stats update");
        };
        assert!(patch.storage.is_none());
        assert_eq!(patch.scan.unwrap().processed_queries, 4);
    }

    #[test]
    fn test_patch_merges_only_present_sections() {
        let mut stats = SummaryStats::default();
        stats.storage.valid_keys = 9;
        let patch = StatsPatch {
            storage: None,
            scan: Some(ScanStats {
                is_active: true,
                ..Default::default()
            }),
        };
        patch.apply_to(&mut stats);
        assert_eq!(stats.storage.valid_keys, 9);
        assert!(stats.scan.is_active);
    }

    #[test]
    fn test_frame_round_trip_keeps_type() {
        let event = PushEvent::LogEntry(LogRecord {
            level: "warn".into(),
            message: "token exhausted".into(),
            timestamp: None,
        });
        let decoded = PushEvent::from_frame(&event.to_frame().unwrap()).unwrap();
        assert_eq!(decoded, Some(event));
    }
}
