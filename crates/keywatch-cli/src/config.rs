//! CLI configuration

use crate::error::{CliError, CliResult};
use keywatch_sync::SyncConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Endpoint used when neither the command line nor the file names one
pub const DEFAULT_ENDPOINT: &str = "http://localhost:8080";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// CLI configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CliConfig {
    /// Dashboard server endpoint
    pub endpoint: Option<String>,

    /// Identity recorded on review decisions
    pub reviewer: Option<String>,

    /// Request timeout in seconds
    pub request_timeout_secs: Option<u64>,

    /// Emit logs as JSON lines
    #[serde(default)]
    pub log_json: bool,

    /// Synchronization tunables
    #[serde(default)]
    pub sync: SyncConfig,
}

impl CliConfig {
    /// Load configuration from file
    pub fn load(path: Option<&str>) -> CliResult<Self> {
        let config_path = match path {
            Some(p) => PathBuf::from(p),
            None => Self::default_config_path()?,
        };

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path)?;
            let config: CliConfig =
                toml::from_str(&contents).map_err(|e| CliError::Config(e.to_string()))?;
            Ok(config)
        } else {
            Ok(CliConfig::default())
        }
    }

    /// Get the default configuration file path
    pub fn default_config_path() -> CliResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| CliError::Config("Cannot find config directory".into()))?;
        Ok(config_dir.join("keywatch").join("config.toml"))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS).max(1))
    }
}
