//! Backup configuration.
//!
//! Loads the YAML run description, applies defaults and validates it
//! before any backup starts.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use validator::Validate;

use crate::errors::{AppError, AppResult};
use crate::models::{BackupRun, DatabaseTarget, DumpTools};

/// Ping timeout applied when unset or not positive.
pub const DEFAULT_PING_TIMEOUT_SECS: i64 = 10;
/// Redis connect timeout applied when unset or not positive.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: i64 = 30;

/// Configuration file contents.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct BackupConfig {
    /// Databases to back up, in order.
    #[serde(default)]
    pub databases: Vec<DatabaseTarget>,
    /// Output directory for artifacts.
    #[validate(length(min = 1, message = "backup_dir must not be empty"))]
    #[serde(default)]
    pub backup_dir: String,
    /// URLs to ping before the backup run.
    #[serde(default)]
    pub pre_ping_urls: Vec<String>,
    /// URLs to ping after the backup run.
    #[serde(default)]
    pub post_ping_urls: Vec<String>,
    /// Timeout in seconds for each ping round.
    #[serde(default)]
    pub ping_timeout_seconds: i64,
    /// Timeout in seconds for establishing Redis connections.
    #[serde(default)]
    pub connect_timeout_seconds: i64,
    /// External dump executables.
    #[serde(default)]
    pub tools: DumpTools,
}

impl BackupConfig {
    /// Reads and parses the configuration file at `path`.
    pub fn load(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("error reading config file {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&data)
    }

    /// Parses a YAML document and applies defaults.
    pub fn from_yaml(data: &str) -> AppResult<Self> {
        let mut config: BackupConfig = serde_yml::from_str(data)
            .map_err(|e| AppError::Config(format!("error parsing config file: {}", e)))?;

        if config.ping_timeout_seconds <= 0 {
            config.ping_timeout_seconds = DEFAULT_PING_TIMEOUT_SECS;
        }
        if config.connect_timeout_seconds <= 0 {
            config.connect_timeout_seconds = DEFAULT_CONNECT_TIMEOUT_SECS;
        }

        tracing::debug!(databases = config.databases.len(), "configuration parsed");
        Ok(config)
    }

    /// Overrides the output directory (CLI / environment).
    pub fn with_backup_dir(mut self, dir: impl Into<String>) -> Self {
        self.backup_dir = dir.into();
        self
    }

    /// Validates the whole configuration.
    ///
    /// Targets with an unknown engine are only checked for a usable display
    /// name; they are skipped at run time, not rejected here.
    pub fn check(&self) -> AppResult<()> {
        self.validate()
            .map_err(|e| AppError::Config(e.to_string()))?;

        for (index, target) in self.databases.iter().enumerate() {
            let result = if target.engine.is_supported() {
                target.validate().map_err(|e| e.to_string())
            } else if target.display_name().is_empty() {
                Err("either alias or database must be set".to_string())
            } else {
                Ok(())
            };
            result.map_err(|e| {
                AppError::Config(format!("databases[{}] ({}): {}", index, target.engine, e))
            })?;
        }
        Ok(())
    }

    /// Validates and freezes the configuration into a run description.
    pub fn into_run(self) -> AppResult<BackupRun> {
        self.check()?;
        Ok(BackupRun {
            backup_dir: PathBuf::from(self.backup_dir),
            databases: self.databases,
            pre_ping_urls: self.pre_ping_urls,
            post_ping_urls: self.post_ping_urls,
            ping_timeout: Duration::from_secs(self.ping_timeout_seconds as u64),
            connect_timeout: Duration::from_secs(self.connect_timeout_seconds as u64),
            tools: self.tools,
        })
    }
}
