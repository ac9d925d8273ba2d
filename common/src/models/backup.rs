//! Backup run models.
//!
//! Contains the immutable run description and the per-target results.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use super::connection::DatabaseTarget;
use crate::errors::AppError;

/// Default executable for PostgreSQL dumps.
pub const DEFAULT_PG_DUMP: &str = "pg_dump";
/// Default executable for MariaDB dumps.
pub const DEFAULT_MYSQLDUMP: &str = "mysqldump";

/// External dump executables.
#[derive(Debug, Clone, Deserialize)]
pub struct DumpTools {
    /// `pg_dump` executable name or path.
    #[serde(default = "default_pg_dump")]
    pub pg_dump: String,
    /// `mysqldump` executable name or path.
    #[serde(default = "default_mysqldump")]
    pub mysqldump: String,
}

fn default_pg_dump() -> String {
    DEFAULT_PG_DUMP.to_string()
}

fn default_mysqldump() -> String {
    DEFAULT_MYSQLDUMP.to_string()
}

impl Default for DumpTools {
    fn default() -> Self {
        Self {
            pg_dump: default_pg_dump(),
            mysqldump: default_mysqldump(),
        }
    }
}

/// One invocation of the backup runner. Not mutated once built.
#[derive(Debug, Clone)]
pub struct BackupRun {
    /// Directory receiving every artifact of the run.
    pub backup_dir: PathBuf,
    /// Targets in configuration order.
    pub databases: Vec<DatabaseTarget>,
    /// URLs probed before any backup starts.
    pub pre_ping_urls: Vec<String>,
    /// URLs probed after all backups finished.
    pub post_ping_urls: Vec<String>,
    /// Per-request and per-round ping deadline.
    pub ping_timeout: Duration,
    /// Deadline for establishing a Redis connection.
    pub connect_timeout: Duration,
    /// External dump executables.
    pub tools: DumpTools,
}

/// Outcome of backing up one target.
#[derive(Debug)]
pub struct BackupResult {
    /// Display name of the target.
    pub target: String,
    /// Declared engine, as configured.
    pub engine: String,
    /// Written artifact, if the backup succeeded.
    pub artifact: Option<PathBuf>,
    /// Failure, if the backup failed or was skipped.
    pub error: Option<AppError>,
}

impl BackupResult {
    pub fn succeeded(target: &DatabaseTarget, artifact: PathBuf) -> Self {
        Self {
            target: target.display_name().to_string(),
            engine: target.engine.to_string(),
            artifact: Some(artifact),
            error: None,
        }
    }

    pub fn failed(target: &DatabaseTarget, error: AppError) -> Self {
        Self {
            target: target.display_name().to_string(),
            engine: target.engine.to_string(),
            artifact: None,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Skipped targets never reached a strategy.
    pub fn is_skipped(&self) -> bool {
        matches!(self.error, Some(AppError::UnsupportedEngine(_)))
    }
}

/// Results of a whole run, in configuration order.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub run_id: String,
    pub results: Vec<BackupResult>,
}

impl RunSummary {
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    pub fn skipped(&self) -> usize {
        self.results.iter().filter(|r| r.is_skipped()).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded() - self.skipped()
    }
}
