//! Backup strategies.
//!
//! One strategy per supported engine, selected strictly by the target's
//! declared engine. PostgreSQL and MariaDB shell out to their dump tools;
//! Redis is exported natively.

mod mariadb;
mod postgres;
mod redis;

use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;

use tokio::process::Command;

use common::errors::{AppError, AppResult};
use common::models::{DatabaseTarget, DbType, DumpTools};

/// Settings shared by all strategies in a run.
#[derive(Debug, Clone)]
pub struct StrategyContext {
    pub tools: DumpTools,
    pub connect_timeout: Duration,
}

/// Backup strategy for one engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Postgres,
    MariaDB,
    Redis,
}

impl Strategy {
    /// Selects the strategy for an engine; `None` for unsupported engines.
    pub fn for_engine(engine: &DbType) -> Option<Self> {
        match engine {
            DbType::Postgres => Some(Strategy::Postgres),
            DbType::MariaDB => Some(Strategy::MariaDB),
            DbType::Redis => Some(Strategy::Redis),
            DbType::Unsupported(_) => None,
        }
    }

    /// Artifact file extension.
    pub fn extension(&self) -> &'static str {
        match self {
            Strategy::Postgres | Strategy::MariaDB => "sql",
            Strategy::Redis => "resp",
        }
    }

    /// Backs up `target` into `artifact`.
    pub async fn backup(
        &self,
        target: &DatabaseTarget,
        artifact: &Path,
        ctx: &StrategyContext,
    ) -> AppResult<PathBuf> {
        match self {
            Strategy::Postgres => postgres::backup(target, artifact, &ctx.tools.pg_dump).await?,
            Strategy::MariaDB => mariadb::backup(target, artifact, &ctx.tools.mysqldump).await?,
            Strategy::Redis => self::redis::backup(target, artifact, ctx.connect_timeout).await?,
        }
        Ok(artifact.to_path_buf())
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Strategy::Postgres => write!(f, "postgres"),
            Strategy::MariaDB => write!(f, "mariadb"),
            Strategy::Redis => write!(f, "redis"),
        }
    }
}

/// Runs an external dump command to completion.
///
/// A spawn failure or non-zero exit becomes `ExternalProcess` carrying the
/// combined stdout/stderr.
async fn run_dump(program: &str, mut cmd: Command) -> AppResult<()> {
    tracing::debug!(program = %program, "running dump command");

    let output = cmd
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| AppError::ExternalProcess {
            program: program.to_string(),
            status: "not started".to_string(),
            output: e.to_string(),
        })?;

    if output.status.success() {
        return Ok(());
    }

    Err(AppError::ExternalProcess {
        program: program.to_string(),
        status: output.status.to_string(),
        output: combined_output(&output),
    })
}

fn combined_output(output: &Output) -> String {
    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    text.push_str(&String::from_utf8_lossy(&output.stderr));
    text
}
