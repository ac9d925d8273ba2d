//! Backup run orchestration.
//!
//! A run moves through `PrePing -> Executing -> PostPing -> Done`. Targets
//! are processed one at a time in configuration order; a failing target is
//! reported and the run moves on. Ping failures are warnings only.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::Instrument;
use uuid::Uuid;

use common::models::{BackupResult, BackupRun, DatabaseTarget, RunSummary};
use common::utils::artifact_path;
use common::{AppError, AppResult};

use crate::ping::Pinger;
use crate::reporter::RunReporter;
use crate::strategy::{Strategy, StrategyContext};

/// Phases of a backup run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    PrePing,
    Executing,
    PostPing,
    Done,
}

/// Runs a selected strategy against one target.
#[async_trait]
pub trait BackupExecutor: Send + Sync {
    async fn execute(
        &self,
        strategy: Strategy,
        target: &DatabaseTarget,
        backup_dir: &Path,
    ) -> AppResult<PathBuf>;
}

/// Executor that names the artifact and runs the real strategy.
#[derive(Debug, Clone)]
pub struct LiveExecutor {
    ctx: StrategyContext,
}

impl LiveExecutor {
    pub fn new(ctx: StrategyContext) -> Self {
        Self { ctx }
    }

    pub fn from_run(run: &BackupRun) -> Self {
        Self::new(StrategyContext {
            tools: run.tools.clone(),
            connect_timeout: run.connect_timeout,
        })
    }
}

#[async_trait]
impl BackupExecutor for LiveExecutor {
    async fn execute(
        &self,
        strategy: Strategy,
        target: &DatabaseTarget,
        backup_dir: &Path,
    ) -> AppResult<PathBuf> {
        let artifact = artifact_path(backup_dir, target.display_name(), strategy.extension());
        strategy.backup(target, &artifact, &self.ctx).await
    }
}

/// Drives a backup run and reports every step.
pub struct Orchestrator<E, R> {
    executor: E,
    reporter: R,
}

impl<E, R> Orchestrator<E, R>
where
    E: BackupExecutor,
    R: RunReporter,
{
    pub fn new(executor: E, reporter: R) -> Self {
        Self { executor, reporter }
    }

    /// Executes all phases of `run`. Per-target failures end up in the
    /// returned summary, never as an error.
    pub async fn run(&self, run: &BackupRun) -> RunSummary {
        let run_id = Uuid::new_v4().to_string();
        let span = tracing::info_span!("backup_run", run_id = %run_id);
        self.run_phases(run, run_id).instrument(span).await
    }

    async fn run_phases(&self, run: &BackupRun, run_id: String) -> RunSummary {
        let pinger = Pinger::new(run.ping_timeout);

        self.reporter.phase(RunPhase::PrePing);
        self.ping(&pinger, RunPhase::PrePing, &run.pre_ping_urls).await;

        self.reporter.phase(RunPhase::Executing);
        let mut summary = RunSummary {
            run_id,
            results: Vec::with_capacity(run.databases.len()),
        };
        for target in &run.databases {
            let result = self.backup_target(target, &run.backup_dir).await;
            self.reporter.target_finished(&result);
            summary.results.push(result);
        }

        self.reporter.phase(RunPhase::PostPing);
        self.ping(&pinger, RunPhase::PostPing, &run.post_ping_urls).await;

        self.reporter.phase(RunPhase::Done);
        self.reporter.run_finished(&summary);
        summary
    }

    async fn ping(&self, pinger: &Pinger, phase: RunPhase, urls: &[String]) {
        if let Err(e) = pinger.ping_all(urls).await {
            self.reporter.ping_failed(phase, &e);
        }
    }

    async fn backup_target(&self, target: &DatabaseTarget, backup_dir: &Path) -> BackupResult {
        let Some(strategy) = Strategy::for_engine(&target.engine) else {
            let error = AppError::UnsupportedEngine(target.engine.to_string());
            return BackupResult::failed(target, error);
        };

        self.reporter.target_started(target);
        match self.executor.execute(strategy, target, backup_dir).await {
            Ok(artifact) => BackupResult::succeeded(target, artifact),
            Err(e) => BackupResult::failed(target, e),
        }
    }
}
