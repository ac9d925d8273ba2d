//! Run reporting.
//!
//! The orchestrator reports progress through [`RunReporter`] instead of
//! logging directly. [`TracingReporter`] is the production sink.

use common::models::{BackupResult, DatabaseTarget, RunSummary};
use common::AppError;

use crate::orchestrator::RunPhase;

/// Receives progress events of a backup run.
pub trait RunReporter: Send + Sync {
    /// The run entered `phase`.
    fn phase(&self, phase: RunPhase);

    /// A ping round had failures. Never blocks the run.
    fn ping_failed(&self, phase: RunPhase, error: &AppError);

    /// A target is about to be backed up.
    fn target_started(&self, target: &DatabaseTarget);

    /// A target finished, was skipped, or failed.
    fn target_finished(&self, result: &BackupResult);

    /// All phases completed.
    fn run_finished(&self, summary: &RunSummary);
}

/// Forwards run events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl RunReporter for TracingReporter {
    fn phase(&self, phase: RunPhase) {
        tracing::debug!(phase = ?phase, "run phase");
    }

    fn ping_failed(&self, phase: RunPhase, error: &AppError) {
        tracing::warn!(phase = ?phase, error = %error, "health ping failed, continuing");
    }

    fn target_started(&self, target: &DatabaseTarget) {
        tracing::info!(
            database = %target.display_name(),
            engine = %target.engine,
            "Processing database"
        );
    }

    fn target_finished(&self, result: &BackupResult) {
        match (&result.artifact, &result.error) {
            (_, Some(error)) if result.is_skipped() => {
                tracing::warn!(database = %result.target, error = %error, "Skipping database");
            }
            (_, Some(error)) => {
                tracing::error!(
                    database = %result.target,
                    engine = %result.engine,
                    kind = error.kind(),
                    error = %error,
                    "Failed to backup database"
                );
            }
            (Some(artifact), None) => {
                tracing::info!(
                    database = %result.target,
                    artifact = %artifact.display(),
                    "Successfully backed up database"
                );
            }
            (None, None) => {
                tracing::info!(database = %result.target, "Successfully backed up database");
            }
        }
    }

    fn run_finished(&self, summary: &RunSummary) {
        tracing::info!(
            succeeded = summary.succeeded(),
            failed = summary.failed(),
            skipped = summary.skipped(),
            "Backup process completed"
        );
    }
}
