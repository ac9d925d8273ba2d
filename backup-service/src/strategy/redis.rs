//! Redis backups as a RESP command stream.

use std::path::Path;
use std::time::Duration;

use common::errors::AppResult;
use common::models::DatabaseTarget;

use crate::exporter;
use crate::keyspace::{KeyspaceSource, RedisKeyspace};

pub(super) async fn backup(
    target: &DatabaseTarget,
    artifact: &Path,
    timeout: Duration,
) -> AppResult<()> {
    let mut keyspace = RedisKeyspace::connect(target, timeout).await?;
    export_to_file(&mut keyspace, artifact).await
}

/// Exports `source` and writes the stream to `artifact` in one go, so a
/// failed export leaves no file behind.
pub(crate) async fn export_to_file<S>(source: &mut S, artifact: &Path) -> AppResult<()>
where
    S: KeyspaceSource + ?Sized,
{
    let (stream, stats) = exporter::export(source).await?;
    tokio::fs::write(artifact, &stream).await?;

    tracing::debug!(
        exported = stats.exported,
        skipped = stats.skipped,
        frames = stats.frames,
        bytes = stream.len(),
        "redis keyspace written"
    );
    Ok(())
}
