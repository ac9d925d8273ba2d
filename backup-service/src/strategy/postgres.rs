//! PostgreSQL backups via `pg_dump`.

use std::path::Path;

use tokio::process::Command;

use common::errors::AppResult;
use common::models::DatabaseTarget;

/// Arguments for a custom-format dump of `target` into `artifact`.
pub fn pg_dump_args(target: &DatabaseTarget, artifact: &Path) -> Vec<String> {
    vec![
        "-h".to_string(),
        target.host.clone(),
        "-p".to_string(),
        target.port().to_string(),
        "-U".to_string(),
        target.username.clone(),
        "-d".to_string(),
        target.database.clone(),
        // custom (compressed) format
        "-F".to_string(),
        "c".to_string(),
        "-f".to_string(),
        artifact.display().to_string(),
    ]
}

pub(super) async fn backup(
    target: &DatabaseTarget,
    artifact: &Path,
    program: &str,
) -> AppResult<()> {
    let mut cmd = Command::new(program);
    cmd.args(pg_dump_args(target, artifact))
        .env("PGPASSWORD", &target.password);
    if target.enable_ssl {
        cmd.env("PGSSLMODE", "require");
    }
    super::run_dump(program, cmd).await
}
