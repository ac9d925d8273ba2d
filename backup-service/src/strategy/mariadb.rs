//! MariaDB / MySQL backups via `mysqldump`.

use std::path::Path;

use tokio::process::Command;

use common::errors::AppResult;
use common::models::DatabaseTarget;

/// Arguments for a consistent single-database dump into `artifact`.
pub fn mysqldump_args(target: &DatabaseTarget, artifact: &Path) -> Vec<String> {
    let mut args = vec![
        format!("--host={}", target.host),
        format!("--port={}", target.port()),
        format!("--user={}", target.username),
    ];
    if !target.password.is_empty() {
        args.push(format!("--password={}", target.password));
    }
    if target.enable_ssl {
        args.push("--ssl".to_string());
    }
    args.extend([
        "--databases".to_string(),
        target.database.clone(),
        "--single-transaction".to_string(),
        "--quick".to_string(),
        "--add-drop-database".to_string(),
        "--add-drop-table".to_string(),
        format!("--result-file={}", artifact.display()),
    ]);
    args
}

pub(super) async fn backup(
    target: &DatabaseTarget,
    artifact: &Path,
    program: &str,
) -> AppResult<()> {
    let mut cmd = Command::new(program);
    cmd.args(mysqldump_args(target, artifact));
    super::run_dump(program, cmd).await
}
