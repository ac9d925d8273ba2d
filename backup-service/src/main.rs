//! 数据库定时备份服务
//!
//! 按配置依次备份多个数据库，包括：
//! - PostgreSQL（调用 pg_dump）
//! - MariaDB / MySQL（调用 mysqldump）
//! - Redis（导出为 RESP 命令流）
//!
//! 备份前后可选地向健康检查地址发送 ping。

mod exporter;
mod keyspace;
mod orchestrator;
mod ping;
mod reporter;
mod resp;
mod strategy;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use common::config::BackupConfig;
use common::errors::AppError;
use orchestrator::{LiveExecutor, Orchestrator};
use reporter::TracingReporter;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const SERVICE_NAME: &str = "db-backup";

/// Log output format.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

/// Scheduled multi-engine database backup runner.
#[derive(Parser, Debug)]
#[command(name = "db-backup")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the YAML configuration file
    #[arg(value_name = "CONFIG", env = "BACKUP_CONFIG", default_value = "config.yaml")]
    config: PathBuf,

    /// Output directory (overrides `backup_dir` from the config file)
    #[arg(long = "backup-dir", value_name = "DIR", env = "BACKUP_DIR")]
    backup_dir: Option<String>,

    /// Log level: trace, debug, info, warn, error (defaults to RUST_LOG, then info)
    #[arg(short = 'l', long = "log-level", value_name = "LEVEL")]
    log_level: Option<String>,

    /// Log output format
    #[arg(long = "log-format", value_enum, default_value = "text")]
    log_format: LogFormat,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Load .env file (if present) before anything else
    load_dotenv();

    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref(), cli.log_format);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %format!("{:#}", e), "备份服务启动失败");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    info!(service = SERVICE_NAME, "Starting database backup service...");

    // 加载配置
    let mut config = BackupConfig::load(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    if let Some(dir) = cli.backup_dir {
        config = config.with_backup_dir(dir);
    }
    let run = config.into_run().context("Invalid configuration")?;

    // 创建备份目录
    tokio::fs::create_dir_all(&run.backup_dir)
        .await
        .map_err(|e| AppError::Directory(format!("{}: {}", run.backup_dir.display(), e)))
        .context("Failed to create backup directory")?;

    info!(databases = run.databases.len(), "Loaded configuration");
    info!(backup_dir = %run.backup_dir.display(), "Backup directory");

    let orchestrator = Orchestrator::new(LiveExecutor::from_run(&run), TracingReporter);
    orchestrator.run(&run).await;
    Ok(())
}

fn init_tracing(level: Option<&str>, format: LogFormat) {
    let filter = match level {
        Some(level) => tracing_subscriber::EnvFilter::new(level),
        None => tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "info".into()),
    };

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
    }
}

/// Load .env file from the working directory (best-effort, no error if missing).
fn load_dotenv() {
    let Ok(content) = std::fs::read_to_string(".env") else {
        return;
    };
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            let key = key.trim();
            let value = value.trim().trim_matches('"');
            // Only set if not already set by the environment
            if std::env::var_os(key).is_none() {
                std::env::set_var(key, value);
            }
        }
    }
}
