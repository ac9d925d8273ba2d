//! Application error types.
//!
//! Errors fall into two groups: fatal setup errors that stop a run before
//! any backup starts, and per-target errors that are logged while the run
//! moves on to the next database.

use thiserror::Error;

/// Result alias used throughout the backup runner.
pub type AppResult<T> = Result<T, AppError>;

/// Backup runner error.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration could not be read, parsed or validated.
    #[error("configuration error: {0}")]
    Config(String),

    /// Backup directory could not be created.
    #[error("backup directory error: {0}")]
    Directory(String),

    /// Could not reach or authenticate against a database.
    #[error("connection error: {0}")]
    Connection(String),

    /// Keyspace enumeration or export failed.
    #[error("export error: {0}")]
    Export(String),

    /// External dump executable failed.
    #[error("{program} failed ({status})\nOutput: {output}")]
    ExternalProcess {
        program: String,
        status: String,
        output: String,
    },

    /// One or more health pings failed.
    #[error("ping failures: {0}")]
    Ping(String),

    /// Engine value has no backup strategy.
    #[error("unsupported database type: {0}")]
    UnsupportedEngine(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Returns true for errors that must abort the whole run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, AppError::Config(_) | AppError::Directory(_))
    }

    /// Short machine-friendly error kind, used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Config(_) => "config",
            AppError::Directory(_) => "directory",
            AppError::Connection(_) => "connection",
            AppError::Export(_) => "export",
            AppError::ExternalProcess { .. } => "external_process",
            AppError::Ping(_) => "ping",
            AppError::UnsupportedEngine(_) => "unsupported_engine",
            AppError::Io(_) => "io",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_setup_errors_are_fatal() {
        assert!(AppError::Config("bad".into()).is_fatal());
        assert!(AppError::Directory("bad".into()).is_fatal());
        assert!(!AppError::Connection("down".into()).is_fatal());
        assert!(!AppError::Export("boom".into()).is_fatal());
        assert!(!AppError::Ping("x".into()).is_fatal());
        assert!(!AppError::UnsupportedEngine("mongo".into()).is_fatal());
    }

    #[test]
    fn test_external_process_message_carries_output() {
        let err = AppError::ExternalProcess {
            program: "pg_dump".into(),
            status: "exit status: 1".into(),
            output: "pg_dump: error: connection refused".into(),
        };
        let msg = err.to_string();
        assert!(msg.starts_with("pg_dump failed (exit status: 1)"));
        assert!(msg.contains("connection refused"));
        assert_eq!(err.kind(), "external_process");
    }
}
