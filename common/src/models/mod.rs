//! Shared data models for the backup runner.

pub mod backup;
pub mod connection;

// Re-export commonly used types
pub use backup::{BackupResult, BackupRun, DumpTools, RunSummary};
pub use connection::{DatabaseTarget, DbType};
