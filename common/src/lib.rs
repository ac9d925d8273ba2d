//! Shared building blocks for the database backup runner.
//!
//! Holds the configuration model, the error taxonomy and the artifact
//! naming helpers used by the backup service.

pub mod config;
pub mod errors;
pub mod models;
pub mod utils;

pub use config::BackupConfig;
pub use errors::{AppError, AppResult};
