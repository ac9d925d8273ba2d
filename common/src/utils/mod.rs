//! Utility functions and helpers.

pub mod artifact;

// Re-export commonly used helpers
pub use artifact::{artifact_file_name, artifact_path, format_timestamp};
