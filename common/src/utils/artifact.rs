//! Artifact naming.
//!
//! Every artifact is named `{display_name}-{YYYY-MM-DD-HH-MM-SS}.{ext}`.
//! Two runs within the same second produce the same name.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, TimeZone};

/// Timestamp layout used in artifact names.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d-%H-%M-%S";

/// Formats a run-local timestamp without timezone suffix.
pub fn format_timestamp<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Builds the artifact file name.
pub fn artifact_file_name<Tz: TimeZone>(
    display_name: &str,
    extension: &str,
    at: &DateTime<Tz>,
) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("{}-{}.{}", display_name, format_timestamp(at), extension)
}

/// Builds the artifact path inside `dir` using the current local time.
pub fn artifact_path(dir: &Path, display_name: &str, extension: &str) -> PathBuf {
    dir.join(artifact_file_name(display_name, extension, &Local::now()))
}
