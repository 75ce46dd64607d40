//! Default script file names.

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

/// Suffix of the file written while a run is in progress.
pub const PARTIAL_SUFFIX: &str = ".partial";

/// `<schema>-<YYYYmmdd-HHMMSS>.sql`, with the timestamp in UTC.
///
/// Characters that are awkward in file names are replaced by `_`.
pub fn backup_file_name(schema: &str, at: DateTime<Utc>) -> String {
    let stem: String = schema
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let stem = if stem.is_empty() { "backup" } else { &stem };
    format!("{stem}-{}.sql", at.format("%Y%m%d-%H%M%S"))
}

/// Temporary path the script is streamed to before it gets its final name.
pub fn partial_path(dir: &Path, at: DateTime<Utc>) -> PathBuf {
    dir.join(format!(
        ".stratadump-{}-{}{PARTIAL_SUFFIX}",
        at.format("%Y%m%d-%H%M%S"),
        std::process::id()
    ))
}
