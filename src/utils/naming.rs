//! Backup names and the timestamps embedded in archive file names.
//!
//! An archive is named `<prefix>_<YYYYMMDD>_<HHMMSS>.tar.gz`. Names have one-second
//! resolution, so two jobs started in the same second produce the same name.

use chrono::{NaiveDateTime, Timelike};

pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
pub const ARCHIVE_EXTENSION: &str = ".tar.gz";

pub fn generate_name(prefix: &str, now: NaiveDateTime) -> String {
    format!("{}_{}", prefix, now.format(TIMESTAMP_FORMAT))
}

/// Extracts the creation time from an archive (or backup directory) name.
///
/// Returns `None` for anything that does not end in `_<YYYYMMDD>_<HHMMSS>`.
/// Second `60` is rejected; chrono would otherwise read it as a leap second.
pub fn parse_timestamp(filename: &str) -> Option<NaiveDateTime> {
    let stem = filename.strip_suffix(ARCHIVE_EXTENSION).unwrap_or(filename);
    let parts: Vec<&str> = stem.split('_').collect();
    if parts.len() < 3 {
        return None;
    }
    let date_part = parts[parts.len() - 2];
    let time_part = parts[parts.len() - 1];
    NaiveDateTime::parse_from_str(&format!("{}_{}", date_part, time_part), TIMESTAMP_FORMAT)
        .ok()
        .filter(|t| t.nanosecond() < 1_000_000_000)
}
