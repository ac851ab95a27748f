// pantrykeeper/src/backup/retention.rs
use chrono::{Local, NaiveDateTime};
use log::{error, info, warn};
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::SweepError;
use crate::utils::naming::{parse_timestamp, ARCHIVE_EXTENSION};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub removed_count: usize,
    /// Archive-looking files whose timestamp could not be parsed.
    pub skipped_count: usize,
    pub failed_count: usize,
}

/// Deletes archives older than the retention window.
pub trait RetentionSweeper {
    fn sweep(&self, directory: &Path, retention_window: chrono::Duration) -> Result<SweepReport, SweepError>;
}

#[derive(Debug, Clone)]
pub struct FsRetentionSweeper {
    prefix: String,
}

impl FsRetentionSweeper {
    pub fn new(prefix: impl Into<String>) -> Self {
        FsRetentionSweeper { prefix: prefix.into() }
    }

    /// Archives in `directory` named `<prefix>_*.tar.gz`. Other files are ignored.
    fn backup_files(&self, directory: &Path) -> Result<Vec<PathBuf>, SweepError> {
        let read_dir_error = |cause| SweepError::ReadDir {
            path: directory.to_path_buf(),
            cause,
        };
        let name_prefix = format!("{}_", self.prefix);

        let mut files = Vec::new();
        for entry in fs::read_dir(directory).map_err(read_dir_error)? {
            let entry = entry.map_err(read_dir_error)?;
            let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if is_file && name.starts_with(&name_prefix) && name.ends_with(ARCHIVE_EXTENSION) {
                files.push(entry.path());
            }
        }
        Ok(files)
    }

    /// Removes every archive whose embedded timestamp is strictly before `now - retention_window`.
    /// A window reaching past the earliest representable date removes nothing.
    pub fn sweep_at(
        &self,
        directory: &Path,
        retention_window: chrono::Duration,
        now: NaiveDateTime,
    ) -> Result<SweepReport, SweepError> {
        let mut report = SweepReport::default();
        let Some(cutoff) = now.checked_sub_signed(retention_window) else {
            info!("Retention window reaches before any representable date, nothing to remove");
            return Ok(report);
        };

        for backup_file in self.backup_files(directory)? {
            let file_name = backup_file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();

            let Some(backup_date) = parse_timestamp(&file_name) else {
                warn!("Could not parse date from backup file: {}", file_name);
                report.skipped_count += 1;
                continue;
            };

            if backup_date < cutoff {
                match fs::remove_file(&backup_file) {
                    Ok(()) => {
                        info!("Removed old backup: {}", file_name);
                        report.removed_count += 1;
                    }
                    Err(e) => {
                        error!("Failed to remove old backup {}: {}", file_name, e);
                        report.failed_count += 1;
                    }
                }
            }
        }

        if report.removed_count > 0 {
            info!("Cleanup completed: {} old backups removed", report.removed_count);
        } else {
            info!("No old backups to remove");
        }
        Ok(report)
    }
}

impl RetentionSweeper for FsRetentionSweeper {
    fn sweep(&self, directory: &Path, retention_window: chrono::Duration) -> Result<SweepReport, SweepError> {
        self.sweep_at(directory, retention_window, Local::now().naive_local())
    }
}
