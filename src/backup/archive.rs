// pantrykeeper/src/backup/archive.rs
use flate2::write::GzEncoder;
use flate2::Compression;
use log::{info, warn};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tar::Builder;
use walkdir::WalkDir;

use crate::errors::ArchiveError;
use crate::utils::naming::ARCHIVE_EXTENSION;

/// Turns a finished dump directory into a single archive file.
pub trait Archiver {
    fn archive(&self, source_dir: &Path) -> Result<PathBuf, ArchiveError>;
}

/// Writes `<source_dir>.tar.gz` next to the source directory, then removes the directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct TarGzArchiver;

impl Archiver for TarGzArchiver {
    fn archive(&self, source_dir: &Path) -> Result<PathBuf, ArchiveError> {
        let archive_path = archive_path_for(source_dir)?;
        create_tar_gz_archive(source_dir, &archive_path)?;

        // The archive is complete on disk; a leftover directory is only clutter.
        if let Err(e) = fs::remove_dir_all(source_dir) {
            warn!(
                "Archive created but failed to remove dump directory {}: {}. Remove it manually",
                source_dir.display(),
                e
            );
        }
        Ok(archive_path)
    }
}

fn archive_path_for(source_dir: &Path) -> Result<PathBuf, ArchiveError> {
    let name = source_dir
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| ArchiveError::InvalidName(source_dir.to_path_buf()))?;
    Ok(source_dir.with_file_name(format!("{}{}", name, ARCHIVE_EXTENSION)))
}

/// Creates a GZipped TAR archive from a source directory.
///
/// Paths inside the archive are relative to `source_dir`. The destination must
/// not exist yet. On failure any partially written archive is removed, so a
/// file at `archive_dest_path` always means a complete archive.
pub fn create_tar_gz_archive(source_dir: &Path, archive_dest_path: &Path) -> Result<(), ArchiveError> {
    if !source_dir.is_dir() {
        return Err(ArchiveError::NotADirectory(source_dir.to_path_buf()));
    }

    info!(
        "Creating tar.gz archive from {} to {}",
        source_dir.display(),
        archive_dest_path.display()
    );

    let archive_file = match File::create_new(archive_dest_path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
            return Err(ArchiveError::AlreadyExists(archive_dest_path.to_path_buf()));
        }
        Err(e) => {
            return Err(ArchiveError::io(
                format!("Failed to create archive file: {}", archive_dest_path.display()),
                e,
            ));
        }
    };

    if let Err(e) = write_archive(source_dir, archive_file) {
        if let Err(cleanup) = fs::remove_file(archive_dest_path) {
            warn!(
                "Failed to remove partial archive {}: {}",
                archive_dest_path.display(),
                cleanup
            );
        }
        return Err(e);
    }

    info!("✓ Tar.gz archive created successfully at {}", archive_dest_path.display());
    Ok(())
}

fn write_archive(source_dir: &Path, archive_file: File) -> Result<(), ArchiveError> {
    let enc = GzEncoder::new(archive_file, Compression::default());
    let mut tar_builder = Builder::new(enc);

    for entry in WalkDir::new(source_dir).sort_by_file_name() {
        let entry = entry.map_err(|cause| ArchiveError::Walk {
            path: source_dir.to_path_buf(),
            cause,
        })?;
        let path = entry.path();
        let name = path
            .strip_prefix(source_dir)
            .map_err(|_| ArchiveError::InvalidName(path.to_path_buf()))?;

        if name.as_os_str().is_empty() {
            continue;
        }

        if entry.file_type().is_dir() {
            tar_builder.append_dir(name, path).map_err(|e| {
                ArchiveError::io(format!("Failed to append directory {} to archive", path.display()), e)
            })?;
        } else if entry.file_type().is_file() {
            tar_builder.append_path_with_name(path, name).map_err(|e| {
                ArchiveError::io(
                    format!("Failed to append file {} as {} to archive", path.display(), name.display()),
                    e,
                )
            })?;
        }
    }

    let encoder = tar_builder
        .into_inner()
        .map_err(|e| ArchiveError::io("Failed to finish tar stream", e))?;
    let file = encoder
        .finish()
        .map_err(|e| ArchiveError::io("Failed to finish Gzip encoding", e))?;
    file.sync_all()
        .map_err(|e| ArchiveError::io("Failed to flush archive to disk", e))
}
