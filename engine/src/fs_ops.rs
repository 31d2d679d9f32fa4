//! Filesystem operations module.
//!
//! Low-level operations used by the backup engine:
//! - Listing a directory's files and subdirectories in deterministic order
//! - Copying a single file without overwriting, preserving its mtime
//! - Creating destination directories
//! - The ancestor-walk containment check

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::BackupError;

/// List the immediate entries of `dir`, split into files and
/// subdirectories, each sorted by name.
///
/// Symlinks are not followed for classification: a symlink counts as a file
/// and is copied by content (or skipped if its target cannot be opened).
///
/// # Errors
/// Returns `EnumerationFailed` if the directory or any entry cannot be read.
pub fn list_entries(dir: &Path) -> Result<(Vec<PathBuf>, Vec<PathBuf>), BackupError> {
    let entries = fs::read_dir(dir).map_err(|e| BackupError::EnumerationFailed {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let mut files = Vec::new();
    let mut dirs = Vec::new();

    for entry in entries {
        let entry = entry.map_err(|e| BackupError::EnumerationFailed {
            path: dir.to_path_buf(),
            source: e,
        })?;
        let file_type = entry.file_type().map_err(|e| BackupError::EnumerationFailed {
            path: entry.path(),
            source: e,
        })?;

        if file_type.is_dir() {
            dirs.push(entry.path());
        } else {
            files.push(entry.path());
        }
    }

    files.sort();
    dirs.sort();

    Ok((files, dirs))
}

/// Create `path` and any missing ancestors.
///
/// # Errors
/// Returns `DirectoryCreationFailed` if creation fails.
pub fn ensure_dir_exists(path: &Path) -> Result<(), BackupError> {
    fs::create_dir_all(path).map_err(|e| BackupError::DirectoryCreationFailed {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Copy a file from `src` to `dst`, failing if `dst` already exists.
///
/// The destination is opened with `create_new`, so an existing file is never
/// overwritten. The source's modification time is carried over on a
/// best-effort basis.
///
/// # Returns
/// Number of bytes copied
///
/// # Errors
/// `DestinationExists` on collision, `ReadError`/`WriteError` otherwise.
/// All three carry `Skipped` severity; callers record and continue.
pub fn copy_file_no_overwrite(src: &Path, dst: &Path) -> Result<u64, BackupError> {
    let mut src_file = fs::File::open(src).map_err(|e| BackupError::ReadError {
        path: src.to_path_buf(),
        source: e,
    })?;

    let src_mtime = src_file.metadata().ok().and_then(|m| m.modified().ok());

    let mut dst_file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(dst)
        .map_err(|e| {
            if e.kind() == io::ErrorKind::AlreadyExists {
                BackupError::DestinationExists {
                    path: dst.to_path_buf(),
                }
            } else {
                BackupError::WriteError {
                    path: dst.to_path_buf(),
                    source: e,
                }
            }
        })?;

    let bytes_copied = io::copy(&mut src_file, &mut dst_file).map_err(|e| {
        if e.kind() == io::ErrorKind::PermissionDenied {
            BackupError::WriteError {
                path: dst.to_path_buf(),
                source: e,
            }
        } else {
            BackupError::ReadError {
                path: src.to_path_buf(),
                source: e,
            }
        }
    })?;

    drop(dst_file);

    if let Some(mtime) = src_mtime {
        let _ = filetime::set_file_mtime(dst, filetime::FileTime::from_system_time(mtime));
    }

    Ok(bytes_copied)
}

/// Returns true if `candidate_sub` lies strictly inside `candidate_parent`.
///
/// Both paths are canonicalized when they exist and absolutized lexically
/// when they do not, then the proper ancestors of `candidate_sub` are
/// compared against `candidate_parent`. A path is not a subdirectory of
/// itself.
pub fn is_subdirectory(candidate_sub: &Path, candidate_parent: &Path) -> bool {
    let sub = resolve_for_comparison(candidate_sub);
    let parent = resolve_for_comparison(candidate_parent);

    sub.ancestors().skip(1).any(|ancestor| ancestor == parent)
}

/// Canonicalize if possible; the backups root usually does not exist yet,
/// so fall back to lexical absolutization.
fn resolve_for_comparison(path: &Path) -> PathBuf {
    fs::canonicalize(path)
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf())
}
