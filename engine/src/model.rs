//! Core data model for backup runs.
//!
//! This module defines:
//! - DirectorySet: the ordered, duplicate-free collection of source trees
//! - BackupOutcome / BackupReport: the structured result of one run
//! - SourceReport / SkippedFile: per-source and per-file records

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::Serialize;
use uuid::Uuid;

use crate::error::BackupError;

/// An ordered collection of source directory paths with no duplicates.
///
/// Paths are compared as given, component-wise, without normalization or
/// filesystem access. Insertion order is preserved; it is also the order in
/// which sources are copied during a run.
#[derive(Debug, Default, Clone)]
pub struct DirectorySet {
    paths: Vec<PathBuf>,
}

impl DirectorySet {
    pub fn new() -> Self {
        DirectorySet { paths: Vec::new() }
    }

    /// Append a path to the end of the set.
    ///
    /// # Errors
    /// Returns `InvalidArgument` for an empty path and `DuplicateSource` if
    /// the path is already present. The set is unchanged on error.
    pub fn add(&mut self, path: impl Into<PathBuf>) -> Result<(), BackupError> {
        let path = path.into();

        if path.as_os_str().is_empty() {
            return Err(BackupError::InvalidArgument {
                reason: "source directory path is empty".to_string(),
            });
        }

        if self.paths.contains(&path) {
            return Err(BackupError::DuplicateSource { path });
        }

        self.paths.push(path);
        Ok(())
    }

    /// Remove a path from the set. Removing an absent path is a no-op.
    pub fn remove(&mut self, path: &Path) {
        self.paths.retain(|p| p != path);
    }

    /// Snapshot of the ordered paths. Mutating the returned vector does not
    /// affect the set.
    pub fn snapshot(&self) -> Vec<PathBuf> {
        self.paths.clone()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.paths.iter().any(|p| p == path)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PathBuf> {
        self.paths.iter()
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// The result of one `make_backup` invocation.
#[derive(Debug, Serialize)]
pub enum BackupOutcome {
    /// No source directories registered; nothing was created on disk
    NothingToDo,
    /// Every source was copied, each possibly with per-file skips
    Completed(BackupReport),
}

impl BackupOutcome {
    /// Returns the report if the run produced one.
    pub fn report(&self) -> Option<&BackupReport> {
        match self {
            BackupOutcome::Completed(report) => Some(report),
            BackupOutcome::NothingToDo => None,
        }
    }
}

/// Summary of a completed backup run.
#[derive(Debug, Serialize)]
pub struct BackupReport {
    /// Unique identifier for this run
    pub run_id: Uuid,

    /// The timestamped directory everything was copied into
    pub destination: PathBuf,

    /// One entry per registered source, in registration order
    pub sources: Vec<SourceReport>,

    /// When the run started (after the destination was created)
    pub started_at: SystemTime,

    /// When the run finished
    pub finished_at: SystemTime,
}

impl BackupReport {
    /// Total number of files copied across all sources.
    pub fn files_copied(&self) -> u64 {
        self.sources.iter().map(|s| s.files_copied).sum()
    }

    /// Total number of files skipped across all sources.
    pub fn files_skipped(&self) -> usize {
        self.sources.iter().map(|s| s.skipped.len()).sum()
    }

    /// Total bytes written across all sources.
    pub fn bytes_copied(&self) -> u64 {
        self.sources.iter().map(|s| s.bytes_copied).sum()
    }
}

/// Copy outcome for a single source directory.
#[derive(Debug, Serialize)]
pub struct SourceReport {
    /// The source directory as registered
    pub source: PathBuf,

    /// Number of files copied from this source
    pub files_copied: u64,

    /// Bytes written for this source
    pub bytes_copied: u64,

    /// Files that could not be copied and were skipped
    pub skipped: Vec<SkippedFile>,

    /// Destination files whose post-copy checksum did not match the source
    /// (only populated when verification is enabled)
    pub verification_failures: Vec<PathBuf>,
}

impl SourceReport {
    pub fn new(source: PathBuf) -> Self {
        SourceReport {
            source,
            files_copied: 0,
            bytes_copied: 0,
            skipped: Vec::new(),
            verification_failures: Vec::new(),
        }
    }
}

/// A single file that failed to copy and was skipped.
#[derive(Debug, Serialize)]
pub struct SkippedFile {
    /// Full source path of the file
    pub source_path: PathBuf,

    /// Destination path the copy was aimed at
    pub destination_path: PathBuf,

    /// OS error code, if the underlying failure carried one
    pub error_code: Option<i32>,

    /// Human-readable description of the failure
    pub message: String,
}

impl SkippedFile {
    /// Build a record from the per-file error that caused the skip.
    pub fn from_error(source_path: PathBuf, destination_path: PathBuf, err: &BackupError) -> Self {
        SkippedFile {
            source_path,
            destination_path,
            error_code: err.raw_os_error(),
            message: err.to_string(),
        }
    }
}
