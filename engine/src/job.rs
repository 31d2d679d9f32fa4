//! Backup orchestration module.
//!
//! This module provides `BackupEngine`, which owns the set of source
//! directories and a backups root, and executes backup runs: one
//! timestamped destination directory per run, every registered source tree
//! copied into it recursively, per-file failures isolated and recorded.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::format::{Item, StrftimeItems};
use chrono::Local;
use uuid::Uuid;

use crate::checksums::{self, ChecksumAlgorithm};
use crate::error::BackupError;
use crate::fs_ops;
use crate::model::{BackupOutcome, BackupReport, DirectorySet, SkippedFile, SourceReport};
use crate::progress::BackupObserver;

/// Default directory-name format: month, day, year, hour, minute, second.
/// Sortable within a day and free of characters that are invalid in file
/// names on any supported platform.
pub const DEFAULT_TIMESTAMP_FORMAT: &str = "%m-%d-%Y__%H_%M_%S";

/// Check that a strftime format string is non-empty and fully recognized by
/// chrono, so formatting at run time cannot fail.
///
/// # Errors
/// Returns `InvalidArgument` describing the rejected format.
pub fn validate_timestamp_format(fmt: &str) -> Result<(), BackupError> {
    if fmt.is_empty() {
        return Err(BackupError::InvalidArgument {
            reason: "timestamp format is empty".to_string(),
        });
    }

    if StrftimeItems::new(fmt).any(|item| matches!(item, Item::Error)) {
        return Err(BackupError::InvalidArgument {
            reason: format!("unrecognized specifier in timestamp format {:?}", fmt),
        });
    }

    Ok(())
}

/// Copies registered source directories into timestamped backup directories.
///
/// The engine holds only configuration between runs: the immutable backups
/// root, the timestamp format, the source set, and the verification knobs.
/// Each `make_backup` call computes its destination fresh and reports a
/// structured outcome.
#[derive(Debug)]
pub struct BackupEngine {
    backups_root: PathBuf,
    timestamp_format: String,
    sources: DirectorySet,

    /// Re-read each copied file and compare checksums against the source
    pub verify_after_copy: bool,

    /// Algorithm used when `verify_after_copy` is set
    pub checksum_algorithm: Option<ChecksumAlgorithm>,
}

impl BackupEngine {
    /// Create an engine for the given backups root.
    ///
    /// # Errors
    /// Returns `InvalidArgument` if the root path is empty.
    pub fn new(backups_root: impl Into<PathBuf>) -> Result<Self, BackupError> {
        let backups_root = backups_root.into();

        if backups_root.as_os_str().is_empty() {
            return Err(BackupError::InvalidArgument {
                reason: "backups root path is empty".to_string(),
            });
        }

        Ok(BackupEngine {
            backups_root,
            timestamp_format: DEFAULT_TIMESTAMP_FORMAT.to_string(),
            sources: DirectorySet::new(),
            verify_after_copy: false,
            checksum_algorithm: None,
        })
    }

    /// The directory under which each run's output directory is created.
    pub fn backups_root(&self) -> &Path {
        &self.backups_root
    }

    pub fn timestamp_format(&self) -> &str {
        &self.timestamp_format
    }

    /// Set the strftime format used to name each run's directory.
    ///
    /// The format is validated eagerly; on error the previous format is
    /// kept.
    ///
    /// # Errors
    /// Returns `InvalidArgument` for an empty or unrecognized format.
    pub fn set_timestamp_format(&mut self, fmt: &str) -> Result<(), BackupError> {
        validate_timestamp_format(fmt)?;
        self.timestamp_format = fmt.to_string();
        Ok(())
    }

    /// Register a source directory to be copied on each run.
    ///
    /// This does not check that the backups root lies outside the source;
    /// callers validate that with `fs_ops::is_subdirectory` before
    /// registering.
    ///
    /// # Errors
    /// Returns `InvalidArgument` for an empty path, `DuplicateSource` if
    /// already registered.
    pub fn add_source(&mut self, path: impl Into<PathBuf>) -> Result<(), BackupError> {
        self.sources.add(path)
    }

    /// Unregister a source directory. Removing an unknown path is a no-op.
    pub fn remove_source(&mut self, path: &Path) {
        self.sources.remove(path);
    }

    /// Snapshot of the registered source directories, in registration order.
    pub fn sources(&self) -> Vec<PathBuf> {
        self.sources.snapshot()
    }

    /// Run one backup.
    ///
    /// With no sources registered this returns `NothingToDo` without
    /// touching the filesystem. Otherwise the destination
    /// `<backups_root>/<formatted local time>` is created (fatal on
    /// failure) and every source is copied into it in registration order.
    /// A missing source aborts the run; output already written stays on
    /// disk. Per-file failures never abort the run; they are recorded on
    /// the report and the observer is told.
    ///
    /// # Errors
    /// Returns only `Fatal`-severity errors; see `ErrorSeverity`.
    pub fn make_backup(
        &self,
        observer: Option<&dyn BackupObserver>,
    ) -> Result<BackupOutcome, BackupError> {
        if self.sources.is_empty() {
            return Ok(BackupOutcome::NothingToDo);
        }

        let stamp = Local::now().format(&self.timestamp_format).to_string();
        let destination = self.backups_root.join(stamp);

        if let Some(cb) = observer {
            cb.on_run_started(&destination, self.sources.len());
        }

        fs::create_dir_all(&destination).map_err(|e| BackupError::DestinationUnavailable {
            path: destination.clone(),
            source: e,
        })?;

        let started_at = SystemTime::now();
        let mut source_reports = Vec::with_capacity(self.sources.len());

        for source in self.sources.iter() {
            if let Some(cb) = observer {
                cb.on_source_started(source);
            }

            let mut report = SourceReport::new(source.clone());
            self.copy_tree(source, &destination, &mut report, observer)?;

            if let Some(cb) = observer {
                cb.on_source_completed(&report);
            }
            source_reports.push(report);
        }

        let report = BackupReport {
            run_id: Uuid::new_v4(),
            destination,
            sources: source_reports,
            started_at,
            finished_at: SystemTime::now(),
        };

        if let Some(cb) = observer {
            cb.on_run_completed(&report);
        }

        Ok(BackupOutcome::Completed(report))
    }

    /// Recursively copy the contents of `source_dir` into `dest_dir`.
    ///
    /// Files are processed before subdirectories, each group in name order.
    /// The missing-source check runs at every level: a directory removed
    /// between listing and recursing still aborts the run.
    fn copy_tree(
        &self,
        source_dir: &Path,
        dest_dir: &Path,
        report: &mut SourceReport,
        observer: Option<&dyn BackupObserver>,
    ) -> Result<(), BackupError> {
        match fs::metadata(source_dir) {
            Ok(metadata) if metadata.is_dir() => {}
            _ => {
                return Err(BackupError::SourceNotFound {
                    path: source_dir.to_path_buf(),
                });
            }
        }

        fs_ops::ensure_dir_exists(dest_dir)?;

        let (files, dirs) = fs_ops::list_entries(source_dir)?;

        for file in files {
            let Some(name) = file.file_name() else {
                continue;
            };
            let target = dest_dir.join(name);

            match fs_ops::copy_file_no_overwrite(&file, &target) {
                Ok(bytes) => {
                    report.files_copied += 1;
                    report.bytes_copied += bytes;

                    if let Some(cb) = observer {
                        cb.on_file_copied(&file, &target, bytes);
                    }

                    if self.verify_after_copy {
                        if let Some(algorithm) = self.checksum_algorithm {
                            // A copy that cannot be re-read counts as unverified
                            match checksums::verify_copy(&file, &target, algorithm) {
                                Ok(true) => {}
                                Ok(false) | Err(_) => {
                                    report.verification_failures.push(target.clone());
                                }
                            }
                        }
                    }
                }
                Err(err) => {
                    let skipped = SkippedFile::from_error(file, target, &err);
                    if let Some(cb) = observer {
                        cb.on_file_skipped(&skipped);
                    }
                    report.skipped.push(skipped);
                }
            }
        }

        for dir in dirs {
            let Some(name) = dir.file_name() else {
                continue;
            };
            self.copy_tree(&dir, &dest_dir.join(name), report, observer)?;
        }

        Ok(())
    }
}
