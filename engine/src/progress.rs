//! Observer trait for backup-run events.
//!
//! The engine emits every noteworthy event through this trait instead of
//! logging directly, so it carries no logger and no process-wide state.
//! The CLI translates these events into tracing records; other front ends
//! can render them however they like.

use std::path::Path;

use crate::model::{BackupReport, SkippedFile, SourceReport};

/// Trait for receiving events from a backup run.
///
/// All methods are called synchronously while `make_backup` executes.
pub trait BackupObserver: Send {
    /// Called once per run, after the destination path is computed but
    /// before it is created.
    fn on_run_started(&self, destination: &Path, source_count: usize);

    /// Called when copying of a registered source directory begins.
    fn on_source_started(&self, source: &Path);

    /// Called after a file has been copied.
    fn on_file_copied(&self, source: &Path, destination: &Path, bytes: u64);

    /// Called when a file could not be copied and was skipped.
    fn on_file_skipped(&self, skipped: &SkippedFile);

    /// Called when a source directory has been fully processed.
    fn on_source_completed(&self, report: &SourceReport);

    /// Called when the whole run has completed.
    fn on_run_completed(&self, report: &BackupReport);
}
