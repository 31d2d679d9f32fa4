//! Error types for the backup engine.
//!
//! The primary error type is `BackupError`. Variants with `Skipped` severity
//! never propagate out of a run: they are converted into `SkippedFile`
//! records on the report at the point of failure. Everything else aborts
//! the operation that produced it.

use std::error::Error;
use std::fmt::{self, Display};
use std::io;
use std::path::PathBuf;

/// How an error affects a backup run.
///
/// Callers match on this instead of on variant lists when mapping errors to
/// exit codes or log levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Rejected before any filesystem mutation; engine state unchanged
    Configuration,
    /// Aborts the entire run; output already written stays on disk
    Fatal,
    /// Affects a single file; recorded on the report and skipped
    Skipped,
}

/// Errors produced by the backup engine.
///
/// Per-file failures (collision, unreadable source, unwritable destination)
/// carry `Skipped` severity and surface as `SkippedFile` entries in the
/// run report, not as a failed run.
#[derive(Debug)]
pub enum BackupError {
    /// A required argument was empty or malformed
    InvalidArgument { reason: String },

    /// Source directory is already registered
    DuplicateSource { path: PathBuf },

    /// The timestamped destination directory could not be created
    DestinationUnavailable { path: PathBuf, source: io::Error },

    /// A registered source directory is missing at copy time
    SourceNotFound { path: PathBuf },

    /// Failed to enumerate a source directory mid-run
    EnumerationFailed { path: PathBuf, source: io::Error },

    /// Failed to create a subdirectory of the destination
    DirectoryCreationFailed { path: PathBuf, source: io::Error },

    /// Destination file already exists (no-overwrite collision)
    DestinationExists { path: PathBuf },

    /// Failed to read from a source file
    ReadError { path: PathBuf, source: io::Error },

    /// Failed to write to a destination file
    WriteError { path: PathBuf, source: io::Error },
}

impl Display for BackupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidArgument { reason } => {
                write!(f, "Invalid argument: {}", reason)
            }
            Self::DuplicateSource { path } => {
                write!(f, "Source directory already registered: {}", path.display())
            }
            Self::DestinationUnavailable { path, source } => {
                write!(
                    f,
                    "Unable to create destination directory {}: {}",
                    path.display(),
                    source
                )
            }
            Self::SourceNotFound { path } => {
                write!(f, "Source directory not found: {}", path.display())
            }
            Self::EnumerationFailed { path, source } => {
                write!(f, "Failed to enumerate directory {}: {}", path.display(), source)
            }
            Self::DirectoryCreationFailed { path, source } => {
                write!(f, "Failed to create directory {}: {}", path.display(), source)
            }
            Self::DestinationExists { path } => {
                write!(f, "Destination file already exists: {}", path.display())
            }
            Self::ReadError { path, source } => {
                write!(f, "Failed to read file {}: {}", path.display(), source)
            }
            Self::WriteError { path, source } => {
                write!(f, "Failed to write file {}: {}", path.display(), source)
            }
        }
    }
}

impl Error for BackupError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::DestinationUnavailable { source, .. }
            | Self::EnumerationFailed { source, .. }
            | Self::DirectoryCreationFailed { source, .. }
            | Self::ReadError { source, .. }
            | Self::WriteError { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl BackupError {
    /// Classify this error for exit-code and log-level mapping.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::InvalidArgument { .. } | Self::DuplicateSource { .. } => {
                ErrorSeverity::Configuration
            }
            Self::DestinationUnavailable { .. }
            | Self::SourceNotFound { .. }
            | Self::EnumerationFailed { .. }
            | Self::DirectoryCreationFailed { .. } => ErrorSeverity::Fatal,
            Self::DestinationExists { .. } | Self::ReadError { .. } | Self::WriteError { .. } => {
                ErrorSeverity::Skipped
            }
        }
    }

    /// Extract the OS error code from this error, if available.
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            Self::DestinationUnavailable { source, .. }
            | Self::EnumerationFailed { source, .. }
            | Self::DirectoryCreationFailed { source, .. }
            | Self::ReadError { source, .. }
            | Self::WriteError { source, .. } => source.raw_os_error(),
            _ => None,
        }
    }
}
