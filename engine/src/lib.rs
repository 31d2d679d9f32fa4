//! # Backupper Engine
//!
//! Core library for configuration-driven directory backups.
//!
//! ## Overview
//!
//! The engine copies the contents of registered source directory trees into
//! one timestamped directory per run, created under a configured backups
//! root. It features:
//! - An ordered, duplicate-free source directory set
//! - Recursive tree copy with per-file failure isolation (failed files are
//!   recorded and skipped, never overwritten, never fatal)
//! - Fail-fast handling of missing sources and unusable destinations
//! - A containment check to keep the backups root out of the source trees
//! - Structured run reports and an observer trait decoupled from any UI
//! - Optional checksum verification of copied files
//!
//! ## Basic Usage
//!
//! ```no_run
//! use engine::{BackupEngine, BackupOutcome};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut engine = BackupEngine::new("/var/backups")?;
//! engine.add_source("/home/user/documents")?;
//! engine.add_source("/home/user/photos")?;
//!
//! match engine.make_backup(None)? {
//!     BackupOutcome::Completed(report) => {
//!         println!(
//!             "{} files into {} ({} skipped)",
//!             report.files_copied(),
//!             report.destination.display(),
//!             report.files_skipped(),
//!         );
//!     }
//!     BackupOutcome::NothingToDo => println!("no source directories registered"),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - **model**: Core data structures (DirectorySet, BackupReport, outcomes)
//! - **error**: Error types and severity classification
//! - **fs_ops**: Low-level filesystem operations and the containment check
//! - **job**: BackupEngine orchestration (the recursive copy lives here)
//! - **progress**: Observer trait for run events
//! - **checksums**: Checksum computation and copy verification

pub mod checksums;
pub mod error;
pub mod fs_ops;
pub mod job;
pub mod model;
pub mod progress;

// Re-export main types and functions
pub use checksums::{compute_file_checksum, verify_copy, ChecksumAlgorithm, ChecksumValue};
pub use error::{BackupError, ErrorSeverity};
pub use fs_ops::is_subdirectory;
pub use job::{validate_timestamp_format, BackupEngine, DEFAULT_TIMESTAMP_FORMAT};
pub use model::{BackupOutcome, BackupReport, DirectorySet, SkippedFile, SourceReport};
pub use progress::BackupObserver;
