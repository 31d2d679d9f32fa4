//! Backupper - configuration-driven backup tool.
//!
//! Thin wrapper around the engine crate: loads a JSON configuration file,
//! sets up logging (console plus a per-run log file), registers the
//! configured source directories, runs one backup, and maps the outcome to
//! a process exit code.

use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use clap::Parser;
use serde::Deserialize;
use tracing::{debug, error, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use engine::{
    is_subdirectory, BackupEngine, BackupObserver, BackupOutcome, BackupReport,
    ChecksumAlgorithm, SkippedFile, SourceReport, DEFAULT_TIMESTAMP_FORMAT,
};

const EXIT_OK: i32 = 0;
const EXIT_NO_BACKUPS_DIRECTORY: i32 = 1;
const EXIT_BACKUP_FAILED: i32 = 2;
const EXIT_CONFIG_UNREADABLE: i32 = 3;
const EXIT_INVALID_SOURCE: i32 = 4;

/// Backupper - scheduled directory backups driven by a JSON configuration
#[derive(Parser, Debug)]
#[command(name = "backupper")]
#[command(version = "0.1.0")]
#[command(about = "Copy configured directory trees into a timestamped backup directory")]
struct Args {
    /// Path to the JSON configuration file
    #[arg(value_name = "CONFIG", default_value = "backup.json")]
    config: PathBuf,

    /// Verify each copied file against its source checksum
    #[arg(long)]
    verify: bool,

    /// Checksum algorithm for verification: crc32, md5, sha256, or blake3
    #[arg(long, value_name = "ALGORITHM", default_value = "sha256", requires = "verify")]
    hash: String,

    /// Write a JSON report of the completed run to this path
    #[arg(long, value_name = "PATH")]
    report: Option<PathBuf>,
}

/// The configuration document (`backup.json`).
#[derive(Debug, Deserialize)]
struct Config {
    /// Directory under which each run's timestamped directory is created
    backups_directory: Option<String>,

    /// strftime format for naming run directories and log files
    datetime_fmt: Option<String>,

    /// Directory trees to back up, in order
    #[serde(default)]
    source_directories: Vec<String>,

    /// Where per-run log files go; defaults to "Logs"
    logs_directory: Option<String>,

    /// Log filter, e.g. "info" or "debug"
    log_level: Option<String>,
}

/// Observer that translates engine events into tracing records.
struct LogObserver;

impl BackupObserver for LogObserver {
    fn on_run_started(&self, destination: &Path, source_count: usize) {
        info!(
            "Backing up {} source directories to \"{}\"",
            source_count,
            destination.display()
        );
    }

    fn on_source_started(&self, source: &Path) {
        info!("Copying {}...", source.display());
    }

    fn on_file_copied(&self, source: &Path, _destination: &Path, bytes: u64) {
        debug!("Copied {} ({} bytes)", source.display(), bytes);
    }

    fn on_file_skipped(&self, skipped: &SkippedFile) {
        warn!(
            "Unable to copy {}. Skipping. ({})",
            skipped.source_path.display(),
            skipped.message
        );
    }

    fn on_source_completed(&self, report: &SourceReport) {
        if report.skipped.is_empty() {
            info!(
                "Finished {} ({} files)",
                report.source.display(),
                report.files_copied
            );
        } else {
            info!(
                "Finished {} ({} files, {} skipped)",
                report.source.display(),
                report.files_copied,
                report.skipped.len()
            );
        }

        if !report.verification_failures.is_empty() {
            warn!(
                "{} copied files under {} failed checksum verification",
                report.verification_failures.len(),
                report.source.display()
            );
        }
    }

    fn on_run_completed(&self, report: &BackupReport) {
        info!(
            "Done: {} files ({} bytes) into \"{}\", {} skipped",
            report.files_copied(),
            report.bytes_copied(),
            report.destination.display(),
            report.files_skipped()
        );
    }
}

fn main() {
    let args = Args::parse();
    process::exit(run(&args));
}

/// Main CLI logic - separated for testability. Returns the process exit
/// code.
fn run(args: &Args) -> i32 {
    // Logging is not configured yet, so config loading reports to stderr
    let config = match load_config(&args.config) {
        Ok(config) => config,
        Err(message) => {
            eprintln!("{}", message);
            return EXIT_CONFIG_UNREADABLE;
        }
    };

    init_logging(&config);

    let Some(backups_directory) = config
        .backups_directory
        .clone()
        .filter(|dir| !dir.is_empty())
    else {
        error!("No backups directory specified. Aborting.");
        return EXIT_NO_BACKUPS_DIRECTORY;
    };

    let mut backup_engine = match BackupEngine::new(&backups_directory) {
        Ok(backup_engine) => backup_engine,
        Err(err) => {
            error!("Invalid backups directory: {}", err);
            return EXIT_NO_BACKUPS_DIRECTORY;
        }
    };

    if let Some(fmt_str) = &config.datetime_fmt {
        if let Err(err) = backup_engine.set_timestamp_format(fmt_str) {
            error!("Invalid datetime format: {}", err);
            return EXIT_BACKUP_FAILED;
        }
    }

    for source in &config.source_directories {
        if is_subdirectory(Path::new(&backups_directory), Path::new(source)) {
            error!(
                "Destination directory is inside of source directory: {}",
                source
            );
            return EXIT_INVALID_SOURCE;
        }

        if let Err(err) = backup_engine.add_source(source) {
            error!("Unable to add new source directory ({}): {}", source, err);
            return EXIT_INVALID_SOURCE;
        }
    }

    if args.verify {
        match ChecksumAlgorithm::from_str(&args.hash) {
            Some(algorithm) => {
                backup_engine.verify_after_copy = true;
                backup_engine.checksum_algorithm = Some(algorithm);
            }
            None => {
                error!(
                    "Invalid hash algorithm '{}'. Must be 'crc32', 'md5', 'sha256', or 'blake3'",
                    args.hash
                );
                return EXIT_BACKUP_FAILED;
            }
        }
    }

    match backup_engine.make_backup(Some(&LogObserver)) {
        Ok(BackupOutcome::NothingToDo) => {
            info!("Nothing to backup");
            EXIT_OK
        }
        Ok(BackupOutcome::Completed(report)) => {
            if let Some(path) = &args.report {
                if let Err(message) = write_report(path, &report) {
                    warn!("{}", message);
                }
            }
            EXIT_OK
        }
        Err(err) => {
            error!("Unable to make backup: {}", err);
            EXIT_BACKUP_FAILED
        }
    }
}

fn load_config(path: &Path) -> Result<Config, String> {
    let raw = fs::read_to_string(path)
        .map_err(|_| format!("Config file is not found: {}", path.display()))?;
    serde_json::from_str(&raw)
        .map_err(|e| format!("Unable to parse config file {}: {}", path.display(), e))
}

/// Set up a console layer plus, when the logs directory is usable, a
/// per-run log file. Failure to open the file degrades to console-only.
fn init_logging(config: &Config) {
    let requested = config.log_level.as_deref().unwrap_or("info");
    let (filter, level_ok) = match EnvFilter::try_new(requested) {
        Ok(filter) => (filter, true),
        Err(_) => (EnvFilter::new("info"), false),
    };

    let console_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    let file_layer = open_log_file(config).map(|file| {
        fmt::layer()
            .with_target(false)
            .with_ansi(false)
            .with_writer(Arc::new(file))
    });

    // try_init fails if a subscriber is already installed (tests); the
    // existing one is kept in that case
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init();

    if !level_ok {
        warn!("Unable to set log level {:?}. Will use INFO.", requested);
    }
}

/// Open `<logs_directory>/<formatted-timestamp>.log` for appending.
fn open_log_file(config: &Config) -> Option<fs::File> {
    let logs_directory = PathBuf::from(config.logs_directory.as_deref().unwrap_or("Logs"));
    if let Err(err) = fs::create_dir_all(&logs_directory) {
        eprintln!(
            "Unable to create logs directory {}: {}",
            logs_directory.display(),
            err
        );
        return None;
    }

    // Name log files with the configured format when it validates, so log
    // and backup names line up; fall back to the default otherwise
    let fmt_str = config
        .datetime_fmt
        .as_deref()
        .filter(|fmt_str| engine::validate_timestamp_format(fmt_str).is_ok())
        .unwrap_or(DEFAULT_TIMESTAMP_FORMAT);
    let file_name = format!("{}.log", chrono::Local::now().format(fmt_str));
    let path = logs_directory.join(file_name);

    match fs::OpenOptions::new().append(true).create(true).open(&path) {
        Ok(file) => Some(file),
        Err(err) => {
            eprintln!("Unable to open log file {}: {}", path.display(), err);
            None
        }
    }
}

fn write_report(path: &Path, report: &BackupReport) -> Result<(), String> {
    let json = serde_json::to_string_pretty(report)
        .map_err(|e| format!("Unable to serialize report: {}", e))?;
    fs::write(path, json).map_err(|e| format!("Unable to write report to {}: {}", path.display(), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn args_for(config: &Path) -> Args {
        Args {
            config: config.to_path_buf(),
            verify: false,
            hash: "sha256".to_string(),
            report: None,
        }
    }

    fn write_config(dir: &TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("backup.json");
        fs::write(&path, body).expect("Failed to write config");
        path
    }

    #[test]
    fn test_load_config_parses_all_keys() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = write_config(
            &temp_dir,
            r#"{
                "backups_directory": "/var/backups",
                "datetime_fmt": "%Y-%m-%d",
                "source_directories": ["/home/a", "/home/b"],
                "logs_directory": "/var/log/backupper",
                "log_level": "debug"
            }"#,
        );

        let config = load_config(&path).expect("Failed to load config");
        assert_eq!(config.backups_directory.as_deref(), Some("/var/backups"));
        assert_eq!(config.datetime_fmt.as_deref(), Some("%Y-%m-%d"));
        assert_eq!(config.source_directories, vec!["/home/a", "/home/b"]);
        assert_eq!(config.logs_directory.as_deref(), Some("/var/log/backupper"));
        assert_eq!(config.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_load_config_defaults_sources_to_empty() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = write_config(&temp_dir, r#"{"backups_directory": "/var/backups"}"#);

        let config = load_config(&path).expect("Failed to load config");
        assert!(config.source_directories.is_empty());
        assert!(config.log_level.is_none());
    }

    #[test]
    fn test_missing_config_file_exits_3() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let args = args_for(&temp_dir.path().join("absent.json"));
        assert_eq!(run(&args), EXIT_CONFIG_UNREADABLE);
    }

    #[test]
    fn test_malformed_config_file_exits_3() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = write_config(&temp_dir, "{ not json");
        assert_eq!(run(&args_for(&path)), EXIT_CONFIG_UNREADABLE);
    }

    #[test]
    fn test_missing_backups_directory_exits_1() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let logs = temp_dir.path().join("logs");
        let path = write_config(
            &temp_dir,
            &format!(r#"{{"logs_directory": {:?}}}"#, logs.to_str().unwrap()),
        );
        assert_eq!(run(&args_for(&path)), EXIT_NO_BACKUPS_DIRECTORY);
    }

    #[test]
    fn test_duplicate_source_exits_4() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let src = temp_dir.path().join("src");
        fs::create_dir(&src).expect("Failed to create src");

        let path = write_config(
            &temp_dir,
            &format!(
                r#"{{
                    "backups_directory": {root:?},
                    "source_directories": [{src:?}, {src:?}],
                    "logs_directory": {logs:?}
                }}"#,
                root = temp_dir.path().join("dst").to_str().unwrap(),
                src = src.to_str().unwrap(),
                logs = temp_dir.path().join("logs").to_str().unwrap(),
            ),
        );
        assert_eq!(run(&args_for(&path)), EXIT_INVALID_SOURCE);
    }

    #[test]
    fn test_nested_destination_exits_4() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        // Registration is rejected before anything touches the filesystem,
        // so the source does not need to exist
        let src = temp_dir.path().join("data");

        let path = write_config(
            &temp_dir,
            &format!(
                r#"{{
                    "backups_directory": {root:?},
                    "source_directories": [{src:?}],
                    "logs_directory": {logs:?}
                }}"#,
                root = src.join("backups").to_str().unwrap(),
                src = src.to_str().unwrap(),
                logs = temp_dir.path().join("logs").to_str().unwrap(),
            ),
        );
        assert_eq!(run(&args_for(&path)), EXIT_INVALID_SOURCE);
    }

    #[test]
    fn test_missing_source_at_run_time_exits_2() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = write_config(
            &temp_dir,
            &format!(
                r#"{{
                    "backups_directory": {root:?},
                    "datetime_fmt": "T1",
                    "source_directories": [{src:?}],
                    "logs_directory": {logs:?}
                }}"#,
                root = temp_dir.path().join("dst").to_str().unwrap(),
                src = temp_dir.path().join("vanished").to_str().unwrap(),
                logs = temp_dir.path().join("logs").to_str().unwrap(),
            ),
        );
        assert_eq!(run(&args_for(&path)), EXIT_BACKUP_FAILED);
    }

    #[test]
    fn test_invalid_datetime_format_exits_2() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = write_config(
            &temp_dir,
            &format!(
                r#"{{
                    "backups_directory": {root:?},
                    "datetime_fmt": "%[",
                    "logs_directory": {logs:?}
                }}"#,
                root = temp_dir.path().join("dst").to_str().unwrap(),
                logs = temp_dir.path().join("logs").to_str().unwrap(),
            ),
        );
        assert_eq!(run(&args_for(&path)), EXIT_BACKUP_FAILED);
    }

    #[test]
    fn test_invalid_hash_algorithm_exits_2() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let src = temp_dir.path().join("src");
        fs::create_dir(&src).expect("Failed to create src");

        let path = write_config(
            &temp_dir,
            &format!(
                r#"{{
                    "backups_directory": {root:?},
                    "source_directories": [{src:?}],
                    "logs_directory": {logs:?}
                }}"#,
                root = temp_dir.path().join("dst").to_str().unwrap(),
                src = src.to_str().unwrap(),
                logs = temp_dir.path().join("logs").to_str().unwrap(),
            ),
        );

        let mut args = args_for(&path);
        args.verify = true;
        args.hash = "invalid_algo".to_string();
        assert_eq!(run(&args), EXIT_BACKUP_FAILED);
    }

    #[test]
    fn test_no_sources_exits_0_without_creating_destination() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let root = temp_dir.path().join("dst");
        let path = write_config(
            &temp_dir,
            &format!(
                r#"{{
                    "backups_directory": {root:?},
                    "logs_directory": {logs:?}
                }}"#,
                root = root.to_str().unwrap(),
                logs = temp_dir.path().join("logs").to_str().unwrap(),
            ),
        );

        assert_eq!(run(&args_for(&path)), EXIT_OK);
        assert!(!root.exists());
    }

    #[test]
    fn test_happy_path_exits_0_and_copies_files() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let src = temp_dir.path().join("src");
        fs::create_dir_all(src.join("sub")).expect("Failed to create source tree");
        fs::write(src.join("a.txt"), b"alpha").expect("Failed to write a.txt");
        fs::write(src.join("sub").join("b.txt"), b"bravo").expect("Failed to write b.txt");

        let root = temp_dir.path().join("dst");
        let report_path = temp_dir.path().join("report.json");
        let path = write_config(
            &temp_dir,
            &format!(
                r#"{{
                    "backups_directory": {root:?},
                    "datetime_fmt": "T1",
                    "source_directories": [{src:?}],
                    "logs_directory": {logs:?}
                }}"#,
                root = root.to_str().unwrap(),
                src = src.to_str().unwrap(),
                logs = temp_dir.path().join("logs").to_str().unwrap(),
            ),
        );

        let mut args = args_for(&path);
        args.verify = true;
        args.report = Some(report_path.clone());
        assert_eq!(run(&args), EXIT_OK);

        let a = fs::read_to_string(root.join("T1").join("a.txt")).expect("a.txt missing");
        assert_eq!(a, "alpha");
        let b = fs::read_to_string(root.join("T1").join("sub").join("b.txt"))
            .expect("sub/b.txt missing");
        assert_eq!(b, "bravo");

        let report_json = fs::read_to_string(&report_path).expect("report missing");
        assert!(report_json.contains("\"sources\""));
    }
}
