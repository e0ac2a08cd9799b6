//! Tracing setup shared by the demo UI and the headless trainer.
//!
//! One global subscriber writes to stdout and to a per-launch file in the app
//! logs directory. Only this crate's own log files are pruned.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::OnceLock,
    time::SystemTime,
};

use time::{OffsetDateTime, UtcOffset, format_description::FormatItem, macros::format_description};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*};

use crate::app_dirs;

/// Log files kept after pruning, this launch included.
const MAX_LOG_FILES: usize = 10;
const LOG_FILE_PREFIX: &str = "shape_sketch";
/// egui and winit are chatty at info while painting.
const DEFAULT_FILTER: &str = "info,eframe=warn,egui=warn,winit=warn";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Log directory unavailable: {0}")]
    Directory(#[from] app_dirs::AppDirError),
    #[error("Log file operation failed at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to format log timestamp: {0}")]
    Timestamp(#[from] time::error::Format),
    #[error("Tracing subscriber already installed: {0}")]
    Subscriber(#[from] tracing::subscriber::SetGlobalDefaultError),
}

/// Initialize tracing with the log file in the app logs directory.
///
/// Repeated calls are no-ops; errors leave the caller free to run without logs.
pub fn init() -> Result<(), LoggingError> {
    if LOG_GUARD.get().is_some() {
        return Ok(());
    }
    init_with_dir(&app_dirs::logs_dir()?)
}

/// Initialize tracing with the log file placed in `log_dir`.
pub fn init_with_dir(log_dir: &Path) -> Result<(), LoggingError> {
    if LOG_GUARD.get().is_some() {
        return Ok(());
    }
    let io_err = |source| LoggingError::Io {
        path: log_dir.to_path_buf(),
        source,
    };
    fs::create_dir_all(log_dir).map_err(io_err)?;
    let log_path = log_dir.join(log_file_name(now_local_or_utc())?);
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .map_err(|source| LoggingError::Io {
            path: log_path.clone(),
            source,
        })?;
    prune_logs(log_dir, MAX_LOG_FILES)?;

    let (file_writer, guard) = tracing_appender::non_blocking(file);
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    const CLOCK: &[FormatItem<'static>] =
        format_description!("[hour]:[minute]:[second].[subsecond digits:3]");
    let timer = fmt::time::OffsetTime::new(offset, CLOCK);

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let subscriber = Registry::default()
        .with(filter)
        .with(
            fmt::layer()
                .with_timer(timer.clone())
                .with_target(false)
                .with_writer(std::io::stdout),
        )
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_timer(timer)
                .with_writer(file_writer),
        );
    tracing::subscriber::set_global_default(subscriber)?;
    let _ = LOG_GUARD.set(guard);

    tracing::info!("Logging to {}", log_path.display());
    Ok(())
}

fn log_file_name(now: OffsetDateTime) -> Result<String, LoggingError> {
    const STAMP: &[FormatItem<'_>] =
        format_description!("[year]-[month]-[day]_[hour]-[minute]-[second]");
    Ok(format!("{LOG_FILE_PREFIX}_{}.log", now.format(STAMP)?))
}

fn is_own_log(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "log")
        && path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with(LOG_FILE_PREFIX))
}

/// Delete all but the `keep` most recently modified log files of this app.
fn prune_logs(dir: &Path, keep: usize) -> Result<(), LoggingError> {
    let io_err = |source| LoggingError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut logs: Vec<(SystemTime, PathBuf)> = fs::read_dir(dir)
        .map_err(io_err)?
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_own_log(path))
        .map(|path| {
            let modified = fs::metadata(&path)
                .and_then(|meta| meta.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            (modified, path)
        })
        .collect();
    logs.sort_by(|a, b| b.0.cmp(&a.0));
    for (_, path) in logs.into_iter().skip(keep) {
        fs::remove_file(&path).map_err(io_err)?;
    }
    Ok(())
}

fn now_local_or_utc() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}
