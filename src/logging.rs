//! Process-wide append-only log.
//!
//! All events go to one text file through a non-blocking writer; nothing is
//! printed to the terminal, which belongs to the TUI.

use crate::config::{LogFormat, LoggingConfig};
use crate::error::{AppError, AppResult};
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

/// Split a log path into the directory and file name the appender wants.
fn split_path(path: &Path) -> AppResult<(PathBuf, PathBuf)> {
    let file_name = path
        .file_name()
        .ok_or_else(|| AppError::Logging(format!("'{}' is not a file path", path.display())))?;
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Ok((directory, PathBuf::from(file_name)))
}

/// Build the filter: `RUST_LOG` wins over the configured level.
fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber writing to `config.file`.
///
/// The returned guard flushes pending lines when dropped; keep it alive for
/// the life of the process.
pub fn init(config: &LoggingConfig) -> AppResult<WorkerGuard> {
    let (directory, file_name) = split_path(&config.file)?;
    std::fs::create_dir_all(&directory)?;

    let appender = tracing_appender::rolling::never(directory, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let base = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(false)
        .with_thread_names(true);
    let fmt_layer: Box<dyn Layer<Registry> + Send + Sync> = match config.format {
        LogFormat::Full => base.boxed(),
        LogFormat::Compact => base.compact().boxed(),
        LogFormat::Pretty => base.pretty().boxed(),
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(build_filter(&config.level))
        .try_init()
        .map_err(|e| AppError::Logging(e.to_string()))?;

    Ok(guard)
}
