//! Logging setup for Accord binaries.
//!
//! Daily log files under `$ACCORD_HOME/logs` (a bounded number kept) plus a
//! stderr layer. `RUST_LOG` overrides the default filter for both.

use accord_protocol::paths::default_logs_dir;
use std::io;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{Builder, InitError, RollingFileAppender, Rotation};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_LOG_FILTER: &str = "accord=info,accord_store=info,accord_templates=info";
const VERBOSE_LOG_FILTER: &str = "accord=debug,accord_store=debug,accord_templates=debug";
const MAX_LOG_FILES: usize = 14;

pub struct LogConfig<'a> {
    pub app_name: &'a str,
    pub verbose: bool,
    /// Keep stderr to warnings, e.g. when stdout carries JSON
    pub quiet_console: bool,
}

/// Keeps the background file writer alive; drop it last.
#[must_use]
pub struct LogGuard {
    _file: Option<WorkerGuard>,
}

/// Install the global subscriber. If the log directory is unusable, logging
/// continues on stderr only.
pub fn init_logging(config: LogConfig<'_>) -> LogGuard {
    let file_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let console_filter = if config.verbose {
        EnvFilter::new(VERBOSE_LOG_FILTER)
    } else if config.quiet_console {
        EnvFilter::new("warn")
    } else {
        file_filter.clone()
    };

    let mut guard = None;
    let appender = ensure_logs_dir()
        .map_err(|e| e.to_string())
        .and_then(|dir| daily_appender(&dir, config.app_name).map_err(|e| e.to_string()));
    let file_layer = match appender {
        Ok(appender) => {
            let (writer, file_guard) = tracing_appender::non_blocking(appender);
            guard = Some(file_guard);
            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false)
                    .with_filter(file_filter),
            )
        }
        Err(err) => {
            eprintln!("Warning: file logging disabled: {}", err);
            None
        }
    };

    tracing_subscriber::registry()
        .with(file_layer)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_filter(console_filter),
        )
        .init();

    LogGuard { _file: guard }
}

/// `<app>.YYYY-MM-DD.log`, rotated daily, oldest pruned.
pub fn daily_appender(dir: &Path, app_name: &str) -> Result<RollingFileAppender, InitError> {
    Builder::new()
        .rotation(Rotation::DAILY)
        .filename_prefix(log_file_prefix(app_name))
        .filename_suffix("log")
        .max_log_files(MAX_LOG_FILES)
        .build(dir)
}

pub fn ensure_logs_dir() -> io::Result<PathBuf> {
    let dir = default_logs_dir();
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

fn log_file_prefix(app_name: &str) -> String {
    let cleaned: String = app_name
        .chars()
        .map(|ch| if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' { ch } else { '_' })
        .collect();
    if cleaned.is_empty() {
        "accord".to_string()
    } else {
        cleaned
    }
}
