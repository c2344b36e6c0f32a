//! Logging for the rollcall binaries
//!
//! All three binaries append to one daily file in the XDG state directory:
//!
//! ```text
//! $XDG_STATE_HOME/rollcall/rollcall.log.2024-03-04
//! $XDG_STATE_HOME/rollcall/rollcall.log.2024-03-05
//! ```
//!
//! Files are named by UTC date. `[logging] max_files` bounds how many are
//! kept; older ones are removed when the file rolls over. Each binary logs a
//! `starting` event with a `binary` field, so runs can be told apart. Nothing
//! is written to the terminal, which carries command output only.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::config::{Config, LoggingConfig};
use crate::error::{Error, Result};

const LOG_FILE_PREFIX: &str = "rollcall.log";

/// Install the file subscriber.
///
/// `RUST_LOG` takes precedence over `[logging] level`. Fails if a global
/// subscriber is already set.
pub fn init(config: &LoggingConfig) -> Result<LoggingGuard> {
    let log_dir = Config::state_dir();
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender(&log_dir, config)?);

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true),
        )
        .try_init()
        .map_err(|e| Error::Config(format!("logging already initialized: {}", e)))?;

    tracing::debug!(log_dir = %log_dir.display(), level = %config.level, "Logging initialized");
    Ok(LoggingGuard { _guard: guard })
}

fn file_appender(dir: &Path, config: &LoggingConfig) -> Result<RollingFileAppender> {
    std::fs::create_dir_all(dir)?;
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .max_log_files(config.max_files.max(1))
        .build(dir)
        .map_err(|e| Error::Config(format!("failed to create log file: {}", e)))
}

/// Subscriber for tests, writing through the test harness.
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .with_span_events(FmtSpan::CLOSE)
        .try_init();
}

/// Keeps the background writer alive; pending lines are flushed on drop.
pub struct LoggingGuard {
    _guard: tracing_appender::non_blocking::WorkerGuard,
}

/// Log file written on `date` (UTC).
pub fn log_file_path(date: NaiveDate) -> PathBuf {
    Config::state_dir().join(log_file_name(date))
}

fn log_file_name(date: NaiveDate) -> String {
    format!("{}.{}", LOG_FILE_PREFIX, date.format("%Y-%m-%d"))
}
