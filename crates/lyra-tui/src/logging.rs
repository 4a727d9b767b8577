//! File logging.
//!
//! The terminal UI owns stderr, so all tracing output goes to
//! `{data_local_dir}/lyra-os/logs/lyra-os.log` through a non-blocking writer.
//! Keep the returned guard alive for the whole program; dropping it flushes
//! and closes the file.

use std::fs;
use std::path::PathBuf;

use anyhow::Result;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

const LOG_FILE_NAME: &str = "lyra-os.log";
const DEFAULT_FILTER: &str = "info,reqwest=warn,hyper=warn";

pub struct LoggingGuard {
    _file_guard: WorkerGuard,
}

pub fn init(level: Option<&str>) -> Result<LoggingGuard> {
    let log_dir = log_dir();
    fs::create_dir_all(&log_dir)?;

    let file_appender = tracing_appender::rolling::never(&log_dir, LOG_FILE_NAME);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false)
        .with_target(true)
        .with_level(true)
        .with_thread_ids(false);

    tracing_subscriber::registry()
        .with(build_filter(level)?)
        .with(file_layer)
        .try_init()?;

    info!(
        event_type = "app_lifecycle",
        action = "started",
        log_path = %log_path().display(),
        "Logging initialized"
    );

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}

/// An explicit level wins over `RUST_LOG`, which wins over the default
fn build_filter(level: Option<&str>) -> Result<EnvFilter> {
    match level {
        Some(directive) => Ok(EnvFilter::try_new(directive)?),
        None => Ok(EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))),
    }
}

fn log_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("lyra-os").join("logs"))
        .unwrap_or_else(|| std::env::temp_dir().join("lyra-os-logs"))
}

pub fn log_path() -> PathBuf {
    log_dir().join(LOG_FILE_NAME)
}
