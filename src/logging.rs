//! Logging setup
//!
//! Console output always; a daily-rolling file under `logging.log_dir` when
//! one is configured. `RUST_LOG` overrides the configured level.

use crate::config::LoggingConfig;
use std::fs;
use std::io;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Log file name prefix; the appender adds the date
pub const LOG_FILE_PREFIX: &str = "thermora-node.log";

/// Keeps the non-blocking file writer alive
///
/// Dropping it flushes and closes the log file.
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Filter from `RUST_LOG`, falling back to the configured level
pub fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Install the global subscriber
///
/// # Errors
///
/// Returns error if the log directory cannot be created
pub fn init_logging(config: &LoggingConfig) -> Result<LoggingGuard, io::Error> {
    let (file_layer, file_guard) = if config.log_dir.is_empty() {
        (None, None)
    } else {
        fs::create_dir_all(&config.log_dir)?;
        let file_appender = tracing_appender::rolling::daily(&config.log_dir, LOG_FILE_PREFIX);
        let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

        let layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking_file)
            .with_ansi(false);
        (Some(layer), Some(file_guard))
    };

    tracing_subscriber::registry()
        .with(env_filter(&config.level))
        .with(file_layer)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stdout))
        .init();

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}
