//! Tracing subscriber setup.
//!
//! Installs a stderr formatter and, when a log directory is configured, a
//! non-blocking file writer. `RUST_LOG` overrides the configured level.
//!
//! # Example
//!
//! ```ignore
//! use busopt::logging::{init_logging, LoggingConfig};
//!
//! // Keep the guard alive until exit so buffered file output is flushed.
//! let _guard = init_logging(&LoggingConfig::default())?;
//! tracing::info!("ready");
//! ```

use std::io;
use std::path::PathBuf;

use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::LocalTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Default filter directive.
pub const DEFAULT_LOG_LEVEL: &str = "warn";

/// Log file name inside the configured directory.
pub const LOG_FILE_NAME: &str = "busopt.log";

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Filter directive, e.g. `info` or `busopt=debug`.
    pub level: String,
    /// Directory for [`LOG_FILE_NAME`]; stderr only when unset.
    pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            directory: None,
        }
    }
}

impl LoggingConfig {
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    pub fn with_directory(mut self, directory: PathBuf) -> Self {
        self.directory = Some(directory);
        self
    }

    /// Full path of the log file, if file logging is enabled.
    pub fn log_file(&self) -> Option<PathBuf> {
        self.directory.as_ref().map(|d| d.join(LOG_FILE_NAME))
    }
}

/// Errors while installing the subscriber.
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid log filter '{directive}': {reason}")]
    InvalidFilter { directive: String, reason: String },

    #[error("failed to create log directory: {0}")]
    Io(#[from] io::Error),

    #[error("logging already initialized: {0}")]
    AlreadyInitialized(String),
}

/// Keeps the background file writer alive.
///
/// Dropping it flushes and stops file logging.
#[must_use = "dropping the guard stops file logging"]
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Build the filter from `RUST_LOG`, falling back to the configured level.
pub fn build_filter(level: &str) -> Result<EnvFilter, LoggingError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    parse_filter(level)
}

/// Parse a filter directive, ignoring `RUST_LOG`.
pub fn parse_filter(level: &str) -> Result<EnvFilter, LoggingError> {
    EnvFilter::try_new(level).map_err(|e| LoggingError::InvalidFilter {
        directive: level.to_string(),
        reason: e.to_string(),
    })
}

/// Install the global tracing subscriber.
pub fn init_logging(config: &LoggingConfig) -> Result<LoggingGuard, LoggingError> {
    let filter = build_filter(&config.level)?;

    let stderr_layer = fmt::layer()
        .with_writer(io::stderr)
        .with_timer(LocalTime::rfc_3339())
        .with_target(false);

    let (file_layer, file_guard) = match &config.directory {
        Some(directory) => {
            std::fs::create_dir_all(directory)?;
            let appender = tracing_appender::rolling::never(directory, LOG_FILE_NAME);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_timer(LocalTime::rfc_3339())
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))?;

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, "warn");
        assert!(config.log_file().is_none());
    }

    #[test]
    fn test_log_file_path() {
        let config = LoggingConfig::default().with_directory(PathBuf::from("/var/log/busopt"));
        assert_eq!(
            config.log_file(),
            Some(PathBuf::from("/var/log/busopt/busopt.log"))
        );
    }

    #[test]
    fn test_build_filter_accepts_directives() {
        assert!(build_filter("info").is_ok());
        assert!(build_filter("busopt=debug,warn").is_ok());
    }

    #[test]
    fn test_parse_filter_rejects_bad_directive() {
        assert!(parse_filter("busopt=debug").is_ok());
        assert!(matches!(
            parse_filter("not=valid=="),
            Err(LoggingError::InvalidFilter { .. })
        ));
    }
}
