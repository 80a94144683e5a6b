//! CLI error type.

use std::fmt;
use std::io;

use busopt::config::ConfigFileError;
use busopt::logging::LoggingError;
use busopt::BusError;

/// Errors surfaced to the user by the `busopt` binary.
#[derive(Debug)]
pub enum CliError {
    /// Invalid input rejected by the engine.
    Bus(BusError),
    /// Config file could not be read, parsed or written.
    ConfigFile(ConfigFileError),
    /// A configuration problem with a user-facing message.
    Config(String),
    /// Logging could not be initialized.
    Logging(LoggingError),
    /// JSON output failed.
    Json(serde_json::Error),
    Io(io::Error),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Bus(e) => write!(f, "{}", e),
            CliError::ConfigFile(e) => write!(f, "Config file error: {}", e),
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Logging(e) => write!(f, "Failed to initialize logging: {}", e),
            CliError::Json(e) => write!(f, "Failed to encode JSON: {}", e),
            CliError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Bus(e) => Some(e),
            CliError::ConfigFile(e) => Some(e),
            CliError::Logging(e) => Some(e),
            CliError::Json(e) => Some(e),
            CliError::Io(e) => Some(e),
            CliError::Config(_) => None,
        }
    }
}

impl From<BusError> for CliError {
    fn from(e: BusError) -> Self {
        CliError::Bus(e)
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::ConfigFile(e)
    }
}

impl From<LoggingError> for CliError {
    fn from(e: LoggingError) -> Self {
        CliError::Logging(e)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::Json(e)
    }
}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        CliError::Io(e)
    }
}
