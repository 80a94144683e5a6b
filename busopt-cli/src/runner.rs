//! Shared setup for commands that run the engine.

use busopt::config::ConfigFile;
use busopt::logging::{init_logging, LoggingGuard};
use tracing::info;

use crate::error::CliError;

/// Loaded configuration plus the active logging guard.
pub struct CliRunner {
    config: ConfigFile,
    _log_guard: LoggingGuard,
}

impl CliRunner {
    /// Load the config file and install logging.
    ///
    /// `log_level` replaces the configured level when given.
    pub fn new(log_level: Option<&str>) -> Result<Self, CliError> {
        let config = ConfigFile::load()?;

        let mut logging = config.logging.clone();
        if let Some(level) = log_level {
            logging = logging.with_level(level);
        }
        let log_guard = init_logging(&logging)?;

        Ok(Self {
            config,
            _log_guard: log_guard,
        })
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    /// Log the command being run.
    pub fn log_startup(&self, command: &str) {
        info!(
            version = busopt::VERSION,
            command,
            log_file = ?self.config.logging.log_file(),
            "busopt starting"
        );
    }
}
