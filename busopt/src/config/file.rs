//! INI configuration file.
//!
//! Default location is `<config dir>/busopt/config.ini`. A missing file is
//! not an error; defaults are used instead.
//!
//! ```ini
//! [bus]
//! frequency = 3200
//! temperature = 30
//! sequence = R-W-R-W
//!
//! [capacity]
//! 2133 = 20
//! 3200 = 28
//!
//! [busy]
//! default = 2
//! R = 2
//! W = 4
//!
//! [predictor]
//! default_spacing = 4
//! refresh_rate_us = 7.8
//! cache_entries = 4096
//!
//! [spacing]
//! W-R = 8
//!
//! [logging]
//! level = warn
//! directory = /var/log/busopt
//! ```

use std::fmt::Display;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use ini::Ini;
use thiserror::Error;
use tracing::debug;

use super::capacity::{validate_capacity, CapacityTable};
use crate::command::{CommandSequence, SEQUENCE_SEPARATOR};
use crate::logging::LoggingConfig;
use crate::predictor::{
    TimingTablePredictor, DEFAULT_PREDICTION_CACHE_ENTRIES, DEFAULT_REFRESH_RATE_US,
    DEFAULT_SPACING_CYCLES, WRITE_TO_READ_SPACING_CYCLES,
};
use crate::schedule::{BusyCycleTable, DEFAULT_BUSY_CYCLES};

/// Default data rate in MT/s.
pub const DEFAULT_FREQUENCY_MTS: u32 = 3200;

/// Default operating temperature in °C.
pub const DEFAULT_TEMPERATURE_C: i32 = 30;

/// Default command sequence.
pub const DEFAULT_SEQUENCE: &str = "R-W-R-W";

/// Config file name.
pub const CONFIG_FILE_NAME: &str = "config.ini";

const SECTION_BUS: &str = "bus";
const SECTION_CAPACITY: &str = "capacity";
const SECTION_BUSY: &str = "busy";
const SECTION_PREDICTOR: &str = "predictor";
const SECTION_SPACING: &str = "spacing";
const SECTION_LOGGING: &str = "logging";

const BUSY_DEFAULT_KEY: &str = "default";

/// Errors loading, parsing or saving the config file.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(String),

    #[error("invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("unknown configuration key '{0}'")]
    UnknownKey(String),
}

impl ConfigFileError {
    pub(crate) fn invalid(key: &str, value: &str, reason: impl Display) -> Self {
        Self::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Directory holding the config file.
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("busopt")
}

/// Full path of the default config file.
pub fn config_file_path() -> PathBuf {
    config_dir().join(CONFIG_FILE_NAME)
}

/// `[bus]` operating defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusSettings {
    pub frequency_mts: u32,
    pub temperature_c: i32,
    pub sequence: String,
}

impl Default for BusSettings {
    fn default() -> Self {
        Self {
            frequency_mts: DEFAULT_FREQUENCY_MTS,
            temperature_c: DEFAULT_TEMPERATURE_C,
            sequence: DEFAULT_SEQUENCE.to_string(),
        }
    }
}

/// One `[spacing]` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpacingOverride {
    pub previous: String,
    pub current: String,
    pub cycles: u32,
}

impl SpacingOverride {
    /// `PREV-CURR` key as written in the file.
    pub fn key(&self) -> String {
        format!("{}{}{}", self.previous, SEQUENCE_SEPARATOR, self.current)
    }
}

/// `[predictor]` and `[spacing]` settings.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictorSettings {
    pub default_spacing: u32,
    pub refresh_rate_us: f64,
    /// Maximum memoized predictions.
    pub cache_entries: u64,
    pub spacings: Vec<SpacingOverride>,
}

impl Default for PredictorSettings {
    fn default() -> Self {
        Self {
            default_spacing: DEFAULT_SPACING_CYCLES,
            refresh_rate_us: DEFAULT_REFRESH_RATE_US,
            cache_entries: DEFAULT_PREDICTION_CACHE_ENTRIES,
            spacings: vec![SpacingOverride {
                previous: "W".to_string(),
                current: "R".to_string(),
                cycles: WRITE_TO_READ_SPACING_CYCLES,
            }],
        }
    }
}

impl PredictorSettings {
    /// Build the table predictor described by these settings.
    pub fn timing_predictor(&self) -> TimingTablePredictor {
        self.spacings.iter().fold(
            TimingTablePredictor::new(self.default_spacing, self.refresh_rate_us),
            |predictor, s| predictor.with_spacing(&s.previous, &s.current, s.cycles),
        )
    }

    /// Insert or replace a spacing entry.
    pub fn set_spacing(&mut self, previous: &str, current: &str, cycles: u32) {
        let previous = previous.trim().to_uppercase();
        let current = current.trim().to_uppercase();
        match self
            .spacings
            .iter_mut()
            .find(|s| s.previous == previous && s.current == current)
        {
            Some(existing) => existing.cycles = cycles,
            None => self.spacings.push(SpacingOverride {
                previous,
                current,
                cycles,
            }),
        }
    }

    /// Configured spacing for a pair, if any.
    pub fn spacing(&self, previous: &str, current: &str) -> Option<u32> {
        let previous = previous.trim().to_uppercase();
        let current = current.trim().to_uppercase();
        self.spacings
            .iter()
            .find(|s| s.previous == previous && s.current == current)
            .map(|s| s.cycles)
    }
}

/// The whole configuration file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConfigFile {
    pub bus: BusSettings,
    pub capacity: CapacityTable,
    pub busy: BusyCycleTable,
    pub predictor: PredictorSettings,
    pub logging: LoggingConfig,
}

impl ConfigFile {
    /// Load from the default path, or defaults if the file does not exist.
    pub fn load() -> Result<Self, ConfigFileError> {
        Self::load_from(&config_file_path())
    }

    /// Load from `path`, or defaults if the file does not exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigFileError> {
        if !path.exists() {
            debug!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path).map_err(|e| match e {
            ini::Error::Io(io) => ConfigFileError::Io(io),
            ini::Error::Parse(parse) => ConfigFileError::Parse(parse.to_string()),
        })?;
        debug!(path = %path.display(), "Loaded config file");
        Self::from_ini(&ini)
    }

    /// Parse from INI text.
    pub fn parse(text: &str) -> Result<Self, ConfigFileError> {
        let ini = Ini::load_from_str(text).map_err(|e| ConfigFileError::Parse(e.to_string()))?;
        Self::from_ini(&ini)
    }

    /// Save to the default path.
    pub fn save(&self) -> Result<(), ConfigFileError> {
        self.save_to(&config_file_path())
    }

    /// Save to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigFileError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        self.to_ini().write_to_file(path)?;
        debug!(path = %path.display(), "Saved config file");
        Ok(())
    }

    /// The configured default sequence, parsed.
    pub fn default_sequence(&self) -> Result<CommandSequence, ConfigFileError> {
        self.bus
            .sequence
            .parse()
            .map_err(|e| ConfigFileError::invalid("bus.sequence", &self.bus.sequence, e))
    }

    fn from_ini(ini: &Ini) -> Result<Self, ConfigFileError> {
        let mut config = Self::default();

        if let Some(section) = ini.section(Some(SECTION_BUS)) {
            if let Some(v) = section.get("frequency") {
                config.bus.frequency_mts = parse_value(SECTION_BUS, "frequency", v)?;
            }
            if let Some(v) = section.get("temperature") {
                config.bus.temperature_c = parse_value(SECTION_BUS, "temperature", v)?;
            }
            if let Some(v) = section.get("sequence") {
                config.bus.sequence = v.trim().to_string();
            }
        }

        if let Some(section) = ini.section(Some(SECTION_CAPACITY)) {
            for (key, value) in section.iter() {
                let frequency: u32 = parse_value(SECTION_CAPACITY, key, key)?;
                let cycles = parse_capacity(SECTION_CAPACITY, key, value)?;
                config
                    .capacity
                    .set(frequency, cycles)
                    .map_err(|e| ConfigFileError::invalid(key, value, e))?;
            }
        }

        if let Some(section) = ini.section(Some(SECTION_BUSY)) {
            let default_cycles = match section.get(BUSY_DEFAULT_KEY) {
                Some(v) => parse_value(SECTION_BUSY, BUSY_DEFAULT_KEY, v)?,
                None => DEFAULT_BUSY_CYCLES,
            };
            let mut busy = BusyCycleTable::new(default_cycles);
            for (key, value) in section.iter().filter(|(k, _)| *k != BUSY_DEFAULT_KEY) {
                busy.insert(key, parse_value(SECTION_BUSY, key, value)?);
            }
            config.busy = busy;
        }

        if let Some(section) = ini.section(Some(SECTION_PREDICTOR)) {
            if let Some(v) = section.get("default_spacing") {
                config.predictor.default_spacing =
                    parse_value(SECTION_PREDICTOR, "default_spacing", v)?;
            }
            if let Some(v) = section.get("refresh_rate_us") {
                let rate: f64 = parse_value(SECTION_PREDICTOR, "refresh_rate_us", v)?;
                if !rate.is_finite() {
                    return Err(ConfigFileError::invalid(
                        "predictor.refresh_rate_us",
                        v,
                        "must be a finite number",
                    ));
                }
                config.predictor.refresh_rate_us = rate;
            }
            if let Some(v) = section.get("cache_entries") {
                let entries: u64 = parse_value(SECTION_PREDICTOR, "cache_entries", v)?;
                if entries == 0 {
                    return Err(ConfigFileError::invalid(
                        "predictor.cache_entries",
                        v,
                        "must be positive",
                    ));
                }
                config.predictor.cache_entries = entries;
            }
        }

        if let Some(section) = ini.section(Some(SECTION_SPACING)) {
            config.predictor.spacings.clear();
            for (key, value) in section.iter() {
                let (previous, current) = split_pair(key)
                    .ok_or_else(|| ConfigFileError::invalid(key, value, "expected PREV-CURR"))?;
                let cycles = parse_value(SECTION_SPACING, key, value)?;
                config.predictor.set_spacing(previous, current, cycles);
            }
        }

        if let Some(section) = ini.section(Some(SECTION_LOGGING)) {
            if let Some(v) = section.get("level") {
                config.logging.level = v.trim().to_string();
            }
            if let Some(v) = section.get("directory") {
                let v = v.trim();
                config.logging.directory = (!v.is_empty()).then(|| PathBuf::from(v));
            }
        }

        Ok(config)
    }

    fn to_ini(&self) -> Ini {
        let mut ini = Ini::new();

        ini.with_section(Some(SECTION_BUS))
            .set("frequency", self.bus.frequency_mts.to_string())
            .set("temperature", self.bus.temperature_c.to_string())
            .set("sequence", self.bus.sequence.as_str());

        for (frequency, cycles) in self.capacity.entries() {
            ini.with_section(Some(SECTION_CAPACITY))
                .set(frequency.to_string(), cycles.to_string());
        }

        ini.with_section(Some(SECTION_BUSY))
            .set(BUSY_DEFAULT_KEY, self.busy.default_cycles().to_string());
        for (command, cycles) in self.busy.entries() {
            ini.with_section(Some(SECTION_BUSY))
                .set(command, cycles.to_string());
        }

        ini.with_section(Some(SECTION_PREDICTOR))
            .set("default_spacing", self.predictor.default_spacing.to_string())
            .set("refresh_rate_us", self.predictor.refresh_rate_us.to_string())
            .set("cache_entries", self.predictor.cache_entries.to_string());

        for spacing in &self.predictor.spacings {
            ini.with_section(Some(SECTION_SPACING))
                .set(spacing.key(), spacing.cycles.to_string());
        }

        let directory = self
            .logging
            .directory
            .as_ref()
            .map(|d| d.display().to_string())
            .unwrap_or_default();
        ini.with_section(Some(SECTION_LOGGING))
            .set("level", self.logging.level.as_str())
            .set("directory", directory);

        ini
    }
}

/// Parse a `PREV-CURR` spacing key.
pub(crate) fn split_pair(key: &str) -> Option<(&str, &str)> {
    let (previous, current) = key.split_once(SEQUENCE_SEPARATOR)?;
    let (previous, current) = (previous.trim(), current.trim());
    if previous.is_empty() || current.is_empty() || current.contains(SEQUENCE_SEPARATOR) {
        return None;
    }
    Some((previous, current))
}

pub(crate) fn parse_value<T>(section: &str, key: &str, value: &str) -> Result<T, ConfigFileError>
where
    T: FromStr,
    T::Err: Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| ConfigFileError::invalid(&format!("{}.{}", section, key), value, e))
}

pub(crate) fn parse_capacity(
    section: &str,
    key: &str,
    value: &str,
) -> Result<u32, ConfigFileError> {
    let cycles: i64 = parse_value(section, key, value)?;
    validate_capacity(cycles)
        .map_err(|e| ConfigFileError::invalid(&format!("{}.{}", section, key), value, e))
}
