//! Addressable configuration keys for `config get` / `config set`.
//!
//! Keys are written `section.key`. Table sections take the table key after
//! the dot: `capacity.3200`, `busy.W`, `spacing.W-R`.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use super::capacity::default_capacity;
use super::file::{parse_capacity, parse_value, split_pair, ConfigFile, ConfigFileError};
use crate::command::CommandSequence;
use crate::logging::parse_filter;

/// A settable configuration key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigKey {
    BusFrequency,
    BusTemperature,
    BusSequence,
    /// Capacity in cycles for a data rate.
    Capacity(u32),
    BusyDefault,
    /// Busy cycles for a command token.
    Busy(String),
    PredictorDefaultSpacing,
    PredictorRefreshRate,
    PredictorCacheEntries,
    /// Spacing for a `(previous, current)` pair.
    Spacing(String, String),
    LoggingLevel,
    LoggingDirectory,
}

impl ConfigKey {
    /// Keys with a fixed name, in display order.
    const FIXED: [ConfigKey; 9] = [
        ConfigKey::BusFrequency,
        ConfigKey::BusTemperature,
        ConfigKey::BusSequence,
        ConfigKey::BusyDefault,
        ConfigKey::PredictorDefaultSpacing,
        ConfigKey::PredictorRefreshRate,
        ConfigKey::PredictorCacheEntries,
        ConfigKey::LoggingLevel,
        ConfigKey::LoggingDirectory,
    ];

    /// Every key present in `config`, grouped by section.
    pub fn all(config: &ConfigFile) -> Vec<ConfigKey> {
        let mut keys = vec![
            ConfigKey::BusFrequency,
            ConfigKey::BusTemperature,
            ConfigKey::BusSequence,
        ];
        keys.extend(config.capacity.entries().map(|(f, _)| ConfigKey::Capacity(f)));
        keys.push(ConfigKey::BusyDefault);
        keys.extend(
            config
                .busy
                .entries()
                .map(|(command, _)| ConfigKey::Busy(command.to_string())),
        );
        keys.extend([
            ConfigKey::PredictorDefaultSpacing,
            ConfigKey::PredictorRefreshRate,
            ConfigKey::PredictorCacheEntries,
        ]);
        keys.extend(
            config
                .predictor
                .spacings
                .iter()
                .map(|s| ConfigKey::Spacing(s.previous.clone(), s.current.clone())),
        );
        keys.extend([ConfigKey::LoggingLevel, ConfigKey::LoggingDirectory]);
        keys
    }

    /// Section name.
    pub fn section(&self) -> &'static str {
        match self {
            ConfigKey::BusFrequency | ConfigKey::BusTemperature | ConfigKey::BusSequence => "bus",
            ConfigKey::Capacity(_) => "capacity",
            ConfigKey::BusyDefault | ConfigKey::Busy(_) => "busy",
            ConfigKey::PredictorDefaultSpacing
            | ConfigKey::PredictorRefreshRate
            | ConfigKey::PredictorCacheEntries => "predictor",
            ConfigKey::Spacing(_, _) => "spacing",
            ConfigKey::LoggingLevel | ConfigKey::LoggingDirectory => "logging",
        }
    }

    /// Key name within the section.
    pub fn key_name(&self) -> String {
        match self {
            ConfigKey::BusFrequency => "frequency".to_string(),
            ConfigKey::BusTemperature => "temperature".to_string(),
            ConfigKey::BusSequence => "sequence".to_string(),
            ConfigKey::Capacity(frequency) => frequency.to_string(),
            ConfigKey::BusyDefault => "default".to_string(),
            ConfigKey::Busy(command) => command.clone(),
            ConfigKey::PredictorDefaultSpacing => "default_spacing".to_string(),
            ConfigKey::PredictorRefreshRate => "refresh_rate_us".to_string(),
            ConfigKey::PredictorCacheEntries => "cache_entries".to_string(),
            ConfigKey::Spacing(previous, current) => format!("{}-{}", previous, current),
            ConfigKey::LoggingLevel => "level".to_string(),
            ConfigKey::LoggingDirectory => "directory".to_string(),
        }
    }

    /// Full `section.key` name.
    pub fn name(&self) -> String {
        format!("{}.{}", self.section(), self.key_name())
    }

    /// Current value as a string (empty when unset).
    pub fn get(&self, config: &ConfigFile) -> String {
        match self {
            ConfigKey::BusFrequency => config.bus.frequency_mts.to_string(),
            ConfigKey::BusTemperature => config.bus.temperature_c.to_string(),
            ConfigKey::BusSequence => config.bus.sequence.clone(),
            ConfigKey::Capacity(frequency) => config
                .capacity
                .get(*frequency)
                .or_else(|| default_capacity(*frequency))
                .map(|c| c.to_string())
                .unwrap_or_default(),
            ConfigKey::BusyDefault => config.busy.default_cycles().to_string(),
            ConfigKey::Busy(command) => config
                .busy
                .entries()
                .find(|(c, _)| *c == command.as_str())
                .map(|(_, cycles)| cycles.to_string())
                .unwrap_or_default(),
            ConfigKey::PredictorDefaultSpacing => config.predictor.default_spacing.to_string(),
            ConfigKey::PredictorRefreshRate => config.predictor.refresh_rate_us.to_string(),
            ConfigKey::PredictorCacheEntries => config.predictor.cache_entries.to_string(),
            ConfigKey::Spacing(previous, current) => config
                .predictor
                .spacing(previous, current)
                .map(|c| c.to_string())
                .unwrap_or_default(),
            ConfigKey::LoggingLevel => config.logging.level.clone(),
            ConfigKey::LoggingDirectory => config
                .logging
                .directory
                .as_ref()
                .map(|d| d.display().to_string())
                .unwrap_or_default(),
        }
    }

    /// Validate and store a value.
    pub fn set(&self, config: &mut ConfigFile, value: &str) -> Result<(), ConfigFileError> {
        let section = self.section();
        let key = self.key_name();
        let invalid = |reason: String| ConfigFileError::invalid(&self.name(), value, reason);

        match self {
            ConfigKey::BusFrequency => {
                let frequency: u32 = parse_value(section, &key, value)?;
                if frequency == 0 {
                    return Err(invalid("frequency must be positive".to_string()));
                }
                config.bus.frequency_mts = frequency;
            }
            ConfigKey::BusTemperature => {
                config.bus.temperature_c = parse_value(section, &key, value)?;
            }
            ConfigKey::BusSequence => {
                let sequence: CommandSequence =
                    value.parse().map_err(|e| invalid(format!("{}", e)))?;
                config.bus.sequence = sequence.to_string();
            }
            ConfigKey::Capacity(frequency) => {
                let cycles = parse_capacity(section, &key, value)?;
                config
                    .capacity
                    .set(*frequency, cycles)
                    .map_err(|e| invalid(e.to_string()))?;
            }
            ConfigKey::BusyDefault => {
                let cycles: u32 = parse_value(section, &key, value)?;
                let mut busy = crate::schedule::BusyCycleTable::new(cycles);
                for (command, c) in config.busy.entries() {
                    busy.insert(command, c);
                }
                config.busy = busy;
            }
            ConfigKey::Busy(command) => {
                config
                    .busy
                    .insert(command, parse_value(section, &key, value)?);
            }
            ConfigKey::PredictorDefaultSpacing => {
                config.predictor.default_spacing = parse_value(section, &key, value)?;
            }
            ConfigKey::PredictorRefreshRate => {
                let rate: f64 = parse_value(section, &key, value)?;
                if !rate.is_finite() {
                    return Err(invalid("must be a finite number".to_string()));
                }
                config.predictor.refresh_rate_us = rate;
            }
            ConfigKey::PredictorCacheEntries => {
                let entries: u64 = parse_value(section, &key, value)?;
                if entries == 0 {
                    return Err(invalid("must be positive".to_string()));
                }
                config.predictor.cache_entries = entries;
            }
            ConfigKey::Spacing(previous, current) => {
                let cycles = parse_value(section, &key, value)?;
                config.predictor.set_spacing(previous, current, cycles);
            }
            ConfigKey::LoggingLevel => {
                parse_filter(value.trim()).map_err(|e| invalid(e.to_string()))?;
                config.logging.level = value.trim().to_string();
            }
            ConfigKey::LoggingDirectory => {
                let value = value.trim();
                config.logging.directory = (!value.is_empty()).then(|| PathBuf::from(value));
            }
        }
        Ok(())
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.section(), self.key_name())
    }
}

impl FromStr for ConfigKey {
    type Err = ConfigFileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unknown = || ConfigFileError::UnknownKey(s.to_string());
        let (section, key) = s.trim().split_once('.').ok_or_else(unknown)?;
        let section = section.to_lowercase();

        if let Some(fixed) = Self::FIXED
            .iter()
            .find(|k| k.section() == section && k.key_name() == key.to_lowercase())
        {
            return Ok(fixed.clone());
        }

        match section.as_str() {
            "capacity" => key.parse().map(ConfigKey::Capacity).map_err(|_| unknown()),
            "busy" if !key.trim().is_empty() => Ok(ConfigKey::Busy(key.trim().to_uppercase())),
            "spacing" => split_pair(key)
                .map(|(p, c)| ConfigKey::Spacing(p.to_uppercase(), c.to_uppercase()))
                .ok_or_else(unknown),
            _ => Err(unknown()),
        }
    }
}
