//! Configuration: capacity tables, the INI config file and its keys.

mod capacity;
mod file;
mod keys;

pub use capacity::{
    default_capacity, validate_capacity, CapacityTable, DEFAULT_CAPACITIES,
    FALLBACK_CAPACITY_CYCLES,
};
pub use file::{
    config_dir, config_file_path, BusSettings, ConfigFile, ConfigFileError, PredictorSettings,
    SpacingOverride, CONFIG_FILE_NAME, DEFAULT_FREQUENCY_MTS, DEFAULT_SEQUENCE,
    DEFAULT_TEMPERATURE_C,
};
pub use keys::ConfigKey;
