//! Init command - initialize configuration file.

use busopt::config::{config_file_path, ConfigFile};

use crate::error::CliError;

/// Run the init command.
pub fn run() -> Result<(), CliError> {
    let path = config_file_path();

    if path.exists() {
        // Validate what is there rather than overwrite it.
        ConfigFile::load_from(&path)?;
        println!("Configuration file already exists: {}", path.display());
        return Ok(());
    }

    ConfigFile::default().save_to(&path)?;

    println!("Configuration file: {}", path.display());
    println!();
    println!("Edit this file to customize bus capacities, busy cycles and spacings.");
    println!("CLI arguments override config file values when specified.");
    Ok(())
}
