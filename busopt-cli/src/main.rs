//! BusOpt CLI - Command-line interface
//!
//! This binary provides a command-line interface to the BusOpt library.

mod commands;
mod error;
mod runner;

use std::process;

use clap::{Parser, Subcommand};
use console::style;

use commands::common::{RefreshCommandArg, RefreshModeArg};
use commands::config::ConfigCommands;
use commands::optimize::OptimizeArgs;
use commands::refresh::RefreshArgs;
use error::CliError;
use runner::CliRunner;

#[derive(Parser)]
#[command(name = "busopt")]
#[command(about = "Predict command spacing and pack memory bus transitions", long_about = None)]
#[command(version)]
struct Cli {
    /// Log filter (e.g. debug, busopt=trace); overrides the config file
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Schedule a command sequence into buses
    Optimize {
        /// Data rate in MT/s (default from config)
        #[arg(long, short)]
        frequency: Option<u32>,

        /// Operating temperature in °C (default from config)
        #[arg(long, short, allow_negative_numbers = true)]
        temperature: Option<i32>,

        /// Command sequence, e.g. R-W-R-W (default from config)
        #[arg(long, short)]
        sequence: Option<String>,

        /// Bus capacity in cycles, overriding the table for this frequency
        #[arg(long, short)]
        capacity: Option<u32>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Evaluate the refresh interval for a refresh command
    Refresh {
        /// Refresh command
        #[arg(long, value_enum)]
        command: RefreshCommandArg,

        /// Refresh mode
        #[arg(long, value_enum, default_value = "normal")]
        mode: RefreshModeArg,

        /// Temperature in °C (0 to 95)
        #[arg(long, short, allow_negative_numbers = true)]
        temperature: f64,

        /// Bank count, required for same-bank fine granularity refresh
        #[arg(long, allow_negative_numbers = true)]
        banks: Option<i64>,
    },

    /// View or modify configuration
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },

    /// Write a default configuration file
    Init,
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("{} {}", style("Error:").red().bold(), e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Optimize {
            frequency,
            temperature,
            sequence,
            capacity,
            json,
        } => {
            let runner = CliRunner::new(cli.log_level.as_deref())?;
            commands::optimize::run(
                OptimizeArgs {
                    frequency,
                    temperature,
                    sequence,
                    capacity,
                    json,
                },
                &runner,
            )
        }
        Commands::Refresh {
            command,
            mode,
            temperature,
            banks,
        } => {
            let runner = CliRunner::new(cli.log_level.as_deref())?;
            commands::refresh::run(
                RefreshArgs {
                    command,
                    mode,
                    temperature,
                    banks,
                },
                &runner,
            )
        }
        Commands::Config { action } => commands::config::run(action),
        Commands::Init => commands::init::run(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_optimize() {
        let cli = Cli::parse_from([
            "busopt", "optimize", "-f", "2133", "-s", "R-W-W", "--capacity", "16", "--json",
        ]);
        match cli.command {
            Commands::Optimize {
                frequency,
                sequence,
                capacity,
                json,
                temperature,
            } => {
                assert_eq!(frequency, Some(2133));
                assert_eq!(sequence.as_deref(), Some("R-W-W"));
                assert_eq!(capacity, Some(16));
                assert_eq!(temperature, None);
                assert!(json);
            }
            _ => panic!("expected optimize"),
        }
    }

    #[test]
    fn test_parse_refresh() {
        let cli = Cli::parse_from([
            "busopt",
            "refresh",
            "--command",
            "refsb",
            "--mode",
            "fgr",
            "-t",
            "90",
            "--banks",
            "4",
        ]);
        match cli.command {
            Commands::Refresh {
                command,
                mode,
                temperature,
                banks,
            } => {
                assert_eq!(command, RefreshCommandArg::Refsb);
                assert_eq!(mode, RefreshModeArg::Fgr);
                assert_eq!(temperature, 90.0);
                assert_eq!(banks, Some(4));
            }
            _ => panic!("expected refresh"),
        }
    }

    #[test]
    fn test_refresh_requires_command() {
        assert!(Cli::try_parse_from(["busopt", "refresh", "-t", "30"]).is_err());
    }
}
