//! CLI subcommands.

pub mod common;
pub mod config;
pub mod init;
pub mod optimize;
pub mod refresh;
