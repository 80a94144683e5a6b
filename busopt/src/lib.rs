//! BusOpt - memory bus command scheduling
//!
//! This library splits a command sequence such as `R-W-R-W` into adjacent
//! transitions, asks a [`Predictor`](predictor::Predictor) for the idle
//! spacing each transition needs, and packs the resulting steps first-fit
//! into fixed-capacity buses. It also evaluates the refresh interval rule
//! table for all-bank and same-bank refresh.
//!
//! # Modules
//!
//! - [`command`] - command tokens, sequences and transitions
//! - [`schedule`] - step building, bus packing and bus summaries
//! - [`refresh`] - refresh interval rule engine
//! - [`predictor`] - predictor trait, table predictor and memoizing decorator
//! - [`optimizer`] - the end-to-end pipeline
//! - [`config`] - capacity tables and the INI config file
//! - [`logging`] - tracing subscriber setup

pub mod command;
pub mod config;
pub mod error;
pub mod logging;
pub mod optimizer;
pub mod predictor;
pub mod refresh;
pub mod schedule;

pub use error::{BusError, BusResult};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
