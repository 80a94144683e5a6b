//! Error types for the scheduling and rule-evaluation engine.
//!
//! Every failure here is a deterministic input error. They are detected before
//! any packing or computation proceeds and are never retried, so callers can
//! match on the variant to render a precise message.

use thiserror::Error;

use crate::predictor::PredictionError;

/// Result type for engine operations.
pub type BusResult<T> = Result<T, BusError>;

/// Errors raised by the scheduling pipeline and the refresh rule engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BusError {
    /// The command sequence is too short or contains an empty token.
    #[error("invalid command sequence: {0}")]
    InvalidSequence(String),

    /// Bus capacity must be a positive number of cycles.
    #[error("invalid bus capacity {0}: capacity must be a positive cycle count")]
    InvalidCapacity(i64),

    /// Temperature outside the supported operating range.
    #[error("temperature {0}°C is outside the supported range 0..=95°C")]
    InvalidTemperature(f64),

    /// Bank count missing or non-positive where the rule divides by it.
    #[error("bank count must be a positive integer for per-bank fine granularity refresh (got {})", display_bank_count(.0))]
    InvalidBankCount(Option<i64>),

    /// The rule table holds no entry for this command and mode.
    #[error("no refresh rule for command {command} in {mode} mode")]
    UnsupportedCombination { command: String, mode: String },

    /// Frequency of zero has no cycle time.
    #[error("invalid frequency {0} MT/s: frequency must be positive")]
    InvalidFrequency(u32),

    /// The number of spacing predictions does not match the transitions.
    #[error("expected {expected} spacing predictions, got {actual}")]
    SpacingCountMismatch { expected: usize, actual: usize },

    /// The injected predictor failed.
    #[error(transparent)]
    Prediction(#[from] PredictionError),
}

fn display_bank_count(value: &Option<i64>) -> String {
    match value {
        Some(n) => n.to_string(),
        None => "none".to_string(),
    }
}
