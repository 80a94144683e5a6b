//! Predictor trait and its query/result types.
//!
//! The scheduling pipeline never trains or evaluates a model itself. It asks
//! an injected [`Predictor`] for the spacing and refresh interval of each
//! transition, which keeps the core testable with deterministic stubs.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::command::{transition_label, Command, Transition};

/// Inputs to a single prediction.
///
/// Queries are compared and hashed field by field, so they can key a cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PredictionQuery {
    /// Data rate in MT/s.
    pub frequency_mts: u32,
    /// Operating temperature in °C.
    pub temperature_c: i32,
    pub previous: Command,
    pub current: Command,
}

impl PredictionQuery {
    /// Query for one transition under fixed operating conditions.
    pub fn for_transition(frequency_mts: u32, temperature_c: i32, transition: &Transition) -> Self {
        Self {
            frequency_mts,
            temperature_c,
            previous: transition.previous.clone(),
            current: transition.current.clone(),
        }
    }

    /// `PREV→CURR` label of the queried transition.
    pub fn label(&self) -> String {
        transition_label(&self.previous, &self.current)
    }
}

/// Predicted timing for one transition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Prediction {
    /// Idle cycles between the two commands.
    pub spacing: u32,
    /// Refresh interval in µs.
    pub refresh_rate_us: f64,
}

/// A predictor could not produce a result.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("prediction failed for {transition}: {reason}")]
pub struct PredictionError {
    pub transition: String,
    pub reason: String,
}

impl PredictionError {
    pub fn new(transition: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            transition: transition.into(),
            reason: reason.into(),
        }
    }
}

/// Source of per-transition timing predictions.
///
/// Implementations must be deterministic for a given query if they are to be
/// wrapped in a [`MemoizedPredictor`](super::MemoizedPredictor).
pub trait Predictor: Send + Sync {
    /// Predict spacing and refresh interval for one transition.
    fn predict(&self, query: &PredictionQuery) -> Result<Prediction, PredictionError>;

    /// Short name for logs and reports.
    fn name(&self) -> &str;
}

impl<P: Predictor + ?Sized> Predictor for Arc<P> {
    fn predict(&self, query: &PredictionQuery) -> Result<Prediction, PredictionError> {
        (**self).predict(query)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

impl<P: Predictor + ?Sized> Predictor for &P {
    fn predict(&self, query: &PredictionQuery) -> Result<Prediction, PredictionError> {
        (**self).predict(query)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

impl<P: Predictor + ?Sized> Predictor for Box<P> {
    fn predict(&self, query: &PredictionQuery) -> Result<Prediction, PredictionError> {
        (**self).predict(query)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
