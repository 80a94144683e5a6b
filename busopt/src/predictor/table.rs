//! Deterministic table-driven predictor.
//!
//! Looks up the spacing for a `(previous, current)` pair and reports a fixed
//! refresh interval. The defaults mirror the reference timing dataset, where
//! only a write followed by a read needs the longer turnaround.

use std::collections::BTreeMap;

use tracing::trace;

use super::traits::{Prediction, PredictionError, PredictionQuery, Predictor};
use crate::command::Command;

/// Spacing in cycles for pairs without an explicit entry.
pub const DEFAULT_SPACING_CYCLES: u32 = 4;

/// Write-to-read turnaround spacing in cycles.
pub const WRITE_TO_READ_SPACING_CYCLES: u32 = 8;

/// Refresh interval reported for every transition, in µs.
pub const DEFAULT_REFRESH_RATE_US: f64 = 7.8;

/// Predictor backed by a static spacing table.
#[derive(Debug, Clone, PartialEq)]
pub struct TimingTablePredictor {
    spacings: BTreeMap<(String, String), u32>,
    default_spacing: u32,
    refresh_rate_us: f64,
}

impl Default for TimingTablePredictor {
    fn default() -> Self {
        Self::new(DEFAULT_SPACING_CYCLES, DEFAULT_REFRESH_RATE_US).with_spacing(
            Command::WRITE,
            Command::READ,
            WRITE_TO_READ_SPACING_CYCLES,
        )
    }
}

impl TimingTablePredictor {
    /// Empty table with the given fallback spacing and refresh interval.
    pub fn new(default_spacing: u32, refresh_rate_us: f64) -> Self {
        Self {
            spacings: BTreeMap::new(),
            default_spacing,
            refresh_rate_us,
        }
    }

    /// Set the spacing for a pair of command tokens (case-insensitive).
    pub fn with_spacing(mut self, previous: &str, current: &str, cycles: u32) -> Self {
        self.insert_spacing(previous, current, cycles);
        self
    }

    /// Set the spacing for a pair of command tokens (case-insensitive).
    pub fn insert_spacing(&mut self, previous: &str, current: &str, cycles: u32) {
        self.spacings.insert(
            (
                previous.trim().to_uppercase(),
                current.trim().to_uppercase(),
            ),
            cycles,
        );
    }

    /// Spacing for a pair, falling back to the default.
    pub fn spacing_for(&self, previous: &Command, current: &Command) -> u32 {
        self.spacings
            .get(&(previous.as_str().to_string(), current.as_str().to_string()))
            .copied()
            .unwrap_or(self.default_spacing)
    }

    pub fn default_spacing(&self) -> u32 {
        self.default_spacing
    }

    pub fn refresh_rate_us(&self) -> f64 {
        self.refresh_rate_us
    }

    /// Explicit pair entries in token order.
    pub fn spacings(&self) -> impl Iterator<Item = (&str, &str, u32)> {
        self.spacings
            .iter()
            .map(|((p, c), v)| (p.as_str(), c.as_str(), *v))
    }
}

impl Predictor for TimingTablePredictor {
    fn predict(&self, query: &PredictionQuery) -> Result<Prediction, PredictionError> {
        let spacing = self.spacing_for(&query.previous, &query.current);
        trace!(transition = %query.label(), spacing, "Table lookup");
        Ok(Prediction {
            spacing,
            refresh_rate_us: self.refresh_rate_us,
        })
    }

    fn name(&self) -> &str {
        "timing-table"
    }
}
