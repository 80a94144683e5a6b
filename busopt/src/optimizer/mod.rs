//! End-to-end bus optimization.
//!
//! Wires the pipeline for one request:
//!
//! ```text
//! sequence ──► transitions ──► predictor (per transition) ──► steps
//!                                                               │
//!              OptimizationReport ◄── summaries ◄── buses ◄─────┘
//! ```
//!
//! The optimizer owns no mutable state. Any caching lives in the injected
//! [`Predictor`], e.g. a [`MemoizedPredictor`](crate::predictor::MemoizedPredictor).
//!
//! # Example
//!
//! ```
//! use busopt::optimizer::{BusOptimizer, OptimizationRequest};
//! use busopt::predictor::TimingTablePredictor;
//!
//! let optimizer = BusOptimizer::new(TimingTablePredictor::default());
//! let request = OptimizationRequest::new(3200, 30, "R-W-R-W".parse().unwrap())
//!     .with_capacity(20);
//!
//! let report = optimizer.optimize(&request).unwrap();
//! assert_eq!(report.bus_count, 2);
//! assert_eq!(report.total_step_cycles, 24);
//! ```

use serde::Serialize;
use tracing::{debug, info};

use crate::command::{Command, CommandSequence};
use crate::config::{validate_capacity, CapacityTable, ConfigFile};
use crate::error::BusResult;
use crate::predictor::{PredictionQuery, Predictor};
use crate::schedule::{
    build_steps, cycle_time_ns, pack_into_buses, summarize_buses, Bus, BusSummary,
    BusyCycleTable, Step,
};

/// Tables injected into the optimizer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OptimizerConfig {
    pub capacities: CapacityTable,
    pub busy_cycles: BusyCycleTable,
}

impl OptimizerConfig {
    pub fn with_capacities(mut self, capacities: CapacityTable) -> Self {
        self.capacities = capacities;
        self
    }

    pub fn with_busy_cycles(mut self, busy_cycles: BusyCycleTable) -> Self {
        self.busy_cycles = busy_cycles;
        self
    }
}

impl From<&ConfigFile> for OptimizerConfig {
    fn from(config: &ConfigFile) -> Self {
        Self {
            capacities: config.capacity.clone(),
            busy_cycles: config.busy.clone(),
        }
    }
}

/// Operating conditions and the sequence to schedule.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizationRequest {
    /// Data rate in MT/s.
    pub frequency_mts: u32,
    /// Operating temperature in °C, passed to the predictor.
    pub temperature_c: i32,
    pub sequence: CommandSequence,
    /// Capacity to use instead of the table entry for this frequency.
    pub capacity_override: Option<u32>,
}

impl OptimizationRequest {
    pub fn new(frequency_mts: u32, temperature_c: i32, sequence: CommandSequence) -> Self {
        Self {
            frequency_mts,
            temperature_c,
            sequence,
            capacity_override: None,
        }
    }

    pub fn with_capacity(mut self, cycles: u32) -> Self {
        self.capacity_override = Some(cycles);
        self
    }
}

/// Per-transition row of the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepBreakdown {
    pub index: usize,
    pub label: String,
    pub predicted_spacing: u32,
    pub busy_cycles: u32,
    pub step_cycles: u64,
}

impl From<&Step> for StepBreakdown {
    fn from(step: &Step) -> Self {
        Self {
            index: step.index(),
            label: step.label(),
            predicted_spacing: step.predicted_spacing,
            busy_cycles: step.busy_cycles,
            step_cycles: step.step_cycles,
        }
    }
}

/// Result of one optimization run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimizationReport {
    pub commands: Vec<Command>,
    pub steps: Vec<StepBreakdown>,
    pub buses: Vec<Bus>,
    pub summaries: Vec<BusSummary>,
    pub bus_count: usize,
    pub transition_count: usize,
    pub total_step_cycles: u64,
    pub total_busy_cycles: u64,
    /// Mean predicted refresh interval across all transitions, in µs.
    pub average_refresh_us: f64,
    /// Capacity the steps were packed against.
    pub capacity: u32,
    pub frequency_mts: u32,
    pub temperature_c: i32,
    pub cycle_time_ns: f64,
}

impl OptimizationReport {
    /// Buses whose usage exceeds the capacity.
    pub fn oversubscribed_buses(&self) -> impl Iterator<Item = &BusSummary> {
        self.summaries
            .iter()
            .filter(move |s| s.used_cycles > u64::from(self.capacity))
    }
}

/// Runs the scheduling pipeline against an injected predictor.
pub struct BusOptimizer<P> {
    predictor: P,
    config: OptimizerConfig,
}

impl<P: Predictor> BusOptimizer<P> {
    /// Optimizer with the built-in capacity and busy-cycle tables.
    pub fn new(predictor: P) -> Self {
        Self::with_config(predictor, OptimizerConfig::default())
    }

    pub fn with_config(predictor: P, config: OptimizerConfig) -> Self {
        Self { predictor, config }
    }

    pub fn predictor(&self) -> &P {
        &self.predictor
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Capacity for a request: the override if set, else the table.
    pub fn capacity_for(&self, request: &OptimizationRequest) -> BusResult<u32> {
        match request.capacity_override {
            Some(cycles) => validate_capacity(i64::from(cycles)),
            None => Ok(self.config.capacities.resolve(request.frequency_mts)),
        }
    }

    /// Schedule the request's sequence into buses.
    pub fn optimize(&self, request: &OptimizationRequest) -> BusResult<OptimizationReport> {
        let cycle_ns = cycle_time_ns(request.frequency_mts)?;
        let capacity = self.capacity_for(request)?;
        let transitions = request.sequence.transitions();

        let mut spacings = Vec::with_capacity(transitions.len());
        let mut refresh_total = 0.0;
        for transition in &transitions {
            let query = PredictionQuery::for_transition(
                request.frequency_mts,
                request.temperature_c,
                transition,
            );
            let prediction = self.predictor.predict(&query)?;
            debug!(
                transition = %transition,
                spacing = prediction.spacing,
                refresh_rate_us = prediction.refresh_rate_us,
                predictor = self.predictor.name(),
                "Predicted transition timing"
            );
            spacings.push(prediction.spacing);
            refresh_total += prediction.refresh_rate_us;
        }
        let average_refresh_us = if transitions.is_empty() {
            0.0
        } else {
            refresh_total / transitions.len() as f64
        };

        let steps = build_steps(&transitions, &spacings, &self.config.busy_cycles)?;
        let buses = pack_into_buses(&steps, capacity)?;
        let summaries = summarize_buses(&buses, capacity, cycle_ns, average_refresh_us)?;

        let total_step_cycles: u64 = steps.iter().map(|s| s.step_cycles).sum();
        let total_busy_cycles: u64 = steps.iter().map(|s| u64::from(s.busy_cycles)).sum();

        info!(
            sequence = %request.sequence,
            frequency_mts = request.frequency_mts,
            capacity,
            buses = buses.len(),
            total_step_cycles,
            average_refresh_us,
            "Optimized command sequence"
        );

        Ok(OptimizationReport {
            commands: request.sequence.commands().to_vec(),
            steps: steps.iter().map(StepBreakdown::from).collect(),
            bus_count: buses.len(),
            transition_count: transitions.len(),
            buses,
            summaries,
            total_step_cycles,
            total_busy_cycles,
            average_refresh_us,
            capacity,
            frequency_mts: request.frequency_mts,
            temperature_c: request.temperature_c,
            cycle_time_ns: cycle_ns,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use crate::error::BusError;
    use crate::predictor::{Prediction, PredictionError, TimingTablePredictor};

    /// Looks up predictions by `PREV→CURR` label.
    struct Scripted {
        rows: HashMap<&'static str, Prediction>,
    }

    impl Scripted {
        fn new(rows: &[(&'static str, u32, f64)]) -> Self {
            Self {
                rows: rows
                    .iter()
                    .map(|&(label, spacing, refresh_rate_us)| {
                        (label, Prediction { spacing, refresh_rate_us })
                    })
                    .collect(),
            }
        }
    }

    impl Predictor for Scripted {
        fn predict(&self, query: &PredictionQuery) -> Result<Prediction, PredictionError> {
            self.rows
                .get(query.label().as_str())
                .copied()
                .ok_or_else(|| PredictionError::new(query.label(), "not scripted"))
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    struct Failing;

    impl Predictor for Failing {
        fn predict(&self, query: &PredictionQuery) -> Result<Prediction, PredictionError> {
            Err(PredictionError::new(query.label(), "model unavailable"))
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    fn request(sequence: &str) -> OptimizationRequest {
        OptimizationRequest::new(3200, 30, sequence.parse().unwrap())
    }

    #[test]
    fn test_reference_sequence() {
        let optimizer = BusOptimizer::new(TimingTablePredictor::default());
        let report = optimizer.optimize(&request("R-W-R-W").with_capacity(20)).unwrap();

        let step_cycles: Vec<u64> = report.steps.iter().map(|s| s.step_cycles).collect();
        assert_eq!(step_cycles, vec![6, 12, 6]);
        assert_eq!(report.bus_count, 2);
        assert_eq!(report.transition_count, 3);
        assert_eq!(report.total_step_cycles, 24);
        assert_eq!(report.total_busy_cycles, 8);
        assert_eq!(report.buses[0].used_cycles, 18);
        assert_eq!(report.buses[1].used_cycles, 6);
        assert_eq!(report.summaries[0].utilization_percent, 90.0);
        assert_eq!(report.summaries[0].transitions, "R→W | W→R");
        assert_eq!(report.summaries[1].transitions, "R→W");
        assert_eq!(report.average_refresh_us, 7.8);
        assert_eq!(report.oversubscribed_buses().count(), 0);
    }

    #[test]
    fn test_capacity_from_table() {
        let optimizer = BusOptimizer::new(TimingTablePredictor::default());
        let report = optimizer.optimize(&request("R-W-R-W")).unwrap();
        assert_eq!(report.capacity, 28);
        assert_eq!(report.bus_count, 1);
        assert_eq!(report.cycle_time_ns, 0.3125);
    }

    #[test]
    fn test_configured_tables() {
        let config = OptimizerConfig::default()
            .with_capacities(CapacityTable::default().with_capacity(3200, 12).unwrap())
            .with_busy_cycles(BusyCycleTable::new(1));
        let optimizer = BusOptimizer::with_config(TimingTablePredictor::default(), config);

        let report = optimizer.optimize(&request("R-W-R-W")).unwrap();
        let step_cycles: Vec<u64> = report.steps.iter().map(|s| s.step_cycles).collect();
        assert_eq!(step_cycles, vec![5, 9, 5]);
        assert_eq!(report.capacity, 12);
        assert_eq!(report.bus_count, 3);
    }

    #[test]
    fn test_oversubscribed_step() {
        let optimizer = BusOptimizer::new(TimingTablePredictor::default());
        let report = optimizer.optimize(&request("W-R").with_capacity(10)).unwrap();

        assert_eq!(report.bus_count, 1);
        assert_eq!(report.buses[0].used_cycles, 12);
        assert_eq!(report.summaries[0].utilization_percent, 120.0);
        assert_eq!(report.oversubscribed_buses().count(), 1);
    }

    #[test]
    fn test_average_refresh_across_sequence() {
        let predictor = Scripted::new(&[("R→W", 4, 2.0), ("W→W", 4, 4.0), ("W→R", 4, 6.0)]);
        let optimizer = BusOptimizer::new(predictor);
        let report = optimizer
            .optimize(&request("R-W-W-R").with_capacity(40))
            .unwrap();
        assert_eq!(report.average_refresh_us, 4.0);
    }

    #[test]
    fn test_refresh_events_use_sequence_average() {
        // 3200 MT/s: 0.3125 ns per cycle, 6400 cycles = 2000 ns.
        let predictor = Scripted::new(&[("R→W", 6398, 1.0), ("W→R", 0, 0.5)]);
        let optimizer = BusOptimizer::new(predictor);
        let report = optimizer
            .optimize(&request("R-W-R").with_capacity(6400))
            .unwrap();

        assert_eq!(report.average_refresh_us, 0.75);
        assert_eq!(report.buses[0].used_cycles, 6400);
        assert_eq!(report.summaries[0].elapsed_ns, 2000.0);
        // floor(2000 / 750)
        assert_eq!(report.summaries[0].refresh_events, 2);
    }

    #[test]
    fn test_zero_refresh_records_no_events() {
        let predictor = Scripted::new(&[("R→W", 1_000, 0.0)]);
        let optimizer = BusOptimizer::new(predictor);
        let report = optimizer
            .optimize(&request("R-W").with_capacity(2_000))
            .unwrap();
        assert_eq!(report.average_refresh_us, 0.0);
        assert_eq!(report.summaries[0].refresh_events, 0);
    }

    #[test]
    fn test_zero_frequency_rejected() {
        let optimizer = BusOptimizer::new(TimingTablePredictor::default());
        let request = OptimizationRequest::new(0, 30, "R-W".parse().unwrap());
        assert_eq!(
            optimizer.optimize(&request).unwrap_err(),
            BusError::InvalidFrequency(0)
        );
    }

    #[test]
    fn test_zero_capacity_override_rejected() {
        let optimizer = BusOptimizer::new(TimingTablePredictor::default());
        let request = request("R-W").with_capacity(0);
        assert_eq!(
            optimizer.optimize(&request).unwrap_err(),
            BusError::InvalidCapacity(0)
        );
    }

    #[test]
    fn test_predictor_failure_propagates() {
        let optimizer = BusOptimizer::new(Failing);
        let err = optimizer.optimize(&request("R-W")).unwrap_err();
        assert_eq!(
            err,
            BusError::Prediction(PredictionError::new("R→W", "model unavailable"))
        );
    }

    #[test]
    fn test_report_serializes() {
        let optimizer = BusOptimizer::new(TimingTablePredictor::default());
        let report = optimizer.optimize(&request("R-W-R").with_capacity(20)).unwrap();
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["commands"], serde_json::json!(["R", "W", "R"]));
        assert_eq!(json["bus_count"], 1);
        assert_eq!(json["steps"][1]["label"], "W→R");
        assert_eq!(json["summaries"][0]["used_cycles"], 18);
        assert_eq!(json["buses"][0]["steps"][0]["transition"]["previous"], "R");
    }

    #[test]
    fn test_config_file_conversion() {
        let mut file = ConfigFile::default();
        file.capacity.set(3200, 50).unwrap();
        file.busy.insert("ACT", 7);

        let config = OptimizerConfig::from(&file);
        assert_eq!(config.capacities.resolve(3200), 50);
        assert_eq!(config.busy_cycles.lookup(&Command::new("act").unwrap()), 7);
    }
}
