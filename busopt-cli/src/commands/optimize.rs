//! Optimize command - predict spacings and pack a sequence into buses.

use busopt::command::CommandSequence;
use busopt::optimizer::{BusOptimizer, OptimizationReport, OptimizationRequest, OptimizerConfig};
use busopt::predictor::MemoizedPredictor;
use console::style;
use tracing::debug;

use super::common::{format_table, print_header, print_metric};
use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the optimize command.
pub struct OptimizeArgs {
    pub frequency: Option<u32>,
    pub temperature: Option<i32>,
    pub sequence: Option<String>,
    pub capacity: Option<u32>,
    pub json: bool,
}

/// Run the optimize command.
pub fn run(args: OptimizeArgs, runner: &CliRunner) -> Result<(), CliError> {
    runner.log_startup("optimize");
    let config = runner.config();

    // CLI > config file
    let frequency = args.frequency.unwrap_or(config.bus.frequency_mts);
    let temperature = args.temperature.unwrap_or(config.bus.temperature_c);
    let sequence: CommandSequence = match args.sequence {
        Some(text) => text.parse()?,
        None => config.default_sequence()?,
    };

    let predictor = MemoizedPredictor::with_capacity(
        config.predictor.timing_predictor(),
        config.predictor.cache_entries,
    );
    let optimizer = BusOptimizer::with_config(predictor, OptimizerConfig::from(config));

    let mut request = OptimizationRequest::new(frequency, temperature, sequence);
    if let Some(capacity) = args.capacity {
        request = request.with_capacity(capacity);
    }

    let report = optimizer.optimize(&request)?;
    let stats = optimizer.predictor().stats();
    debug!(hits = stats.hits, misses = stats.misses, "Prediction cache");

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report, &request.sequence);
    }
    Ok(())
}

fn print_report(report: &OptimizationReport, sequence: &CommandSequence) {
    print_header("Optimization Results");
    println!();
    print_metric(
        "Buses Required",
        &format!("{} ({} transitions)", report.bus_count, report.transition_count),
    );
    print_metric(
        "Total Cycles Consumed",
        &format!("{} cycles", report.total_step_cycles),
    );
    print_metric(
        "Refresh Interval",
        &format!("{:.2} μs", report.average_refresh_us),
    );
    print_metric(
        "Bus Capacity",
        &format!("{} cycles @{} MT/s", report.capacity, report.frequency_mts),
    );
    println!();

    print_header("Bus Packing Breakdown");
    println!(
        "The sequence is packed sequentially into buses of {} cycles each.",
        report.capacity
    );
    println!();
    let rows: Vec<Vec<String>> = report
        .summaries
        .iter()
        .map(|s| {
            vec![
                s.bus.to_string(),
                s.used_cycles.to_string(),
                s.capacity.to_string(),
                format!("{:.1}", s.utilization_percent),
                s.refresh_events.to_string(),
                s.transitions.clone(),
            ]
        })
        .collect();
    println!(
        "{}",
        format_table(
            &[
                "Bus",
                "Used Cycles",
                "Capacity",
                "Utilization (%)",
                "Refresh Events",
                "Transitions (in order)",
            ],
            &rows,
        )
    );
    for summary in report.oversubscribed_buses() {
        println!(
            "{} bus {} uses {} of {} cycles",
            style("oversubscribed:").yellow().bold(),
            summary.bus,
            summary.used_cycles,
            summary.capacity
        );
    }
    println!();

    print_header("Per-Transition Predictions");
    println!();
    let rows: Vec<Vec<String>> = report
        .steps
        .iter()
        .map(|s| {
            vec![
                s.index.to_string(),
                s.label.clone(),
                s.predicted_spacing.to_string(),
                s.busy_cycles.to_string(),
                s.step_cycles.to_string(),
            ]
        })
        .collect();
    println!(
        "{}",
        format_table(
            &[
                "#",
                "Transition",
                "Predicted Spacing",
                "Busy Cycles",
                "Step Cycles",
            ],
            &rows,
        )
    );
    println!();
    println!(
        "{} transitions of {} need {} cycles, packed into {} buses.",
        report.transition_count,
        style(sequence).bold(),
        report.total_step_cycles,
        report.bus_count
    );
}
