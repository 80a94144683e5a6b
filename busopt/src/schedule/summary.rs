//! Per-bus utilization and refresh accounting.

use serde::Serialize;
use tracing::warn;

use super::packer::Bus;
use crate::error::{BusError, BusResult};

/// Separator between transition labels on one bus.
pub const LABEL_SEPARATOR: &str = " | ";

/// Nanoseconds per microsecond.
const NS_PER_US: f64 = 1000.0;

/// Duration of one bus cycle in nanoseconds at `frequency_mts` MT/s.
pub fn cycle_time_ns(frequency_mts: u32) -> BusResult<f64> {
    if frequency_mts == 0 {
        return Err(BusError::InvalidFrequency(frequency_mts));
    }
    Ok(1000.0 / f64::from(frequency_mts))
}

/// Read-only view of one packed bus.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BusSummary {
    /// 1-based position of the bus.
    pub bus: usize,
    pub used_cycles: u64,
    pub capacity: u32,
    /// `used / capacity * 100`, rounded to one decimal.
    pub utilization_percent: f64,
    pub elapsed_ns: f64,
    /// Whole refresh intervals elapsed while the bus is in use.
    pub refresh_events: u64,
    /// `PREV→CURR` labels in bus order, joined with [`LABEL_SEPARATOR`].
    pub transitions: String,
}

impl BusSummary {
    /// Summarize a single bus.
    ///
    /// `average_refresh_us` is the mean predicted refresh interval across the
    /// whole sequence. A non-positive interval records no refresh events.
    pub fn new(
        number: usize,
        bus: &Bus,
        capacity: u32,
        cycle_time_ns: f64,
        average_refresh_us: f64,
    ) -> BusResult<Self> {
        if capacity == 0 {
            return Err(BusError::InvalidCapacity(0));
        }

        let elapsed_ns = bus.used_cycles as f64 * cycle_time_ns;

        Ok(Self {
            bus: number,
            used_cycles: bus.used_cycles,
            capacity,
            utilization_percent: utilization_percent(bus.used_cycles, capacity),
            elapsed_ns,
            refresh_events: refresh_events(elapsed_ns, average_refresh_us),
            transitions: bus.labels().join(LABEL_SEPARATOR),
        })
    }
}

/// Summarize every bus in order.
pub fn summarize_buses(
    buses: &[Bus],
    capacity: u32,
    cycle_time_ns: f64,
    average_refresh_us: f64,
) -> BusResult<Vec<BusSummary>> {
    if average_refresh_us <= 0.0 {
        warn!(
            average_refresh_us,
            "Non-positive refresh interval, no refresh events will be counted"
        );
    }

    buses
        .iter()
        .enumerate()
        .map(|(i, bus)| BusSummary::new(i + 1, bus, capacity, cycle_time_ns, average_refresh_us))
        .collect()
}

/// Utilization in percent with one decimal.
///
/// The ratio is taken in `f64` and that float is rounded to the nearest
/// tenth by its exact binary value. Only a float lying exactly half way
/// between two tenths rounds to the even one.
pub fn utilization_percent(used_cycles: u64, capacity: u32) -> f64 {
    if capacity == 0 {
        return 0.0;
    }
    round_to_tenth(used_cycles as f64 / f64::from(capacity) * 100.0)
}

/// Correctly rounded `x` at one decimal for finite non-negative `x`.
fn round_to_tenth(x: f64) -> f64 {
    if !x.is_finite() || x <= 0.0 {
        return x;
    }

    // x == mantissa * 2^-shift exactly
    let bits = x.to_bits();
    let biased = ((bits >> 52) & 0x7ff) as i32;
    let fraction = u128::from(bits & ((1u64 << 52) - 1));
    let (mantissa, exponent) = if biased == 0 {
        (fraction, -1074)
    } else {
        (fraction | (1u128 << 52), biased - 1075)
    };
    if exponent >= 0 {
        return x;
    }
    let shift = exponent.unsigned_abs();
    if shift > 120 {
        return 0.0;
    }
    let unit = 1u128 << shift;

    // Exact floor of 10x, starting from the float estimate.
    let ten_x = mantissa * 10;
    let mut tenths = (x * 10.0).floor() as u128;
    while tenths * unit > ten_x {
        tenths -= 1;
    }
    while (tenths + 1) * unit <= ten_x {
        tenths += 1;
    }

    // Compare x with the midpoint (2 * tenths + 1) / 20.
    let twenty_x = mantissa * 20;
    let midpoint = (2 * tenths + 1) * unit;
    if twenty_x > midpoint || (twenty_x == midpoint && tenths % 2 == 1) {
        tenths += 1;
    }

    tenths as f64 / 10.0
}

/// Whole refresh intervals that fit into `elapsed_ns`.
pub fn refresh_events(elapsed_ns: f64, average_refresh_us: f64) -> u64 {
    if average_refresh_us <= 0.0 || !average_refresh_us.is_finite() {
        return 0;
    }
    let interval_ns = average_refresh_us * NS_PER_US;
    floor_div(elapsed_ns, interval_ns).max(0.0) as u64
}

/// Floor division that stays exact when `a` is a whole multiple of `b`.
///
/// Plain `(a / b).floor()` can land one below the true quotient when the
/// division rounds down, so the remainder is removed before dividing.
fn floor_div(a: f64, b: f64) -> f64 {
    let remainder = a % b;
    let quotient = (a - remainder) / b;
    let floored = quotient.floor();
    if quotient - floored > 0.5 {
        floored + 1.0
    } else {
        floored
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandSequence;
    use crate::schedule::packer::pack_into_buses;
    use crate::schedule::step::{build_steps, BusyCycleTable};

    fn reference_buses() -> Vec<Bus> {
        let sequence: CommandSequence = "R-W-R-W".parse().unwrap();
        let steps = build_steps(
            &sequence.transitions(),
            &[4, 8, 4],
            &BusyCycleTable::default(),
        )
        .unwrap();
        pack_into_buses(&steps, 20).unwrap()
    }

    #[test]
    fn test_cycle_time() {
        assert_eq!(cycle_time_ns(2000).unwrap(), 0.5);
        assert_eq!(cycle_time_ns(0), Err(BusError::InvalidFrequency(0)));
    }

    #[test]
    fn test_utilization_rounding() {
        assert_eq!(utilization_percent(18, 20), 90.0);
        assert_eq!(utilization_percent(20, 20), 100.0);
        assert_eq!(utilization_percent(30, 20), 150.0);
        assert_eq!(utilization_percent(1, 3), 33.3);
        assert_eq!(utilization_percent(2, 3), 66.7);
    }

    #[test]
    fn test_utilization_half_tenth_rounds_to_even() {
        // 1/16 = 6.25% and 3/16 = 18.75%
        assert_eq!(utilization_percent(1, 16), 6.2);
        assert_eq!(utilization_percent(3, 16), 18.8);
        // 1/80 = 1.25% and 3/80 = 3.75%
        assert_eq!(utilization_percent(1, 80), 1.2);
        assert_eq!(utilization_percent(3, 80), 3.8);
    }

    #[test]
    fn test_utilization_rounds_the_float_ratio() {
        // 0.05%, 0.15% and 0.35% are not representable; each rounds by the
        // side of the tie its float lands on.
        assert_eq!(utilization_percent(1, 2000), 0.1);
        assert_eq!(utilization_percent(3, 2000), 0.1);
        assert_eq!(utilization_percent(7, 2000), 0.4);
        assert_eq!(utilization_percent(0, 2000), 0.0);
    }

    #[test]
    fn test_round_to_tenth() {
        assert_eq!(round_to_tenth(0.0), 0.0);
        assert_eq!(round_to_tenth(0.04), 0.0);
        assert_eq!(round_to_tenth(0.25), 0.2);
        assert_eq!(round_to_tenth(0.75), 0.8);
        assert_eq!(round_to_tenth(2.675), 2.7);
        assert_eq!(round_to_tenth(1e-300), 0.0);
        assert_eq!(round_to_tenth(12_345_678.96), 12_345_679.0);
        assert_eq!(round_to_tenth(2f64.powi(53)), 2f64.powi(53));
    }

    #[test]
    fn test_refresh_events() {
        // 7800 ns elapsed against a 7.8 us interval is exactly one event.
        assert_eq!(refresh_events(7800.0, 7.8), 1);
        assert_eq!(refresh_events(7799.0, 7.8), 0);
        assert_eq!(refresh_events(23_400.0, 7.8), 3);
    }

    #[test]
    fn test_non_positive_interval_records_no_events() {
        assert_eq!(refresh_events(1_000_000.0, 0.0), 0);
        assert_eq!(refresh_events(1_000_000.0, -3.9), 0);
    }

    #[test]
    fn test_summarize_reference_example() {
        let buses = reference_buses();
        let cycle_ns = cycle_time_ns(2133).unwrap();
        let summaries = summarize_buses(&buses, 20, cycle_ns, 7.8).unwrap();

        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].bus, 1);
        assert_eq!(summaries[0].used_cycles, 18);
        assert_eq!(summaries[0].utilization_percent, 90.0);
        assert_eq!(summaries[0].transitions, "R→W | W→R");
        assert_eq!(summaries[0].refresh_events, 0);
        assert_eq!(summaries[1].bus, 2);
        assert_eq!(summaries[1].utilization_percent, 30.0);
        assert_eq!(summaries[1].transitions, "R→W");
        assert!((summaries[0].elapsed_ns - 18.0 * cycle_ns).abs() < 1e-9);
    }

    #[test]
    fn test_summary_counts_refresh_events_for_long_buses() {
        let buses = reference_buses();
        // At 1 MT/s one cycle lasts 1000 ns, so 18 cycles span 18 us.
        let summaries = summarize_buses(&buses, 20, cycle_time_ns(1).unwrap(), 3.9).unwrap();
        assert_eq!(summaries[0].refresh_events, 4);
        assert_eq!(summaries[1].refresh_events, 1);
    }
}
