//! Sequential first-fit packing of steps into fixed-capacity buses.
//!
//! Steps are never reordered, split, or looked ahead of. A step joins the
//! current bus while it fits; otherwise the bus is closed and the step opens
//! the next one. A step that is larger than the whole capacity still gets a
//! bus of its own, which is then oversubscribed.
//!
//! ```text
//! capacity 20, step cycles [6, 12, 6]
//!
//!   bus 1: [6][12]        used 18
//!   bus 2: [6]            used 6
//! ```

use serde::Serialize;
use tracing::{debug, warn};

use super::step::Step;
use crate::error::{BusError, BusResult};

/// An ordered run of contiguous steps sharing one bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bus {
    pub steps: Vec<Step>,
    /// Sum of the steps' cycle costs.
    pub used_cycles: u64,
}

impl Bus {
    fn open(step: Step) -> Self {
        let used_cycles = step.step_cycles;
        Self {
            steps: vec![step],
            used_cycles,
        }
    }

    fn push(&mut self, step: Step) {
        self.used_cycles += step.step_cycles;
        self.steps.push(step);
    }

    /// True when usage exceeds capacity (only possible for a single step).
    pub fn is_oversubscribed(&self, capacity: u32) -> bool {
        self.used_cycles > u64::from(capacity)
    }

    /// `PREV→CURR` labels of the steps in bus order.
    pub fn labels(&self) -> Vec<String> {
        self.steps.iter().map(Step::label).collect()
    }
}

/// Pack steps into buses of `capacity` cycles.
///
/// Fails with [`BusError::InvalidCapacity`] when capacity is zero. The
/// partition is fully determined by the step order and capacity.
pub fn pack_into_buses(steps: &[Step], capacity: u32) -> BusResult<Vec<Bus>> {
    if capacity == 0 {
        return Err(BusError::InvalidCapacity(0));
    }
    let limit = u64::from(capacity);

    let mut buses: Vec<Bus> = Vec::new();

    for step in steps {
        match buses.last_mut() {
            Some(bus) if bus.used_cycles + step.step_cycles <= limit => {
                bus.push(step.clone());
                debug!(
                    step = step.index(),
                    cycles = step.step_cycles,
                    bus = buses.len(),
                    "Appended step to current bus"
                );
            }
            _ => {
                if step.step_cycles > limit {
                    warn!(
                        step = step.index(),
                        cycles = step.step_cycles,
                        capacity,
                        "Step exceeds bus capacity, placing it alone"
                    );
                }
                buses.push(Bus::open(step.clone()));
                debug!(
                    step = step.index(),
                    cycles = step.step_cycles,
                    bus = buses.len(),
                    "Opened new bus"
                );
            }
        }
    }

    Ok(buses)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{Command, Transition};
    use crate::schedule::step::BusyCycleTable;

    /// Steps with the given total cycles (spacing carries everything, no busy cost).
    fn steps_with_cycles(cycles: &[u32]) -> Vec<Step> {
        let busy = BusyCycleTable::new(0);
        cycles
            .iter()
            .enumerate()
            .map(|(index, &c)| {
                let transition = Transition {
                    index,
                    previous: Command::new("R").unwrap(),
                    current: Command::new("W").unwrap(),
                };
                Step::new(transition, c, &busy)
            })
            .collect()
    }

    fn partition(buses: &[Bus]) -> Vec<Vec<usize>> {
        buses
            .iter()
            .map(|b| b.steps.iter().map(Step::index).collect())
            .collect()
    }

    #[test]
    fn test_packs_reference_example() {
        let buses = pack_into_buses(&steps_with_cycles(&[6, 12, 6]), 20).unwrap();
        assert_eq!(partition(&buses), vec![vec![0, 1], vec![2]]);
        assert_eq!(buses[0].used_cycles, 18);
        assert_eq!(buses[1].used_cycles, 6);
    }

    #[test]
    fn test_exact_fit_stays_on_bus() {
        let buses = pack_into_buses(&steps_with_cycles(&[10, 10, 1]), 20).unwrap();
        assert_eq!(partition(&buses), vec![vec![0, 1], vec![2]]);
        assert_eq!(buses[0].used_cycles, 20);
    }

    #[test]
    fn test_step_equal_to_capacity_fills_bus_alone() {
        let buses = pack_into_buses(&steps_with_cycles(&[20, 20]), 20).unwrap();
        assert_eq!(partition(&buses), vec![vec![0], vec![1]]);
        assert!(buses.iter().all(|b| b.used_cycles == 20));
        assert!(!buses[0].is_oversubscribed(20));
    }

    #[test]
    fn test_oversized_step_gets_own_bus() {
        let buses = pack_into_buses(&steps_with_cycles(&[4, 30, 4]), 20).unwrap();
        assert_eq!(partition(&buses), vec![vec![0], vec![1], vec![2]]);
        assert_eq!(buses[1].used_cycles, 30);
        assert!(buses[1].is_oversubscribed(20));
        assert!(!buses[2].is_oversubscribed(20));
    }

    #[test]
    fn test_no_look_ahead() {
        // A later small step could fill bus 1, but first-fit never reorders.
        let buses = pack_into_buses(&steps_with_cycles(&[15, 10, 5]), 20).unwrap();
        assert_eq!(partition(&buses), vec![vec![0], vec![1, 2]]);
    }

    #[test]
    fn test_empty_input_yields_no_buses() {
        assert!(pack_into_buses(&[], 20).unwrap().is_empty());
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let err = pack_into_buses(&steps_with_cycles(&[1]), 0).unwrap_err();
        assert_eq!(err, BusError::InvalidCapacity(0));
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_packing_preserves_order_and_cycles(
                cycles in prop::collection::vec(0u32..64, 1..80),
                capacity in 1u32..96
            ) {
                let steps = steps_with_cycles(&cycles);
                let buses = pack_into_buses(&steps, capacity)?;

                let flattened: Vec<Step> = buses.iter().flat_map(|b| b.steps.clone()).collect();
                prop_assert_eq!(&flattened, &steps);

                let used: u64 = buses.iter().map(|b| b.used_cycles).sum();
                let total: u64 = steps.iter().map(|s| s.step_cycles).sum();
                prop_assert_eq!(used, total);

                for bus in &buses {
                    prop_assert!(!bus.steps.is_empty());
                    prop_assert!(
                        bus.used_cycles <= u64::from(capacity) || bus.steps.len() == 1,
                        "bus with {} steps uses {} of {}",
                        bus.steps.len(), bus.used_cycles, capacity
                    );
                }
            }

            #[test]
            fn test_packing_is_idempotent(
                cycles in prop::collection::vec(0u32..64, 1..40),
                capacity in 1u32..96
            ) {
                let steps = steps_with_cycles(&cycles);
                let first = pack_into_buses(&steps, capacity)?;
                let second = pack_into_buses(&steps, capacity)?;
                prop_assert_eq!(first, second);
            }
        }
    }
}
