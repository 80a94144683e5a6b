//! Steps: transitions with a cycle cost.
//!
//! A step's cost is the predicted idle spacing after the transition plus the
//! cycles the bus stays busy executing the previous command.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::command::{Command, Transition};
use crate::error::{BusError, BusResult};

/// Busy cycles for a read command.
pub const READ_BUSY_CYCLES: u32 = 2;

/// Busy cycles for a write command.
pub const WRITE_BUSY_CYCLES: u32 = 4;

/// Busy cycles for any command without an explicit entry.
pub const DEFAULT_BUSY_CYCLES: u32 = 2;

/// Lookup from command token to busy cycles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusyCycleTable {
    entries: BTreeMap<String, u32>,
    default_cycles: u32,
}

impl Default for BusyCycleTable {
    fn default() -> Self {
        Self::new(DEFAULT_BUSY_CYCLES)
            .with_entry(Command::READ, READ_BUSY_CYCLES)
            .with_entry(Command::WRITE, WRITE_BUSY_CYCLES)
    }
}

impl BusyCycleTable {
    /// Create an empty table with the given fallback.
    pub fn new(default_cycles: u32) -> Self {
        Self {
            entries: BTreeMap::new(),
            default_cycles,
        }
    }

    /// Set the busy cycles for a command token (case-insensitive).
    pub fn with_entry(mut self, command: &str, cycles: u32) -> Self {
        self.insert(command, cycles);
        self
    }

    /// Set the busy cycles for a command token (case-insensitive).
    pub fn insert(&mut self, command: &str, cycles: u32) {
        self.entries.insert(command.trim().to_uppercase(), cycles);
    }

    /// Busy cycles for a command, falling back to the default.
    pub fn lookup(&self, command: &Command) -> u32 {
        self.entries
            .get(command.as_str())
            .copied()
            .unwrap_or(self.default_cycles)
    }

    /// The fallback for unlisted commands.
    pub fn default_cycles(&self) -> u32 {
        self.default_cycles
    }

    /// Explicit entries in token order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, u32)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

/// A transition with its predicted spacing and total cycle cost.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Step {
    pub transition: Transition,
    /// Idle cycles predicted between the two commands.
    pub predicted_spacing: u32,
    /// Cycles the previous command keeps the bus busy.
    pub busy_cycles: u32,
    /// `predicted_spacing + busy_cycles`.
    pub step_cycles: u64,
}

impl Step {
    /// Build a step, looking up busy cycles from the previous command.
    pub fn new(transition: Transition, predicted_spacing: u32, busy: &BusyCycleTable) -> Self {
        let busy_cycles = busy.lookup(&transition.previous);
        Self {
            transition,
            predicted_spacing,
            busy_cycles,
            step_cycles: u64::from(predicted_spacing) + u64::from(busy_cycles),
        }
    }

    /// Position of the underlying transition.
    pub fn index(&self) -> usize {
        self.transition.index
    }

    /// `PREV→CURR` label of the underlying transition.
    pub fn label(&self) -> String {
        self.transition.label()
    }
}

/// Combine transitions with their spacing predictions.
///
/// `spacings[i]` belongs to `transitions[i]`; the two slices must be the same
/// length.
pub fn build_steps(
    transitions: &[Transition],
    spacings: &[u32],
    busy: &BusyCycleTable,
) -> BusResult<Vec<Step>> {
    if transitions.len() != spacings.len() {
        return Err(BusError::SpacingCountMismatch {
            expected: transitions.len(),
            actual: spacings.len(),
        });
    }

    Ok(transitions
        .iter()
        .zip(spacings)
        .map(|(transition, &spacing)| Step::new(transition.clone(), spacing, busy))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandSequence;

    #[test]
    fn test_default_busy_table() {
        let table = BusyCycleTable::default();
        assert_eq!(table.lookup(&Command::new("R").unwrap()), 2);
        assert_eq!(table.lookup(&Command::new("w").unwrap()), 4);
        assert_eq!(table.lookup(&Command::new("ACT").unwrap()), 2);
    }

    #[test]
    fn test_custom_busy_table() {
        let table = BusyCycleTable::new(7).with_entry("r", 1);
        assert_eq!(table.lookup(&Command::new("R").unwrap()), 1);
        assert_eq!(table.lookup(&Command::new("W").unwrap()), 7);
    }

    #[test]
    fn test_build_steps_uses_previous_command() {
        let sequence: CommandSequence = "R-W-R-W".parse().unwrap();
        let steps = build_steps(
            &sequence.transitions(),
            &[4, 8, 4],
            &BusyCycleTable::default(),
        )
        .unwrap();

        let busy: Vec<u32> = steps.iter().map(|s| s.busy_cycles).collect();
        let cycles: Vec<u64> = steps.iter().map(|s| s.step_cycles).collect();
        assert_eq!(busy, vec![2, 4, 2]);
        assert_eq!(cycles, vec![6, 12, 6]);
        assert_eq!(steps[1].label(), "W→R");
        assert_eq!(steps[2].index(), 2);
    }

    #[test]
    fn test_build_steps_rejects_count_mismatch() {
        let sequence: CommandSequence = "R-W-R".parse().unwrap();
        let err = build_steps(&sequence.transitions(), &[4], &BusyCycleTable::default())
            .unwrap_err();
        assert_eq!(
            err,
            BusError::SpacingCountMismatch {
                expected: 2,
                actual: 1
            }
        );
    }
}
