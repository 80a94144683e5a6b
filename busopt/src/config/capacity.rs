//! Bus capacity per data rate.

use std::collections::BTreeMap;

use crate::error::{BusError, BusResult};

/// Built-in capacities in cycles, keyed by data rate in MT/s.
pub const DEFAULT_CAPACITIES: [(u32, u32); 5] = [
    (2133, 20),
    (2666, 24),
    (3200, 28),
    (3733, 32),
    (4266, 36),
];

/// Capacity used for a data rate found in neither table.
pub const FALLBACK_CAPACITY_CYCLES: u32 = 20;

/// Look up the built-in capacity for a data rate.
pub fn default_capacity(frequency_mts: u32) -> Option<u32> {
    DEFAULT_CAPACITIES
        .iter()
        .find(|(f, _)| *f == frequency_mts)
        .map(|(_, c)| *c)
}

/// Check that a capacity is a positive cycle count that fits in `u32`.
pub fn validate_capacity(cycles: i64) -> BusResult<u32> {
    u32::try_from(cycles)
        .ok()
        .filter(|c| *c > 0)
        .ok_or(BusError::InvalidCapacity(cycles))
}

/// Configured capacities with fallback to the built-in table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapacityTable {
    entries: BTreeMap<u32, u32>,
}

impl Default for CapacityTable {
    fn default() -> Self {
        Self {
            entries: DEFAULT_CAPACITIES.into_iter().collect(),
        }
    }
}

impl CapacityTable {
    /// A table with no configured entries; every lookup uses the built-ins.
    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Set the capacity for a data rate.
    pub fn set(&mut self, frequency_mts: u32, cycles: u32) -> BusResult<()> {
        if cycles == 0 {
            return Err(BusError::InvalidCapacity(0));
        }
        self.entries.insert(frequency_mts, cycles);
        Ok(())
    }

    /// Builder form of [`CapacityTable::set`].
    pub fn with_capacity(mut self, frequency_mts: u32, cycles: u32) -> BusResult<Self> {
        self.set(frequency_mts, cycles)?;
        Ok(self)
    }

    /// Configured capacity only, without fallback.
    pub fn get(&self, frequency_mts: u32) -> Option<u32> {
        self.entries.get(&frequency_mts).copied()
    }

    /// Capacity for a data rate: configured, then built-in, then
    /// [`FALLBACK_CAPACITY_CYCLES`].
    pub fn resolve(&self, frequency_mts: u32) -> u32 {
        self.get(frequency_mts)
            .or_else(|| default_capacity(frequency_mts))
            .unwrap_or(FALLBACK_CAPACITY_CYCLES)
    }

    /// Configured entries in ascending data rate.
    pub fn entries(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.entries.iter().map(|(f, c)| (*f, *c))
    }
}
