//! Step building, bus packing and per-bus summaries.
//!
//! # Pipeline
//!
//! ```text
//! Transitions + spacings ──► Steps ──► Buses ──► BusSummary
//!        build_steps()          pack_into_buses()   summarize_buses()
//! ```
//!
//! # Example
//!
//! ```
//! use busopt::command::CommandSequence;
//! use busopt::schedule::{build_steps, pack_into_buses, BusyCycleTable};
//!
//! let sequence: CommandSequence = "R-W-R-W".parse().unwrap();
//! let steps = build_steps(&sequence.transitions(), &[4, 8, 4], &BusyCycleTable::default()).unwrap();
//! let buses = pack_into_buses(&steps, 20).unwrap();
//!
//! assert_eq!(buses.len(), 2);
//! assert_eq!(buses[0].used_cycles, 18);
//! ```

mod packer;
mod step;
mod summary;

pub use packer::{pack_into_buses, Bus};
pub use step::{
    build_steps, BusyCycleTable, Step, DEFAULT_BUSY_CYCLES, READ_BUSY_CYCLES, WRITE_BUSY_CYCLES,
};
pub use summary::{
    cycle_time_ns, refresh_events, summarize_buses, utilization_percent, BusSummary,
    LABEL_SEPARATOR,
};
