//! CPU tick model and the counter-to-rate engine.

pub mod delta;
pub mod snapshot;
pub mod ticks;

pub use delta::{is_counter_regression, usage_between, CpuDeltaTracker, Sample};
pub use snapshot::SnapshotStore;
pub use ticks::{CpuCounters, CpuKey, TickReading, Ticks};
