//! CPU counter-to-rate engine and host samplers.
//!
//! [`cpu`] turns monotonically increasing tick counters into utilization
//! percentages, [`arith`] scales large counters without overflow, and
//! [`backends`] acquire raw readings from the local host (Linux, Windows,
//! Darwin) or a remote Linux host over SSH. [`monitoring::CpuMonitor`] ties
//! one source to its own baselines.

pub mod arith;
pub mod backends;
pub mod config;
pub mod cpu;
pub mod errors;
pub mod monitoring;
