//! Raw CPU tick readings and the keys that identify rate-tracking streams.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Cumulative CPU time counters parsed from a `cpu` line in `/proc/stat`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuCounters {
    pub user: u64,
    pub nice: u64,
    pub system: u64,
    pub idle: u64,
    pub iowait: u64,
    pub irq: u64,
    pub softirq: u64,
    pub steal: u64,
}

impl CpuCounters {
    /// Total CPU time across all fields.
    pub fn total(&self) -> u64 {
        [
            self.user,
            self.nice,
            self.system,
            self.idle,
            self.iowait,
            self.irq,
            self.softirq,
            self.steal,
        ]
        .iter()
        .fold(0u64, |acc, v| acc.saturating_add(*v))
    }

    /// Idle CPU time (idle + iowait).
    pub fn idle_total(&self) -> u64 {
        self.idle.saturating_add(self.iowait)
    }
}

/// One reading of monotonically non-decreasing CPU counters.
///
/// `total` is the sum of every state, `idle` the part of it spent idle.
/// Platforms that expose a per-state breakdown keep it in `states`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Ticks {
    pub idle: u64,
    pub total: u64,
    pub states: Option<CpuCounters>,
}

impl Ticks {
    pub fn new(idle: u64, total: u64) -> Self {
        Self {
            idle,
            total,
            states: None,
        }
    }

    /// Non-idle ticks.
    pub fn work(&self) -> u64 {
        self.total.saturating_sub(self.idle)
    }
}

impl From<CpuCounters> for Ticks {
    fn from(counters: CpuCounters) -> Self {
        Self {
            idle: counters.idle_total(),
            total: counters.total(),
            states: Some(counters),
        }
    }
}

/// One acquisition: the whole-machine reading plus one reading per core.
///
/// `cores` is empty when the platform does not expose per-core counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReading {
    pub aggregate: Ticks,
    pub cores: Vec<(CpuKey, Ticks)>,
}

/// Identifies an independent rate-tracking stream.
///
/// Renders as `"aggregate"` for whole-machine usage and `"core-<n>"` for a
/// single logical CPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum CpuKey {
    Aggregate,
    Core(usize),
}

const AGGREGATE_KEY: &str = "aggregate";
const CORE_KEY_PREFIX: &str = "core-";

impl fmt::Display for CpuKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CpuKey::Aggregate => f.write_str(AGGREGATE_KEY),
            CpuKey::Core(n) => write!(f, "{CORE_KEY_PREFIX}{n}"),
        }
    }
}

impl FromStr for CpuKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == AGGREGATE_KEY {
            return Ok(CpuKey::Aggregate);
        }
        s.strip_prefix(CORE_KEY_PREFIX)
            .and_then(|n| n.parse().ok())
            .map(CpuKey::Core)
            .ok_or_else(|| format!("Invalid CPU key: {s}"))
    }
}

impl From<CpuKey> for String {
    fn from(key: CpuKey) -> Self {
        key.to_string()
    }
}

impl TryFrom<String> for CpuKey {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}
