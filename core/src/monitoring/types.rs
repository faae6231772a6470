//! Monitoring data types shared between the core and the agent.

use serde::{Deserialize, Serialize};

use crate::cpu::{CpuKey, Sample};

/// Parsed system statistics from a Linux host.
///
/// Fields use `camelCase` serialization to match the JSON convention used
/// by the agent's notifications.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemStats {
    pub hostname: String,
    pub uptime_seconds: f64,
    pub load_average: [f64; 3],
    pub cpu_usage_percent: f64,
    pub memory_total_kb: u64,
    pub memory_available_kb: u64,
    pub memory_used_percent: f64,
    pub disk_total_kb: u64,
    pub disk_used_kb: u64,
    pub disk_used_percent: f64,
    pub os_info: String,
}

/// Utilization of one tracked key over the last interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoreUsage {
    pub key: CpuKey,
    pub usage_percent: f64,
    /// `false` while the key has no baseline or was just re-baselined.
    pub measured: bool,
}

impl CoreUsage {
    pub fn new(key: CpuKey, sample: Sample) -> Self {
        Self {
            key,
            usage_percent: sample.percent(),
            measured: sample.is_usage(),
        }
    }
}

/// Whole-machine and per-core utilization from one acquisition.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CpuUsage {
    pub total: CoreUsage,
    pub cores: Vec<CoreUsage>,
}
