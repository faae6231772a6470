//! Notification payloads emitted by the agent.

use chrono::{DateTime, Utc};
use serde::Serialize;

use hoststat_core::monitoring::{CpuUsage, SystemStats};

/// Method name of a successful sample.
pub const MONITORING_DATA: &str = "monitoring.data";

/// Method name of a failed sampling round.
pub const MONITORING_ERROR: &str = "monitoring.error";

/// Params of a `monitoring.data` notification.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitoringData {
    /// Target id from the agent configuration.
    pub host: String,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub stats: SystemStats,
    /// Per-core breakdown, present when per-core reporting is enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu: Option<CpuUsage>,
}

/// Params of a `monitoring.error` notification.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitoringError {
    pub host: String,
    pub timestamp: DateTime<Utc>,
    pub message: String,
}
