//! Counter-to-rate conversion.
//!
//! [`CpuDeltaTracker`] turns successive [`Ticks`] readings for a key into a
//! utilization percentage. The first reading for a key only establishes a
//! baseline; every later reading is measured against the previous one and
//! then becomes the new baseline.

use tracing::debug;

use super::snapshot::SnapshotStore;
use super::ticks::{CpuKey, Ticks};

/// Lowest and highest utilization a sample can report.
const MIN_PERCENT: f64 = 0.0;
const MAX_PERCENT: f64 = 100.0;

/// Outcome of measuring one reading against the stored baseline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Sample {
    /// No baseline existed for the key; the reading became the baseline.
    WarmUp,
    /// A counter went backward (reboot, counter source restart). The reading
    /// became the new baseline.
    Regressed,
    /// `total` did not advance since the baseline.
    Stalled,
    /// Utilization over the interval, within `[0, 100]`.
    Usage(f64),
}

impl Sample {
    /// Percentage for this outcome; everything but [`Sample::Usage`] is `0`.
    pub fn percent(&self) -> f64 {
        match self {
            Sample::Usage(p) => *p,
            Sample::WarmUp | Sample::Regressed | Sample::Stalled => 0.0,
        }
    }

    /// Whether this outcome carries a measured rate.
    pub fn is_usage(&self) -> bool {
        matches!(self, Sample::Usage(_))
    }
}

/// Whether `current` cannot be a later reading of the same counters as
/// `prior`.
///
/// Tick counters only grow while a host is up. A smaller value means the
/// counters were reset, so no delta between the two readings is meaningful.
pub fn is_counter_regression(prior: &Ticks, current: &Ticks) -> bool {
    current.total < prior.total || current.idle < prior.idle
}

/// Utilization between two readings of the same key.
pub fn usage_between(prior: &Ticks, current: &Ticks) -> Sample {
    if is_counter_regression(prior, current) {
        return Sample::Regressed;
    }

    let delta_total = current.total - prior.total;
    let delta_idle = current.idle - prior.idle;
    if delta_total == 0 {
        return Sample::Stalled;
    }

    // Imprecise platform counters can report more idle than total time.
    let percent = (1.0 - delta_idle as f64 / delta_total as f64) * 100.0;
    Sample::Usage(percent.clamp(MIN_PERCENT, MAX_PERCENT))
}

/// Converts per-key tick readings into utilization percentages.
///
/// Owns one [`SnapshotStore`]. Each provider instance must own its own
/// tracker; sharing one across hosts would measure one host's counters
/// against another's baseline.
#[derive(Debug, Default)]
pub struct CpuDeltaTracker {
    store: SnapshotStore,
}

impl CpuDeltaTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `ticks` for `key` and return the utilization since the
    /// previous reading, or `0.0` when no rate can be derived.
    pub fn sample(&self, key: CpuKey, ticks: Ticks) -> f64 {
        self.observe(key, ticks).percent()
    }

    /// Record `ticks` for `key` and classify the result.
    ///
    /// The stored baseline is always replaced by `ticks`, whatever the
    /// outcome, so the next call measures a fresh interval.
    pub fn observe(&self, key: CpuKey, ticks: Ticks) -> Sample {
        let sample = match self.store.replace(key, ticks) {
            None => Sample::WarmUp,
            Some(prior) => usage_between(&prior, &ticks),
        };

        if sample == Sample::Regressed {
            debug!("Counter regression for '{key}', re-baselining");
        }

        sample
    }

    /// The current baseline for `key`.
    pub fn baseline(&self, key: &CpuKey) -> Option<Ticks> {
        self.store.get(key)
    }

    /// Drop the baseline for `key`; its next sample is a warm-up.
    pub fn forget(&self, key: &CpuKey) {
        self.store.remove(key);
    }

    /// Drop every baseline.
    pub fn reset(&self) {
        self.store.clear();
    }

    /// Keys that currently have a baseline.
    pub fn tracked_keys(&self) -> Vec<CpuKey> {
        self.store.keys()
    }
}
