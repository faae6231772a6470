//! Pairs a tick source with its own rate tracker.

use tracing::debug;

use crate::cpu::{CpuDeltaTracker, CpuKey, TickReading};
use crate::errors::AcquisitionError;
use crate::monitoring::provider::{CpuSource, TickSource};
use crate::monitoring::types::{CoreUsage, CpuUsage, SystemStats};

/// CPU usage for one host.
///
/// Every monitor owns a private [`CpuDeltaTracker`], so monitors for
/// different hosts never measure against each other's baselines. Sampling
/// methods take `&self` and may be called from several threads; calls for
/// the same key are serialized by the tracker.
///
/// When acquisition fails the error is returned and no baseline changes.
pub struct CpuMonitor<S = CpuSource> {
    source: S,
    tracker: CpuDeltaTracker,
}

impl<S: TickSource> CpuMonitor<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            tracker: CpuDeltaTracker::new(),
        }
    }

    /// Whole-machine utilization since the previous call.
    ///
    /// Returns `0.0` on the first call (no baseline yet).
    pub fn total_usage(&self) -> Result<f64, AcquisitionError> {
        let ticks = self.source.sample_aggregate()?;
        Ok(self.tracker.sample(CpuKey::Aggregate, ticks))
    }

    /// Per-core utilization since the previous call.
    ///
    /// Cores that were not present in the previous reading start in
    /// warm-up and report `0.0`.
    pub fn usage(&self) -> Result<Vec<CoreUsage>, AcquisitionError> {
        let cores = self.source.sample_cores()?;
        Ok(cores
            .into_iter()
            .map(|(key, ticks)| CoreUsage::new(key, self.tracker.observe(key, ticks)))
            .collect())
    }

    /// Aggregate and per-core utilization from a single acquisition.
    pub fn snapshot(&self) -> Result<CpuUsage, AcquisitionError> {
        let reading = self.source.sample_all()?;
        Ok(self.record(reading))
    }

    /// Feed a reading acquired elsewhere (for example as part of a larger
    /// stats command) through the tracker.
    pub fn record(&self, reading: TickReading) -> CpuUsage {
        let total = CoreUsage::new(
            CpuKey::Aggregate,
            self.tracker.observe(CpuKey::Aggregate, reading.aggregate),
        );
        let cores: Vec<CoreUsage> = reading
            .cores
            .into_iter()
            .map(|(key, ticks)| CoreUsage::new(key, self.tracker.observe(key, ticks)))
            .collect();

        // A core missing from this reading (taken offline) restarts in
        // warm-up if it comes back.
        for key in self.tracker.tracked_keys() {
            if matches!(key, CpuKey::Core(_)) && !cores.iter().any(|c| c.key == key) {
                debug!("{}: {} went away, dropping its baseline", self.source.describe(), key);
                self.tracker.forget(&key);
            }
        }

        debug!(
            "{}: total {:.1}% across {} cores",
            self.source.describe(),
            total.usage_percent,
            cores.len()
        );

        CpuUsage { total, cores }
    }

    /// Drop every baseline, e.g. after reconnecting to a remote host.
    pub fn reset(&self) {
        self.tracker.reset();
    }

    /// Swap in a fresh source for the same host, such as a new SSH session.
    ///
    /// Counters read through the old source are not comparable with the
    /// new one, so every baseline is dropped.
    pub fn replace_source(&mut self, source: S) {
        self.source = source;
        self.reset();
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn tracker(&self) -> &CpuDeltaTracker {
        &self.tracker
    }
}

impl CpuMonitor<CpuSource> {
    /// Collect the host's stats with CPU utilization measured against this
    /// monitor's baselines.
    ///
    /// Linux hosts (local or remote) report memory, disk, load and uptime.
    /// Darwin reports memory; Windows reports CPU only.
    pub fn collect_stats(&self) -> Result<(SystemStats, CpuUsage), AcquisitionError> {
        let (mut stats, reading) = match &self.source {
            CpuSource::LocalLinux(s) => s.read_stats()?,
            CpuSource::RemoteLinux(s) => s.read_stats()?,
            #[cfg(target_os = "windows")]
            CpuSource::Windows(s) => (native_stats(), s.sample_all()?),
            #[cfg(target_os = "macos")]
            CpuSource::Darwin(s) => {
                let (memory_total_kb, memory_available_kb) = s.memory_kb()?;
                let stats = SystemStats {
                    memory_total_kb,
                    memory_available_kb,
                    memory_used_percent: crate::arith::percent_of(
                        memory_total_kb.saturating_sub(memory_available_kb),
                        memory_total_kb,
                    ),
                    ..native_stats()
                };
                (stats, s.sample_all()?)
            }
        };

        let usage = self.record(reading);
        stats.cpu_usage_percent = usage.total.usage_percent;
        Ok((stats, usage))
    }
}

/// Hostname and OS name for platforms without `/proc`.
#[cfg(any(target_os = "windows", target_os = "macos"))]
fn native_stats() -> SystemStats {
    let hostname = crate::backends::run_command("hostname", &[])
        .map(|h| h.trim().to_string())
        .unwrap_or_else(|_| "unknown".to_string());
    SystemStats {
        hostname,
        os_info: std::env::consts::OS.to_string(),
        ..Default::default()
    }
}
