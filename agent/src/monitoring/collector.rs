//! Stats collectors for local and remote hosts.

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{debug, info};

use hoststat_core::backends::ssh::SshSource;
use hoststat_core::config::SshConfig;
use hoststat_core::errors::AcquisitionError;
use hoststat_core::monitoring::{CpuMonitor, CpuSource, TickSource};

use crate::config::Target;
use crate::protocol::methods::MonitoringData;

/// Collect system statistics from a host.
pub trait StatsCollector: Send {
    /// Collect a snapshot of system statistics.
    ///
    /// CPU usage is measured between consecutive calls. The first call
    /// reports 0% since there is no previous reading to compare against.
    fn collect(&mut self, host_label: &str) -> Result<MonitoringData>;
}

/// Collects from one host through its own [`CpuMonitor`].
///
/// SSH collectors keep their connection settings: after the session is
/// lost, the next round reconnects first and starts over from warm-up.
pub struct HostCollector {
    monitor: CpuMonitor,
    per_core: bool,
    ssh_config: Option<SshConfig>,
    reconnect: bool,
}

impl HostCollector {
    pub fn new(source: CpuSource, per_core: bool) -> Self {
        Self {
            monitor: CpuMonitor::new(source),
            per_core,
            ssh_config: None,
            reconnect: false,
        }
    }

    /// Collector for the host the agent runs on.
    pub fn local(per_core: bool) -> Result<Self> {
        let source = CpuSource::local().context("Local monitoring is not available")?;
        Ok(Self::new(source, per_core))
    }

    /// Collector for a remote Linux host. Blocks while connecting.
    pub fn ssh(config: SshConfig, per_core: bool) -> Result<Self> {
        let address = config.address();
        let source = SshSource::connect(config.clone())
            .with_context(|| format!("Failed to connect to {address}"))?;
        Ok(Self {
            ssh_config: Some(config),
            ..Self::new(source.into(), per_core)
        })
    }

    /// Collector for a configured target. Blocks while connecting.
    pub fn for_target(target: &Target, per_core: bool) -> Result<Self> {
        match target {
            Target::Local { .. } => Self::local(per_core),
            Target::Ssh { ssh, .. } => Self::ssh(ssh.clone(), per_core),
        }
    }

    fn note_failure(&mut self, err: &AcquisitionError) {
        if self.ssh_config.is_some() && err.is_connection_lost() {
            debug!("SSH session lost, reconnecting before the next round");
            self.reconnect = true;
        }
    }

    /// Open a new SSH session and drop the baselines measured through the
    /// old one.
    fn reconnect_ssh(&mut self) -> Result<()> {
        let Some(config) = self.ssh_config.clone() else {
            return Ok(());
        };
        let address = config.address();
        let source = SshSource::connect(config)
            .with_context(|| format!("Failed to reconnect to {address}"))?;
        self.monitor.replace_source(source.into());
        self.reconnect = false;
        info!("Reconnected to {address}");
        Ok(())
    }
}

impl StatsCollector for HostCollector {
    fn collect(&mut self, host_label: &str) -> Result<MonitoringData> {
        if self.reconnect {
            self.reconnect_ssh()?;
        }

        let (stats, usage) = match self.monitor.collect_stats() {
            Ok(collected) => collected,
            Err(e) => {
                self.note_failure(&e);
                return Err(e).with_context(|| {
                    format!("Failed to sample {}", self.monitor.source().describe())
                });
            }
        };
        debug!(
            "Collected stats for '{}': cpu {:.1}%",
            host_label, stats.cpu_usage_percent
        );
        Ok(MonitoringData {
            host: host_label.to_string(),
            timestamp: Utc::now(),
            stats,
            cpu: self.per_core.then_some(usage),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hoststat_core::backends::local::LocalLinuxSource;

    fn fake_proc(stat: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let write = |name: &str, body: &str| std::fs::write(dir.path().join(name), body).unwrap();
        write("loadavg", "0.50 0.40 0.30 1/100 42\n");
        write("meminfo", "MemTotal: 8000 kB\nMemAvailable: 2000 kB\n");
        write("uptime", "100.5 50.0\n");
        write("stat", stat);
        dir
    }

    #[test]
    fn collect_reports_host_and_cpu() {
        let dir = fake_proc("cpu  0 0 0 0\ncpu0 0 0 0 0\n");
        let mut collector =
            HostCollector::new(LocalLinuxSource::with_root(dir.path()).into(), true);

        let first = collector.collect("self").unwrap();
        assert_eq!(first.host, "self");
        assert_eq!(first.stats.cpu_usage_percent, 0.0);
        assert!((first.stats.memory_used_percent - 75.0).abs() < 1e-9);
        let cpu = first.cpu.unwrap();
        assert!(!cpu.total.measured);

        std::fs::write(dir.path().join("stat"), "cpu  25 0 0 75\ncpu0 25 0 0 75\n").unwrap();
        let second = collector.collect("self").unwrap();
        assert!((second.stats.cpu_usage_percent - 25.0).abs() < 1e-9);
        assert!((second.cpu.unwrap().cores[0].usage_percent - 25.0).abs() < 1e-9);
    }

    #[test]
    fn per_core_off_omits_breakdown() {
        let dir = fake_proc("cpu  0 0 0 0\n");
        let mut collector =
            HostCollector::new(LocalLinuxSource::with_root(dir.path()).into(), false);
        assert!(collector.collect("self").unwrap().cpu.is_none());
    }

    #[test]
    fn collect_fails_when_proc_missing() {
        let dir = tempfile::tempdir().unwrap();
        let mut collector =
            HostCollector::new(LocalLinuxSource::with_root(dir.path()).into(), false);
        assert!(collector.collect("self").is_err());
        // A missing local file is not a lost session.
        assert!(!collector.reconnect);
    }

    fn unreachable_ssh() -> SshConfig {
        SshConfig {
            host: "127.0.0.1".into(),
            port: 1,
            username: "nobody".into(),
            auth_method: "password".into(),
            password: Some("x".into()),
            timeout_ms: 500,
            ..Default::default()
        }
    }

    #[test]
    fn lost_session_reconnects_before_sampling() {
        let dir = fake_proc("cpu  0 0 0 0\n");
        let mut collector = HostCollector {
            ssh_config: Some(unreachable_ssh()),
            ..HostCollector::new(LocalLinuxSource::with_root(dir.path()).into(), false)
        };
        collector.collect("web1").unwrap();

        collector.note_failure(&AcquisitionError::Unavailable("exit status 1".into()));
        assert!(!collector.reconnect);

        collector.note_failure(&AcquisitionError::Remote("Channel open failed".into()));
        assert!(collector.reconnect);

        let err = collector.collect("web1").err().unwrap();
        assert!(err.to_string().contains("Failed to reconnect to 127.0.0.1:1"));
        // Still pending; the old source and its baselines are untouched.
        assert!(collector.reconnect);
        assert_eq!(collector.monitor.tracker().tracked_keys().len(), 1);
    }

    #[test]
    fn ssh_connect_failure_is_reported() {
        let config = unreachable_ssh();
        let err = HostCollector::ssh(config, false).err().unwrap();
        assert!(err.to_string().contains("127.0.0.1:1"));
    }
}
