//! Local Linux tick source reading `/proc` directly.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::cpu::{CpuKey, TickReading, Ticks};
use crate::errors::AcquisitionError;
use crate::monitoring::parser::{parse_proc_stat, parse_raw_stats, RawStats};
use crate::monitoring::provider::TickSource;
use crate::monitoring::types::SystemStats;

use super::run_command;

const DEFAULT_PROC_ROOT: &str = "/proc";

/// Reads CPU counters from `/proc/stat` on the local host.
///
/// The proc root is configurable so tests can point it at a fake tree.
#[derive(Debug, Clone)]
pub struct LocalLinuxSource {
    proc_root: PathBuf,
}

impl Default for LocalLinuxSource {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalLinuxSource {
    pub fn new() -> Self {
        Self::with_root(DEFAULT_PROC_ROOT)
    }

    pub fn with_root(proc_root: impl Into<PathBuf>) -> Self {
        Self {
            proc_root: proc_root.into(),
        }
    }

    pub fn proc_root(&self) -> &Path {
        &self.proc_root
    }

    fn read(&self, relative: &str) -> Result<String, AcquisitionError> {
        let path = self.proc_root.join(relative);
        std::fs::read_to_string(&path).map_err(|e| {
            AcquisitionError::Unavailable(format!("Failed to read {}: {e}", path.display()))
        })
    }

    /// Read memory, load, uptime and disk figures along with one CPU
    /// reading.
    ///
    /// `df` failing (e.g. inside a minimal container) leaves the disk
    /// figures at zero rather than failing the whole collection.
    pub fn read_stats(&self) -> Result<(SystemStats, TickReading), AcquisitionError> {
        let stat = self.read("stat")?;
        let loadavg = self.read("loadavg")?;
        let meminfo = self.read("meminfo")?;
        let uptime = self.read("uptime")?;
        let hostname = self.read("sys/kernel/hostname").unwrap_or_default();
        let uname = match (
            self.read("sys/kernel/ostype"),
            self.read("sys/kernel/osrelease"),
        ) {
            (Ok(os), Ok(release)) => format!("{} {}", os.trim(), release.trim()),
            _ => String::new(),
        };
        let df = run_command("df", &["-Pk", "/"]).unwrap_or_else(|e| {
            debug!("Disk usage unavailable: {e}");
            String::new()
        });

        let reading = parse_proc_stat(&stat)?;
        let stats = parse_raw_stats(&RawStats {
            hostname: &hostname,
            loadavg: &loadavg,
            meminfo: &meminfo,
            uptime: &uptime,
            df: &df,
            uname: &uname,
        })?;

        Ok((stats, reading))
    }
}

impl TickSource for LocalLinuxSource {
    fn sample_aggregate(&self) -> Result<Ticks, AcquisitionError> {
        Ok(self.sample_all()?.aggregate)
    }

    fn sample_cores(&self) -> Result<Vec<(CpuKey, Ticks)>, AcquisitionError> {
        Ok(self.sample_all()?.cores)
    }

    fn sample_all(&self) -> Result<TickReading, AcquisitionError> {
        parse_proc_stat(&self.read("stat")?)
    }

    fn describe(&self) -> String {
        format!("local ({})", self.proc_root.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_proc(stat: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("stat"), stat).unwrap();
        std::fs::write(dir.path().join("loadavg"), "0.50 0.40 0.30 2/345 6789\n").unwrap();
        std::fs::write(
            dir.path().join("meminfo"),
            "MemTotal:        8000000 kB\nMemFree:  100 kB\nMemAvailable:    6000000 kB\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("uptime"), "100.50 200.00\n").unwrap();
        std::fs::create_dir_all(dir.path().join("sys/kernel")).unwrap();
        std::fs::write(dir.path().join("sys/kernel/hostname"), "box\n").unwrap();
        std::fs::write(dir.path().join("sys/kernel/ostype"), "Linux\n").unwrap();
        std::fs::write(dir.path().join("sys/kernel/osrelease"), "6.1.0\n").unwrap();
        dir
    }

    #[test]
    fn sample_all_reads_stat() {
        let dir = fake_proc("cpu  10 0 10 80 0 0 0 0\ncpu0 5 0 5 40\ncpu1 5 0 5 40\n");
        let source = LocalLinuxSource::with_root(dir.path());
        let reading = source.sample_all().unwrap();
        assert_eq!(reading.aggregate.total, 100);
        assert_eq!(reading.aggregate.idle, 80);
        assert_eq!(reading.cores.len(), 2);
        assert_eq!(source.sample_cores().unwrap()[1].0, CpuKey::Core(1));
    }

    #[test]
    fn missing_stat_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let source = LocalLinuxSource::with_root(dir.path());
        let err = source.sample_aggregate().unwrap_err();
        assert!(matches!(err, AcquisitionError::Unavailable(_)));
    }

    #[test]
    fn malformed_stat_is_an_error_not_zero() {
        let dir = fake_proc("cpu  garbage\n");
        let source = LocalLinuxSource::with_root(dir.path());
        assert!(matches!(
            source.sample_aggregate(),
            Err(AcquisitionError::Malformed(_))
        ));
    }

    #[test]
    fn read_stats_combines_sources() {
        let dir = fake_proc("cpu  10 0 10 80 0 0 0 0\n");
        let source = LocalLinuxSource::with_root(dir.path());
        let (stats, reading) = source.read_stats().unwrap();
        assert_eq!(stats.hostname, "box");
        assert_eq!(stats.os_info, "Linux 6.1.0");
        assert_eq!(stats.memory_total_kb, 8000000);
        assert!((stats.memory_used_percent - 25.0).abs() < 0.01);
        assert!((stats.load_average[0] - 0.5).abs() < 1e-9);
        assert!((stats.uptime_seconds - 100.5).abs() < 1e-9);
        assert_eq!(reading.aggregate.total, 100);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn reads_real_proc_stat() {
        let source = LocalLinuxSource::new();
        let reading = source.sample_all().unwrap();
        assert!(reading.aggregate.total > 0);
        assert!(reading.aggregate.idle <= reading.aggregate.total);
    }
}
