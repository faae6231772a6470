//! Monitoring integration tests.
//!
//! MON-01..MON-03 drive a `CpuMonitor` end to end through a fake `/proc`
//! tree and the real local host. MON-04..MON-05 sample a remote host over
//! SSH against the docker container and skip when it is not running.

mod common;

use std::time::Duration;

use common::{fake_proc, require_docker, ssh_password_config, write_stat, PORT_SSH_PASSWORD};
use hoststat_core::backends::local::LocalLinuxSource;
use hoststat_core::backends::ssh::SshSource;
use hoststat_core::cpu::CpuKey;
use hoststat_core::monitoring::{CpuMonitor, CpuSource};

// ── MON-01: warm-up, rate, regression through a real file ──────────

#[test]
fn mon_01_rate_from_proc_file() {
    let dir = fake_proc("cpu  100 0 100 800 0 0 0 0\ncpu0 50 0 50 400\n");
    let monitor = CpuMonitor::new(CpuSource::from(LocalLinuxSource::with_root(dir.path())));

    let first = monitor.snapshot().unwrap();
    assert_eq!(first.total.usage_percent, 0.0);
    assert!(!first.total.measured);

    // +100 total, +30 idle on the aggregate.
    write_stat(dir.path(), "cpu  150 0 120 830 0 0 0 0\ncpu0 60 0 60 480\n");
    let second = monitor.snapshot().unwrap();
    assert!((second.total.usage_percent - 70.0).abs() < 1e-9);
    assert!((second.cores[0].usage_percent - 20.0).abs() < 1e-9);

    // Host "rebooted": counters restart lower.
    write_stat(dir.path(), "cpu  1 0 1 8 0 0 0 0\ncpu0 1 0 1 8\n");
    let third = monitor.snapshot().unwrap();
    assert_eq!(third.total.usage_percent, 0.0);
    assert!(!third.total.measured);

    write_stat(dir.path(), "cpu  41 0 21 38 0 0 0 0\ncpu0 1 0 1 8\n");
    let fourth = monitor.snapshot().unwrap();
    assert!((fourth.total.usage_percent - 66.666_666_666).abs() < 1e-6);
    assert_eq!(fourth.cores[0].usage_percent, 0.0);
}

// ── MON-02: a broken read does not touch the baseline ──────────────

#[test]
fn mon_02_failed_read_skips_round() {
    let dir = fake_proc("cpu  0 0 0 100\n");
    let monitor = CpuMonitor::new(CpuSource::from(LocalLinuxSource::with_root(dir.path())));
    monitor.total_usage().unwrap();

    write_stat(dir.path(), "not a stat file\n");
    assert!(monitor.total_usage().is_err());

    std::fs::remove_file(dir.path().join("stat")).unwrap();
    assert!(monitor.total_usage().is_err());

    write_stat(dir.path(), "cpu  50 0 0 150\n");
    let pct = monitor.total_usage().unwrap();
    assert!((pct - 50.0).abs() < 1e-9);
}

// ── MON-03: the real local host, sampled from several threads ──────

#[cfg(target_os = "linux")]
#[test]
fn mon_03_local_host_concurrent_sampling() {
    use std::sync::Arc;

    let monitor = Arc::new(CpuMonitor::new(CpuSource::local().unwrap()));
    monitor.snapshot().unwrap();
    std::thread::sleep(Duration::from_millis(100));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let monitor = monitor.clone();
            std::thread::spawn(move || monitor.snapshot().unwrap())
        })
        .collect();

    for handle in handles {
        let usage = handle.join().unwrap();
        assert!((0.0..=100.0).contains(&usage.total.usage_percent));
        for core in &usage.cores {
            assert!((0.0..=100.0).contains(&core.usage_percent));
        }
    }

    assert!(monitor
        .tracker()
        .tracked_keys()
        .contains(&CpuKey::Aggregate));
}

// ── MON-04: remote CPU usage over SSH ──────────────────────────────

#[test]
fn mon_04_ssh_cpu_usage() {
    require_docker!(PORT_SSH_PASSWORD);

    let source = SshSource::connect(ssh_password_config(PORT_SSH_PASSWORD))
        .expect("SSH connection should succeed");
    let monitor = CpuMonitor::new(CpuSource::from(source));

    assert_eq!(monitor.total_usage().unwrap(), 0.0);
    std::thread::sleep(Duration::from_millis(500));
    let pct = monitor.total_usage().unwrap();
    assert!(
        (0.0..=100.0).contains(&pct),
        "MON-04: CPU usage should be 0-100%, got {pct}"
    );

    let cores = monitor.usage().unwrap();
    assert!(!cores.is_empty(), "MON-04: remote host should report cores");
}

// ── MON-05: full stats over SSH ─────────────────────────────────────

#[test]
fn mon_05_ssh_full_stats() {
    require_docker!(PORT_SSH_PASSWORD);

    let source = SshSource::connect(ssh_password_config(PORT_SSH_PASSWORD))
        .expect("SSH connection should succeed");
    let monitor = CpuMonitor::new(CpuSource::from(source));

    let (stats, _) = monitor.collect_stats().unwrap();
    assert!(!stats.hostname.is_empty());
    assert!(stats.memory_total_kb > 0);
    assert!(stats.memory_available_kb <= stats.memory_total_kb);
    assert!(stats.os_info.starts_with("Linux"));

    std::thread::sleep(Duration::from_millis(500));
    let (stats, usage) = monitor.collect_stats().unwrap();
    assert!((0.0..=100.0).contains(&stats.cpu_usage_percent));
    assert_eq!(stats.cpu_usage_percent, usage.total.usage_percent);
}
