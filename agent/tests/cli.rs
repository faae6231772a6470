//! End-to-end tests of the agent binary.

use std::process::Command;

fn agent() -> Command {
    Command::new(env!("CARGO_BIN_EXE_hoststat-agent"))
}

#[test]
fn version_prints_package_version() {
    let output = agent().arg("--version").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert_eq!(
        stdout.trim(),
        format!("hoststat-agent {}", env!("CARGO_PKG_VERSION"))
    );
}

#[test]
fn no_targets_exits_with_usage() {
    let output = agent().output().unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("No targets configured"));
    assert!(stderr.contains("Usage:"));
}

#[test]
fn unknown_option_is_rejected() {
    let output = agent().arg("--stdio").output().unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8(output.stderr)
        .unwrap()
        .contains("Unknown option: --stdio"));
}

#[cfg(target_os = "linux")]
#[test]
fn self_monitoring_streams_ndjson() {
    let output = agent()
        .args(["--self", "--count", "2", "--interval-ms", "500", "--per-core"])
        .env("RUST_LOG", "warn")
        .output()
        .unwrap();
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let stdout = String::from_utf8(output.stdout).unwrap();
    let lines: Vec<serde_json::Value> = stdout
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(lines.len(), 2);

    for line in &lines {
        assert_eq!(line["jsonrpc"], "2.0");
        assert_eq!(line["method"], "monitoring.data");
        assert_eq!(line["params"]["host"], "self");
        let pct = line["params"]["cpuUsagePercent"].as_f64().unwrap();
        assert!((0.0..=100.0).contains(&pct));
        assert!(line["params"]["memoryTotalKb"].as_u64().unwrap() > 0);
    }

    // First sample has no baseline yet.
    assert_eq!(lines[0]["params"]["cpuUsagePercent"], 0.0);
    assert_eq!(lines[0]["params"]["cpu"]["total"]["measured"], false);
    assert_eq!(lines[1]["params"]["cpu"]["total"]["measured"], true);
}

#[test]
fn config_file_with_unreachable_ssh_target_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("agent.json");
    std::fs::write(
        &path,
        r#"{"targets":[{"id":"down","type":"ssh","ssh":{"host":"127.0.0.1","port":1,"username":"u","authMethod":"agent","timeoutMs":500}}]}"#,
    )
    .unwrap();

    let output = agent()
        .args(["--config", path.to_str().unwrap(), "--count", "1"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("No target could be monitored"));
}
