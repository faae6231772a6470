//! Parsers for the Linux pseudo-files and commands used by the samplers.
//!
//! The same parsers serve the local reader (which reads `/proc` directly)
//! and the SSH reader (which runs [`MONITORING_COMMAND`] or
//! [`CPU_COMMAND`] and parses stdout).

use std::collections::HashMap;

use crate::arith::percent_of;
use crate::cpu::{CpuCounters, CpuKey, TickReading, Ticks};
use crate::errors::AcquisitionError;
use crate::monitoring::types::SystemStats;

/// Prints only the `cpu*` lines of `/proc/stat`.
pub const CPU_COMMAND: &str = "grep '^cpu' /proc/stat";

/// Marker that opens each section of [`MONITORING_COMMAND`] output.
const SECTION_MARKER: &str = "--- ";

/// Compound command gathering every metric in a single round-trip.
///
/// Each command's output is preceded by a `--- <name>` line so sections can
/// be told apart even when one of them prints nothing.
pub const MONITORING_COMMAND: &str = "echo '--- hostname'; hostname; \
     echo '--- loadavg'; cat /proc/loadavg; \
     echo '--- stat'; grep '^cpu' /proc/stat; \
     echo '--- meminfo'; cat /proc/meminfo; \
     echo '--- uptime'; cat /proc/uptime; \
     echo '--- df'; df -Pk /; \
     echo '--- uname'; uname -sr";

/// Minimum number of counters a `cpu` line must carry (user..idle).
const MIN_CPU_FIELDS: usize = 4;

/// Parse one `cpu` / `cpuN` line from `/proc/stat`.
///
/// Counters past `steal` (guest time, already included in `user`) are
/// ignored; counters missing from older kernels default to `0`.
pub fn parse_cpu_line(line: &str) -> Result<(CpuKey, CpuCounters), AcquisitionError> {
    let mut parts = line.split_whitespace();
    let label = parts
        .next()
        .ok_or_else(|| AcquisitionError::Malformed("empty cpu line".to_string()))?;

    let key = match label.strip_prefix("cpu") {
        Some("") => CpuKey::Aggregate,
        Some(n) => n
            .parse()
            .map(CpuKey::Core)
            .map_err(|_| AcquisitionError::Malformed(format!("bad cpu label '{label}'")))?,
        None => {
            return Err(AcquisitionError::Malformed(format!(
                "not a cpu line: '{line}'"
            )))
        }
    };

    let values = parts
        .take(8)
        .map(|p| p.parse::<u64>())
        .collect::<Result<Vec<u64>, _>>()
        .map_err(|e| AcquisitionError::Malformed(format!("bad counter in '{line}': {e}")))?;

    if values.len() < MIN_CPU_FIELDS {
        return Err(AcquisitionError::Malformed(format!(
            "too few counters in '{line}'"
        )));
    }

    let field = |i: usize| values.get(i).copied().unwrap_or(0);
    Ok((
        key,
        CpuCounters {
            user: field(0),
            nice: field(1),
            system: field(2),
            idle: field(3),
            iowait: field(4),
            irq: field(5),
            softirq: field(6),
            steal: field(7),
        },
    ))
}

/// Parse the `cpu` lines of `/proc/stat` into one reading.
///
/// Non-`cpu` lines are skipped. The aggregate line is required.
pub fn parse_proc_stat(text: &str) -> Result<TickReading, AcquisitionError> {
    let mut aggregate = None;
    let mut cores = Vec::new();

    for line in text.lines().filter(|l| l.starts_with("cpu")) {
        match parse_cpu_line(line)? {
            (CpuKey::Aggregate, counters) => aggregate = Some(Ticks::from(counters)),
            (key, counters) => cores.push((key, Ticks::from(counters))),
        }
    }

    let aggregate = aggregate.ok_or_else(|| {
        AcquisitionError::Malformed("no aggregate cpu line found".to_string())
    })?;
    cores.sort_by_key(|(key, _)| *key);

    Ok(TickReading { aggregate, cores })
}

/// Parse the numeric kB value from a `/proc/meminfo` line like
/// `"MemTotal:       16384000 kB"`.
pub fn parse_meminfo_value(line: &str) -> u64 {
    line.split(':')
        .nth(1)
        .and_then(|rest| rest.split_whitespace().next())
        .and_then(|v| v.parse().ok())
        .unwrap_or(0)
}

/// Parse `/proc/loadavg` into the 1, 5 and 15 minute averages.
pub fn parse_loadavg(text: &str) -> [f64; 3] {
    let mut parts = text.split_whitespace().map(|s| s.parse().unwrap_or(0.0));
    [
        parts.next().unwrap_or(0.0),
        parts.next().unwrap_or(0.0),
        parts.next().unwrap_or(0.0),
    ]
}

/// Parse the first field of `/proc/uptime` (seconds since boot).
pub fn parse_uptime(text: &str) -> f64 {
    text.split_whitespace()
        .next()
        .and_then(|s| s.parse().ok())
        .unwrap_or(0.0)
}

/// Parse `df -Pk` output to extract disk total, used, and used percent.
pub fn parse_df_output(output: &str) -> (u64, u64, f64) {
    for line in output.lines() {
        if line.starts_with("Filesystem") || line.trim().is_empty() {
            continue;
        }
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() >= 5 {
            let total: u64 = parts[1].parse().unwrap_or(0);
            let used: u64 = parts[2].parse().unwrap_or(0);
            let percent: f64 = parts[4].trim_end_matches('%').parse().unwrap_or(0.0);
            return (total, used, percent);
        }
    }
    (0, 0, 0.0)
}

/// Split [`MONITORING_COMMAND`] output into its named sections.
fn split_sections(output: &str) -> HashMap<&str, String> {
    let mut sections: HashMap<&str, String> = HashMap::new();
    let mut current: Option<&str> = None;

    for line in output.lines() {
        if let Some(name) = line.strip_prefix(SECTION_MARKER) {
            let name = name.trim();
            sections.entry(name).or_default();
            current = Some(name);
        } else if let Some(name) = current {
            let body = sections.entry(name).or_default();
            body.push_str(line);
            body.push('\n');
        }
    }

    sections
}

/// Raw text of every non-CPU source that makes up [`SystemStats`].
#[derive(Debug, Default, Clone, Copy)]
pub struct RawStats<'a> {
    pub hostname: &'a str,
    pub loadavg: &'a str,
    pub meminfo: &'a str,
    pub uptime: &'a str,
    pub df: &'a str,
    pub uname: &'a str,
}

/// Build [`SystemStats`] from raw text, with `cpu_usage_percent` left at
/// `0.0` (a rate needs two readings).
pub fn parse_raw_stats(raw: &RawStats<'_>) -> Result<SystemStats, AcquisitionError> {
    let mut memory_total_kb = 0;
    let mut memory_available_kb = 0;
    for line in raw.meminfo.lines() {
        if line.starts_with("MemTotal:") {
            memory_total_kb = parse_meminfo_value(line);
        } else if line.starts_with("MemAvailable:") {
            memory_available_kb = parse_meminfo_value(line);
        }
    }
    if memory_total_kb == 0 {
        return Err(AcquisitionError::Malformed(
            "MemTotal missing from meminfo".to_string(),
        ));
    }

    let (disk_total_kb, disk_used_kb, disk_used_percent) = parse_df_output(raw.df);

    Ok(SystemStats {
        hostname: raw.hostname.trim().to_string(),
        uptime_seconds: parse_uptime(raw.uptime),
        load_average: parse_loadavg(raw.loadavg),
        cpu_usage_percent: 0.0,
        memory_total_kb,
        memory_available_kb,
        memory_used_percent: percent_of(
            memory_total_kb.saturating_sub(memory_available_kb),
            memory_total_kb,
        ),
        disk_total_kb,
        disk_used_kb,
        disk_used_percent,
        os_info: raw.uname.trim().to_string(),
    })
}

/// Parse the output of [`MONITORING_COMMAND`] into stats plus the raw CPU
/// reading.
pub fn parse_stats(output: &str) -> Result<(SystemStats, TickReading), AcquisitionError> {
    let sections = split_sections(output);
    let section = |name: &str| sections.get(name).map(String::as_str).unwrap_or("");

    let reading = parse_proc_stat(section("stat"))?;
    let stats = parse_raw_stats(&RawStats {
        hostname: section("hostname"),
        loadavg: section("loadavg"),
        meminfo: section("meminfo"),
        uptime: section("uptime"),
        df: section("df"),
        uname: section("uname"),
    })?;

    Ok((stats, reading))
}
