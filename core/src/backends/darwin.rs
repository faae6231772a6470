//! Darwin tick source via `host_processor_info`.
//!
//! Mach reports per-CPU user/system/idle/nice ticks as 32-bit counters. The
//! aggregate reading is the sum over all CPUs. A 32-bit counter wrapping
//! shows up as a counter regression and is re-baselined by the tracker.

use tracing::debug;

use crate::arith::kib_from_pages;
use crate::backends::run_command;
use crate::cpu::{CpuCounters, CpuKey, TickReading, Ticks};
use crate::errors::AcquisitionError;
use crate::monitoring::provider::TickSource;

const CPU_STATE_MAX: usize = libc::CPU_STATE_MAX as usize;
const CPU_STATE_USER: usize = libc::CPU_STATE_USER as usize;
const CPU_STATE_SYSTEM: usize = libc::CPU_STATE_SYSTEM as usize;
const CPU_STATE_IDLE: usize = libc::CPU_STATE_IDLE as usize;
const CPU_STATE_NICE: usize = libc::CPU_STATE_NICE as usize;

/// Reads per-CPU load ticks from the Mach host port.
#[derive(Debug, Default, Clone)]
pub struct DarwinSource;

impl DarwinSource {
    pub fn new() -> Self {
        Self
    }

    /// Raw `[user, system, idle, nice]` ticks per CPU.
    #[allow(deprecated)]
    fn cpu_load_info(&self) -> Result<Vec<[u32; CPU_STATE_MAX]>, AcquisitionError> {
        let mut cpu_count: libc::natural_t = 0;
        let mut info: libc::processor_info_array_t = std::ptr::null_mut();
        let mut info_count: libc::mach_msg_type_number_t = 0;

        // SAFETY: out-pointers reference locals; on success the kernel hands
        // back a buffer of `info_count` integers that we free below.
        let kr = unsafe {
            libc::host_processor_info(
                libc::mach_host_self(),
                libc::PROCESSOR_CPU_LOAD_INFO,
                &mut cpu_count,
                &mut info,
                &mut info_count,
            )
        };
        if kr != libc::KERN_SUCCESS || info.is_null() {
            return Err(AcquisitionError::Unavailable(format!(
                "host_processor_info failed with code {kr}"
            )));
        }

        // SAFETY: the buffer holds `info_count` integers, which is
        // `cpu_count * CPU_STATE_MAX` for this flavor.
        let values = unsafe { std::slice::from_raw_parts(info, info_count as usize) };
        let cpus = values
            .chunks_exact(CPU_STATE_MAX)
            .take(cpu_count as usize)
            .map(|c| {
                [
                    c[CPU_STATE_USER] as u32,
                    c[CPU_STATE_SYSTEM] as u32,
                    c[CPU_STATE_IDLE] as u32,
                    c[CPU_STATE_NICE] as u32,
                ]
            })
            .collect();

        // SAFETY: releasing the buffer allocated by host_processor_info.
        let kr = unsafe {
            libc::vm_deallocate(
                libc::mach_task_self(),
                info as libc::vm_address_t,
                info_count as libc::vm_size_t * std::mem::size_of::<libc::integer_t>(),
            )
        };
        if kr != libc::KERN_SUCCESS {
            debug!("vm_deallocate of processor info failed with code {kr}");
        }

        Ok(cpus)
    }

    /// Total and available memory in KiB, from `sysctl` and `vm_stat`.
    pub fn memory_kb(&self) -> Result<(u64, u64), AcquisitionError> {
        let total_bytes: u64 = run_command("sysctl", &["-n", "hw.memsize"])?
            .trim()
            .parse()
            .map_err(|e| AcquisitionError::Malformed(format!("hw.memsize: {e}")))?;
        let page_size: u64 = run_command("sysctl", &["-n", "hw.pagesize"])
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(4096);
        let vm_stat = run_command("vm_stat", &[])?;

        let available_pages = parse_vm_stat_available_pages(&vm_stat);
        debug!("vm_stat: {available_pages} available pages of {page_size} bytes");
        Ok((total_bytes / 1024, kib_from_pages(available_pages, page_size)))
    }
}

fn counters_from_load(load: &[u32; CPU_STATE_MAX]) -> CpuCounters {
    CpuCounters {
        user: u64::from(load[0]),
        system: u64::from(load[1]),
        idle: u64::from(load[2]),
        nice: u64::from(load[3]),
        ..Default::default()
    }
}

/// Sum the per-CPU counters into one whole-machine reading.
fn aggregate(cores: &[CpuCounters]) -> CpuCounters {
    cores.iter().fold(CpuCounters::default(), |acc, c| CpuCounters {
        user: acc.user.saturating_add(c.user),
        nice: acc.nice.saturating_add(c.nice),
        system: acc.system.saturating_add(c.system),
        idle: acc.idle.saturating_add(c.idle),
        ..Default::default()
    })
}

/// Free plus speculative pages from `vm_stat` output.
fn parse_vm_stat_available_pages(output: &str) -> u64 {
    let value = |line: &str| -> u64 {
        line.split(':')
            .nth(1)
            .and_then(|s| s.trim().trim_end_matches('.').parse().ok())
            .unwrap_or(0)
    };

    output
        .lines()
        .filter(|l| l.starts_with("Pages free:") || l.starts_with("Pages speculative:"))
        .map(value)
        .fold(0u64, u64::saturating_add)
}

impl TickSource for DarwinSource {
    fn sample_aggregate(&self) -> Result<Ticks, AcquisitionError> {
        Ok(self.sample_all()?.aggregate)
    }

    fn sample_cores(&self) -> Result<Vec<(CpuKey, Ticks)>, AcquisitionError> {
        Ok(self.sample_all()?.cores)
    }

    fn sample_all(&self) -> Result<TickReading, AcquisitionError> {
        let counters: Vec<CpuCounters> = self
            .cpu_load_info()?
            .iter()
            .map(counters_from_load)
            .collect();
        if counters.is_empty() {
            return Err(AcquisitionError::Malformed(
                "host_processor_info reported no CPUs".to_string(),
            ));
        }

        Ok(TickReading {
            aggregate: Ticks::from(aggregate(&counters)),
            cores: counters
                .into_iter()
                .enumerate()
                .map(|(i, c)| (CpuKey::Core(i), Ticks::from(c)))
                .collect(),
        })
    }

    fn describe(&self) -> String {
        "local (host_processor_info)".to_string()
    }
}
