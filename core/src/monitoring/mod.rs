//! CPU monitors, tick source dispatch, and the Linux text parsers.

pub mod monitor;
pub mod parser;
pub mod provider;
pub mod types;

pub use monitor::CpuMonitor;
pub use parser::{
    parse_cpu_line, parse_df_output, parse_loadavg, parse_meminfo_value, parse_proc_stat,
    parse_raw_stats, parse_stats, parse_uptime, RawStats, CPU_COMMAND, MONITORING_COMMAND,
};
pub use provider::{CpuSource, TickSource};
pub use types::{CoreUsage, CpuUsage, SystemStats};
