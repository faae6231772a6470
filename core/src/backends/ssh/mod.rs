//! Remote Linux tick source over SSH.
//!
//! Runs [`CPU_COMMAND`] (or the full [`MONITORING_COMMAND`]) on a remote
//! host through a dedicated blocking `ssh2` session and parses stdout.

pub mod auth;

use std::io::Read;

use tracing::{debug, info};

use crate::config::SshConfig;
use crate::cpu::{CpuKey, TickReading, Ticks};
use crate::errors::AcquisitionError;
use crate::monitoring::parser::{parse_proc_stat, parse_stats, CPU_COMMAND, MONITORING_COMMAND};
use crate::monitoring::provider::TickSource;
use crate::monitoring::types::SystemStats;

use self::auth::connect_and_authenticate;

/// Samples a remote Linux host over one persistent SSH session.
///
/// Each instance belongs to exactly one host; the `CpuMonitor` wrapping it
/// holds that host's baselines.
pub struct SshSource {
    config: SshConfig,
    session: ssh2::Session,
}

impl SshSource {
    /// Open and authenticate a session for `config`.
    pub fn connect(config: SshConfig) -> Result<Self, AcquisitionError> {
        let config = config.expand();
        config
            .validate()
            .map_err(|e| AcquisitionError::Remote(e.to_string()))?;

        let session = connect_and_authenticate(&config)?;
        info!(
            "SSH monitoring connection established to {}@{}",
            config.username,
            config.address()
        );

        Ok(Self { config, session })
    }

    pub fn config(&self) -> &SshConfig {
        &self.config
    }

    /// Execute a command and return its stdout.
    ///
    /// A non-zero exit status is an error: a command that printed nothing
    /// useful must not be parsed as a reading.
    pub fn exec(&self, command: &str) -> Result<String, AcquisitionError> {
        let mut channel = self
            .session
            .channel_session()
            .map_err(|e| AcquisitionError::Remote(format!("Channel open failed: {e}")))?;

        channel
            .exec(command)
            .map_err(|e| AcquisitionError::Remote(format!("Exec failed: {e}")))?;

        let mut output = String::new();
        channel
            .read_to_string(&mut output)
            .map_err(|e| AcquisitionError::Remote(format!("Read failed: {e}")))?;

        channel.wait_close().ok();
        let status = channel.exit_status().unwrap_or(0);
        if status != 0 {
            debug!("'{command}' exited with status {status} on {}", self.config.host);
            return Err(AcquisitionError::Unavailable(format!(
                "Command exited with status {status}"
            )));
        }

        Ok(output)
    }

    /// Collect the full stats set in one round-trip.
    pub fn read_stats(&self) -> Result<(SystemStats, TickReading), AcquisitionError> {
        parse_stats(&self.exec(MONITORING_COMMAND)?)
    }
}

impl TickSource for SshSource {
    fn sample_aggregate(&self) -> Result<Ticks, AcquisitionError> {
        Ok(self.sample_all()?.aggregate)
    }

    fn sample_cores(&self) -> Result<Vec<(CpuKey, Ticks)>, AcquisitionError> {
        Ok(self.sample_all()?.cores)
    }

    fn sample_all(&self) -> Result<TickReading, AcquisitionError> {
        parse_proc_stat(&self.exec(CPU_COMMAND)?)
    }

    fn describe(&self) -> String {
        format!("ssh {}@{}", self.config.username, self.config.address())
    }
}
