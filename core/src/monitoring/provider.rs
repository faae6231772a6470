//! Capability interface for CPU tick sources.
//!
//! A [`TickSource`] only acquires raw counter readings; turning them into
//! rates is the job of [`CpuMonitor`](super::CpuMonitor). [`CpuSource`] is
//! the closed set of sources this crate ships.

#[cfg(target_os = "macos")]
use crate::backends::darwin::DarwinSource;
use crate::backends::local::LocalLinuxSource;
use crate::backends::ssh::SshSource;
#[cfg(target_os = "windows")]
use crate::backends::windows::WindowsSource;
use crate::cpu::{CpuKey, TickReading, Ticks};
use crate::errors::AcquisitionError;

/// Produces raw CPU tick readings from one host.
///
/// Implementations must report a failed acquisition as an error, never as a
/// zeroed reading: a fabricated zero would become a baseline.
pub trait TickSource: Send {
    /// One reading of the whole-machine counters.
    fn sample_aggregate(&self) -> Result<Ticks, AcquisitionError>;

    /// One reading per logical CPU, or an empty list when the platform has
    /// no per-core counters.
    fn sample_cores(&self) -> Result<Vec<(CpuKey, Ticks)>, AcquisitionError>;

    /// Aggregate and per-core readings together.
    ///
    /// Sources that get both from a single read should override this.
    fn sample_all(&self) -> Result<TickReading, AcquisitionError> {
        Ok(TickReading {
            aggregate: self.sample_aggregate()?,
            cores: self.sample_cores()?,
        })
    }

    /// Short human-readable name used in logs.
    fn describe(&self) -> String;
}

/// The tick sources supported by this crate.
pub enum CpuSource {
    /// `/proc/stat` on the local host.
    LocalLinux(LocalLinuxSource),
    /// `/proc/stat` on a remote Linux host over SSH.
    RemoteLinux(SshSource),
    /// `GetSystemTimes` on the local Windows host.
    #[cfg(target_os = "windows")]
    Windows(WindowsSource),
    /// `host_processor_info` on the local Darwin host.
    #[cfg(target_os = "macos")]
    Darwin(DarwinSource),
}

impl CpuSource {
    /// The native source for the host this process runs on.
    pub fn local() -> Result<Self, AcquisitionError> {
        #[cfg(target_os = "linux")]
        {
            Ok(CpuSource::LocalLinux(LocalLinuxSource::new()))
        }

        #[cfg(target_os = "windows")]
        {
            Ok(CpuSource::Windows(WindowsSource::new()))
        }

        #[cfg(target_os = "macos")]
        {
            Ok(CpuSource::Darwin(DarwinSource::new()))
        }

        #[cfg(not(any(target_os = "linux", target_os = "windows", target_os = "macos")))]
        {
            Err(AcquisitionError::Unsupported(format!(
                "local CPU sampling on {}",
                std::env::consts::OS
            )))
        }
    }

    fn inner(&self) -> &dyn TickSource {
        match self {
            CpuSource::LocalLinux(s) => s,
            CpuSource::RemoteLinux(s) => s,
            #[cfg(target_os = "windows")]
            CpuSource::Windows(s) => s,
            #[cfg(target_os = "macos")]
            CpuSource::Darwin(s) => s,
        }
    }
}

impl TickSource for CpuSource {
    fn sample_aggregate(&self) -> Result<Ticks, AcquisitionError> {
        self.inner().sample_aggregate()
    }

    fn sample_cores(&self) -> Result<Vec<(CpuKey, Ticks)>, AcquisitionError> {
        self.inner().sample_cores()
    }

    fn sample_all(&self) -> Result<TickReading, AcquisitionError> {
        self.inner().sample_all()
    }

    fn describe(&self) -> String {
        self.inner().describe()
    }
}

impl From<LocalLinuxSource> for CpuSource {
    fn from(source: LocalLinuxSource) -> Self {
        CpuSource::LocalLinux(source)
    }
}

impl From<SshSource> for CpuSource {
    fn from(source: SshSource) -> Self {
        CpuSource::RemoteLinux(source)
    }
}
