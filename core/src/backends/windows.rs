//! Windows tick source via `GetSystemTimes`.
//!
//! Only whole-machine counters are read; per-core times would need
//! `NtQuerySystemInformation`, so [`sample_cores`](TickSource::sample_cores)
//! returns an empty list.

use windows::Win32::Foundation::FILETIME;
use windows::Win32::System::Threading::GetSystemTimes;

use crate::cpu::{CpuKey, Ticks};
use crate::errors::AcquisitionError;
use crate::monitoring::provider::TickSource;

fn filetime_to_u64(ft: FILETIME) -> u64 {
    (u64::from(ft.dwHighDateTime) << 32) | u64::from(ft.dwLowDateTime)
}

/// Reads system-wide idle, kernel and user time (100 ns units).
#[derive(Debug, Default, Clone)]
pub struct WindowsSource;

impl WindowsSource {
    pub fn new() -> Self {
        Self
    }
}

impl TickSource for WindowsSource {
    fn sample_aggregate(&self) -> Result<Ticks, AcquisitionError> {
        let mut idle = FILETIME::default();
        let mut kernel = FILETIME::default();
        let mut user = FILETIME::default();

        // SAFETY: all three pointers reference live FILETIME values owned by
        // this frame.
        unsafe {
            GetSystemTimes(
                Some(&mut idle as *mut _),
                Some(&mut kernel as *mut _),
                Some(&mut user as *mut _),
            )
        }
        .map_err(|e| AcquisitionError::Unavailable(format!("GetSystemTimes failed: {e}")))?;

        // Kernel time already includes idle time.
        let total = filetime_to_u64(kernel).saturating_add(filetime_to_u64(user));
        Ok(Ticks::new(filetime_to_u64(idle), total))
    }

    fn sample_cores(&self) -> Result<Vec<(CpuKey, Ticks)>, AcquisitionError> {
        Ok(Vec::new())
    }

    fn describe(&self) -> String {
        "local (GetSystemTimes)".to_string()
    }
}
