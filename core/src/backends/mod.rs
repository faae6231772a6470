//! Tick sources for each platform and transport.
//!
//! Local Linux and SSH sources are always compiled (the SSH source samples
//! a remote Linux host from any platform). The Windows and Darwin sources
//! call native APIs and are compiled only on their own target.

#[cfg(target_os = "macos")]
pub mod darwin;
pub mod local;
pub mod ssh;
#[cfg(target_os = "windows")]
pub mod windows;

use crate::errors::AcquisitionError;

/// Run a command and capture its stdout as a string.
pub(crate) fn run_command(cmd: &str, args: &[&str]) -> Result<String, AcquisitionError> {
    let output = std::process::Command::new(cmd)
        .args(args)
        .output()
        .map_err(|e| AcquisitionError::Unavailable(format!("Failed to execute {cmd}: {e}")))?;

    if !output.status.success() {
        return Err(AcquisitionError::Unavailable(format!(
            "{cmd} exited with status {}",
            output.status
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}
