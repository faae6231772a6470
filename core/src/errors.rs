//! Unified error types for the hoststat core crate.
//!
//! The rate engine itself never fails: warm-up, stalled counters and
//! counter regressions are all reported as a zero rate. Errors only come
//! from the adapters that acquire raw tick readings, and from configuration.

use thiserror::Error;

/// Top-level error type encompassing all core error categories.
#[derive(Error, Debug)]
pub enum CoreError {
    /// A raw counter reading could not be acquired.
    #[error("Acquisition error: {0}")]
    Acquisition(#[from] AcquisitionError),

    /// A configuration error (invalid values, missing fields, parse failures).
    #[error("Config error: {0}")]
    Config(String),

    /// A low-level I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Catch-all for errors that don't fit other categories.
    #[error("{0}")]
    Other(String),
}

/// Errors raised by a tick source while producing one counter reading.
///
/// A failed acquisition skips the sampling round; the stored baseline for
/// the affected keys is left untouched.
#[derive(Error, Debug)]
pub enum AcquisitionError {
    /// The counter source (file, command, API) is not available.
    #[error("Counter source unavailable: {0}")]
    Unavailable(String),

    /// The counter source answered, but its output could not be parsed.
    #[error("Malformed counter data: {0}")]
    Malformed(String),

    /// This platform or transport does not provide the requested counters.
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// The remote host could not be reached or the command failed.
    #[error("Remote error: {0}")]
    Remote(String),

    /// A low-level I/O error while reading counters.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AcquisitionError {
    /// Whether the transport to the host is gone and must be re-established
    /// before the next reading.
    pub fn is_connection_lost(&self) -> bool {
        matches!(self, AcquisitionError::Remote(_) | AcquisitionError::Io(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquisition_error_display() {
        let err = AcquisitionError::Unavailable("/proc/stat".into());
        assert_eq!(err.to_string(), "Counter source unavailable: /proc/stat");

        let err = AcquisitionError::Malformed("cpu x y".into());
        assert_eq!(err.to_string(), "Malformed counter data: cpu x y");

        let err = AcquisitionError::Unsupported("per-core counters".into());
        assert_eq!(err.to_string(), "Unsupported: per-core counters");
    }

    #[test]
    fn connection_lost_classification() {
        assert!(AcquisitionError::Remote("Channel open failed".into()).is_connection_lost());
        assert!(AcquisitionError::Io(std::io::Error::from(std::io::ErrorKind::BrokenPipe))
            .is_connection_lost());
        assert!(!AcquisitionError::Unavailable("exit status 1".into()).is_connection_lost());
        assert!(!AcquisitionError::Malformed("cpu x".into()).is_connection_lost());
    }

    #[test]
    fn core_error_from_acquisition_error() {
        let err: CoreError = AcquisitionError::Remote("exec failed".into()).into();
        assert_eq!(
            err.to_string(),
            "Acquisition error: Remote error: exec failed"
        );
    }

    #[test]
    fn core_error_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let core_err: CoreError = io_err.into();
        assert_eq!(core_err.to_string(), "I/O error: gone");
    }

    #[test]
    fn acquisition_error_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: AcquisitionError = io_err.into();
        assert_eq!(err.to_string(), "I/O error: denied");
    }
}
