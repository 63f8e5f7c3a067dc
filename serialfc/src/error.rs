//! Error types for serialfc.

use std::io;
use thiserror::Error;

/// Result type for serialfc operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for serialfc operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The driver rejected a control call.
    ///
    /// `code` is the raw value returned by the control channel (always `>= 1`).
    /// The driver publishes no catalog for these values, so none is applied.
    #[error("Driver control failure (code {code})")]
    Driver {
        /// Raw driver result code.
        code: i32,
    },

    /// The base serial session has no open device handle.
    #[error("Device handle unavailable: port is not open")]
    HandleUnavailable,

    /// I/O error on the base serial session.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Serial port error from the base serial session.
    #[cfg(feature = "native")]
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// A value could not be interpreted: an unknown feature name, or a
    /// control reply whose payload has the wrong shape.
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// Unsupported platform or operation.
    #[error("Unsupported: {0}")]
    Unsupported(String),
}

impl Error {
    /// Raw driver code, if this is a driver control failure.
    #[must_use]
    pub fn driver_code(&self) -> Option<i32> {
        match self {
            Self::Driver { code } => Some(*code),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_error_keeps_code() {
        let err = Error::Driver { code: 255 };
        assert_eq!(err.driver_code(), Some(255));
        assert_eq!(err.to_string(), "Driver control failure (code 255)");
    }

    #[test]
    fn test_unknown_feature_is_invalid_value() {
        let err = "turbo".parse::<crate::Feature>().unwrap_err();
        assert!(matches!(err, Error::InvalidValue(ref msg) if msg.contains("turbo")));
    }

    #[test]
    fn test_handle_unavailable_has_no_code() {
        assert_eq!(Error::HandleUnavailable.driver_code(), None);
    }
}
