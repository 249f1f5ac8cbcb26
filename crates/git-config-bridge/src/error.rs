//! Error types for bridge operations.

use std::ffi::c_int;
use std::io;
use thiserror::Error;

/// Result type for bridge operations.
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Errors raised by the bridge itself, as opposed to outcomes reported by a
/// backend implementation.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The compiled descriptor layout does not match the native definition.
    #[error("config backend layout mismatch: {field} is {actual}, expected {expected}")]
    LayoutMismatch {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A pointer that must be valid was null.
    #[error("null {what} pointer")]
    NullPointer { what: &'static str },

    /// The descriptor's handle token does not resolve to a live backend.
    #[error("config backend handle {token} is not registered")]
    StaleHandle { token: u64 },

    /// The native core refused the backend.
    #[error("failed to add config backend (status {status}): {message}")]
    Registration { status: c_int, message: String },

    /// Bridge configuration could not be loaded or is invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl BridgeError {
    /// Creates a null pointer error.
    pub fn null_pointer(what: &'static str) -> Self {
        BridgeError::NullPointer { what }
    }

    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        BridgeError::Config(message.into())
    }

    /// Returns the native status carried by this error, if any.
    pub fn status(&self) -> Option<c_int> {
        match self {
            BridgeError::Registration { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_error_display() {
        let err = BridgeError::StaleHandle { token: 7 };
        assert_eq!(err.to_string(), "config backend handle 7 is not registered");

        let err = BridgeError::config("unknown level");
        assert_eq!(err.to_string(), "Configuration error: unknown level");
    }

    #[test]
    fn test_registration_status_kept() {
        let err = BridgeError::Registration {
            status: -4,
            message: "exists".to_string(),
        };
        assert_eq!(err.status(), Some(-4));
        assert_eq!(BridgeError::null_pointer("backend").status(), None);
    }
}
