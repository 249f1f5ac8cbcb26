//! The contract a config backend author implements.
//!
//! Methods report expected outcomes (a missing key, a read-only store, a
//! domain-specific status) through [`BackendError`], which carries the
//! native status the shim layer hands back unchanged. A panic inside any
//! method is treated as an unexpected failure: the shim catches it and
//! reports a generic error.

use std::ffi::c_int;

use git_config_abi::{ConfigLevel, ErrorClass, ErrorCode};
use thiserror::Error;

use crate::error::BridgeError;

/// Result type for backend contract methods.
pub type BackendResult<T> = Result<T, BackendError>;

/// A config value returned by [`ConfigBackend::get`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigEntry {
    pub name: String,
    pub value: String,
    pub level: ConfigLevel,
    pub include_depth: u32,
}

impl ConfigEntry {
    /// Creates a top-level entry (not pulled in through an include).
    pub fn new(name: impl Into<String>, value: impl Into<String>, level: ConfigLevel) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            level,
            include_depth: 0,
        }
    }
}

/// Outcome of a backend method that did not succeed.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The requested name has no value in this backend.
    #[error("config value '{name}' was not found")]
    NotFound { name: String },

    /// The backend refuses writes.
    #[error("this backend is read-only")]
    ReadOnly,

    /// An argument from the native caller could not be used.
    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    /// A status chosen by the backend author, passed through verbatim.
    #[error("backend returned status {code}")]
    Status { code: c_int, message: Option<String> },

    #[error(transparent)]
    Bridge(#[from] BridgeError),
}

impl BackendError {
    /// Creates a not found error for `name`.
    pub fn not_found(name: impl Into<String>) -> Self {
        BackendError::NotFound { name: name.into() }
    }

    /// Creates an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        BackendError::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates a passthrough status without an error string.
    pub fn status(code: c_int) -> Self {
        BackendError::Status {
            code,
            message: None,
        }
    }

    /// Creates a passthrough status with an error string.
    pub fn with_message(code: c_int, message: impl Into<String>) -> Self {
        BackendError::Status {
            code,
            message: Some(message.into()),
        }
    }

    /// Returns the native status this outcome maps to.
    pub fn code(&self) -> c_int {
        match self {
            BackendError::NotFound { .. } => ErrorCode::NotFound.raw(),
            BackendError::Status { code, .. } => *code,
            BackendError::ReadOnly
            | BackendError::InvalidArgument { .. }
            | BackendError::Bridge(_) => ErrorCode::GenericError.raw(),
        }
    }

    /// Returns the error class reported alongside the message.
    pub fn class(&self) -> ErrorClass {
        match self {
            BackendError::InvalidArgument { .. } | BackendError::Bridge(_) => ErrorClass::Invalid,
            _ => ErrorClass::Config,
        }
    }

    /// Returns the message to publish through the native error facility.
    ///
    /// A not-found outcome is a normal lookup miss and publishes nothing.
    pub fn native_message(&self) -> Option<String> {
        match self {
            BackendError::NotFound { .. } => None,
            BackendError::Status { message, .. } => message.clone(),
            other => Some(other.to_string()),
        }
    }
}

/// Optional cleanup hook for backends that hold releasable resources.
///
/// The bridge probes for it through [`ConfigBackend::as_dispose`] when the
/// native core frees the backend, and calls it exactly once.
pub trait Dispose {
    fn dispose(&self);
}

/// A config store the native core drives as if it were built in.
///
/// The native core may call any method from any thread, concurrently;
/// implementations provide their own synchronization.
pub trait ConfigBackend: Send + Sync + 'static {
    /// Prepares the backend for use at `level`.
    ///
    /// Called once when the backend is added to a config object, before any
    /// `get` or `set`. An error aborts the registration.
    fn open(&self, level: ConfigLevel) -> BackendResult<()>;

    /// Looks `name` up. Must not modify the backend.
    fn get(&self, name: &str) -> BackendResult<ConfigEntry>;

    /// Writes `name`. A `None` value means "delete this key".
    fn set(&self, name: &str, value: Option<&str>) -> BackendResult<()>;

    /// Returns a read-only, point-in-time copy of this backend.
    ///
    /// The bridge binds the returned backend on its own before handing it to
    /// the native core.
    fn snapshot(&self) -> BackendResult<Box<dyn ConfigBackend>>;

    /// Exposes the disposal hook, if this backend has one.
    fn as_dispose(&self) -> Option<&dyn Dispose> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_not_found_maps_to_enotfound() {
        let err = BackendError::not_found("core.bare");
        assert_eq!(err.code(), -3);
        assert_eq!(err.native_message(), None);
        assert_eq!(err.to_string(), "config value 'core.bare' was not found");
    }

    #[test]
    fn test_read_only_is_generic_error() {
        let err = BackendError::ReadOnly;
        assert_eq!(err.code(), -1);
        assert_eq!(err.class(), ErrorClass::Config);
        assert_eq!(
            err.native_message().as_deref(),
            Some("this backend is read-only")
        );
    }

    #[test]
    fn test_status_passthrough() {
        let err = BackendError::status(-42);
        assert_eq!(err.code(), -42);
        assert_eq!(err.native_message(), None);

        let err = BackendError::with_message(ErrorCode::Locked.raw(), "config is locked");
        assert_eq!(err.code(), -14);
        assert_eq!(err.native_message().as_deref(), Some("config is locked"));
    }

    #[test]
    fn test_bridge_error_is_invalid_class() {
        let err: BackendError = BridgeError::null_pointer("out").into();
        assert_eq!(err.code(), -1);
        assert_eq!(err.class(), ErrorClass::Invalid);
    }
}
