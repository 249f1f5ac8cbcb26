//! Calls from the bridge into the native core.
//!
//! With the `native-link` feature these are the real native entry points.
//! Without it, the error facility keeps a thread-local last error with the
//! same set/read/clear semantics so the bridge can be exercised in-process.

use std::ffi::{c_int, CString};

use git_config_abi::{ConfigLevel, ErrorClass, RawConfigBackend};
#[cfg(feature = "native-link")]
use git_config_abi::{GitConfig, GitRepository};
#[cfg(feature = "native-link")]
use std::ffi::{c_char, CStr};
#[cfg(feature = "native-link")]
use std::ptr::NonNull;

#[cfg(feature = "native-link")]
use crate::error::{BridgeError, BridgeResult};

/// The last error published through the native error facility.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeError {
    /// Raw error class, see [`ErrorClass`].
    pub class: c_int,
    pub message: String,
}

/// A native config object that accepts backends.
pub trait NativeConfig {
    /// Installs `backend` at `level` and returns the native status verbatim.
    ///
    /// On success the native core owns `backend` and will eventually call
    /// its `free` slot. On failure ownership stays with the caller.
    ///
    /// # Safety
    ///
    /// `backend` must point to a live, fully initialised callback table
    /// that is not installed anywhere else.
    unsafe fn add_backend(
        &mut self,
        backend: *mut RawConfigBackend,
        level: ConfigLevel,
        force: bool,
    ) -> c_int;
}

fn to_c_message(message: &str) -> CString {
    // Interior NULs would truncate the message on the native side.
    CString::new(message.replace('\0', " ")).unwrap_or_default()
}

// =============================================================================
// Native declarations
// =============================================================================

#[cfg(feature = "native-link")]
#[repr(C)]
struct RawGitError {
    message: *mut c_char,
    klass: c_int,
}

#[cfg(feature = "native-link")]
extern "C" {
    fn git_error_set_str(error_class: c_int, string: *const c_char) -> c_int;
    fn git_error_last() -> *const RawGitError;
    fn git_error_clear();
    fn git_config_add_backend(
        cfg: *mut GitConfig,
        backend: *mut RawConfigBackend,
        level: c_int,
        repo: *const GitRepository,
        force: c_int,
    ) -> c_int;
}

// =============================================================================
// Error facility
// =============================================================================

#[cfg(not(feature = "native-link"))]
thread_local! {
    static LAST_ERROR: std::cell::RefCell<Option<NativeError>> = const { std::cell::RefCell::new(None) };
}

/// Publishes `message` as the calling thread's last native error.
#[cfg(feature = "native-link")]
pub fn set_native_error(class: ErrorClass, message: &str) {
    let message = to_c_message(message);
    // Safety: message is a valid NUL-terminated string for the call duration
    unsafe {
        git_error_set_str(class.raw(), message.as_ptr());
    }
}

#[cfg(not(feature = "native-link"))]
pub fn set_native_error(class: ErrorClass, message: &str) {
    let message = to_c_message(message).to_string_lossy().into_owned();
    LAST_ERROR.with(|cell| {
        *cell.borrow_mut() = Some(NativeError {
            class: class.raw(),
            message,
        });
    });
}

/// Returns the calling thread's last native error, if any.
#[cfg(feature = "native-link")]
pub fn last_native_error() -> Option<NativeError> {
    // Safety: git_error_last returns null or a pointer valid until the next
    // error call on this thread; the message is copied out immediately
    unsafe {
        let raw = git_error_last();
        if raw.is_null() || (*raw).message.is_null() {
            return None;
        }
        Some(NativeError {
            class: (*raw).klass,
            message: CStr::from_ptr((*raw).message).to_string_lossy().into_owned(),
        })
    }
}

#[cfg(not(feature = "native-link"))]
pub fn last_native_error() -> Option<NativeError> {
    LAST_ERROR.with(|cell| cell.borrow().clone())
}

/// Clears the calling thread's last native error.
#[cfg(feature = "native-link")]
pub fn clear_native_error() {
    unsafe { git_error_clear() }
}

#[cfg(not(feature = "native-link"))]
pub fn clear_native_error() {
    LAST_ERROR.with(|cell| {
        *cell.borrow_mut() = None;
    });
}

/// Returns the last error message, or a placeholder when none was set.
pub(crate) fn last_message_or_default() -> String {
    last_native_error()
        .map(|err| err.message)
        .unwrap_or_else(|| "no error message".to_string())
}

// =============================================================================
// Linked config object
// =============================================================================

/// A native `git_config` object owned elsewhere.
#[cfg(feature = "native-link")]
pub struct LinkedConfig {
    raw: NonNull<GitConfig>,
}

#[cfg(feature = "native-link")]
impl LinkedConfig {
    /// Wraps a native config pointer.
    ///
    /// # Safety
    ///
    /// `raw` must stay valid for the lifetime of the returned value.
    pub unsafe fn from_raw(raw: *mut GitConfig) -> BridgeResult<Self> {
        NonNull::new(raw)
            .map(|raw| Self { raw })
            .ok_or_else(|| BridgeError::null_pointer("git_config"))
    }

    /// Returns the wrapped native pointer.
    pub fn as_ptr(&self) -> *mut GitConfig {
        self.raw.as_ptr()
    }
}

#[cfg(feature = "native-link")]
impl NativeConfig for LinkedConfig {
    unsafe fn add_backend(
        &mut self,
        backend: *mut RawConfigBackend,
        level: ConfigLevel,
        force: bool,
    ) -> c_int {
        git_config_add_backend(
            self.raw.as_ptr(),
            backend,
            level.raw(),
            std::ptr::null(),
            c_int::from(force),
        )
    }
}

#[cfg(all(test, not(feature = "native-link")))]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_set_and_clear_error() {
        clear_native_error();
        assert_eq!(last_native_error(), None);

        set_native_error(ErrorClass::Config, "bad value");
        assert_eq!(
            last_native_error(),
            Some(NativeError {
                class: 7,
                message: "bad value".to_string(),
            })
        );

        clear_native_error();
        assert_eq!(last_native_error(), None);
        assert_eq!(last_message_or_default(), "no error message");
    }

    #[test]
    fn test_interior_nul_is_replaced() {
        set_native_error(ErrorClass::Invalid, "a\0b");
        assert_eq!(last_native_error().unwrap().message, "a b");
        clear_native_error();
    }

    #[test]
    fn test_error_is_thread_local() {
        set_native_error(ErrorClass::Config, "main thread");
        let other = std::thread::spawn(last_native_error).join().unwrap();
        assert_eq!(other, None);
        clear_native_error();
    }
}
