//! Entry points wired into every descriptor's callback slots.
//!
//! Each shim is a plain `extern "C"` function shared by all descriptors. It
//! never captures state: the backend it serves is recovered on every call
//! from the handle token stored in the descriptor it is handed.
//!
//! Every shim follows the same sequence:
//!
//! 1. Resolve the descriptor to a backend through the handle table. An
//!    unresolvable descriptor sets an error and returns `GIT_ERROR`.
//! 2. Decode native arguments leniently (invalid UTF-8 is replaced, unknown
//!    level tags are kept as [`ConfigLevel::Other`]).
//! 3. Call the backend inside `catch_unwind`. A panic sets an error and
//!    returns `GIT_ERROR`; nothing unwinds into native frames.
//! 4. Encode the result: `0` on success, the backend's status verbatim on
//!    failure.

use std::any::Any;
use std::borrow::Cow;
use std::ffi::{c_char, c_int, CStr, CString};
use std::panic::{self, AssertUnwindSafe};
use std::ptr;
use std::sync::Arc;

use git_config_abi::{
    ConfigLevel, ErrorClass, ErrorCode, GitRepository, RawConfigBackend, RawConfigEntry,
};

use crate::backend::{BackendError, BackendResult, ConfigBackend, ConfigEntry};
use crate::descriptor::BackendDescriptor;
use crate::error::BridgeError;
use crate::handles::{self, HandleToken};
use crate::native::set_native_error;
use crate::registration::BoundBackend;

const GIT_OK: c_int = ErrorCode::Ok as c_int;
const GIT_ERROR: c_int = ErrorCode::GenericError as c_int;

/// Finds the backend behind `backend`, publishing an error if there is none.
unsafe fn lookup(op: &str, backend: *mut RawConfigBackend) -> Option<Arc<dyn ConfigBackend>> {
    let token = BackendDescriptor::token_of(backend).unwrap_or(HandleToken::NULL);
    match handles::resolve(token) {
        Some(instance) => Some(instance),
        None => {
            let err = BridgeError::StaleHandle { token: token.raw() };
            log::warn!("config backend {}: {}", op, err);
            set_native_error(ErrorClass::Invalid, &err.to_string());
            None
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}

/// Runs `call` against the backend behind `backend` and encodes the outcome.
unsafe fn dispatch<F>(op: &'static str, backend: *mut RawConfigBackend, call: F) -> c_int
where
    F: FnOnce(&dyn ConfigBackend) -> BackendResult<()>,
{
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        let instance = lookup(op, backend)?;
        Some(call(instance.as_ref()))
    }));

    match outcome {
        Ok(None) => GIT_ERROR,
        Ok(Some(Ok(()))) => GIT_OK,
        Ok(Some(Err(err))) if err.code() == GIT_OK => {
            // A zero status would tell the caller its out-pointer was filled.
            log::warn!("config backend {} returned status 0 as an error", op);
            set_native_error(
                ErrorClass::Config,
                "backend reported success through an error",
            );
            GIT_ERROR
        }
        Ok(Some(Err(err))) => {
            log::trace!("config backend {}: {}", op, err);
            if let Some(message) = err.native_message() {
                set_native_error(err.class(), &message);
            }
            err.code()
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            log::warn!("config backend {} panicked: {}", op, message);
            set_native_error(
                ErrorClass::Config,
                &format!("config backend {} failed: {}", op, message),
            );
            GIT_ERROR
        }
    }
}

/// Decodes a native string argument, replacing invalid UTF-8.
unsafe fn decode<'a>(what: &str, raw: *const c_char) -> BackendResult<Cow<'a, str>> {
    if raw.is_null() {
        return Err(BackendError::invalid_argument(format!("null {}", what)));
    }
    Ok(CStr::from_ptr(raw).to_string_lossy())
}

/// Native-owned copy of a [`ConfigEntry`].
///
/// `raw` must stay the first field: the native side only sees a pointer to
/// it and hands the same pointer back to [`free_entry`].
#[repr(C)]
struct NativeEntry {
    raw: RawConfigEntry,
    _name: CString,
    _value: CString,
}

fn into_native_entry(entry: ConfigEntry) -> BackendResult<*mut RawConfigEntry> {
    let name = CString::new(entry.name)
        .map_err(|_| BackendError::invalid_argument("config entry name contains NUL"))?;
    let value = CString::new(entry.value)
        .map_err(|_| BackendError::invalid_argument("config entry value contains NUL"))?;

    // The CString buffers are heap allocated and do not move with the box.
    let native = Box::new(NativeEntry {
        raw: RawConfigEntry {
            name: name.as_ptr(),
            value: value.as_ptr(),
            include_depth: entry.include_depth,
            level: entry.level.raw(),
            free: Some(free_entry),
            payload: ptr::null_mut(),
        },
        _name: name,
        _value: value,
    });
    Ok(Box::into_raw(native) as *mut RawConfigEntry)
}

/// Releases an entry produced by the `get` shim.
///
/// Installed as the entry's own `free` slot; the native caller that
/// received the entry is responsible for calling it exactly once.
///
/// # Safety
///
/// `entry` must be null or a pointer obtained from the `get` shim that has
/// not been freed yet.
pub unsafe extern "C" fn free_entry(entry: *mut RawConfigEntry) {
    if entry.is_null() {
        return;
    }
    drop(Box::from_raw(entry as *mut NativeEntry));
}

/// `open` slot. The repository the native core passes is not used.
///
/// # Safety
///
/// `backend` must be null or point to a live descriptor.
pub unsafe extern "C" fn open(
    backend: *mut RawConfigBackend,
    level: c_int,
    _repo: *const GitRepository,
) -> c_int {
    let level = ConfigLevel::from_raw(level);
    log::trace!("config backend open at {}", level);
    dispatch("open", backend, |instance| instance.open(level))
}

/// `get` slot.
///
/// On success `*out` receives an entry owned by the caller. On any other
/// outcome `*out` is set to null.
///
/// # Safety
///
/// `backend` must be null or point to a live descriptor. `name` must be null
/// or a NUL-terminated string. `out` must be null or writable.
pub unsafe extern "C" fn get(
    backend: *mut RawConfigBackend,
    name: *const c_char,
    out: *mut *mut RawConfigEntry,
) -> c_int {
    if !out.is_null() {
        *out = ptr::null_mut();
    }
    dispatch("get", backend, |instance| {
        if out.is_null() {
            return Err(BackendError::invalid_argument("null entry out-pointer"));
        }
        let name = decode("config name", name)?;
        log::trace!("config backend get {}", name);
        let entry = instance.get(&name)?;
        *out = into_native_entry(entry)?;
        Ok(())
    })
}

/// `set` slot. A null `value` asks the backend to delete `name`.
///
/// # Safety
///
/// `backend` must be null or point to a live descriptor. `name` and `value`
/// must each be null or a NUL-terminated string.
pub unsafe extern "C" fn set(
    backend: *mut RawConfigBackend,
    name: *const c_char,
    value: *const c_char,
) -> c_int {
    dispatch("set", backend, |instance| {
        let name = decode("config name", name)?;
        let value = if value.is_null() {
            None
        } else {
            Some(CStr::from_ptr(value).to_string_lossy())
        };
        log::trace!("config backend set {} (delete: {})", name, value.is_none());
        instance.set(&name, value.as_deref())
    })
}

/// `del` slot, forwarded to the backend as a `set` with no value.
///
/// # Safety
///
/// `backend` must be null or point to a live descriptor. `name` must be null
/// or a NUL-terminated string.
pub unsafe extern "C" fn del(backend: *mut RawConfigBackend, name: *const c_char) -> c_int {
    dispatch("del", backend, |instance| {
        let name = decode("config name", name)?;
        log::trace!("config backend del {}", name);
        instance.set(&name, None)
    })
}

/// `snapshot` slot.
///
/// The backend returns a plain instance; the shim binds it and hands the
/// new descriptor to the caller through `out`.
///
/// # Safety
///
/// `out` must be null or writable. `backend` must be null or point to a
/// live descriptor.
pub unsafe extern "C" fn snapshot(
    out: *mut *mut RawConfigBackend,
    backend: *mut RawConfigBackend,
) -> c_int {
    if !out.is_null() {
        *out = ptr::null_mut();
    }
    dispatch("snapshot", backend, |instance| {
        if out.is_null() {
            return Err(BackendError::invalid_argument("null snapshot out-pointer"));
        }
        let view: Arc<dyn ConfigBackend> = Arc::from(instance.snapshot()?);
        let bound = BoundBackend::bind(view)?;
        log::debug!("config backend snapshot bound as {}", bound.token());
        *out = bound.into_raw();
        Ok(())
    })
}

/// `free` slot. Tears the descriptor down.
///
/// Releases the handle token, then the descriptor memory, then runs the
/// backend's disposal hook if it has one. A null `backend` is a no-op.
///
/// # Safety
///
/// `backend` must be null or a descriptor that has not been freed yet.
/// No slot of this descriptor may be called afterwards.
pub unsafe extern "C" fn free(backend: *mut RawConfigBackend) {
    if backend.is_null() {
        return;
    }

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        let descriptor = Box::from_raw(backend as *mut BackendDescriptor);
        let token = descriptor.handle();
        let instance = handles::release(token);
        drop(descriptor);

        match instance {
            Some(instance) => {
                log::debug!("config backend {} freed", token);
                if let Some(hook) = instance.as_dispose() {
                    hook.dispose();
                }
            }
            None => log::warn!("config backend {} freed without a live handle", token),
        }
    }));

    if let Err(payload) = outcome {
        log::warn!(
            "config backend free panicked: {}",
            panic_message(payload.as_ref())
        );
    }
}
