//! The callback table handed to the native core.
//!
//! A [`BackendDescriptor`] is the native `git_config_backend` struct with one
//! extra trailing field, the handle token. The native core only validates and
//! touches the prefix it declares, so the trailer is invisible to it. Every
//! shim receives a pointer to the prefix and recovers the token from the
//! trailer offset.
//!
//! ```text
//! +---------+----------+-----+------+-----+-----+- ... -+------+--------+
//! | version | readonly | cfg | open | get | set |       | free | handle |
//! +---------+----------+-----+------+-----+-----+- ... -+------+--------+
//! |<-------------- native prefix (GIT_CONFIG_BACKEND_SIZE) ----->| trailer|
//! ```

use std::mem::{offset_of, size_of};

use git_config_abi::{RawConfigBackend, GIT_CONFIG_BACKEND_SIZE, GIT_CONFIG_BACKEND_VERSION};
use once_cell::sync::Lazy;

use crate::error::{BridgeError, BridgeResult};
use crate::handles::HandleToken;
use crate::shims;

/// Native callback table followed by the bridge-private handle token.
#[repr(C)]
#[derive(Debug)]
pub struct BackendDescriptor {
    pub parent: RawConfigBackend,
    handle: HandleToken,
}

/// Byte offset of the handle token from the start of the descriptor.
pub const HANDLE_OFFSET: usize = offset_of!(BackendDescriptor, handle);

static LAYOUT_CHECK: Lazy<Result<(), (&'static str, usize, usize)>> = Lazy::new(check_layout);

fn check_layout() -> Result<(), (&'static str, usize, usize)> {
    let prefix = size_of::<RawConfigBackend>();
    if prefix != GIT_CONFIG_BACKEND_SIZE {
        return Err(("git_config_backend size", GIT_CONFIG_BACKEND_SIZE, prefix));
    }

    let parent = offset_of!(BackendDescriptor, parent);
    if parent != 0 {
        return Err(("native prefix offset", 0, parent));
    }

    if HANDLE_OFFSET < GIT_CONFIG_BACKEND_SIZE {
        return Err(("handle offset", GIT_CONFIG_BACKEND_SIZE, HANDLE_OFFSET));
    }

    Ok(())
}

/// Checks the descriptor layout against the published native struct size.
///
/// The check runs once per process; later calls return the cached outcome.
pub fn verify_layout() -> BridgeResult<()> {
    match *LAYOUT_CHECK {
        Ok(()) => Ok(()),
        Err((field, expected, actual)) => {
            log::error!(
                "config backend layout check failed: {} is {}, expected {}",
                field,
                actual,
                expected
            );
            Err(BridgeError::LayoutMismatch {
                field,
                expected,
                actual,
            })
        }
    }
}

impl BackendDescriptor {
    /// Builds a fully wired descriptor for `handle`.
    ///
    /// Slots the bridge cannot translate (`set_multivar`, `del_multivar`,
    /// `iterator`, `lock`, `unlock`) stay null so the native core reports
    /// them as unsupported.
    pub(crate) fn new(handle: HandleToken) -> Self {
        let parent = RawConfigBackend {
            version: GIT_CONFIG_BACKEND_VERSION,
            open: Some(shims::open),
            get: Some(shims::get),
            set: Some(shims::set),
            del: Some(shims::del),
            snapshot: Some(shims::snapshot),
            free: Some(shims::free),
            ..RawConfigBackend::empty()
        };

        Self { parent, handle }
    }

    /// Returns the handle token stored in this descriptor.
    pub fn handle(&self) -> HandleToken {
        self.handle
    }

    /// Reads the handle token behind a native backend pointer.
    ///
    /// Returns `None` for a null pointer.
    ///
    /// # Safety
    ///
    /// A non-null `backend` must point to a live `BackendDescriptor`.
    pub unsafe fn token_of(backend: *const RawConfigBackend) -> Option<HandleToken> {
        if backend.is_null() {
            return None;
        }
        let trailer = (backend as *const u8).add(HANDLE_OFFSET) as *const HandleToken;
        Some(trailer.read())
    }
}
