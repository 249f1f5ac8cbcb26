//! Binding backends to descriptors and handing them to the native core.
//!
//! A backend starts out as a plain Rust value. [`BoundBackend::bind`] gives
//! it a descriptor and a handle token; [`register`] passes the descriptor to
//! a native config object, which from then on owns it and tears it down by
//! calling the `free` slot.

use std::ptr::NonNull;
use std::sync::Arc;

use git_config_abi::{ConfigLevel, RawConfigBackend};

use crate::backend::ConfigBackend;
use crate::config::BridgeConfig;
use crate::descriptor::{self, BackendDescriptor};
use crate::error::{BridgeError, BridgeResult};
use crate::handles::{self, HandleToken};
use crate::native::{self, NativeConfig};
use crate::shims;

/// A backend with an allocated descriptor.
///
/// Until [`into_raw`](Self::into_raw) transfers the descriptor to the native
/// core, this value owns it and frees it on drop.
#[derive(Debug)]
pub struct BoundBackend {
    ptr: Option<NonNull<RawConfigBackend>>,
    token: HandleToken,
}

// Safety: the descriptor is only reached through the handle table, which is
// thread-safe, and backends are Send + Sync
unsafe impl Send for BoundBackend {}

impl BoundBackend {
    /// Allocates a descriptor for `backend`.
    ///
    /// Issues a fresh handle token, wires every supported shim and moves the
    /// finished descriptor into a single heap allocation whose address never
    /// changes. No backend method is called.
    pub fn bind(backend: Arc<dyn ConfigBackend>) -> BridgeResult<Self> {
        descriptor::verify_layout()?;

        let token = handles::issue(backend);
        let descriptor = Box::new(BackendDescriptor::new(token));
        let ptr = NonNull::from(Box::leak(descriptor)).cast::<RawConfigBackend>();
        log::debug!("config backend {} bound at {:p}", token, ptr);

        Ok(Self {
            ptr: Some(ptr),
            token,
        })
    }

    /// Returns the handle token issued for this backend.
    pub fn token(&self) -> HandleToken {
        self.token
    }

    /// Returns the native pointer, or null once freed.
    pub fn as_ptr(&self) -> *mut RawConfigBackend {
        self.ptr.map_or(std::ptr::null_mut(), NonNull::as_ptr)
    }

    /// Returns true while the descriptor is allocated and owned here.
    pub fn is_bound(&self) -> bool {
        self.ptr.is_some()
    }

    /// Gives up ownership of the descriptor.
    ///
    /// The receiver must eventually call the descriptor's `free` slot.
    pub fn into_raw(mut self) -> *mut RawConfigBackend {
        self.ptr
            .take()
            .map_or(std::ptr::null_mut(), NonNull::as_ptr)
    }

    /// Frees the descriptor through its own `free` slot.
    ///
    /// Calling this again, or after [`into_raw`](Self::into_raw), does nothing.
    pub fn free(&mut self) {
        if let Some(ptr) = self.ptr.take() {
            // Safety: ptr came from bind and has not been freed or given away
            unsafe { shims::free(ptr.as_ptr()) };
        }
    }
}

impl Drop for BoundBackend {
    fn drop(&mut self) {
        self.free();
    }
}

/// Binds `backend` and installs it in `config` at `level`.
///
/// The native status is surfaced unchanged on failure, in which case the
/// descriptor is freed here since the native core did not take it.
pub fn register<C>(
    config: &mut C,
    backend: Arc<dyn ConfigBackend>,
    level: ConfigLevel,
    force: bool,
) -> BridgeResult<HandleToken>
where
    C: NativeConfig + ?Sized,
{
    let mut bound = BoundBackend::bind(backend)?;
    let token = bound.token();

    // Safety: the descriptor was just bound and is not installed anywhere
    let status = unsafe { config.add_backend(bound.as_ptr(), level, force) };
    if status != 0 {
        let message = native::last_message_or_default();
        log::warn!(
            "config backend {} rejected at {} (status {}): {}",
            token,
            level,
            status,
            message
        );
        bound.free();
        return Err(BridgeError::Registration { status, message });
    }

    let _ = bound.into_raw();
    log::debug!("config backend {} registered at {}", token, level);
    Ok(token)
}

/// Like [`register`], with level and force taken from `settings`.
pub fn register_with_config<C>(
    config: &mut C,
    backend: Arc<dyn ConfigBackend>,
    settings: &BridgeConfig,
) -> BridgeResult<HandleToken>
where
    C: NativeConfig + ?Sized,
{
    let level = settings.level()?;
    register(config, backend, level, settings.force)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendResult, ConfigEntry, Dispose};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Disposable {
        disposed: Arc<AtomicUsize>,
    }

    impl ConfigBackend for Disposable {
        fn open(&self, _level: ConfigLevel) -> BackendResult<()> {
            Ok(())
        }

        fn get(&self, name: &str) -> BackendResult<ConfigEntry> {
            Err(crate::backend::BackendError::not_found(name))
        }

        fn set(&self, _name: &str, _value: Option<&str>) -> BackendResult<()> {
            Ok(())
        }

        fn snapshot(&self) -> BackendResult<Box<dyn ConfigBackend>> {
            Ok(Box::new(Disposable {
                disposed: Arc::clone(&self.disposed),
            }))
        }

        fn as_dispose(&self) -> Option<&dyn Dispose> {
            Some(self)
        }
    }

    impl Dispose for Disposable {
        fn dispose(&self) {
            self.disposed.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_bind_then_free_releases_token() {
        let disposed = Arc::new(AtomicUsize::new(0));
        let mut bound = BoundBackend::bind(Arc::new(Disposable {
            disposed: Arc::clone(&disposed),
        }))
        .unwrap();
        let token = bound.token();
        assert!(bound.is_bound());
        assert!(handles::is_live(token));

        bound.free();
        assert!(!bound.is_bound());
        assert!(bound.as_ptr().is_null());
        assert!(!handles::is_live(token));
        assert_eq!(disposed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_free_twice_disposes_once() {
        let disposed = Arc::new(AtomicUsize::new(0));
        let mut bound = BoundBackend::bind(Arc::new(Disposable {
            disposed: Arc::clone(&disposed),
        }))
        .unwrap();

        bound.free();
        bound.free();
        drop(bound);
        assert_eq!(disposed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drop_frees() {
        let disposed = Arc::new(AtomicUsize::new(0));
        let bound = BoundBackend::bind(Arc::new(Disposable {
            disposed: Arc::clone(&disposed),
        }))
        .unwrap();
        let token = bound.token();

        drop(bound);
        assert!(!handles::is_live(token));
        assert_eq!(disposed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_into_raw_transfers_ownership() {
        let disposed = Arc::new(AtomicUsize::new(0));
        let bound = BoundBackend::bind(Arc::new(Disposable {
            disposed: Arc::clone(&disposed),
        }))
        .unwrap();
        let token = bound.token();

        let raw = bound.into_raw();
        assert!(!raw.is_null());
        assert!(handles::is_live(token));
        assert_eq!(disposed.load(Ordering::SeqCst), 0);

        unsafe { shims::free(raw) };
        assert!(!handles::is_live(token));
        assert_eq!(disposed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_same_backend_bound_twice() {
        let backend: Arc<dyn ConfigBackend> = Arc::new(Disposable {
            disposed: Arc::new(AtomicUsize::new(0)),
        });
        let first = BoundBackend::bind(Arc::clone(&backend)).unwrap();
        let second = BoundBackend::bind(backend).unwrap();
        assert_ne!(first.token(), second.token());
        assert_ne!(first.as_ptr(), second.as_ptr());
    }
}
