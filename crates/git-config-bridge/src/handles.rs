//! Process-wide handle table.
//!
//! Maps opaque tokens to live backend instances. A token is the only thing
//! a descriptor carries to find its backend again, so a raw pointer held by
//! the native core never refers to Rust memory directly.
//!
//! Tokens are issued from a monotonically increasing counter and are never
//! reused: a released token always fails to resolve instead of silently
//! resolving to a newer backend.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::Lazy;

use crate::backend::ConfigBackend;

/// Opaque identifier of a bound backend instance.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandleToken(u64);

impl HandleToken {
    /// The token no backend is ever issued.
    pub const NULL: HandleToken = HandleToken(0);

    /// Wraps a raw token value.
    pub const fn from_raw(raw: u64) -> Self {
        HandleToken(raw)
    }

    /// Returns the raw token value.
    pub const fn raw(self) -> u64 {
        self.0
    }

    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for HandleToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);

static TABLE: Lazy<DashMap<HandleToken, Arc<dyn ConfigBackend>>> = Lazy::new(DashMap::new);

/// Stores `backend` and returns a fresh token for it.
pub fn issue(backend: Arc<dyn ConfigBackend>) -> HandleToken {
    let token = HandleToken(NEXT_TOKEN.fetch_add(1, Ordering::Relaxed));
    TABLE.insert(token, backend);
    token
}

/// Returns the backend for `token`, if it is still live.
pub fn resolve(token: HandleToken) -> Option<Arc<dyn ConfigBackend>> {
    if token.is_null() {
        return None;
    }
    TABLE.get(&token).map(|entry| Arc::clone(entry.value()))
}

/// Removes `token` from the table.
///
/// Only the first call for a given token returns the backend; every later
/// call returns `None`.
pub fn release(token: HandleToken) -> Option<Arc<dyn ConfigBackend>> {
    TABLE.remove(&token).map(|(_, backend)| backend)
}

/// Returns true if `token` currently resolves.
pub fn is_live(token: HandleToken) -> bool {
    !token.is_null() && TABLE.contains_key(&token)
}
