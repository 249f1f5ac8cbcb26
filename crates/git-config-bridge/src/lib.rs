//! Bridge that lets Rust config backends be driven by a native core.
//!
//! The native core only knows its own `git_config_backend` callback table.
//! This crate produces such tables for any [`ConfigBackend`] implementation,
//! so a Rust type can be installed next to the core's built-in backends.
//!
//! ```text
//! ConfigBackend impl --bind--> BackendDescriptor --add_backend--> native core
//!        ^                        (token trailer)                     |
//!        |                                                            v
//!   handle table  <--- token ---  shims::{open,get,set,del,snapshot,free}
//! ```
//!
//! # Safety
//!
//! Every pointer that crosses the boundary follows these rules:
//!
//! 1. Native callers only ever hold a pointer to a [`BackendDescriptor`]
//!    (never to the backend itself); the backend is found again through the
//!    handle token stored in the descriptor's trailer
//! 2. Descriptors live in a single heap allocation that never moves, and are
//!    freed exactly once, through their `free` slot
//! 3. Entries returned from `get` are owned by the caller, which releases
//!    them through the entry's own `free` slot
//! 4. No panic unwinds into native frames; every shim reports failures as a
//!    status code plus a native error string
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use git_config_bridge::{register, ConfigLevel, EmulatedConfig, MemoryBackend};
//!
//! let mut config = EmulatedConfig::new();
//! let backend = Arc::new(MemoryBackend::with_entries([
//!     ("core.editor".to_string(), "vim".to_string()),
//! ]));
//! register(&mut config, backend, ConfigLevel::App, false).unwrap();
//!
//! assert_eq!(config.get_string("core.editor").unwrap(), "vim");
//! ```

pub mod backend;
pub mod config;
pub mod descriptor;
pub mod emulated;
pub mod error;
pub mod handles;
pub mod memory;
pub mod native;
pub mod registration;
pub mod shims;

pub use backend::{BackendError, BackendResult, ConfigBackend, ConfigEntry, Dispose};
pub use config::BridgeConfig;
pub use descriptor::{verify_layout, BackendDescriptor};
pub use emulated::EmulatedConfig;
pub use error::{BridgeError, BridgeResult};
pub use handles::HandleToken;
pub use memory::MemoryBackend;
pub use native::{clear_native_error, last_native_error, set_native_error, NativeConfig, NativeError};
#[cfg(feature = "native-link")]
pub use native::LinkedConfig;
pub use registration::{register, register_with_config, BoundBackend};

pub use git_config_abi::{ConfigLevel, ErrorClass, ErrorCode, RawConfigBackend, RawConfigEntry};
