//! C ABI definitions for pluggable config backends.
//!
//! This crate mirrors the native `git_config_backend` and
//! `git_config_entry` structs, the native status codes and the error
//! classes that go with them. It contains no behavior beyond conversions
//! between raw values and their named forms.
//!
//! - [`types`]: `#[repr(C)]` structs, callback signatures and config levels
//! - [`error`]: status codes and error classes
//!
//! # Example
//!
//! ```
//! use git_config_abi::{ConfigLevel, ErrorCode, RawConfigBackend};
//!
//! let table = RawConfigBackend::empty();
//! assert!(table.get.is_none());
//! assert_eq!(ConfigLevel::from_raw(4), ConfigLevel::Global);
//! assert_eq!(ErrorCode::NotFound.raw(), -3);
//! ```

pub mod error;
pub mod types;

pub use error::{ErrorClass, ErrorCode, StatusError, StatusExt};
pub use types::{
    ConfigLevel, DelFn, DelMultivarFn, EntryFreeFn, FreeFn, GetFn, GitConfig,
    GitConfigIterator, GitRepository, IteratorFn, LockFn, OpenFn, ParseLevelError,
    RawConfigBackend, RawConfigEntry, SetFn, SetMultivarFn, SnapshotFn, UnlockFn,
    GIT_CONFIG_BACKEND_SIZE, GIT_CONFIG_BACKEND_VERSION,
};
