//! `#[repr(C)]` mirrors of the native config backend structures.
//!
//! The field order, widths and padding of every struct in this module must
//! match the native definitions exactly. The native core dereferences these
//! structs directly, so a mismatch is memory corruption rather than an error.

use std::ffi::{c_char, c_int, c_uint, c_void};
use std::fmt;
use std::mem::size_of;
use std::str::FromStr;

/// ABI revision of [`RawConfigBackend`] this crate is built against.
pub const GIT_CONFIG_BACKEND_VERSION: c_uint = 1;

/// Published size of the native `git_config_backend` struct.
///
/// Two 32-bit fields (`version`, `readonly`) followed by twelve
/// pointer-width fields (`cfg` and the eleven callback slots).
pub const GIT_CONFIG_BACKEND_SIZE: usize = 2 * size_of::<u32>() + 12 * size_of::<usize>();

/// Opaque native config object that owns a backend chain.
#[repr(C)]
pub struct GitConfig {
    _private: [u8; 0],
}

/// Opaque native repository handle.
#[repr(C)]
pub struct GitRepository {
    _private: [u8; 0],
}

/// Opaque native config iterator.
#[repr(C)]
pub struct GitConfigIterator {
    _private: [u8; 0],
}

pub type OpenFn = unsafe extern "C" fn(
    backend: *mut RawConfigBackend,
    level: c_int,
    repo: *const GitRepository,
) -> c_int;
pub type GetFn = unsafe extern "C" fn(
    backend: *mut RawConfigBackend,
    name: *const c_char,
    out: *mut *mut RawConfigEntry,
) -> c_int;
pub type SetFn = unsafe extern "C" fn(
    backend: *mut RawConfigBackend,
    name: *const c_char,
    value: *const c_char,
) -> c_int;
pub type SetMultivarFn = unsafe extern "C" fn(
    backend: *mut RawConfigBackend,
    name: *const c_char,
    regexp: *const c_char,
    value: *const c_char,
) -> c_int;
pub type DelFn = unsafe extern "C" fn(backend: *mut RawConfigBackend, name: *const c_char) -> c_int;
pub type DelMultivarFn = unsafe extern "C" fn(
    backend: *mut RawConfigBackend,
    name: *const c_char,
    regexp: *const c_char,
) -> c_int;
pub type IteratorFn = unsafe extern "C" fn(
    out: *mut *mut GitConfigIterator,
    backend: *mut RawConfigBackend,
) -> c_int;
pub type SnapshotFn = unsafe extern "C" fn(
    out: *mut *mut RawConfigBackend,
    backend: *mut RawConfigBackend,
) -> c_int;
pub type LockFn = unsafe extern "C" fn(backend: *mut RawConfigBackend) -> c_int;
pub type UnlockFn = unsafe extern "C" fn(backend: *mut RawConfigBackend, success: c_int) -> c_int;
pub type FreeFn = unsafe extern "C" fn(backend: *mut RawConfigBackend);
pub type EntryFreeFn = unsafe extern "C" fn(entry: *mut RawConfigEntry);

/// C-compatible representation of `git_config_backend`.
///
/// `readonly` and `cfg` belong to the native core: it writes them after the
/// backend is added to a config object. A `None` slot tells the native core
/// the operation is unsupported.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RawConfigBackend {
    pub version: c_uint,
    pub readonly: c_int,
    pub cfg: *mut GitConfig,
    pub open: Option<OpenFn>,
    pub get: Option<GetFn>,
    pub set: Option<SetFn>,
    pub set_multivar: Option<SetMultivarFn>,
    pub del: Option<DelFn>,
    pub del_multivar: Option<DelMultivarFn>,
    pub iterator: Option<IteratorFn>,
    pub snapshot: Option<SnapshotFn>,
    pub lock: Option<LockFn>,
    pub unlock: Option<UnlockFn>,
    pub free: Option<FreeFn>,
}

const _: () = assert!(size_of::<RawConfigBackend>() == GIT_CONFIG_BACKEND_SIZE);

impl RawConfigBackend {
    /// Returns a table of the current version with every slot unsupported.
    pub const fn empty() -> Self {
        Self {
            version: GIT_CONFIG_BACKEND_VERSION,
            readonly: 0,
            cfg: std::ptr::null_mut(),
            open: None,
            get: None,
            set: None,
            set_multivar: None,
            del: None,
            del_multivar: None,
            iterator: None,
            snapshot: None,
            lock: None,
            unlock: None,
            free: None,
        }
    }
}

impl Default for RawConfigBackend {
    fn default() -> Self {
        Self::empty()
    }
}

/// C-compatible representation of `git_config_entry`.
///
/// The allocation is owned by whoever receives it from a `get` callback.
/// It is released by calling its own `free` slot with the entry pointer.
#[repr(C)]
#[derive(Debug)]
pub struct RawConfigEntry {
    pub name: *const c_char,
    pub value: *const c_char,
    pub include_depth: c_uint,
    pub level: c_int,
    pub free: Option<EntryFreeFn>,
    pub payload: *mut c_void,
}

/// Priority level of a config backend.
///
/// Higher levels take precedence when the native core looks a name up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigLevel {
    ProgramData,
    System,
    Xdg,
    Global,
    Local,
    App,
    Highest,
    /// A tag this crate has no name for, kept verbatim.
    Other(c_int),
}

impl ConfigLevel {
    /// Decodes a raw level tag; unknown tags are preserved, never rejected.
    pub fn from_raw(level: c_int) -> Self {
        match level {
            1 => ConfigLevel::ProgramData,
            2 => ConfigLevel::System,
            3 => ConfigLevel::Xdg,
            4 => ConfigLevel::Global,
            5 => ConfigLevel::Local,
            6 => ConfigLevel::App,
            -1 => ConfigLevel::Highest,
            other => ConfigLevel::Other(other),
        }
    }

    /// Returns the raw level tag.
    pub fn raw(self) -> c_int {
        match self {
            ConfigLevel::ProgramData => 1,
            ConfigLevel::System => 2,
            ConfigLevel::Xdg => 3,
            ConfigLevel::Global => 4,
            ConfigLevel::Local => 5,
            ConfigLevel::App => 6,
            ConfigLevel::Highest => -1,
            ConfigLevel::Other(raw) => raw,
        }
    }
}

impl fmt::Display for ConfigLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigLevel::ProgramData => write!(f, "programdata"),
            ConfigLevel::System => write!(f, "system"),
            ConfigLevel::Xdg => write!(f, "xdg"),
            ConfigLevel::Global => write!(f, "global"),
            ConfigLevel::Local => write!(f, "local"),
            ConfigLevel::App => write!(f, "app"),
            ConfigLevel::Highest => write!(f, "highest"),
            ConfigLevel::Other(raw) => write!(f, "level({})", raw),
        }
    }
}

/// Error returned when parsing a level name fails.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown config level: {0}")]
pub struct ParseLevelError(pub String);

impl FromStr for ConfigLevel {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "programdata" => Ok(ConfigLevel::ProgramData),
            "system" => Ok(ConfigLevel::System),
            "xdg" => Ok(ConfigLevel::Xdg),
            "global" => Ok(ConfigLevel::Global),
            "local" => Ok(ConfigLevel::Local),
            "app" => Ok(ConfigLevel::App),
            "highest" => Ok(ConfigLevel::Highest),
            _ => Err(ParseLevelError(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::mem::offset_of;

    #[test]
    fn test_backend_size_matches_published() {
        assert_eq!(size_of::<RawConfigBackend>(), GIT_CONFIG_BACKEND_SIZE);
    }

    #[test]
    fn test_slot_order() {
        let ptr = size_of::<usize>();
        assert_eq!(offset_of!(RawConfigBackend, version), 0);
        assert_eq!(offset_of!(RawConfigBackend, readonly), 4);
        assert_eq!(offset_of!(RawConfigBackend, cfg), 8);
        assert_eq!(offset_of!(RawConfigBackend, open), 8 + ptr);
        assert_eq!(offset_of!(RawConfigBackend, get), 8 + 2 * ptr);
        assert_eq!(offset_of!(RawConfigBackend, snapshot), 8 + 8 * ptr);
        assert_eq!(offset_of!(RawConfigBackend, free), 8 + 11 * ptr);
    }

    #[test]
    fn test_empty_table() {
        let raw = RawConfigBackend::empty();
        assert_eq!(raw.version, GIT_CONFIG_BACKEND_VERSION);
        assert!(raw.cfg.is_null());
        assert!(raw.get.is_none());
        assert!(raw.free.is_none());
    }

    #[test]
    fn test_level_from_raw() {
        assert_eq!(ConfigLevel::from_raw(5), ConfigLevel::Local);
        assert_eq!(ConfigLevel::from_raw(-1), ConfigLevel::Highest);
        assert_eq!(ConfigLevel::from_raw(42), ConfigLevel::Other(42));
        assert_eq!(ConfigLevel::Other(42).raw(), 42);
        assert_eq!(ConfigLevel::App.raw(), 6);
    }

    #[test]
    fn test_level_parse() {
        assert_eq!("Global".parse::<ConfigLevel>(), Ok(ConfigLevel::Global));
        assert_eq!("app".parse::<ConfigLevel>(), Ok(ConfigLevel::App));
        assert!("nowhere".parse::<ConfigLevel>().is_err());
        assert_eq!(ConfigLevel::Xdg.to_string(), "xdg");
    }
}
