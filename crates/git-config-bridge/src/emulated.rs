//! In-process stand-in for the native config object.
//!
//! [`EmulatedConfig`] drives installed backends exactly the way the native
//! core does: only through the slots of their callback tables, with raw
//! pointers, NUL-terminated strings and integer statuses. It owns every
//! backend it accepts and frees them through their `free` slot on drop.
//!
//! Lookups walk backends from the highest level down and stop at the first
//! one that has the name. Writes go to the highest-level backend that has
//! the corresponding slot.

use std::ffi::{c_int, CStr, CString};
use std::ptr::{self, NonNull};

use git_config_abi::{
    ConfigLevel, ErrorClass, ErrorCode, RawConfigBackend, RawConfigEntry, StatusError,
    GIT_CONFIG_BACKEND_VERSION,
};

use crate::backend::ConfigEntry;
use crate::native::{set_native_error, NativeConfig};

struct Installed {
    level: ConfigLevel,
    backend: NonNull<RawConfigBackend>,
}

/// A config object that owns a chain of backends, ordered by level.
#[derive(Default)]
pub struct EmulatedConfig {
    backends: Vec<Installed>,
}

fn fail(status: c_int, class: ErrorClass, message: &str) -> StatusError {
    set_native_error(class, message);
    StatusError { status }
}

fn c_name(name: &str) -> Result<CString, StatusError> {
    CString::new(name).map_err(|_| {
        fail(
            ErrorCode::Invalid.raw(),
            ErrorClass::Invalid,
            "config name contains NUL",
        )
    })
}

impl EmulatedConfig {
    /// Creates a config object with no backends.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of installed backends.
    pub fn len(&self) -> usize {
        self.backends.len()
    }

    /// Returns true if no backend is installed.
    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    /// Returns the installed levels, highest first.
    pub fn levels(&self) -> Vec<ConfigLevel> {
        self.backends.iter().map(|installed| installed.level).collect()
    }

    /// Looks `name` up across all backends.
    pub fn get_entry(&self, name: &str) -> Result<ConfigEntry, StatusError> {
        let c_name = c_name(name)?;

        for installed in &self.backends {
            let raw = installed.backend.as_ptr();
            // Safety: installed backends stay live until drop
            let Some(get) = (unsafe { (*raw).get }) else {
                continue;
            };

            let mut out: *mut RawConfigEntry = ptr::null_mut();
            let status = unsafe { get(raw, c_name.as_ptr(), &mut out) };
            if status == ErrorCode::NotFound.raw() {
                continue;
            }
            if status != 0 {
                return Err(StatusError { status });
            }
            if out.is_null() {
                return Err(fail(
                    ErrorCode::GenericError.raw(),
                    ErrorClass::Config,
                    "config backend returned success without an entry",
                ));
            }

            // Safety: a successful get hands over a live entry we now own
            let entry = unsafe { take_entry(out) };
            return Ok(entry);
        }

        Err(fail(
            ErrorCode::NotFound.raw(),
            ErrorClass::Config,
            &format!("config value '{}' was not found", name),
        ))
    }

    /// Returns the value of `name`.
    pub fn get_string(&self, name: &str) -> Result<String, StatusError> {
        self.get_entry(name).map(|entry| entry.value)
    }

    /// Writes `name` to the highest-level backend that accepts writes.
    pub fn set(&self, name: &str, value: &str) -> Result<(), StatusError> {
        let c_name = c_name(name)?;
        let c_value = CString::new(value).map_err(|_| {
            fail(
                ErrorCode::Invalid.raw(),
                ErrorClass::Invalid,
                "config value contains NUL",
            )
        })?;

        let (raw, set) = self.writer(name, |raw| unsafe { (*raw).set })?;
        // Safety: raw is installed and live; strings outlive the call
        let status = unsafe { set(raw, c_name.as_ptr(), c_value.as_ptr()) };
        if status != 0 {
            return Err(StatusError { status });
        }
        Ok(())
    }

    /// Deletes `name` from the highest-level backend that accepts deletes.
    pub fn delete(&self, name: &str) -> Result<(), StatusError> {
        let c_name = c_name(name)?;
        let (raw, del) = self.writer(name, |raw| unsafe { (*raw).del })?;
        // Safety: raw is installed and live
        let status = unsafe { del(raw, c_name.as_ptr()) };
        if status != 0 {
            return Err(StatusError { status });
        }
        Ok(())
    }

    /// Takes a read-only snapshot of every backend.
    ///
    /// The returned config object is independent of this one: dropping
    /// either leaves the other usable.
    pub fn snapshot(&self) -> Result<EmulatedConfig, StatusError> {
        let mut snapshot = EmulatedConfig::new();

        for installed in &self.backends {
            let raw = installed.backend.as_ptr();
            // Safety: installed backends stay live until drop
            let Some(take) = (unsafe { (*raw).snapshot }) else {
                return Err(fail(
                    ErrorCode::GenericError.raw(),
                    ErrorClass::Config,
                    "config backend does not support snapshots",
                ));
            };

            let mut out: *mut RawConfigBackend = ptr::null_mut();
            let status = unsafe { take(&mut out, raw) };
            if status != 0 {
                return Err(StatusError { status });
            }
            if out.is_null() {
                return Err(fail(
                    ErrorCode::GenericError.raw(),
                    ErrorClass::Config,
                    "config backend returned success without a snapshot",
                ));
            }

            // Safety: out is a fresh backend that nothing else owns
            let status = unsafe { snapshot.add_backend(out, installed.level, false) };
            if status != 0 {
                unsafe { free_backend(out) };
                return Err(StatusError { status });
            }
        }

        Ok(snapshot)
    }

    fn writer<T>(
        &self,
        name: &str,
        slot: impl Fn(*mut RawConfigBackend) -> Option<T>,
    ) -> Result<(*mut RawConfigBackend, T), StatusError> {
        if self.backends.is_empty() {
            return Err(fail(
                ErrorCode::GenericError.raw(),
                ErrorClass::Config,
                &format!("cannot write '{}': the configuration has no backends", name),
            ));
        }

        self.backends
            .iter()
            .map(|installed| installed.backend.as_ptr())
            .find_map(|raw| slot(raw).map(|callback| (raw, callback)))
            .ok_or_else(|| {
                fail(
                    ErrorCode::GenericError.raw(),
                    ErrorClass::Config,
                    &format!("cannot write '{}': no backend accepts writes", name),
                )
            })
    }
}

/// Copies an entry out and releases it through its own `free` slot.
unsafe fn take_entry(entry: *mut RawConfigEntry) -> ConfigEntry {
    let raw = &*entry;
    let text = |ptr: *const std::ffi::c_char| {
        if ptr.is_null() {
            String::new()
        } else {
            CStr::from_ptr(ptr).to_string_lossy().into_owned()
        }
    };

    let copied = ConfigEntry {
        name: text(raw.name),
        value: text(raw.value),
        level: ConfigLevel::from_raw(raw.level),
        include_depth: raw.include_depth,
    };

    if let Some(free) = raw.free {
        free(entry);
    }
    copied
}

unsafe fn free_backend(backend: *mut RawConfigBackend) {
    if let Some(free) = (*backend).free {
        free(backend);
    }
}

impl NativeConfig for EmulatedConfig {
    unsafe fn add_backend(
        &mut self,
        backend: *mut RawConfigBackend,
        level: ConfigLevel,
        force: bool,
    ) -> c_int {
        let Some(backend) = NonNull::new(backend) else {
            return fail(
                ErrorCode::GenericError.raw(),
                ErrorClass::Invalid,
                "null config backend",
            )
            .status;
        };
        let raw = backend.as_ptr();

        if (*raw).version != GIT_CONFIG_BACKEND_VERSION {
            return fail(
                ErrorCode::GenericError.raw(),
                ErrorClass::Invalid,
                &format!("invalid version {} on git_config_backend", (*raw).version),
            )
            .status;
        }

        if let Some(open) = (*raw).open {
            let status = open(raw, level.raw(), ptr::null());
            if status < 0 {
                return status;
            }
        }

        if let Some(index) = self.backends.iter().position(|b| b.level == level) {
            if !force {
                return fail(
                    ErrorCode::Exists.raw(),
                    ErrorClass::Config,
                    &format!("there already is a configuration with level {}", level.raw()),
                )
                .status;
            }
            let replaced = self.backends.remove(index);
            free_backend(replaced.backend.as_ptr());
        }

        let position = self
            .backends
            .iter()
            .position(|b| b.level.raw() < level.raw())
            .unwrap_or(self.backends.len());
        self.backends.insert(position, Installed { level, backend });
        0
    }
}

impl Drop for EmulatedConfig {
    fn drop(&mut self) {
        for installed in self.backends.drain(..) {
            // Safety: each installed backend is owned here and freed once
            unsafe { free_backend(installed.backend.as_ptr()) };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryBackend;
    use crate::registration::register;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn memory(entries: &[(&str, &str)]) -> Arc<MemoryBackend> {
        Arc::new(MemoryBackend::with_entries(
            entries.iter().map(|(k, v)| (k.to_string(), v.to_string())),
        ))
    }

    #[test]
    fn test_levels_ordered_highest_first() {
        let mut config = EmulatedConfig::new();
        register(&mut config, memory(&[]), ConfigLevel::Global, false).unwrap();
        register(&mut config, memory(&[]), ConfigLevel::App, false).unwrap();
        register(&mut config, memory(&[]), ConfigLevel::System, false).unwrap();

        assert_eq!(
            config.levels(),
            vec![ConfigLevel::App, ConfigLevel::Global, ConfigLevel::System]
        );
    }

    #[test]
    fn test_higher_level_wins() {
        let mut config = EmulatedConfig::new();
        register(&mut config, memory(&[("user.name", "global")]), ConfigLevel::Global, false)
            .unwrap();
        register(&mut config, memory(&[("user.name", "local")]), ConfigLevel::Local, false)
            .unwrap();

        let entry = config.get_entry("user.name").unwrap();
        assert_eq!(entry.value, "local");
        assert_eq!(entry.level, ConfigLevel::Local);
    }

    #[test]
    fn test_lookup_falls_through() {
        let mut config = EmulatedConfig::new();
        register(&mut config, memory(&[("core.pager", "less")]), ConfigLevel::System, false)
            .unwrap();
        register(&mut config, memory(&[]), ConfigLevel::Local, false).unwrap();

        assert_eq!(config.get_string("core.pager").unwrap(), "less");
    }

    #[test]
    fn test_duplicate_level_rejected_without_force() {
        let mut config = EmulatedConfig::new();
        register(&mut config, memory(&[]), ConfigLevel::Local, false).unwrap();

        let err = register(&mut config, memory(&[]), ConfigLevel::Local, false).unwrap_err();
        assert_eq!(err.status(), Some(ErrorCode::Exists.raw()));
        assert_eq!(config.len(), 1);
    }

    #[test]
    fn test_force_replaces_level() {
        let mut config = EmulatedConfig::new();
        register(&mut config, memory(&[("a.b", "old")]), ConfigLevel::Local, false).unwrap();
        register(&mut config, memory(&[("a.b", "new")]), ConfigLevel::Local, true).unwrap();

        assert_eq!(config.len(), 1);
        assert_eq!(config.get_string("a.b").unwrap(), "new");
    }

    #[test]
    fn test_write_without_backends() {
        let config = EmulatedConfig::new();
        let err = config.set("a.b", "c").unwrap_err();
        assert_eq!(err.status, ErrorCode::GenericError.raw());
    }

    #[test]
    fn test_rejects_wrong_version() {
        let mut config = EmulatedConfig::new();
        let mut raw = RawConfigBackend {
            version: 99,
            ..RawConfigBackend::empty()
        };
        let status = unsafe { config.add_backend(&mut raw, ConfigLevel::Local, false) };
        assert_eq!(status, ErrorCode::GenericError.raw());
        assert!(config.is_empty());
    }
}
