//! In-memory config backend.
//!
//! A complete [`ConfigBackend`] kept in a sorted map. Useful on its own for
//! application-level overrides and as a model for other implementations.

use std::collections::BTreeMap;

use git_config_abi::ConfigLevel;
use parking_lot::RwLock;

use crate::backend::{BackendError, BackendResult, ConfigBackend, ConfigEntry};

/// Config backend storing values in memory.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: RwLock<BTreeMap<String, String>>,
    level: RwLock<Option<ConfigLevel>>,
    readonly: bool,
}

impl MemoryBackend {
    /// Creates an empty, writable backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a writable backend holding `entries`.
    pub fn with_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        Self {
            entries: RwLock::new(entries.into_iter().collect()),
            ..Self::default()
        }
    }

    /// Returns the level this backend was opened at, if opened.
    pub fn level(&self) -> Option<ConfigLevel> {
        *self.level.read()
    }

    /// Returns true if writes are rejected.
    pub fn is_readonly(&self) -> bool {
        self.readonly
    }

    /// Returns the number of stored values.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if no values are stored.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl ConfigBackend for MemoryBackend {
    fn open(&self, level: ConfigLevel) -> BackendResult<()> {
        *self.level.write() = Some(level);
        Ok(())
    }

    fn get(&self, name: &str) -> BackendResult<ConfigEntry> {
        let entries = self.entries.read();
        let value = entries
            .get(name)
            .ok_or_else(|| BackendError::not_found(name))?;
        let level = self.level().unwrap_or(ConfigLevel::App);
        Ok(ConfigEntry::new(name, value.as_str(), level))
    }

    fn set(&self, name: &str, value: Option<&str>) -> BackendResult<()> {
        if self.readonly {
            return Err(BackendError::ReadOnly);
        }

        let mut entries = self.entries.write();
        match value {
            Some(value) => {
                entries.insert(name.to_string(), value.to_string());
                Ok(())
            }
            None => entries
                .remove(name)
                .map(|_| ())
                .ok_or_else(|| BackendError::not_found(name)),
        }
    }

    fn snapshot(&self) -> BackendResult<Box<dyn ConfigBackend>> {
        Ok(Box::new(MemoryBackend {
            entries: RwLock::new(self.entries.read().clone()),
            level: RwLock::new(self.level()),
            readonly: true,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_set_get_delete() {
        let backend = MemoryBackend::new();
        backend.open(ConfigLevel::Local).unwrap();

        backend.set("user.name", Some("Ada")).unwrap();
        let entry = backend.get("user.name").unwrap();
        assert_eq!(entry, ConfigEntry::new("user.name", "Ada", ConfigLevel::Local));

        backend.set("user.name", None).unwrap();
        assert!(matches!(
            backend.get("user.name"),
            Err(BackendError::NotFound { .. })
        ));
    }

    #[test]
    fn test_delete_missing_is_not_found() {
        let backend = MemoryBackend::new();
        assert!(matches!(
            backend.set("core.editor", None),
            Err(BackendError::NotFound { .. })
        ));
    }

    #[test]
    fn test_empty_value_is_kept() {
        let backend = MemoryBackend::new();
        backend.set("core.editor", Some("")).unwrap();
        assert_eq!(backend.get("core.editor").unwrap().value, "");
        assert_eq!(backend.len(), 1);
    }

    #[test]
    fn test_snapshot_is_frozen_and_readonly() {
        let backend = MemoryBackend::with_entries([("a.b".to_string(), "1".to_string())]);
        backend.open(ConfigLevel::Global).unwrap();
        let view = backend.snapshot().unwrap();

        backend.set("a.b", Some("2")).unwrap();
        assert_eq!(view.get("a.b").unwrap().value, "1");
        assert_eq!(view.get("a.b").unwrap().level, ConfigLevel::Global);
        assert!(matches!(
            view.set("a.b", Some("3")),
            Err(BackendError::ReadOnly)
        ));
    }
}
