//! Registration settings loaded from TOML.
//!
//! ```toml
//! # Level the backend is installed at (programdata, system, xdg, global,
//! # local, app)
//! level = "app"
//! # Replace a backend already installed at that level
//! force = false
//! ```

use std::fs;
use std::path::Path;

use git_config_abi::ConfigLevel;
use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, BridgeResult};

/// Settings applied by [`register_with_config`](crate::register_with_config).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BridgeConfig {
    /// Config level name
    #[serde(default = "default_level")]
    pub level: String,

    /// Replace an existing backend at the same level
    #[serde(default)]
    pub force: bool,
}

fn default_level() -> String {
    "app".to_string()
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            force: false,
        }
    }
}

impl BridgeConfig {
    /// Parses settings from a TOML document.
    pub fn from_toml_str(content: &str) -> BridgeResult<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| BridgeError::config(format!("Failed to parse TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads settings from a file, or returns defaults if it doesn't exist.
    pub fn load(path: impl AsRef<Path>) -> BridgeResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            log::debug!(
                "bridge config {} not found, using defaults",
                path.display()
            );
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Validates the settings.
    pub fn validate(&self) -> BridgeResult<()> {
        let level = self.level()?;
        if level == ConfigLevel::Highest {
            return Err(BridgeError::config(
                "level 'highest' is a lookup selector, not an installable level",
            ));
        }
        Ok(())
    }

    /// Returns the configured level.
    pub fn level(&self) -> BridgeResult<ConfigLevel> {
        self.level
            .parse()
            .map_err(|e: git_config_abi::ParseLevelError| BridgeError::config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = BridgeConfig::default();
        assert_eq!(config.level().unwrap(), ConfigLevel::App);
        assert!(!config.force);
    }

    #[test]
    fn test_parse() {
        let config = BridgeConfig::from_toml_str("level = \"global\"\nforce = true\n").unwrap();
        assert_eq!(config.level().unwrap(), ConfigLevel::Global);
        assert!(config.force);
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = BridgeConfig::from_toml_str("").unwrap();
        assert_eq!(config, BridgeConfig::default());
    }

    #[test]
    fn test_unknown_level_rejected() {
        let err = BridgeConfig::from_toml_str("level = \"planet\"").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Configuration error: unknown config level: planet"
        );
    }

    #[test]
    fn test_highest_rejected() {
        assert!(BridgeConfig::from_toml_str("level = \"highest\"").is_err());
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(BridgeConfig::from_toml_str("priority = 3").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "level = \"local\"").unwrap();

        let config = BridgeConfig::load(file.path()).unwrap();
        assert_eq!(config.level().unwrap(), ConfigLevel::Local);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = BridgeConfig::load(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, BridgeConfig::default());
    }
}
