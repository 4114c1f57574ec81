//! Storage configuration loading and saving.
//!
//! The storage backend is chosen once, here, from `config.toml`; nothing
//! outside the store layer branches on it afterwards.

use crate::paths::TerakoyaPaths;
use std::path::Path;
use terakoya_core::config::StorageConfig;
use terakoya_core::error::Result;

/// Loads and saves the storage configuration file.
pub struct ConfigService;

impl ConfigService {
    /// Loads the configuration from the default location.
    ///
    /// A missing or unreadable file yields the default configuration; a parse
    /// failure is logged and also falls back to defaults, so a broken config
    /// file never prevents startup.
    pub fn load() -> StorageConfig {
        let Ok(path) = TerakoyaPaths::config_file() else {
            return StorageConfig::default();
        };
        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(
                    "Could not load config from {}, using defaults: {}",
                    path.display(),
                    e
                );
                StorageConfig::default()
            }
        }
    }

    /// Loads the configuration from an explicit path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed. A missing file
    /// is not an error; it yields the default configuration.
    pub fn load_from(path: &Path) -> Result<StorageConfig> {
        if !path.exists() {
            return Ok(StorageConfig::default());
        }
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Saves the configuration to the default location.
    ///
    /// # Errors
    ///
    /// Returns an error if the config directory cannot be created or the file
    /// cannot be written.
    pub fn save(config: &StorageConfig) -> Result<()> {
        let path = TerakoyaPaths::config_file()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(config)?;
        std::fs::write(&path, content)?;
        Ok(())
    }
}
