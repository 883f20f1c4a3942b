//! Configuration management for aperture.
//!
//! Configuration is loaded from the platform config directory with sensible
//! defaults. Every section implements `Default` and is `#[serde(default)]`,
//! so a partial file only overrides what it names.

mod types;
mod validate;

pub use types::*;

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration structure for aperture.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Media storage settings
    pub storage: StorageConfig,

    /// Location capture policy
    pub location: LocationConfig,

    /// Accelerometer snapshot policy
    pub orientation: OrientationConfig,

    /// Metadata write queue settings
    pub queue: QueueConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Returns default configuration if the file doesn't exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path.
    ///
    /// Uses platform-appropriate directories:
    /// - macOS: ~/Library/Application Support/com.aperture.aperture/config.toml
    /// - Linux: ~/.config/aperture/config.toml
    /// - Windows: C:\Users\<User>\AppData\Roaming\aperture\config\config.toml
    ///
    /// Falls back to ~/.aperture/config.toml if directory detection fails.
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("com", "aperture", "aperture")
            .map(|dirs| dirs.config_dir().to_path_buf().join("config.toml"))
            .unwrap_or_else(|| {
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                PathBuf::from(home).join(".aperture").join("config.toml")
            })
    }

    /// Resolved custom storage directory (with ~ expansion), if one is configured.
    pub fn custom_storage_dir(&self) -> Option<PathBuf> {
        self.storage.custom_dir.as_ref().map(|dir| {
            let path_str = dir.to_string_lossy();
            let expanded = shellexpand::tilde(&path_str);
            PathBuf::from(expanded.into_owned())
        })
    }

    /// Serialize the config to a pretty TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}
