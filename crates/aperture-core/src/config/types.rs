//! Sub-configuration structs with their defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Media storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Overrides the default storage root when set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_dir: Option<PathBuf>,

    /// Subdirectory created under the user's documents area
    pub folder_name: String,

    /// Subdirectory (relative to the storage root) holding thumbnails
    pub thumbnail_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            custom_dir: None,
            folder_name: "Aperture".to_string(),
            thumbnail_dir: ".thumbnails".to_string(),
        }
    }
}

/// Location capture policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationConfig {
    /// When false, snapshots never carry location regardless of cache state
    pub enabled: bool,

    /// Maximum age of a cached fix before a fresh read is attempted
    pub freshness_window_secs: u64,

    /// Movement (meters) beyond which the cached fix is no longer reused
    pub distance_threshold_m: f64,

    /// Upper bound on waiting for a fresh fix during capture
    pub fresh_read_timeout_ms: u64,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            freshness_window_secs: 30,
            distance_threshold_m: 10.0,
            fresh_read_timeout_ms: 5000,
        }
    }
}

impl LocationConfig {
    pub fn freshness_window(&self) -> Duration {
        Duration::from_secs(self.freshness_window_secs)
    }

    pub fn fresh_read_timeout(&self) -> Duration {
        Duration::from_millis(self.fresh_read_timeout_ms)
    }
}

/// Accelerometer snapshot policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrientationConfig {
    /// Readings older than this are not attached to a snapshot
    pub max_age_ms: u64,
}

impl Default for OrientationConfig {
    fn default() -> Self {
        Self { max_age_ms: 1000 }
    }
}

impl OrientationConfig {
    pub fn max_age(&self) -> Duration {
        Duration::from_millis(self.max_age_ms)
    }
}

/// Metadata write queue settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// How long shutdown waits for in-flight and queued writes
    pub shutdown_timeout_ms: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            shutdown_timeout_ms: 10_000,
        }
    }
}

impl QueueConfig {
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
