//! Configuration validation with range checks.

use crate::error::ConfigError;

use super::Config;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.folder_name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "storage.folder_name must not be empty".into(),
            ));
        }
        if self.location.freshness_window_secs == 0 {
            return Err(ConfigError::ValidationError(
                "location.freshness_window_secs must be > 0".into(),
            ));
        }
        if self.location.fresh_read_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "location.fresh_read_timeout_ms must be > 0".into(),
            ));
        }
        let threshold = self.location.distance_threshold_m;
        if !threshold.is_finite() || threshold < 0.0 {
            return Err(ConfigError::ValidationError(
                "location.distance_threshold_m must be a finite value >= 0".into(),
            ));
        }
        if self.orientation.max_age_ms == 0 {
            return Err(ConfigError::ValidationError(
                "orientation.max_age_ms must be > 0".into(),
            ));
        }
        if self.queue.shutdown_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "queue.shutdown_timeout_ms must be > 0".into(),
            ));
        }
        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            return Err(ConfigError::ValidationError(format!(
                "logging.format must be \"pretty\" or \"json\", got \"{}\"",
                self.logging.format
            )));
        }
        Ok(())
    }
}
