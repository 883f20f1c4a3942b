//! Error types for the aperture capture pipeline.
//!
//! Errors are organized by component. Only [`StoreError::StorageUnavailable`]
//! is meant to reach callers of the capture path; everything else is recovered
//! locally (null sensor fields, `None`/`false` store results, dropped write tasks).

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for aperture operations.
#[derive(Error, Debug)]
pub enum ApertureError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Media store errors
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Media store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The storage root could not be resolved or created.
    #[error("Storage directory unavailable at {path}: {source}")]
    StorageUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No documents or data directory could be determined for this platform.
    #[error("No default storage location available on this platform")]
    NoDefaultLocation,
}

/// Errors raised while rewriting an image's metadata container.
#[derive(Error, Debug)]
pub enum ContainerError {
    /// The file extension does not map to a container we can rewrite
    #[error("Unsupported format for {path}: {format}")]
    UnsupportedFormat { path: PathBuf, format: String },

    /// The image bytes or the embedded tag directory could not be parsed
    #[error("Decode error for {path}: {message}")]
    Decode { path: PathBuf, message: String },

    /// The tag directory could not be serialized
    #[error("Encode error for {path}: {message}")]
    Encode { path: PathBuf, message: String },

    /// The custom application block carries a version we do not understand
    #[error("Unsupported application block version {0}")]
    BlockVersion(u32),

    /// I/O failure on the target or its temporary sibling
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Sensor and device-service errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SensorError {
    /// The platform has no such sensor or service
    #[error("Sensor unavailable: {0}")]
    Unavailable(String),

    /// The user denied the permission required to read the sensor
    #[error("Permission denied for {0}")]
    PermissionDenied(String),

    /// A fresh reading did not arrive in time
    #[error("Sensor read timed out after {0}ms")]
    Timeout(u64),
}

/// Errors from a write-task executor.
#[derive(Error, Debug)]
pub enum ExecutorError {
    /// The isolated context could not be started; callers fall back to inline execution
    #[error("Failed to start isolated executor: {0}")]
    SpawnFailed(String),

    /// The isolated context died before reporting a result
    #[error("Isolated executor disconnected before reporting a result")]
    Disconnected,
}

/// Convenience type alias for aperture results.
pub type Result<T> = std::result::Result<T, ApertureError>;

/// Convenience type alias for container rewrite results.
pub type ContainerResult<T> = std::result::Result<T, ContainerError>;

impl ContainerError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
