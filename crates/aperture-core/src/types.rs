//! Core data types for the aperture capture pipeline.
//!
//! A [`MetadataSnapshot`] is built once per capture and never mutated; it is
//! moved into a [`WriteTask`] and consumed by the write queue. [`MediaItem`]
//! describes a capture that already lives on disk.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Mean Earth radius used for fix-to-fix distances.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Sentinel used when a device-identity field cannot be resolved.
pub const UNKNOWN: &str = "Unknown";

/// A single location fix.
///
/// Latitude and longitude are always present together; the remaining fields
/// are independently optional because not every fix reports them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationFix {
    /// Decimal degrees, positive north
    pub latitude: f64,

    /// Decimal degrees, positive east
    pub longitude: f64,

    /// Meters above sea level
    #[serde(skip_serializing_if = "Option::is_none")]
    pub altitude: Option<f64>,

    /// Ground speed in meters per second
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,

    /// Heading in degrees clockwise from true north
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heading: Option<f64>,

    /// Horizontal accuracy radius in meters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub horizontal_accuracy: Option<f64>,
}

impl LocationFix {
    /// A fix with only coordinates.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            altitude: None,
            speed: None,
            heading: None,
            horizontal_accuracy: None,
        }
    }

    /// Great-circle (haversine) distance to another fix, in meters.
    pub fn distance_to(&self, other: &LocationFix) -> f64 {
        let (lat1, lat2) = (self.latitude.to_radians(), other.latitude.to_radians());
        let dlat = lat2 - lat1;
        let dlon = (other.longitude - self.longitude).to_radians();

        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_M * a.sqrt().atan2((1.0 - a).sqrt())
    }

    /// Whether both coordinates are finite and inside their valid ranges.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Accelerometer reading in m/s² on the device axes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tilt {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Manufacturer, model and OS version of the capturing device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceIdentity {
    pub manufacturer: String,
    pub model: String,
    pub os_version: String,
}

impl DeviceIdentity {
    /// Identity used when the platform lookup fails.
    pub fn unknown() -> Self {
        Self {
            manufacturer: UNKNOWN.to_string(),
            model: UNKNOWN.to_string(),
            os_version: UNKNOWN.to_string(),
        }
    }
}

/// Which way the lens faces relative to the screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LensFacing {
    #[default]
    Back,
    Front,
    External,
}

impl LensFacing {
    pub fn as_str(&self) -> &'static str {
        match self {
            LensFacing::Back => "back",
            LensFacing::Front => "front",
            LensFacing::External => "external",
        }
    }
}

/// Camera and lens parameters reported by the capture subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraContext {
    /// Platform camera identifier
    pub camera_id: String,

    /// Lens direction
    pub lens_facing: LensFacing,

    /// Zoom ratio (1.0 = no zoom)
    pub zoom_ratio: f32,

    /// Flash mode as reported by the camera API ("auto", "off", "always", ...)
    pub flash_mode: String,

    /// Opaque clockwise rotation in degrees, already corrected for the device
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotation_degrees: Option<u16>,
}

impl Default for CameraContext {
    fn default() -> Self {
        Self {
            camera_id: "0".to_string(),
            lens_facing: LensFacing::Back,
            zoom_ratio: 1.0,
            flash_mode: "off".to_string(),
            rotation_degrees: None,
        }
    }
}

/// Immutable point-in-time capture context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataSnapshot {
    /// Location at capture; `None` when disabled, denied or unavailable
    pub location: Option<LocationFix>,

    /// Capturing device
    pub device: DeviceIdentity,

    /// Camera state at capture
    pub camera: CameraContext,

    /// Accelerometer tilt at capture
    pub tilt: Option<Tilt>,

    /// When the shutter fired
    pub captured_at: DateTime<Utc>,

    /// Milliseconds between the capture request and snapshot assembly
    pub capture_latency_ms: u64,

    /// Free-form application tags
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

impl MetadataSnapshot {
    pub fn latitude(&self) -> Option<f64> {
        self.location.map(|l| l.latitude)
    }

    pub fn longitude(&self) -> Option<f64> {
        self.location.map(|l| l.longitude)
    }
}

/// One pending metadata mutation.
#[derive(Debug, Clone)]
pub struct WriteTask {
    /// File whose container will be rewritten
    pub path: PathBuf,

    /// Snapshot to embed
    pub snapshot: Arc<MetadataSnapshot>,

    /// When the task entered the queue
    pub enqueued_at: DateTime<Utc>,
}

impl WriteTask {
    pub fn new(path: impl Into<PathBuf>, snapshot: Arc<MetadataSnapshot>) -> Self {
        Self {
            path: path.into(),
            snapshot,
            enqueued_at: Utc::now(),
        }
    }
}

/// Kind of persisted capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Photo,
    Video,
}

impl MediaType {
    const PHOTO_EXTENSIONS: &'static [&'static str] = &["jpg", "jpeg", "png", "heic", "heif", "webp"];
    const VIDEO_EXTENSIONS: &'static [&'static str] = &["mp4", "mov", "m4v", "3gp", "webm", "mkv"];

    /// Infer the media type from a file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.to_ascii_lowercase();
        if Self::PHOTO_EXTENSIONS.contains(&ext.as_str()) {
            Some(MediaType::Photo)
        } else if Self::VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            Some(MediaType::Video)
        } else {
            None
        }
    }

    /// Extensions the store keeps for this media type, lowercase.
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            MediaType::Photo => Self::PHOTO_EXTENSIONS,
            MediaType::Video => Self::VIDEO_EXTENSIONS,
        }
    }

    /// Extension used when a source or supplied name carries none we keep.
    pub fn default_extension(self) -> &'static str {
        match self {
            MediaType::Photo => "jpg",
            MediaType::Video => "mp4",
        }
    }
}

/// A persisted capture on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaItem {
    pub path: PathBuf,
    pub media_type: MediaType,
    pub captured_at: DateTime<Utc>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_path: Option<PathBuf>,

    /// Video duration in milliseconds, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,

    /// File size in bytes
    pub file_size: u64,
}

impl MediaItem {
    /// Replace the thumbnail path, keeping everything else.
    pub fn with_thumbnail(self, thumbnail_path: Option<PathBuf>) -> Self {
        Self {
            thumbnail_path,
            ..self
        }
    }

    /// Replace the video duration, keeping everything else.
    pub fn with_duration(self, duration_ms: Option<u64>) -> Self {
        Self {
            duration_ms,
            ..self
        }
    }

    /// Just the filename portion of the path.
    pub fn file_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
    }

    pub fn is_photo(&self) -> bool {
        self.media_type == MediaType::Photo
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_same_point_is_zero() {
        let fix = LocationFix::new(37.7749, -122.4194);
        assert!(fix.distance_to(&fix) < 1e-6);
    }

    #[test]
    fn test_distance_known_pair() {
        // San Francisco to Los Angeles: roughly 559 km
        let sf = LocationFix::new(37.7749, -122.4194);
        let la = LocationFix::new(34.0522, -118.2437);
        let km = sf.distance_to(&la) / 1000.0;
        assert!((km - 559.0).abs() < 5.0, "got {km}");
    }

    #[test]
    fn test_location_validity() {
        assert!(LocationFix::new(0.0, 0.0).is_valid());
        assert!(!LocationFix::new(91.0, 0.0).is_valid());
        assert!(!LocationFix::new(0.0, f64::NAN).is_valid());
    }

    #[test]
    fn test_media_type_from_extension() {
        assert_eq!(MediaType::from_extension("JPG"), Some(MediaType::Photo));
        assert_eq!(MediaType::from_extension("png"), Some(MediaType::Photo));
        assert_eq!(MediaType::from_extension("mp4"), Some(MediaType::Video));
        assert_eq!(MediaType::from_extension("MOV"), Some(MediaType::Video));
        assert_eq!(MediaType::from_extension("txt"), None);
    }

    #[test]
    fn test_media_item_with_thumbnail_keeps_fields() {
        let item = MediaItem {
            path: PathBuf::from("/media/IMG_1.jpg"),
            media_type: MediaType::Photo,
            captured_at: Utc::now(),
            thumbnail_path: None,
            duration_ms: None,
            file_size: 42,
        };
        let updated = item.clone().with_thumbnail(Some(PathBuf::from("/media/t.jpg")));
        assert_eq!(updated.file_size, 42);
        assert_eq!(updated.path, item.path);
        assert_eq!(updated.thumbnail_path, Some(PathBuf::from("/media/t.jpg")));
        assert_eq!(updated.file_name(), "IMG_1.jpg");
    }

    #[test]
    fn test_unknown_identity() {
        let id = DeviceIdentity::unknown();
        assert_eq!(id.manufacturer, UNKNOWN);
        assert_eq!(id.model, UNKNOWN);
    }
}
