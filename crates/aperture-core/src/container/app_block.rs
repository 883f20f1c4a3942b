//! Custom application tag block.
//!
//! Camera and sensor context that has no standard EXIF tag is serialized as a
//! small JSON object and stored in `UserComment` behind the 8-byte `ASCII`
//! character-code prefix. The `v` field is the block's major version; readers
//! reject versions newer than [`APP_BLOCK_VERSION`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::ContainerError;
use crate::types::{LensFacing, MetadataSnapshot, Tilt};

/// Current block layout version.
pub const APP_BLOCK_VERSION: u32 = 1;

/// Character-code header required at the start of `UserComment`.
pub(crate) const ASCII_PREFIX: &[u8; 8] = b"ASCII\0\0\0";

/// Application-specific capture context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppBlock {
    pub v: u32,
    pub camera_id: String,
    pub lens_facing: LensFacing,
    pub zoom_ratio: f32,
    pub flash_mode: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tilt: Option<Tilt>,
    pub capture_latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub horizontal_accuracy_m: Option<f64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
}

impl AppBlock {
    pub fn from_snapshot(snapshot: &MetadataSnapshot) -> Self {
        Self {
            v: APP_BLOCK_VERSION,
            camera_id: snapshot.camera.camera_id.clone(),
            lens_facing: snapshot.camera.lens_facing,
            zoom_ratio: snapshot.camera.zoom_ratio,
            flash_mode: snapshot.camera.flash_mode.clone(),
            tilt: snapshot.tilt,
            capture_latency_ms: snapshot.capture_latency_ms,
            horizontal_accuracy_m: snapshot.location.and_then(|l| l.horizontal_accuracy),
            tags: snapshot.tags.clone(),
        }
    }

    /// Serialize into `UserComment` payload bytes (prefix + JSON).
    pub fn to_user_comment(&self) -> Result<Vec<u8>, serde_json::Error> {
        let json = serde_json::to_vec(self)?;
        let mut bytes = Vec::with_capacity(ASCII_PREFIX.len() + json.len());
        bytes.extend_from_slice(ASCII_PREFIX);
        bytes.extend_from_slice(&json);
        Ok(bytes)
    }

    /// Parse a `UserComment` payload.
    ///
    /// Returns `Ok(None)` when the comment is not one of our blocks.
    pub fn from_user_comment(bytes: &[u8]) -> Result<Option<Self>, ContainerError> {
        let Some(json) = bytes.strip_prefix(ASCII_PREFIX.as_slice()) else {
            return Ok(None);
        };

        #[derive(Deserialize)]
        struct Versioned {
            v: u32,
        }

        let Ok(Versioned { v }) = serde_json::from_slice::<Versioned>(json) else {
            return Ok(None);
        };
        if v > APP_BLOCK_VERSION {
            return Err(ContainerError::BlockVersion(v));
        }

        Ok(serde_json::from_slice(json).ok())
    }
}
