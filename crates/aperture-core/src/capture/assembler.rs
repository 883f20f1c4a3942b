//! Builds a [`MetadataSnapshot`] from cached sensor state at shutter time.
//!
//! Everything here is cheap except the optional fresh location read, which is
//! bounded by `location.fresh_read_timeout_ms` and falls back to the stale
//! cache (or no location) when it does not finish in time.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::{LocationConfig, OrientationConfig};
use crate::error::SensorError;
use crate::sensors::{DeviceIdentityService, LocationProvider, SensorCache};
use crate::types::{CameraContext, LocationFix, MetadataSnapshot, Tilt};

/// Produces snapshots from the sensor cache, device identity and camera context.
pub struct MetadataAssembler {
    cache: Arc<SensorCache>,
    device: Arc<DeviceIdentityService>,
    location_provider: Arc<dyn LocationProvider>,
    location: LocationConfig,
    orientation: OrientationConfig,
}

impl MetadataAssembler {
    pub fn new(
        cache: Arc<SensorCache>,
        device: Arc<DeviceIdentityService>,
        location_provider: Arc<dyn LocationProvider>,
        location: LocationConfig,
        orientation: OrientationConfig,
    ) -> Self {
        Self {
            cache,
            device,
            location_provider,
            location,
            orientation,
        }
    }

    /// Assemble the snapshot for a capture that started at `capture_start`.
    pub async fn capture(
        &self,
        capture_start: DateTime<Utc>,
        camera: CameraContext,
    ) -> MetadataSnapshot {
        self.capture_with_tags(capture_start, camera, BTreeMap::new())
            .await
    }

    /// Like [`capture`](Self::capture), attaching free-form application tags.
    pub async fn capture_with_tags(
        &self,
        capture_start: DateTime<Utc>,
        camera: CameraContext,
        tags: BTreeMap<String, String>,
    ) -> MetadataSnapshot {
        let location = self.resolve_location().await;
        let tilt = self.resolve_tilt();
        let device = self.device.identity().clone();

        let capture_latency_ms = (Utc::now() - capture_start).num_milliseconds().max(0) as u64;
        tracing::debug!(
            "Assembled snapshot in {}ms (location: {}, tilt: {})",
            capture_latency_ms,
            location.is_some(),
            tilt.is_some()
        );

        MetadataSnapshot {
            location,
            device,
            camera,
            tilt,
            captured_at: capture_start,
            capture_latency_ms,
            tags,
        }
    }

    async fn resolve_location(&self) -> Option<LocationFix> {
        if !self.location.enabled {
            return None;
        }

        let cached = self.cache.location();
        if let Some(reading) = cached {
            if reading.is_fresh(self.location.freshness_window()) && self.is_settled(&reading.value) {
                self.cache.mark_location_used(reading.value);
                return Some(reading.value);
            }
        }

        let fresh = match self.read_fresh().await {
            Ok(fix) => Some(fix),
            Err(e) => {
                tracing::debug!(
                    "Fresh location read from {} failed: {e}",
                    self.location_provider.name()
                );
                None
            }
        };

        let chosen = match fresh {
            Some(fix) => {
                self.cache.record_location(fix);
                Some(fix)
            }
            None => cached.map(|reading| reading.value),
        };
        if let Some(fix) = chosen {
            self.cache.mark_location_used(fix);
        }
        chosen
    }

    /// One provider read bounded by `fresh_read_timeout_ms`.
    async fn read_fresh(&self) -> Result<LocationFix, SensorError> {
        let timeout = self.location.fresh_read_timeout();
        let fix = tokio::time::timeout(timeout, self.location_provider.current_fix())
            .await
            .map_err(|_| SensorError::Timeout(timeout.as_millis() as u64))??;
        if !fix.is_valid() {
            return Err(SensorError::Unavailable(format!(
                "provider returned out-of-range fix {:.5}, {:.5}",
                fix.latitude, fix.longitude
            )));
        }
        Ok(fix)
    }

    /// The cached fix is reusable while it stays within the distance threshold
    /// of the fix attached to the previous capture.
    fn is_settled(&self, fix: &LocationFix) -> bool {
        match self.cache.last_used_location() {
            Some(previous) => previous.distance_to(fix) < self.location.distance_threshold_m,
            None => true,
        }
    }

    fn resolve_tilt(&self) -> Option<Tilt> {
        self.cache
            .tilt()
            .filter(|reading| reading.age() <= self.orientation.max_age())
            .map(|reading| reading.value)
    }
}
