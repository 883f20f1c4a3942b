//! Most-recent sensor readings with staleness timestamps.
//!
//! Each slot is a `watch` channel holding an immutable [`Reading`]. Writers
//! replace the whole value; readers copy it out, so a reader never observes a
//! half-updated fix.

use futures_util::{Stream, StreamExt};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::types::{LocationFix, Tilt};

/// A sensor value and the instant it was recorded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading<T> {
    pub value: T,
    pub last_updated: Instant,
}

impl<T> Reading<T> {
    pub fn age(&self) -> Duration {
        self.last_updated.elapsed()
    }

    /// True while the reading is strictly younger than `window`.
    pub fn is_fresh(&self, window: Duration) -> bool {
        self.age() < window
    }
}

/// Shared cache of the latest location fix and accelerometer tick.
pub struct SensorCache {
    location: watch::Sender<Option<Reading<LocationFix>>>,
    tilt: watch::Sender<Option<Reading<Tilt>>>,
    /// Fix most recently attached to a snapshot.
    last_used_location: Mutex<Option<LocationFix>>,
}

impl Default for SensorCache {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorCache {
    pub fn new() -> Self {
        let (location, _) = watch::channel(None);
        let (tilt, _) = watch::channel(None);
        Self {
            location,
            tilt,
            last_used_location: Mutex::new(None),
        }
    }

    /// Latest location reading, if any has arrived.
    pub fn location(&self) -> Option<Reading<LocationFix>> {
        *self.location.borrow()
    }

    /// Latest accelerometer reading, if any has arrived.
    pub fn tilt(&self) -> Option<Reading<Tilt>> {
        *self.tilt.borrow()
    }

    /// Replace the cached location with a new fix stamped now.
    ///
    /// Fixes with out-of-range or non-finite coordinates are ignored.
    pub fn record_location(&self, fix: LocationFix) {
        if !fix.is_valid() {
            tracing::debug!("Ignoring invalid location fix: {:?}", fix);
            return;
        }
        self.location.send_replace(Some(Reading {
            value: fix,
            last_updated: Instant::now(),
        }));
    }

    /// Replace the cached accelerometer reading with a new tick stamped now.
    pub fn record_tilt(&self, tilt: Tilt) {
        self.tilt.send_replace(Some(Reading {
            value: tilt,
            last_updated: Instant::now(),
        }));
    }

    /// Watch for location updates (e.g. to await the next fix).
    pub fn subscribe_location(&self) -> watch::Receiver<Option<Reading<LocationFix>>> {
        self.location.subscribe()
    }

    pub fn last_used_location(&self) -> Option<LocationFix> {
        *self
            .last_used_location
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(crate) fn mark_location_used(&self, fix: LocationFix) {
        *self
            .last_used_location
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(fix);
    }

    /// Drop all cached readings (e.g. when location permission is revoked).
    pub fn clear(&self) {
        self.location.send_replace(None);
        self.tilt.send_replace(None);
        *self
            .last_used_location
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
    }
}

/// Feed a long-lived stream of location fixes into the cache.
///
/// The task ends when the stream ends.
pub fn spawn_location_subscription<S>(cache: std::sync::Arc<SensorCache>, stream: S) -> JoinHandle<()>
where
    S: Stream<Item = LocationFix> + Send + 'static,
{
    tokio::spawn(async move {
        let mut stream = Box::pin(stream);
        while let Some(fix) = stream.next().await {
            cache.record_location(fix);
        }
        tracing::debug!("Location subscription ended");
    })
}

/// Feed a long-lived stream of accelerometer ticks into the cache.
pub fn spawn_tilt_subscription<S>(cache: std::sync::Arc<SensorCache>, stream: S) -> JoinHandle<()>
where
    S: Stream<Item = Tilt> + Send + 'static,
{
    tokio::spawn(async move {
        let mut stream = Box::pin(stream);
        while let Some(tilt) = stream.next().await {
            cache.record_tilt(tilt);
        }
        tracing::debug!("Accelerometer subscription ended");
    })
}
