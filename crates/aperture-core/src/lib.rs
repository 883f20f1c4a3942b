//! Aperture Core - capture-time metadata pipeline.
//!
//! At shutter time a [`MetadataSnapshot`] is assembled from cached sensor
//! state, the image bytes are persisted immediately, and the EXIF rewrite is
//! handed to a background queue so capture latency never waits on it.
//!
//! # Architecture
//!
//! ```text
//! capture → MetadataAssembler (snapshot) → MediaStore (bytes on disk, path returned)
//!                                              ↓ enqueue
//!                                  MetadataWriteQueue → executor → <path>.tmp → rename
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use aperture_core::{CameraContext, CapturePipeline, Config};
//!
//! #[tokio::main]
//! async fn main() -> aperture_core::Result<()> {
//!     let pipeline = CapturePipeline::from_config(Config::load()?);
//!
//!     let path = pipeline
//!         .capture_photo_bytes(&jpeg, None, chrono::Utc::now(), CameraContext::default())
//!         .await?;
//!     println!("Saved {:?}", path);
//!
//!     pipeline.shutdown().await;
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod capture;
pub mod config;
pub mod container;
pub mod error;
pub mod queue;
pub mod sensors;
pub mod store;
pub mod types;

// Re-exports for convenient access
pub use capture::MetadataAssembler;
pub use config::Config;
pub use container::{read_metadata, WrittenMetadata};
pub use error::{
    ApertureError, ConfigError, ContainerError, ContainerResult, ExecutorError, Result,
    SensorError, StoreError,
};
pub use queue::{
    Executor, MetadataWriteQueue, QueueState, WriteObserver, WriteOutcome,
};
pub use sensors::{DeviceInfoProvider, LocationProvider, SensorCache};
pub use store::{format_size, MediaStore};
pub use types::{
    CameraContext, DeviceIdentity, LensFacing, LocationFix, MediaItem, MediaType,
    MetadataSnapshot, Tilt, WriteTask,
};

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use sensors::{DeviceIdentityService, HostDeviceInfo, NoLocationProvider};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The wired-up capture pipeline - the main entry point for camera code.
pub struct CapturePipeline {
    config: Config,
    sensors: Arc<SensorCache>,
    assembler: MetadataAssembler,
    store: MediaStore,
}

impl CapturePipeline {
    /// Build a pipeline, probing for an isolated executor.
    pub fn new(
        config: Config,
        location_provider: Arc<dyn LocationProvider>,
        device_info: Box<dyn DeviceInfoProvider>,
    ) -> Self {
        Self::with_executor(
            config,
            location_provider,
            device_info,
            queue::detect_executor(),
            None,
        )
    }

    /// Build a pipeline with an explicit executor and optional write observer.
    pub fn with_executor(
        config: Config,
        location_provider: Arc<dyn LocationProvider>,
        device_info: Box<dyn DeviceInfoProvider>,
        executor: Arc<dyn Executor>,
        observer: Option<Arc<dyn WriteObserver>>,
    ) -> Self {
        tracing::debug!("Initializing aperture v{}", VERSION);

        let sensors = Arc::new(SensorCache::new());
        let device = Arc::new(DeviceIdentityService::new(device_info));
        let assembler = MetadataAssembler::new(
            sensors.clone(),
            device,
            location_provider,
            config.location.clone(),
            config.orientation.clone(),
        );
        let queue = Arc::new(MetadataWriteQueue::with_observer(executor, observer));
        let store = MediaStore::new(&config, queue);

        Self {
            config,
            sensors,
            assembler,
            store,
        }
    }

    /// Pipeline with no location service and host device identity.
    pub fn from_config(config: Config) -> Self {
        Self::new(config, Arc::new(NoLocationProvider), Box::new(HostDeviceInfo))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The cache fed by location and accelerometer subscriptions.
    pub fn sensors(&self) -> &Arc<SensorCache> {
        &self.sensors
    }

    pub fn assembler(&self) -> &MetadataAssembler {
        &self.assembler
    }

    pub fn store(&self) -> &MediaStore {
        &self.store
    }

    pub fn queue(&self) -> &Arc<MetadataWriteQueue> {
        self.store.queue()
    }

    /// Snapshot, persist encoded bytes, and queue the metadata write.
    pub async fn capture_photo_bytes(
        &self,
        bytes: &[u8],
        file_name: Option<&str>,
        capture_start: DateTime<Utc>,
        camera: CameraContext,
    ) -> Result<Option<PathBuf>> {
        let snapshot = self.assembler.capture(capture_start, camera).await;
        Ok(self
            .store
            .save_photo_bytes(bytes, file_name, Some(snapshot))
            .await?)
    }

    /// Snapshot, copy a temporary capture file, and queue the metadata write.
    pub async fn capture_photo_file(
        &self,
        source: &Path,
        file_name: Option<&str>,
        capture_start: DateTime<Utc>,
        camera: CameraContext,
    ) -> Result<Option<PathBuf>> {
        let snapshot = self.assembler.capture(capture_start, camera).await;
        Ok(self
            .store
            .save_photo_file(source, file_name, Some(snapshot))
            .await?)
    }

    /// Drain pending metadata writes, bounded by `queue.shutdown_timeout_ms`.
    ///
    /// Returns false if the timeout elapsed with work still pending.
    pub async fn shutdown(&self) -> bool {
        let timeout = self.config.queue.shutdown_timeout();
        match tokio::time::timeout(timeout, self.queue().drain_and_stop()).await {
            Ok(()) => true,
            Err(_) => {
                tracing::warn!(
                    "Metadata queue still had {} pending writes after {:?}",
                    self.queue().queue_depth(),
                    timeout
                );
                false
            }
        }
    }
}
