//! Interfaces to the platform location and device-information services.
//!
//! Acquisition itself lives outside this crate; these traits are the seams
//! the capture path calls through.

use async_trait::async_trait;
use std::path::Path;

use crate::error::SensorError;
use crate::types::{DeviceIdentity, LocationFix};

/// On-demand location reads.
///
/// Uses `async_trait` because the assembler holds an `Arc<dyn LocationProvider>`.
#[async_trait]
pub trait LocationProvider: Send + Sync {
    /// Provider name for logging.
    fn name(&self) -> &str;

    /// Request a fresh fix. May take arbitrarily long; callers bound it.
    async fn current_fix(&self) -> Result<LocationFix, SensorError>;
}

/// Used when no location service is wired in.
pub struct NoLocationProvider;

#[async_trait]
impl LocationProvider for NoLocationProvider {
    fn name(&self) -> &str {
        "none"
    }

    async fn current_fix(&self) -> Result<LocationFix, SensorError> {
        Err(SensorError::Unavailable("no location provider configured".into()))
    }
}

/// Synchronous, fallible device identity lookup.
pub trait DeviceInfoProvider: Send + Sync {
    fn identity(&self) -> Result<DeviceIdentity, SensorError>;
}

/// A fixed identity, for callers that already know it.
pub struct StaticDeviceInfo(pub DeviceIdentity);

impl DeviceInfoProvider for StaticDeviceInfo {
    fn identity(&self) -> Result<DeviceIdentity, SensorError> {
        Ok(self.0.clone())
    }
}

/// Reads identity from the host OS.
///
/// On Linux this uses DMI (`/sys/devices/virtual/dmi/id`) and `/etc/os-release`.
/// Other platforms report [`SensorError::Unavailable`].
pub struct HostDeviceInfo;

const DMI_DIR: &str = "/sys/devices/virtual/dmi/id";

impl DeviceInfoProvider for HostDeviceInfo {
    fn identity(&self) -> Result<DeviceIdentity, SensorError> {
        if !cfg!(target_os = "linux") {
            return Err(SensorError::Unavailable(format!(
                "device identity lookup not supported on {}",
                std::env::consts::OS
            )));
        }

        let dmi = Path::new(DMI_DIR);
        let manufacturer = read_trimmed(&dmi.join("sys_vendor"));
        let model = read_trimmed(&dmi.join("product_name"));
        let os_version = std::fs::read_to_string("/etc/os-release")
            .ok()
            .and_then(|content| os_release_pretty_name(&content));

        if manufacturer.is_none() && model.is_none() && os_version.is_none() {
            return Err(SensorError::Unavailable("no DMI or os-release data".into()));
        }

        Ok(DeviceIdentity {
            manufacturer: manufacturer.unwrap_or_else(|| crate::types::UNKNOWN.to_string()),
            model: model.unwrap_or_else(|| crate::types::UNKNOWN.to_string()),
            os_version: os_version.unwrap_or_else(|| std::env::consts::OS.to_string()),
        })
    }
}

fn read_trimmed(path: &Path) -> Option<String> {
    std::fs::read_to_string(path)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Extract `PRETTY_NAME` from os-release content.
fn os_release_pretty_name(content: &str) -> Option<String> {
    content
        .lines()
        .find_map(|line| line.strip_prefix("PRETTY_NAME="))
        .map(|value| value.trim().trim_matches('"').to_string())
        .filter(|value| !value.is_empty())
}
