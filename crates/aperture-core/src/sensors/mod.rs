//! Sensor state consumed at capture time.
//!
//! - **cache**: freshness-stamped location and accelerometer readings fed by push subscriptions
//! - **provider**: traits for on-demand location reads and device identity lookups
//! - **device**: process-lifetime cache of the device identity

pub mod cache;
pub mod device;
pub mod provider;

pub use cache::{Reading, SensorCache};
pub use device::DeviceIdentityService;
pub use provider::{
    DeviceInfoProvider, HostDeviceInfo, LocationProvider, NoLocationProvider, StaticDeviceInfo,
};
