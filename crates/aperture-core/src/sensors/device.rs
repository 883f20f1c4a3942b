//! Process-lifetime device identity cache.

use std::sync::OnceLock;

use super::provider::DeviceInfoProvider;
use crate::types::{DeviceIdentity, UNKNOWN};

/// Resolves the device identity once and hands out the cached value.
///
/// Lookup failures degrade to the "Unknown" sentinel instead of failing a capture.
pub struct DeviceIdentityService {
    provider: Box<dyn DeviceInfoProvider>,
    cached: OnceLock<DeviceIdentity>,
}

impl DeviceIdentityService {
    pub fn new(provider: Box<dyn DeviceInfoProvider>) -> Self {
        Self {
            provider,
            cached: OnceLock::new(),
        }
    }

    pub fn identity(&self) -> &DeviceIdentity {
        self.cached.get_or_init(|| match self.provider.identity() {
            Ok(identity) => normalize(identity),
            Err(e) => {
                tracing::warn!("Device identity unavailable, using \"{UNKNOWN}\": {e}");
                DeviceIdentity::unknown()
            }
        })
    }
}

/// Blank fields are replaced by the sentinel.
fn normalize(identity: DeviceIdentity) -> DeviceIdentity {
    let or_unknown = |s: String| {
        if s.trim().is_empty() {
            UNKNOWN.to_string()
        } else {
            s
        }
    };
    DeviceIdentity {
        manufacturer: or_unknown(identity.manufacturer),
        model: or_unknown(identity.model),
        os_version: or_unknown(identity.os_version),
    }
}
