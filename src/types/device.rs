use serde::{Deserialize, Serialize};

/// Device type reported for every browser registration.
pub const WEB_DEVICE_TYPE: &str = "web";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceIdentity {
    pub id: String,
}

/// Runtime facts the host page reports about itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceEnvironment {
    pub user_agent: String,
    pub platform: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceMetadata {
    pub device_id: String,
    pub device_type: String,
    pub device_name: String,
    pub browser: String,
    pub platform: String,
    pub user_agent: String,
}
