use std::sync::{Arc, Mutex};

use rand::Rng;
use rand::distributions::Alphanumeric;

use crate::config::DEVICE_ID_PREFIX;
use crate::ports::ClientStateStore;
use crate::types::device::{DeviceEnvironment, DeviceIdentity, DeviceMetadata, WEB_DEVICE_TYPE};

pub const DEVICE_ID_KEY: &str = "device_id";
const DEVICE_ID_SUFFIX_LEN: usize = 9;

/// Stable per-browser device identifier.
///
/// Falls back to an identifier held in memory for the lifetime of this value
/// when durable storage is unavailable.
#[derive(Debug, Clone)]
pub struct DeviceIdentityStore<S> {
    store: S,
    prefix: String,
    ephemeral: Arc<Mutex<Option<String>>>,
}

impl<S: ClientStateStore> DeviceIdentityStore<S> {
    pub fn new(store: S) -> Self {
        Self::with_prefix(store, DEVICE_ID_PREFIX)
    }

    pub fn with_prefix(store: S, prefix: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.into(),
            ephemeral: Arc::new(Mutex::new(None)),
        }
    }

    pub fn get_or_create_device_id(&self) -> String {
        match self.store.get(DEVICE_ID_KEY) {
            Ok(Some(id)) if !id.trim().is_empty() => return id,
            Ok(_) => {}
            Err(err) => {
                tracing::warn!(error = %err, "device id storage unavailable; using ephemeral id");
                return self.ephemeral_id();
            }
        }

        let id = generate_device_id(&mut rand::thread_rng(), &self.prefix);
        if let Err(err) = self.store.set(DEVICE_ID_KEY, &id) {
            tracing::warn!(error = %err, "failed to persist device id; using ephemeral id");
            return self.ephemeral_id();
        }
        tracing::debug!(device_id = %id, "created device id");
        id
    }

    pub fn identity(&self) -> DeviceIdentity {
        DeviceIdentity {
            id: self.get_or_create_device_id(),
        }
    }

    fn ephemeral_id(&self) -> String {
        let mut guard = self
            .ephemeral
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        guard
            .get_or_insert_with(|| generate_device_id(&mut rand::thread_rng(), &self.prefix))
            .clone()
    }
}

pub(crate) fn generate_device_id<R: Rng>(rng: &mut R, prefix: &str) -> String {
    let suffix: String = rng
        .sample_iter(&Alphanumeric)
        .take(DEVICE_ID_SUFFIX_LEN)
        .map(|byte| char::from(byte).to_ascii_lowercase())
        .collect();
    format!("{prefix}{suffix}")
}

impl DeviceMetadata {
    /// Assembled fresh for every registration.
    pub fn collect(device_id: impl Into<String>, environment: &DeviceEnvironment) -> Self {
        let browser = detect_browser(&environment.user_agent).to_string();
        let platform = if environment.platform.trim().is_empty() {
            "Unknown".to_string()
        } else {
            environment.platform.clone()
        };
        Self {
            device_id: device_id.into(),
            device_type: WEB_DEVICE_TYPE.to_string(),
            device_name: format!("{browser} on {platform}"),
            browser,
            platform,
            user_agent: environment.user_agent.clone(),
        }
    }
}

/// Order matters: Edge and Opera also advertise Chrome, Chrome advertises Safari.
pub(crate) fn detect_browser(user_agent: &str) -> &'static str {
    if user_agent.contains("Edg/") || user_agent.contains("Edge/") {
        "Edge"
    } else if user_agent.contains("OPR/") || user_agent.contains("Opera") {
        "Opera"
    } else if user_agent.contains("Firefox/") || user_agent.contains("FxiOS/") {
        "Firefox"
    } else if user_agent.contains("Chrome/") || user_agent.contains("CriOS/") {
        "Chrome"
    } else if user_agent.contains("Safari/") {
        "Safari"
    } else {
        "Unknown"
    }
}
