use std::time::Duration;

use url::Url;

use crate::types::dismissal::PromptKind;

pub const UPDATE_POLL_INTERVAL: Duration = Duration::from_secs(5 * 60);
pub const HANDOFF_FALLBACK: Duration = Duration::from_secs(4);
pub const INSTALL_COOLDOWN: time::Duration = time::Duration::days(1);
pub const UPDATE_COOLDOWN: time::Duration = time::Duration::minutes(30);
pub const INSTALL_AUTO_SHOW_DELAY: Duration = Duration::from_secs(3);
pub const DEVICE_ID_PREFIX: &str = "device_";
pub const CACHE_BUST_PARAM: &str = "_v";

/// Timing and naming constants fixed at build time.
#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    pub poll_interval: Duration,
    pub handoff_fallback: Duration,
    pub install_cooldown: time::Duration,
    pub update_cooldown: time::Duration,
    pub install_auto_show_delay: Duration,
    pub device_id_prefix: String,
    pub cache_bust_param: String,
}

impl LifecycleConfig {
    pub fn cooldown(&self, kind: PromptKind) -> time::Duration {
        match kind {
            PromptKind::Install => self.install_cooldown,
            PromptKind::Update => self.update_cooldown,
        }
    }
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            poll_interval: UPDATE_POLL_INTERVAL,
            handoff_fallback: HANDOFF_FALLBACK,
            install_cooldown: INSTALL_COOLDOWN,
            update_cooldown: UPDATE_COOLDOWN,
            install_auto_show_delay: INSTALL_AUTO_SHOW_DELAY,
            device_id_prefix: DEVICE_ID_PREFIX.to_string(),
            cache_bust_param: CACHE_BUST_PARAM.to_string(),
        }
    }
}

/// Where and as whom registrations are sent.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub base_url: Url,
    pub csrf_token: Option<String>,
    pub session_cookie: Option<String>,
    pub user_id: Option<String>,
}

impl BackendConfig {
    pub fn push_token_url(&self) -> crate::Result<Url> {
        Ok(self.base_url.join("push-token")?)
    }
}
