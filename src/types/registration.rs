use serde::{Deserialize, Serialize};

use crate::types::device::DeviceMetadata;

/// Opaque push-messaging token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessagingCredential(pub String);

impl MessagingCredential {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Body of `POST /push-token`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationRequest {
    pub token: String,
    pub device_info: DeviceMetadata,
}

/// Authenticated session the page runs under.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub user_id: Option<String>,
}

impl Session {
    pub fn authenticated(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user_id
            .as_deref()
            .is_some_and(|user_id| !user_id.trim().is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NotAuthenticated,
    NoCredential,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationResult {
    Registered,
    Skipped(SkipReason),
    Failed { reason: String },
}

impl RegistrationResult {
    pub fn is_registered(&self) -> bool {
        matches!(self, Self::Registered)
    }

    /// Text suitable for a toast.
    pub fn user_message(&self) -> String {
        match self {
            Self::Registered => "Notifications enabled on this device.".to_string(),
            Self::Skipped(SkipReason::NotAuthenticated) => {
                "Sign in to enable notifications.".to_string()
            }
            Self::Skipped(SkipReason::NoCredential) => {
                "Notifications are blocked or not supported in this browser.".to_string()
            }
            Self::Failed { reason } => format!("Failed to enable notifications: {reason}"),
        }
    }
}
