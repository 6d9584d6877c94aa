use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionState {
    /// Never asked; requesting triggers the native prompt.
    Default,
    Granted,
    Denied,
    Unsupported,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForegroundMessage {
    pub title: Option<String>,
    pub body: Option<String>,
    #[serde(default)]
    pub data: HashMap<String, String>,
}

/// Application-level events re-dispatched to the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    ForegroundMessage(ForegroundMessage),
}
