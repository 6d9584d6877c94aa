//! Messaging credential provider: SDK setup, permission, token retrieval.

use std::sync::Mutex as StdMutex;

use tokio::sync::{Mutex, broadcast};
use tokio::task::JoinHandle;

use crate::ports::{MessagingSdk, PermissionSource};
use crate::types::messaging::{AppEvent, PermissionState};
use crate::types::registration::MessagingCredential;

const EVENT_CAPACITY: usize = 32;

enum InitState {
    Uninitialized,
    Ready { forwarder: JoinHandle<()> },
}

pub struct CredentialProvider<P, M> {
    permission: P,
    sdk: M,
    supported: bool,
    init: Mutex<InitState>,
    last_error: StdMutex<Option<String>>,
    events: broadcast::Sender<AppEvent>,
}

impl<P, M> CredentialProvider<P, M>
where
    P: PermissionSource,
    M: MessagingSdk,
{
    pub fn new(permission: P, sdk: M) -> Self {
        let supported = sdk.is_supported() && permission.current() != PermissionState::Unsupported;
        if !supported {
            tracing::info!("push messaging unsupported; credential provider disabled");
        }
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            permission,
            sdk,
            supported,
            init: Mutex::new(InitState::Uninitialized),
            last_error: StdMutex::new(None),
            events,
        }
    }

    pub fn is_supported(&self) -> bool {
        self.supported
    }

    /// Foreground messages re-dispatched as application events.
    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.events.subscribe()
    }

    /// Reason of the most recent failure, for display.
    pub fn last_error(&self) -> Option<String> {
        self.last_error
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn record_failure(&self, reason: String) {
        tracing::warn!(%reason, "messaging credential failure");
        *self
            .last_error
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(reason);
    }

    /// Idempotent once it succeeds; a failed attempt is retried on the next call.
    pub async fn initialize(&self) {
        if !self.supported {
            return;
        }
        let mut init = self.init.lock().await;
        if matches!(*init, InitState::Ready { .. }) {
            return;
        }

        match self.sdk.initialize().await {
            Ok(mut messages) => {
                let events = self.events.clone();
                let forwarder = tokio::spawn(async move {
                    while let Some(message) = messages.recv().await {
                        // No subscribers is fine.
                        let _ = events.send(AppEvent::ForegroundMessage(message));
                    }
                });
                *init = InitState::Ready { forwarder };
                tracing::debug!("messaging initialized");
            }
            Err(err) => self.record_failure(format!("messaging initialization failed: {err}")),
        }
    }

    /// Prompts natively at most once per permission state.
    pub async fn request_credential(&self) -> Option<MessagingCredential> {
        if !self.supported {
            return None;
        }

        let permission = match self.permission.current() {
            PermissionState::Default => self.permission.request().await,
            decided => decided,
        };
        match permission {
            PermissionState::Granted => {}
            PermissionState::Denied => {
                self.record_failure("notification permission denied".to_string());
                return None;
            }
            PermissionState::Default => {
                self.record_failure("notification permission prompt dismissed".to_string());
                return None;
            }
            PermissionState::Unsupported => {
                self.record_failure("notifications unsupported".to_string());
                return None;
            }
        }

        self.fetch_token().await
    }

    /// Credential for an already granted permission; never prompts.
    pub async fn current_credential(&self) -> Option<MessagingCredential> {
        if !self.supported {
            return None;
        }
        if self.permission.current() != PermissionState::Granted {
            tracing::debug!("notification permission not granted; no credential");
            return None;
        }
        self.fetch_token().await
    }

    async fn fetch_token(&self) -> Option<MessagingCredential> {
        self.initialize().await;
        if !matches!(*self.init.lock().await, InitState::Ready { .. }) {
            return None;
        }

        match self.sdk.token().await {
            Ok(credential) if !credential.as_str().is_empty() => Some(credential),
            Ok(_) => {
                self.record_failure("messaging SDK returned an empty token".to_string());
                None
            }
            Err(err) => {
                self.record_failure(format!("failed to obtain messaging token: {err}"));
                None
            }
        }
    }

    /// Deregisters the foreground message listener.
    pub async fn shutdown(&self) {
        let mut init = self.init.lock().await;
        if let InitState::Ready { forwarder } = &*init {
            forwarder.abort();
        }
        *init = InitState::Uninitialized;
    }
}
