use crate::ports::RegistrationBackend;
use crate::types::device::DeviceMetadata;
use crate::types::registration::{
    MessagingCredential, RegistrationRequest, RegistrationResult, Session, SkipReason,
};

/// Sends `(token, device_info)` to the backend, which deduplicates on
/// `(device_id, token)`; calling this repeatedly is expected.
#[derive(Debug, Clone)]
pub struct RegistrationClient<B> {
    backend: B,
    session: Session,
}

impl<B: RegistrationBackend> RegistrationClient<B> {
    pub fn new(backend: B, session: Session) -> Self {
        Self { backend, session }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub async fn register(
        &self,
        credential: Option<&MessagingCredential>,
        device_info: DeviceMetadata,
    ) -> RegistrationResult {
        if !self.session.is_authenticated() {
            tracing::debug!("registration skipped: no authenticated user");
            return RegistrationResult::Skipped(SkipReason::NotAuthenticated);
        }
        let Some(credential) = credential else {
            tracing::debug!("registration skipped: no messaging credential");
            return RegistrationResult::Skipped(SkipReason::NoCredential);
        };

        let request = RegistrationRequest {
            token: credential.as_str().to_string(),
            device_info,
        };
        match self.backend.register(&request).await {
            Ok(()) => {
                tracing::info!(
                    device_id = %request.device_info.device_id,
                    "push credential registered"
                );
                RegistrationResult::Registered
            }
            Err(err) => {
                tracing::error!(
                    error = %err,
                    device_id = %request.device_info.device_id,
                    "push credential registration failed"
                );
                RegistrationResult::Failed {
                    reason: err.to_string(),
                }
            }
        }
    }
}
