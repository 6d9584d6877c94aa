use std::pin::Pin;
use std::sync::Arc;

use crate::device::DeviceIdentityStore;
use crate::messaging::CredentialProvider;
use crate::ports::{
    ClientStateStore, CredentialRefresh, MessagingSdk, PermissionSource, RegistrationBackend,
};
use crate::registration::RegistrationClient;
use crate::types::device::{DeviceEnvironment, DeviceMetadata};
use crate::types::registration::{MessagingCredential, RegistrationResult, SkipReason};

/// Device identity + messaging credential + backend registration.
pub struct PushRegistrar<P, M, S, B> {
    provider: Arc<CredentialProvider<P, M>>,
    identity: DeviceIdentityStore<S>,
    client: RegistrationClient<B>,
    environment: DeviceEnvironment,
}

impl<P, M, S, B> PushRegistrar<P, M, S, B>
where
    P: PermissionSource,
    M: MessagingSdk,
    S: ClientStateStore,
    B: RegistrationBackend,
{
    pub fn new(
        provider: Arc<CredentialProvider<P, M>>,
        identity: DeviceIdentityStore<S>,
        client: RegistrationClient<B>,
        environment: DeviceEnvironment,
    ) -> Self {
        Self {
            provider,
            identity,
            client,
            environment,
        }
    }

    pub fn provider(&self) -> &Arc<CredentialProvider<P, M>> {
        &self.provider
    }

    /// Explicit "enable notifications" action; the result carries a toast message.
    pub async fn enable_notifications(&self) -> RegistrationResult {
        self.provider.initialize().await;
        self.register_current_device().await
    }

    /// Anonymous visitors are skipped before any permission prompt.
    pub async fn register_current_device(&self) -> RegistrationResult {
        if !self.client.session().is_authenticated() {
            return RegistrationResult::Skipped(SkipReason::NotAuthenticated);
        }
        let credential = self.provider.request_credential().await;
        self.register_with(credential).await
    }

    /// Re-registration after an update; only an already granted permission
    /// yields a credential.
    pub async fn refresh_registration(&self) -> RegistrationResult {
        if !self.client.session().is_authenticated() {
            return RegistrationResult::Skipped(SkipReason::NotAuthenticated);
        }
        self.provider.initialize().await;
        let credential = self.provider.current_credential().await;
        self.register_with(credential).await
    }

    async fn register_with(&self, credential: Option<MessagingCredential>) -> RegistrationResult {
        let device_id = self.identity.get_or_create_device_id();
        let metadata = DeviceMetadata::collect(device_id, &self.environment);
        self.client.register(credential.as_ref(), metadata).await
    }
}

impl<P, M, S, B> CredentialRefresh for PushRegistrar<P, M, S, B>
where
    P: PermissionSource,
    M: MessagingSdk,
    S: ClientStateStore,
    B: RegistrationBackend,
{
    type Fut<'a>
        = Pin<Box<dyn Future<Output = RegistrationResult> + Send + 'a>>
    where
        Self: 'a;
    type Shutdown<'a>
        = Pin<Box<dyn Future<Output = ()> + Send + 'a>>
    where
        Self: 'a;

    fn refresh<'a>(&'a self) -> Self::Fut<'a> {
        Box::pin(self.refresh_registration())
    }

    fn shutdown<'a>(&'a self) -> Self::Shutdown<'a> {
        Box::pin(self.provider.shutdown())
    }
}
