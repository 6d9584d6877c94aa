use crate::types::registration::{RegistrationRequest, RegistrationResult};

pub trait RegistrationBackend: Clone + Send + Sync + 'static {
    type Error: std::fmt::Display + Send + Sync + 'static;
    type Fut<'a>: Future<Output = Result<(), Self::Error>> + Send + 'a
    where
        Self: 'a;

    fn register<'a>(&'a self, request: &'a RegistrationRequest) -> Self::Fut<'a>;
}

/// Re-initializes messaging and re-registers the current device.
pub trait CredentialRefresh: Send + Sync + 'static {
    type Fut<'a>: Future<Output = RegistrationResult> + Send + 'a
    where
        Self: 'a;
    type Shutdown<'a>: Future<Output = ()> + Send + 'a
    where
        Self: 'a;

    /// Never shows a permission prompt.
    fn refresh<'a>(&'a self) -> Self::Fut<'a>;

    /// Stops foreground message delivery.
    fn shutdown<'a>(&'a self) -> Self::Shutdown<'a>;
}
