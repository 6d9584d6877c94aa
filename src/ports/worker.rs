use crate::Result;
use crate::ports::BoxFuture;
use crate::types::lifecycle::RegistrationStatus;

/// The page's background worker registration.
pub trait WorkerRegistration: Clone + Send + Sync + 'static {
    fn is_supported(&self) -> bool;

    /// Resolves once the registration is ready.
    fn ready(&self) -> BoxFuture<'_, Result<RegistrationStatus>>;

    /// Asks the platform to check for a new worker script.
    fn update(&self) -> BoxFuture<'_, Result<()>>;

    /// Posts the skip-waiting instruction to the waiting worker.
    fn skip_waiting(&self) -> BoxFuture<'_, Result<()>>;

    /// Resolves when a new worker takes control of the page.
    fn controller_changed(&self) -> BoxFuture<'_, ()>;
}
