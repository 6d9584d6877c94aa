use std::pin::Pin;

pub mod install;
pub mod messaging;
pub mod page;
pub mod push;
pub mod storage;
pub mod time;
pub mod worker;

pub use install::{InstallOutcome, InstallSource};
pub use messaging::{MessagingSdk, PermissionSource};
pub use page::PageNavigator;
pub use push::{CredentialRefresh, RegistrationBackend};
pub use storage::ClientStateStore;
pub use time::TimeProvider;
pub use worker::WorkerRegistration;

/// Boxed future used by ports with more than one async operation.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
