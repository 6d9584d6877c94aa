use tokio::sync::mpsc;

use crate::Result;
use crate::ports::BoxFuture;
use crate::types::messaging::{ForegroundMessage, PermissionState};
use crate::types::registration::MessagingCredential;

/// Native notification permission.
pub trait PermissionSource: Send + Sync + 'static {
    /// Cached decision, never prompts.
    fn current(&self) -> PermissionState;

    /// Shows the native prompt when the state is still `Default`.
    fn request(&self) -> BoxFuture<'_, PermissionState>;
}

/// Platform push-messaging SDK.
pub trait MessagingSdk: Send + Sync + 'static {
    fn is_supported(&self) -> bool;

    /// Registers the messaging worker and returns the foreground message stream.
    fn initialize(&self) -> BoxFuture<'_, Result<mpsc::UnboundedReceiver<ForegroundMessage>>>;

    fn token(&self) -> BoxFuture<'_, Result<MessagingCredential>>;
}
