use crate::Result;
use crate::ports::BoxFuture;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    Accepted,
    Dismissed,
}

/// Deferred install offer held by the hosting platform.
pub trait InstallSource: Send + Sync + 'static {
    /// True when the app already runs as an installed window.
    fn is_standalone(&self) -> bool;

    /// Shows the platform install dialog and reports the user's choice.
    fn prompt(&self) -> BoxFuture<'_, Result<InstallOutcome>>;
}
