//! Error types for the lifecycle manager

use thiserror::Error;

use crate::types::lifecycle::WorkerUpdateState;

/// Result type alias for lifecycle operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised at component seams
///
/// Components never let these escape to the page; they are logged or folded
/// into user-facing result values at the boundary.
#[derive(Debug, Error)]
pub enum Error {
    /// Durable client storage unavailable or rejected a write
    #[error("storage error: {0}")]
    Storage(String),

    /// Background worker registration failure
    #[error("worker error: {0}")]
    Worker(String),

    /// Messaging SDK failure
    #[error("messaging error: {0}")]
    Messaging(String),

    /// Backend rejected or never received a registration
    #[error("registration error: {0}")]
    Registration(String),

    /// Platform install dialog failure
    #[error("install error: {0}")]
    Install(String),

    /// Lifecycle transition not allowed by the update state machine
    #[error("invalid lifecycle transition: {from} -> {to}")]
    InvalidTransition {
        from: WorkerUpdateState,
        to: WorkerUpdateState,
    },

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// URL error
    #[error("url error: {0}")]
    Url(#[from] url::ParseError),
}
