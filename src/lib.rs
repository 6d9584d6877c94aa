//! Update & notification lifecycle manager for an installable web app.
//!
//! Detects a waiting background worker, hands control over to it, re-registers
//! the push credential and reloads the page, with prompts gated by persisted
//! dismissal choices. Platform capabilities enter through [`ports`].

pub mod adapters;
pub mod config;
pub mod detector;
pub mod device;
mod error;
pub mod handoff;
pub mod install;
pub mod lifecycle;
pub mod manager;
pub mod messaging;
pub mod policy;
pub mod ports;
pub mod registrar;
pub mod registration;
pub mod types;

pub use error::{Error, Result};
pub use handoff::{HandoffOutcome, ReloadTrigger, UpdateHandoffCoordinator};
pub use manager::LifecycleManager;
pub use policy::DismissalPolicy;
pub use registrar::PushRegistrar;
