use serde::{Deserialize, Serialize};

/// Where the page stands in the update handoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerUpdateState {
    #[default]
    None,
    Installing,
    Waiting,
    Activating,
    Activated,
}

impl WorkerUpdateState {
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::None, Self::Installing)
                | (Self::None, Self::Waiting)
                | (Self::Installing, Self::Waiting)
                | (Self::Installing, Self::None)
                | (Self::Waiting, Self::Activating)
                | (Self::Activating, Self::Activated)
        )
    }
}

impl std::fmt::Display for WorkerUpdateState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => f.write_str("none"),
            Self::Installing => f.write_str("installing"),
            Self::Waiting => f.write_str("waiting"),
            Self::Activating => f.write_str("activating"),
            Self::Activated => f.write_str("activated"),
        }
    }
}

/// Lifecycle stage of an individual background worker, as the platform reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    Installing,
    Installed,
    Activating,
    Activated,
    Redundant,
}

/// Synthetic or forwarded worker lifecycle event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerEvent {
    UpdateFound,
    StateChanged {
        state: WorkerState,
        has_controller: bool,
    },
}

/// Snapshot of the registration once it becomes ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RegistrationStatus {
    pub has_waiting: bool,
    pub has_controller: bool,
}
