//! Update state machine shared by the detector and the handoff coordinator.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::types::lifecycle::WorkerUpdateState;
use crate::{Error, Result};

type TransitionCallback = Arc<dyn Fn(WorkerUpdateState) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Exactly one state is live per page load.
pub struct UpdateLifecycle {
    state: Mutex<WorkerUpdateState>,
    subscribers: Mutex<Vec<(SubscriptionId, TransitionCallback)>>,
    next_id: AtomicU64,
}

impl Default for UpdateLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for UpdateLifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateLifecycle")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl UpdateLifecycle {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(WorkerUpdateState::None),
            subscribers: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(0),
        }
    }

    pub fn state(&self) -> WorkerUpdateState {
        *self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Callbacks run synchronously, after the state is updated, outside any lock.
    pub fn on_transition<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(WorkerUpdateState) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((id, Arc::new(callback)));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .retain(|(existing, _)| *existing != id);
    }

    pub fn transition(&self, next: WorkerUpdateState) -> Result<()> {
        {
            let mut state = self
                .state
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            let from = *state;
            if !from.can_transition_to(next) {
                return Err(Error::InvalidTransition { from, to: next });
            }
            tracing::debug!(%from, to = %next, "update lifecycle transition");
            *state = next;
        }

        let callbacks: Vec<TransitionCallback> = self
            .subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect();
        for callback in callbacks {
            callback(next);
        }
        Ok(())
    }
}
