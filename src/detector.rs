use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::config::LifecycleConfig;
use crate::lifecycle::UpdateLifecycle;
use crate::ports::{TimeProvider, WorkerRegistration};
use crate::types::lifecycle::{WorkerEvent, WorkerState, WorkerUpdateState};

/// Periodic `update()` poll; aborted on `cancel` or drop.
pub struct PollHandle {
    handle: JoinHandle<()>,
}

impl PollHandle {
    pub fn cancel(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Watches the worker registration until an update is installed and waiting.
pub struct UpdateDetector<W, T> {
    registration: W,
    time: T,
    lifecycle: Arc<UpdateLifecycle>,
    poll_interval: Duration,
    supported: bool,
}

impl<W, T> UpdateDetector<W, T>
where
    W: WorkerRegistration,
    T: TimeProvider,
{
    /// Platform support is checked here, once.
    pub fn new(
        registration: W,
        time: T,
        lifecycle: Arc<UpdateLifecycle>,
        config: &LifecycleConfig,
    ) -> Self {
        let supported = registration.is_supported();
        if !supported {
            tracing::info!("background workers unsupported; update detection disabled");
        }
        Self {
            registration,
            time,
            lifecycle,
            poll_interval: config.poll_interval,
            supported,
        }
    }

    pub fn is_supported(&self) -> bool {
        self.supported
    }

    pub fn lifecycle(&self) -> &Arc<UpdateLifecycle> {
        &self.lifecycle
    }

    /// Picks up an update that arrived before any listener was attached.
    pub async fn attach(&self) -> WorkerUpdateState {
        if !self.supported {
            return self.lifecycle.state();
        }
        match self.registration.ready().await {
            Ok(status) if status.has_waiting && status.has_controller => {
                tracing::info!("worker already waiting on attach");
                self.advance(WorkerUpdateState::Waiting);
            }
            // A waiting worker without a controller is a first install.
            Ok(_) => {}
            Err(err) => tracing::warn!(error = %err, "worker registration never became ready"),
        }
        self.lifecycle.state()
    }

    pub fn handle_event(&self, event: WorkerEvent) {
        if !self.supported {
            return;
        }
        let current = self.lifecycle.state();
        match event {
            WorkerEvent::UpdateFound if current == WorkerUpdateState::None => {
                self.advance(WorkerUpdateState::Installing);
            }
            WorkerEvent::StateChanged {
                state: WorkerState::Installed,
                has_controller: true,
            } if matches!(
                current,
                WorkerUpdateState::None | WorkerUpdateState::Installing
            ) =>
            {
                tracing::info!("new worker installed and waiting");
                self.advance(WorkerUpdateState::Waiting);
            }
            // No controller means a first install, not an update.
            WorkerEvent::StateChanged {
                state: WorkerState::Installed,
                has_controller: false,
            }
            | WorkerEvent::StateChanged {
                state: WorkerState::Redundant,
                ..
            } if current == WorkerUpdateState::Installing => {
                self.advance(WorkerUpdateState::None);
            }
            other => tracing::trace!(?other, %current, "worker event ignored"),
        }
    }

    fn advance(&self, next: WorkerUpdateState) {
        if let Err(err) = self.lifecycle.transition(next) {
            tracing::debug!(error = %err, "stale worker event");
        }
    }

    /// Returns `None` when the platform has no worker support.
    pub fn spawn_polling(&self) -> Option<PollHandle> {
        if !self.supported {
            return None;
        }
        let registration = self.registration.clone();
        let time = self.time.clone();
        let interval = self.poll_interval;
        let handle = tokio::spawn(async move {
            loop {
                time.sleep(interval).await;
                match registration.update().await {
                    Ok(()) => tracing::trace!("polled worker registration for updates"),
                    Err(err) => tracing::warn!(error = %err, "worker update poll failed"),
                }
            }
        });
        Some(PollHandle { handle })
    }
}
