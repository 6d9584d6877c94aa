use std::sync::Arc;

use crate::config::LifecycleConfig;
use crate::detector::{PollHandle, UpdateDetector};
use crate::handoff::UpdateHandoffCoordinator;
use crate::lifecycle::{SubscriptionId, UpdateLifecycle};
use crate::ports::{
    ClientStateStore, CredentialRefresh, PageNavigator, TimeProvider, WorkerRegistration,
};
use crate::types::lifecycle::{WorkerEvent, WorkerUpdateState};

/// Detector → coordinator wiring for one page load.
pub struct LifecycleManager<W, T, N, S, R> {
    detector: UpdateDetector<W, T>,
    coordinator: Arc<UpdateHandoffCoordinator<W, T, N, S, R>>,
    refresher: Arc<R>,
    subscription: Option<SubscriptionId>,
    poll: Option<PollHandle>,
}

impl<W, T, N, S, R> LifecycleManager<W, T, N, S, R>
where
    W: WorkerRegistration,
    T: TimeProvider,
    N: PageNavigator,
    S: ClientStateStore,
    R: CredentialRefresh,
{
    pub fn new(
        registration: W,
        time: T,
        navigator: N,
        store: S,
        refresher: Arc<R>,
        config: &LifecycleConfig,
    ) -> Self {
        let lifecycle = Arc::new(UpdateLifecycle::new());
        let detector = UpdateDetector::new(
            registration.clone(),
            time.clone(),
            Arc::clone(&lifecycle),
            config,
        );
        let coordinator = Arc::new(UpdateHandoffCoordinator::new(
            registration,
            time,
            navigator,
            store,
            Arc::clone(&refresher),
            lifecycle,
            config,
        ));
        Self {
            detector,
            coordinator,
            refresher,
            subscription: None,
            poll: None,
        }
    }

    /// Does nothing beyond reporting `None` on platforms without worker support.
    pub async fn start(&mut self) -> WorkerUpdateState {
        if !self.detector.is_supported() {
            return WorkerUpdateState::None;
        }
        if self.subscription.is_none() {
            self.subscription = Some(self.coordinator.attach());
        }
        let state = self.detector.attach().await;
        if self.poll.is_none() {
            self.poll = self.detector.spawn_polling();
        }
        state
    }

    /// Forwards a worker lifecycle event from the host page.
    pub fn handle_event(&self, event: WorkerEvent) {
        self.detector.handle_event(event);
    }

    pub fn state(&self) -> WorkerUpdateState {
        self.detector.lifecycle().state()
    }

    pub fn coordinator(&self) -> &Arc<UpdateHandoffCoordinator<W, T, N, S, R>> {
        &self.coordinator
    }

    /// Cancels polling, stops surfacing prompts and deregisters the
    /// foreground message listener; an in-flight handoff still runs to
    /// completion.
    pub async fn teardown(&mut self) {
        if let Some(poll) = self.poll.take() {
            poll.cancel();
        }
        if let Some(id) = self.subscription.take() {
            self.coordinator.detach(id);
        }
        self.refresher.shutdown().await;
        tracing::debug!("lifecycle manager torn down");
    }
}
