//! Update prompt and the skip-waiting → controller-changed → reload handoff.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use url::Url;

use crate::config::LifecycleConfig;
use crate::lifecycle::{SubscriptionId, UpdateLifecycle};
use crate::policy::DismissalPolicy;
use crate::ports::{
    ClientStateStore, CredentialRefresh, PageNavigator, TimeProvider, WorkerRegistration,
};
use crate::types::dismissal::{DismissalMode, PromptKind};
use crate::types::lifecycle::WorkerUpdateState;
use crate::types::registration::RegistrationResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadTrigger {
    ControllerChanged,
    FallbackTimeout,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandoffOutcome {
    /// Another handoff already owns this page load.
    AlreadyInProgress,
    Reloaded { trigger: ReloadTrigger, url: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpdatePromptState {
    pub visible: bool,
    /// False once "Update Now" has been pressed.
    pub trigger_enabled: bool,
}

pub struct UpdateHandoffCoordinator<W, T, N, S, R> {
    registration: W,
    time: T,
    navigator: N,
    policy: DismissalPolicy<S, T>,
    refresher: Arc<R>,
    lifecycle: Arc<UpdateLifecycle>,
    fallback: Duration,
    cache_bust_param: String,
    prompt_visible: AtomicBool,
    in_flight: AtomicBool,
}

impl<W, T, N, S, R> UpdateHandoffCoordinator<W, T, N, S, R>
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
        lifecycle: Arc<UpdateLifecycle>,
        config: &LifecycleConfig,
    ) -> Self {
        Self {
            registration,
            policy: DismissalPolicy::new(store, time.clone(), config),
            time,
            navigator,
            refresher,
            lifecycle,
            fallback: config.handoff_fallback,
            cache_bust_param: config.cache_bust_param.clone(),
            prompt_visible: AtomicBool::new(false),
            in_flight: AtomicBool::new(false),
        }
    }

    /// Surfaces the prompt whenever the lifecycle reaches `Waiting`.
    pub fn attach(self: &Arc<Self>) -> SubscriptionId {
        let coordinator: Weak<Self> = Arc::downgrade(self);
        let id = self.lifecycle.on_transition(move |state| {
            if state == WorkerUpdateState::Waiting
                && let Some(coordinator) = coordinator.upgrade()
            {
                coordinator.on_waiting();
            }
        });
        if self.lifecycle.state() == WorkerUpdateState::Waiting {
            self.on_waiting();
        }
        id
    }

    pub fn detach(&self, id: SubscriptionId) {
        self.lifecycle.unsubscribe(id);
    }

    /// Returns whether the prompt is now shown.
    pub fn on_waiting(&self) -> bool {
        if self.in_flight.load(Ordering::SeqCst) {
            return true;
        }
        if !self.policy.should_prompt(PromptKind::Update) {
            tracing::debug!("update prompt suppressed by dismissal policy");
            return false;
        }
        if !self.prompt_visible.swap(true, Ordering::SeqCst) {
            tracing::info!("showing update prompt");
        }
        true
    }

    pub fn prompt_state(&self) -> UpdatePromptState {
        UpdatePromptState {
            visible: self.prompt_visible.load(Ordering::SeqCst),
            trigger_enabled: !self.in_flight.load(Ordering::SeqCst),
        }
    }

    pub fn dismiss(&self, mode: DismissalMode) {
        if self.in_flight.load(Ordering::SeqCst) {
            return;
        }
        self.policy.record_dismissal(PromptKind::Update, mode);
        self.prompt_visible.store(false, Ordering::SeqCst);
    }

    /// "Update Now". Only the first call per page load runs the handoff; it
    /// cannot be cancelled once the skip-waiting instruction is on its way.
    pub async fn confirm_update(&self) -> HandoffOutcome {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            tracing::debug!("update handoff already in progress");
            return HandoffOutcome::AlreadyInProgress;
        }
        if let Err(err) = self.lifecycle.transition(WorkerUpdateState::Activating) {
            tracing::debug!(error = %err, "handoff started outside waiting state");
        }

        let trigger = self.await_takeover().await;
        self.policy.clear(PromptKind::Update);
        let url = self.reload();
        self.prompt_visible.store(false, Ordering::SeqCst);
        HandoffOutcome::Reloaded { trigger, url }
    }

    /// Races the handshake (including re-registration) against the fallback
    /// timer; the loser is dropped, so only one path reaches the reload.
    async fn await_takeover(&self) -> ReloadTrigger {
        let took_control = AtomicBool::new(false);
        let controller_changed = self.registration.controller_changed();
        let fallback = self.time.sleep(self.fallback);

        let handshake = async {
            if let Err(err) = self.registration.skip_waiting().await {
                tracing::warn!(error = %err, "failed to send skip-waiting; relying on fallback");
            }
            controller_changed.await;
            took_control.store(true, Ordering::SeqCst);
            if let Err(err) = self.lifecycle.transition(WorkerUpdateState::Activated) {
                tracing::debug!(error = %err, "unexpected lifecycle state on controller change");
            }
            self.reregister().await;
        };

        tokio::select! {
            () = handshake => {}
            () = fallback => {
                if took_control.load(Ordering::SeqCst) {
                    tracing::warn!("re-registration still running at fallback deadline; reloading");
                } else {
                    tracing::warn!(
                        fallback_ms = self.fallback.as_millis() as u64,
                        "controller did not change in time; forcing reload"
                    );
                }
            }
        }

        if took_control.load(Ordering::SeqCst) {
            ReloadTrigger::ControllerChanged
        } else {
            ReloadTrigger::FallbackTimeout
        }
    }

    /// Never fails the handoff.
    async fn reregister(&self) {
        match self.refresher.refresh().await {
            RegistrationResult::Registered => tracing::info!("push credential re-registered after update"),
            RegistrationResult::Skipped(reason) => {
                tracing::debug!(?reason, "push re-registration skipped after update");
            }
            RegistrationResult::Failed { reason } => {
                tracing::warn!(%reason, "push re-registration failed after update");
            }
        }
    }

    fn reload(&self) -> String {
        let current = self.navigator.current_url();
        let target = cache_busting_url(&current, &self.cache_bust_param, self.time.now_millis());
        tracing::info!(url = %target, "reloading after update");
        self.navigator.navigate(&target);
        target
    }
}

/// Replaces any previous marker so repeated reloads do not accumulate params.
/// The rest of the query is kept byte for byte.
pub fn cache_busting_url(current: &str, param: &str, marker: i64) -> String {
    match Url::parse(current) {
        Ok(mut url) => {
            let query = marked_query(url.query(), param, marker);
            url.set_query(Some(&query));
            url.into()
        }
        Err(err) => {
            tracing::debug!(error = %err, url = current, "relative url; appending marker textually");
            let (base, fragment) = match current.split_once('#') {
                Some((base, fragment)) => (base, Some(fragment)),
                None => (current, None),
            };
            let (path, query) = match base.split_once('?') {
                Some((path, query)) => (path, Some(query)),
                None => (base, None),
            };
            let mut target = format!("{path}?{}", marked_query(query, param, marker));
            if let Some(fragment) = fragment {
                target.push('#');
                target.push_str(fragment);
            }
            target
        }
    }
}

fn marked_query(query: Option<&str>, param: &str, marker: i64) -> String {
    let marker = format!("{param}={marker}");
    query
        .unwrap_or_default()
        .split('&')
        .filter(|segment| !segment.is_empty() && segment.split('=').next() != Some(param))
        .chain(std::iter::once(marker.as_str()))
        .collect::<Vec<_>>()
        .join("&")
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;
    use crate::adapters::{MemoryStateStore, TokioTimeProvider};
    use crate::policy::{UPDATE_DISMISSED_KEY, UPDATE_LATER_KEY};
    use crate::ports::BoxFuture;
    use crate::types::lifecycle::RegistrationStatus;
    use std::pin::Pin;
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Notify;
    use tokio::time::Instant;

    #[derive(Clone, Default)]
    struct TestRegistration {
        skip_waiting_calls: Arc<AtomicUsize>,
        controller: Arc<Notify>,
    }

    impl WorkerRegistration for TestRegistration {
        fn is_supported(&self) -> bool {
            true
        }

        fn ready(&self) -> BoxFuture<'_, crate::Result<RegistrationStatus>> {
            Box::pin(async { Ok(RegistrationStatus::default()) })
        }

        fn update(&self) -> BoxFuture<'_, crate::Result<()>> {
            Box::pin(async { Ok(()) })
        }

        fn skip_waiting(&self) -> BoxFuture<'_, crate::Result<()>> {
            self.skip_waiting_calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(async { Ok(()) })
        }

        fn controller_changed(&self) -> BoxFuture<'_, ()> {
            let controller = Arc::clone(&self.controller);
            Box::pin(async move { controller.notified().await })
        }
    }

    #[derive(Clone)]
    struct TestNavigator {
        url: String,
        navigations: Arc<Mutex<Vec<(Instant, String)>>>,
    }

    impl TestNavigator {
        fn new(url: &str) -> Self {
            Self {
                url: url.to_string(),
                navigations: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn navigations(&self) -> Vec<(Instant, String)> {
            self.navigations.lock().expect("navigations lock").clone()
        }
    }

    impl PageNavigator for TestNavigator {
        fn current_url(&self) -> String {
            self.url.clone()
        }

        fn navigate(&self, url: &str) {
            self.navigations
                .lock()
                .expect("navigations lock")
                .push((Instant::now(), url.to_string()));
        }
    }

    #[derive(Default)]
    struct TestRefresher {
        calls: AtomicUsize,
        hang: bool,
    }

    impl CredentialRefresh for TestRefresher {
        type Fut<'a>
            = Pin<Box<dyn Future<Output = RegistrationResult> + Send + 'a>>
        where
            Self: 'a;
        type Shutdown<'a>
            = std::future::Ready<()>
        where
            Self: 'a;

        fn shutdown<'a>(&'a self) -> Self::Shutdown<'a> {
            std::future::ready(())
        }

        fn refresh<'a>(&'a self) -> Self::Fut<'a> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let hang = self.hang;
            Box::pin(async move {
                if hang {
                    std::future::pending::<()>().await;
                }
                RegistrationResult::Failed {
                    reason: "backend responded with status 500".to_string(),
                }
            })
        }
    }

    type TestCoordinator = UpdateHandoffCoordinator<
        TestRegistration,
        TokioTimeProvider,
        TestNavigator,
        MemoryStateStore,
        TestRefresher,
    >;

    struct Harness {
        registration: TestRegistration,
        navigator: TestNavigator,
        store: MemoryStateStore,
        refresher: Arc<TestRefresher>,
        lifecycle: Arc<UpdateLifecycle>,
        coordinator: Arc<TestCoordinator>,
    }

    /// The paused clock lands on timer ticks, so allow for millisecond rounding.
    fn assert_elapsed(elapsed: Duration, expected: Duration) {
        assert!(
            elapsed >= expected && elapsed < expected + Duration::from_millis(5),
            "elapsed {elapsed:?}, expected about {expected:?}"
        );
    }

    fn harness(refresher: TestRefresher) -> Harness {
        let registration = TestRegistration::default();
        let navigator = TestNavigator::new("https://app.example/dashboard?tab=wallet");
        let store = MemoryStateStore::new();
        let refresher = Arc::new(refresher);
        let lifecycle = Arc::new(UpdateLifecycle::new());
        let coordinator = Arc::new(UpdateHandoffCoordinator::new(
            registration.clone(),
            TokioTimeProvider,
            navigator.clone(),
            store.clone(),
            Arc::clone(&refresher),
            Arc::clone(&lifecycle),
            &LifecycleConfig::default(),
        ));
        Harness {
            registration,
            navigator,
            store,
            refresher,
            lifecycle,
            coordinator,
        }
    }

    #[test]
    fn attach__should_show_prompt_on_waiting() {
        // Given
        let harness = harness(TestRefresher::default());
        harness.coordinator.attach();

        // When
        harness
            .lifecycle
            .transition(WorkerUpdateState::Waiting)
            .expect("waiting");

        // Then
        assert_eq!(
            harness.coordinator.prompt_state(),
            UpdatePromptState {
                visible: true,
                trigger_enabled: true
            }
        );
    }

    #[test]
    fn attach__should_respect_permanent_dismissal() {
        // Given
        let harness = harness(TestRefresher::default());
        harness
            .store
            .set(UPDATE_DISMISSED_KEY, "true")
            .expect("set");
        harness.coordinator.attach();

        // When
        harness
            .lifecycle
            .transition(WorkerUpdateState::Waiting)
            .expect("waiting");

        // Then
        assert!(!harness.coordinator.prompt_state().visible);
    }

    #[test]
    fn dismiss__should_hide_prompt_and_record_later() {
        // Given
        let harness = harness(TestRefresher::default());
        harness.coordinator.attach();
        harness
            .lifecycle
            .transition(WorkerUpdateState::Waiting)
            .expect("waiting");

        // When
        harness.coordinator.dismiss(DismissalMode::Later);

        // Then
        assert!(!harness.coordinator.prompt_state().visible);
        assert!(harness.store.get(UPDATE_LATER_KEY).expect("get").is_some());
        assert!(!harness.coordinator.on_waiting());
    }

    #[tokio::test(start_paused = true)]
    async fn confirm_update__should_send_skip_waiting_once_for_double_click() {
        // Given
        let harness = harness(TestRefresher::default());
        harness.coordinator.attach();
        harness
            .lifecycle
            .transition(WorkerUpdateState::Waiting)
            .expect("waiting");
        let controller = Arc::clone(&harness.registration.controller);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            controller.notify_one();
        });

        // When
        let (first, second) = tokio::join!(
            harness.coordinator.confirm_update(),
            harness.coordinator.confirm_update()
        );

        // Then
        let outcomes = [first, second];
        let reloaded = outcomes
            .iter()
            .filter(|outcome| matches!(outcome, HandoffOutcome::Reloaded { .. }))
            .count();
        let rejected = outcomes
            .iter()
            .filter(|outcome| **outcome == HandoffOutcome::AlreadyInProgress)
            .count();
        assert_eq!((reloaded, rejected), (1, 1));
        assert_eq!(
            harness.registration.skip_waiting_calls.load(Ordering::SeqCst),
            1
        );
        assert_eq!(harness.navigator.navigations().len(), 1);
        assert!(!harness.coordinator.prompt_state().trigger_enabled);
    }

    #[tokio::test(start_paused = true)]
    async fn confirm_update__should_reload_once_when_controller_changes_first() {
        // Given
        let harness = harness(TestRefresher::default());
        let start = Instant::now();
        let controller = Arc::clone(&harness.registration.controller);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            controller.notify_one();
        });

        // When
        let outcome = harness.coordinator.confirm_update().await;
        tokio::time::sleep(Duration::from_secs(10)).await;

        // Then
        let navigations = harness.navigator.navigations();
        assert_eq!(navigations.len(), 1);
        assert_elapsed(navigations[0].0 - start, Duration::from_secs(1));
        assert!(matches!(
            outcome,
            HandoffOutcome::Reloaded {
                trigger: ReloadTrigger::ControllerChanged,
                ..
            }
        ));
        assert_eq!(harness.refresher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn confirm_update__should_fall_back_after_four_seconds_on_stall() {
        // Given
        let harness = harness(TestRefresher::default());
        let start = Instant::now();

        // When
        let outcome = harness.coordinator.confirm_update().await;
        tokio::time::sleep(Duration::from_secs(10)).await;

        // Then
        let navigations = harness.navigator.navigations();
        assert_eq!(navigations.len(), 1);
        assert_elapsed(navigations[0].0 - start, Duration::from_secs(4));
        assert!(matches!(
            outcome,
            HandoffOutcome::Reloaded {
                trigger: ReloadTrigger::FallbackTimeout,
                ..
            }
        ));
        assert_eq!(harness.refresher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn confirm_update__should_not_wait_for_hung_reregistration() {
        // Given
        let harness = harness(TestRefresher {
            hang: true,
            ..TestRefresher::default()
        });
        harness
            .lifecycle
            .transition(WorkerUpdateState::Waiting)
            .expect("waiting");
        let start = Instant::now();
        let controller = Arc::clone(&harness.registration.controller);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            controller.notify_one();
        });

        // When
        let outcome = harness.coordinator.confirm_update().await;

        // Then
        let navigations = harness.navigator.navigations();
        assert_eq!(navigations.len(), 1);
        assert_elapsed(navigations[0].0 - start, Duration::from_secs(4));
        assert!(matches!(
            outcome,
            HandoffOutcome::Reloaded {
                trigger: ReloadTrigger::ControllerChanged,
                ..
            }
        ));
        assert_eq!(harness.lifecycle.state(), WorkerUpdateState::Activated);
    }

    #[tokio::test(start_paused = true)]
    async fn confirm_update__should_clear_update_dismissals() {
        // Given
        let harness = harness(TestRefresher::default());
        harness
            .store
            .set(UPDATE_LATER_KEY, "1700000000000")
            .expect("set");
        harness
            .store
            .set(UPDATE_DISMISSED_KEY, "true")
            .expect("set");

        // When
        harness.coordinator.confirm_update().await;

        // Then
        assert_eq!(harness.store.get(UPDATE_LATER_KEY).expect("get"), None);
        assert_eq!(harness.store.get(UPDATE_DISMISSED_KEY).expect("get"), None);
    }

    #[test]
    fn cache_busting_url__should_append_marker_and_keep_query() {
        let url = cache_busting_url("https://app.example/dashboard?tab=wallet#top", "_v", 42);

        assert_eq!(url, "https://app.example/dashboard?tab=wallet&_v=42#top");
    }

    #[test]
    fn cache_busting_url__should_replace_previous_marker() {
        let url = cache_busting_url("https://app.example/?_v=1&lang=en", "_v", 2);

        assert_eq!(url, "https://app.example/?lang=en&_v=2");
    }

    #[test]
    fn cache_busting_url__should_keep_raw_query_segments() {
        let url = cache_busting_url(
            "https://app.example/search?flag&q=a+b%20c&_v=1#top",
            "_v",
            5,
        );

        assert_eq!(url, "https://app.example/search?flag&q=a+b%20c&_v=5#top");
    }

    #[test]
    fn cache_busting_url__should_handle_relative_paths() {
        assert_eq!(cache_busting_url("/dashboard", "_v", 7), "/dashboard?_v=7");
        assert_eq!(
            cache_busting_url("/dashboard?tab=1#x", "_v", 7),
            "/dashboard?tab=1&_v=7#x"
        );
        assert_eq!(
            cache_busting_url("/dashboard?_v=3&flag", "_v", 7),
            "/dashboard?flag&_v=7"
        );
    }
}
