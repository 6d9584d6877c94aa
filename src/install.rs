use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::config::LifecycleConfig;
use crate::policy::DismissalPolicy;
use crate::ports::{ClientStateStore, InstallOutcome, InstallSource, TimeProvider};
use crate::types::dismissal::{DismissalMode, PromptKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallResult {
    Installed,
    Declined,
    /// No deferred offer is held, or it was already used.
    Unavailable,
    AlreadyInProgress,
    Failed { reason: String },
}

/// Install prompt: captures the platform's deferred offer and shows it
/// subject to the dismissal policy.
pub struct InstallPromptCoordinator<I, S, T> {
    source: I,
    policy: DismissalPolicy<S, T>,
    time: T,
    auto_show_delay: Duration,
    offer_available: AtomicBool,
    visible: AtomicBool,
    installing: AtomicBool,
    installed: AtomicBool,
}

impl<I, S, T> InstallPromptCoordinator<I, S, T>
where
    I: InstallSource,
    S: ClientStateStore,
    T: TimeProvider,
{
    pub fn new(source: I, store: S, time: T, config: &LifecycleConfig) -> Self {
        let installed = source.is_standalone();
        Self {
            source,
            policy: DismissalPolicy::new(store, time.clone(), config),
            time,
            auto_show_delay: config.install_auto_show_delay,
            offer_available: AtomicBool::new(false),
            visible: AtomicBool::new(false),
            installing: AtomicBool::new(false),
            installed: AtomicBool::new(installed),
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible.load(Ordering::SeqCst)
    }

    /// The platform handed over a deferred install offer.
    pub fn on_install_available(&self) {
        if self.installed.load(Ordering::SeqCst) {
            tracing::debug!("install offer ignored: app already installed");
            return;
        }
        self.offer_available.store(true, Ordering::SeqCst);
    }

    /// Waits the auto-show delay, then shows the prompt if still allowed.
    pub async fn auto_show(&self) -> bool {
        self.time.sleep(self.auto_show_delay).await;
        self.show()
    }

    pub fn show(&self) -> bool {
        if self.installed.load(Ordering::SeqCst)
            || !self.offer_available.load(Ordering::SeqCst)
            || self.installing.load(Ordering::SeqCst)
        {
            return false;
        }
        if !self.policy.should_prompt(PromptKind::Install) {
            tracing::debug!("install prompt suppressed by dismissal policy");
            return false;
        }
        if !self.visible.swap(true, Ordering::SeqCst) {
            tracing::info!("showing install prompt");
        }
        true
    }

    pub fn dismiss(&self, mode: DismissalMode) {
        self.policy.record_dismissal(PromptKind::Install, mode);
        self.visible.store(false, Ordering::SeqCst);
    }

    /// "Install". A declined native dialog counts as a "later" dismissal.
    pub async fn install(&self) -> InstallResult {
        if !self.offer_available.load(Ordering::SeqCst) {
            return InstallResult::Unavailable;
        }
        if self.installing.swap(true, Ordering::SeqCst) {
            return InstallResult::AlreadyInProgress;
        }

        let result = match self.source.prompt().await {
            Ok(InstallOutcome::Accepted) => {
                tracing::info!("install accepted");
                self.mark_installed();
                InstallResult::Installed
            }
            Ok(InstallOutcome::Dismissed) => {
                tracing::info!("install dialog dismissed");
                self.policy
                    .record_dismissal(PromptKind::Install, DismissalMode::Later);
                InstallResult::Declined
            }
            Err(err) => {
                tracing::warn!(error = %err, "install prompt failed");
                InstallResult::Failed {
                    reason: err.to_string(),
                }
            }
        };
        // A deferred offer can only be used once.
        self.offer_available.store(false, Ordering::SeqCst);
        self.visible.store(false, Ordering::SeqCst);
        self.installing.store(false, Ordering::SeqCst);
        result
    }

    /// The platform reported the app as installed by any route.
    pub fn on_app_installed(&self) {
        self.mark_installed();
        self.offer_available.store(false, Ordering::SeqCst);
        self.visible.store(false, Ordering::SeqCst);
    }

    fn mark_installed(&self) {
        self.installed.store(true, Ordering::SeqCst);
        self.policy.clear(PromptKind::Install);
    }
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::adapters::{MemoryStateStore, TokioTimeProvider};
    use crate::policy::{INSTALL_DISMISSED_KEY, INSTALL_LATER_KEY};
    use crate::ports::BoxFuture;
    use std::sync::atomic::AtomicUsize;
    use std::sync::{Arc, Mutex};

    struct TestSource {
        standalone: bool,
        outcome: Mutex<Option<crate::Result<InstallOutcome>>>,
        prompts: Arc<AtomicUsize>,
    }

    impl TestSource {
        fn answering(outcome: crate::Result<InstallOutcome>) -> Self {
            Self {
                standalone: false,
                outcome: Mutex::new(Some(outcome)),
                prompts: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl InstallSource for TestSource {
        fn is_standalone(&self) -> bool {
            self.standalone
        }

        fn prompt(&self) -> BoxFuture<'_, crate::Result<InstallOutcome>> {
            self.prompts.fetch_add(1, Ordering::SeqCst);
            let outcome = self
                .outcome
                .lock()
                .expect("outcome lock")
                .take()
                .unwrap_or(Ok(InstallOutcome::Dismissed));
            Box::pin(async move {
                tokio::time::sleep(Duration::from_millis(100)).await;
                outcome
            })
        }
    }

    fn coordinator(
        source: TestSource,
        store: &MemoryStateStore,
    ) -> InstallPromptCoordinator<TestSource, MemoryStateStore, TokioTimeProvider> {
        InstallPromptCoordinator::new(
            source,
            store.clone(),
            TokioTimeProvider,
            &LifecycleConfig::default(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn auto_show__should_show_after_delay_when_offer_available() {
        // Given
        let store = MemoryStateStore::new();
        let coordinator = coordinator(TestSource::answering(Ok(InstallOutcome::Accepted)), &store);
        coordinator.on_install_available();
        let start = tokio::time::Instant::now();

        // When
        let shown = coordinator.auto_show().await;

        // Then
        assert!(shown);
        assert!(coordinator.is_visible());
        assert!(start.elapsed() >= Duration::from_secs(3));
    }

    #[test]
    fn show__should_not_show_without_offer_or_when_standalone() {
        // Given
        let store = MemoryStateStore::new();
        let without_offer = coordinator(TestSource::answering(Ok(InstallOutcome::Accepted)), &store);
        let standalone = coordinator(
            TestSource {
                standalone: true,
                ..TestSource::answering(Ok(InstallOutcome::Accepted))
            },
            &store,
        );
        standalone.on_install_available();

        // Then
        assert!(!without_offer.show());
        assert!(!standalone.show());
    }

    #[test]
    fn show__should_respect_later_dismissal() {
        // Given
        let store = MemoryStateStore::new();
        let coordinator = coordinator(TestSource::answering(Ok(InstallOutcome::Accepted)), &store);
        coordinator.on_install_available();
        assert!(coordinator.show());

        // When
        coordinator.dismiss(DismissalMode::Later);

        // Then
        assert!(!coordinator.is_visible());
        assert!(!coordinator.show());
        assert!(store.get(INSTALL_LATER_KEY).expect("get").is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn install__should_clear_dismissals_and_prompt_once() {
        // Given
        let store = MemoryStateStore::new();
        store.set(INSTALL_DISMISSED_KEY, "true").expect("set");
        store.set(INSTALL_LATER_KEY, "1700000000000").expect("set");
        let source = TestSource::answering(Ok(InstallOutcome::Accepted));
        let prompts = Arc::clone(&source.prompts);
        let coordinator = coordinator(source, &store);
        coordinator.on_install_available();

        // When
        let (first, second) = tokio::join!(coordinator.install(), coordinator.install());

        // Then
        let mut results = vec![first, second];
        results.sort_by_key(|result| matches!(result, InstallResult::Installed));
        assert_eq!(
            results,
            vec![InstallResult::AlreadyInProgress, InstallResult::Installed]
        );
        assert_eq!(prompts.load(Ordering::SeqCst), 1);
        assert_eq!(store.get(INSTALL_DISMISSED_KEY).expect("get"), None);
        assert_eq!(store.get(INSTALL_LATER_KEY).expect("get"), None);
        assert!(!coordinator.show());
        assert_eq!(coordinator.install().await, InstallResult::Unavailable);
    }

    #[tokio::test(start_paused = true)]
    async fn install__should_record_later_when_declined() {
        // Given
        let store = MemoryStateStore::new();
        let coordinator = coordinator(TestSource::answering(Ok(InstallOutcome::Dismissed)), &store);
        coordinator.on_install_available();

        // When
        let result = coordinator.install().await;

        // Then
        assert_eq!(result, InstallResult::Declined);
        assert!(store.get(INSTALL_LATER_KEY).expect("get").is_some());
        assert_eq!(coordinator.install().await, InstallResult::Unavailable);
    }

    #[tokio::test(start_paused = true)]
    async fn install__should_report_platform_failure() {
        // Given
        let store = MemoryStateStore::new();
        let coordinator = coordinator(
            TestSource::answering(Err(Error::Install("prompt already used".to_string()))),
            &store,
        );
        coordinator.on_install_available();

        // When
        let result = coordinator.install().await;

        // Then
        assert!(
            matches!(result, InstallResult::Failed { reason } if reason.contains("prompt already used"))
        );
    }

    #[test]
    fn on_app_installed__should_hide_prompt_and_clear_records() {
        // Given
        let store = MemoryStateStore::new();
        let coordinator = coordinator(TestSource::answering(Ok(InstallOutcome::Accepted)), &store);
        coordinator.on_install_available();
        coordinator.show();
        store.set(INSTALL_LATER_KEY, "1700000000000").expect("set");

        // When
        coordinator.on_app_installed();

        // Then
        assert!(!coordinator.is_visible());
        assert_eq!(store.get(INSTALL_LATER_KEY).expect("get"), None);
        coordinator.on_install_available();
        assert!(!coordinator.show());
    }
}
