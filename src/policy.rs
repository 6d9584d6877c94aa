//! Dismissal/backoff gating for the install and update prompts.

use time::OffsetDateTime;

use crate::config::LifecycleConfig;
use crate::ports::{ClientStateStore, TimeProvider};
use crate::types::dismissal::{DismissalMode, DismissalRecord, PromptKind};

pub const INSTALL_DISMISSED_KEY: &str = "pwaPromptDismissed";
pub const INSTALL_LATER_KEY: &str = "pwaPromptLater";
pub const UPDATE_DISMISSED_KEY: &str = "pwaUpdateDismissed";
pub const UPDATE_LATER_KEY: &str = "pwaUpdateLater";

const PERMANENT_FLAG: &str = "true";

fn permanent_key(kind: PromptKind) -> &'static str {
    match kind {
        PromptKind::Install => INSTALL_DISMISSED_KEY,
        PromptKind::Update => UPDATE_DISMISSED_KEY,
    }
}

fn later_key(kind: PromptKind) -> &'static str {
    match kind {
        PromptKind::Install => INSTALL_LATER_KEY,
        PromptKind::Update => UPDATE_LATER_KEY,
    }
}

#[derive(Debug, Clone)]
pub struct DismissalPolicy<S, T> {
    store: S,
    time: T,
    install_cooldown: time::Duration,
    update_cooldown: time::Duration,
}

impl<S, T> DismissalPolicy<S, T>
where
    S: ClientStateStore,
    T: TimeProvider,
{
    pub fn new(store: S, time: T, config: &LifecycleConfig) -> Self {
        Self {
            store,
            time,
            install_cooldown: config.install_cooldown,
            update_cooldown: config.update_cooldown,
        }
    }

    fn cooldown(&self, kind: PromptKind) -> time::Duration {
        match kind {
            PromptKind::Install => self.install_cooldown,
            PromptKind::Update => self.update_cooldown,
        }
    }

    /// Deletes an expired "later" record as a side effect.
    ///
    /// Unreadable storage never suppresses a prompt.
    pub fn should_prompt(&self, kind: PromptKind) -> bool {
        match self.store.get(permanent_key(kind)) {
            Ok(Some(flag)) if flag == PERMANENT_FLAG => return false,
            Ok(_) => {}
            Err(err) => {
                tracing::warn!(%kind, error = %err, "failed to read permanent dismissal");
            }
        }

        let raw = match self.store.get(later_key(kind)) {
            Ok(Some(raw)) => raw,
            Ok(None) => return true,
            Err(err) => {
                tracing::warn!(%kind, error = %err, "failed to read later dismissal");
                return true;
            }
        };

        if let Some(dismissed_at) = parse_millis(&raw)
            && self.time.now() - dismissed_at < self.cooldown(kind)
        {
            return false;
        }

        tracing::debug!(%kind, "later dismissal expired");
        if let Err(err) = self.store.remove(later_key(kind)) {
            tracing::warn!(%kind, error = %err, "failed to remove expired dismissal");
        }
        true
    }

    /// Overwrites any prior record of the same kind and mode.
    pub fn record_dismissal(&self, kind: PromptKind, mode: DismissalMode) {
        let result = match mode {
            DismissalMode::Later => self
                .store
                .set(later_key(kind), &self.time.now_millis().to_string()),
            DismissalMode::Permanent => self.store.set(permanent_key(kind), PERMANENT_FLAG),
        };
        if let Err(err) = result {
            tracing::warn!(%kind, ?mode, error = %err, "failed to record dismissal");
        }
    }

    /// Called after a successful install or update handoff.
    pub fn clear(&self, kind: PromptKind) {
        for key in [later_key(kind), permanent_key(kind)] {
            if let Err(err) = self.store.remove(key) {
                tracing::warn!(%kind, key, error = %err, "failed to clear dismissal");
            }
        }
    }

    /// Stored records for `kind`, without touching them.
    pub fn records(&self, kind: PromptKind) -> Vec<DismissalRecord> {
        let mut records = Vec::new();
        if let Ok(Some(flag)) = self.store.get(permanent_key(kind))
            && flag == PERMANENT_FLAG
        {
            records.push(DismissalRecord {
                mode: DismissalMode::Permanent,
                timestamp: None,
            });
        }
        if let Ok(Some(raw)) = self.store.get(later_key(kind)) {
            records.push(DismissalRecord {
                mode: DismissalMode::Later,
                timestamp: parse_millis(&raw),
            });
        }
        records
    }
}

fn parse_millis(raw: &str) -> Option<OffsetDateTime> {
    let millis: i64 = raw.trim().parse().ok()?;
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000).ok()
}
