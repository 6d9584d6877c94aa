use std::collections::BTreeMap;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use time::OffsetDateTime;

use crate::config::BackendConfig;
use crate::ports;
use crate::types::registration::RegistrationRequest;
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioTimeProvider;

impl ports::TimeProvider for TokioTimeProvider {
    type Sleep<'a>
        = tokio::time::Sleep
    where
        Self: 'a;

    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }

    fn sleep<'a>(&'a self, duration: Duration) -> Self::Sleep<'a> {
        tokio::time::sleep(duration)
    }
}

/// Process-local storage; shared between clones.
#[derive(Debug, Clone, Default)]
pub struct MemoryStateStore {
    entries: Arc<Mutex<BTreeMap<String, String>>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulates the user wiping site data.
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, String>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ports::ClientStateStore for MemoryStateStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.lock().remove(key);
        Ok(())
    }
}

/// Storage persisted as a flat JSON object on disk.
///
/// Every operation re-reads the file, so separate processes observe each
/// other's writes with last-write-wins semantics.
#[derive(Debug, Clone)]
pub struct JsonFileStateStore {
    path: PathBuf,
}

impl JsonFileStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn load(&self) -> Result<BTreeMap<String, String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) if contents.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(err) => Err(err.into()),
        }
    }

    fn save(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.path, contents)?;
        Ok(())
    }
}

impl ports::ClientStateStore for JsonFileStateStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.load()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.load()?;
        entries.insert(key.to_string(), value.to_string());
        self.save(&entries)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.load()?;
        if entries.remove(key).is_some() {
            self.save(&entries)?;
        }
        Ok(())
    }
}

/// `POST /push-token` over the session-authenticated HTTP API.
#[derive(Clone)]
pub struct HttpRegistrationBackend {
    client: reqwest::Client,
    endpoint: url::Url,
    csrf_token: Option<String>,
    session_cookie: Option<String>,
}

impl HttpRegistrationBackend {
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            endpoint: config.push_token_url()?,
            csrf_token: config.csrf_token.clone(),
            session_cookie: config.session_cookie.clone(),
        })
    }
}

impl ports::RegistrationBackend for HttpRegistrationBackend {
    type Error = Error;
    type Fut<'a>
        = Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>
    where
        Self: 'a;

    fn register<'a>(&'a self, request: &'a RegistrationRequest) -> Self::Fut<'a> {
        Box::pin(async move {
            let mut builder = self
                .client
                .post(self.endpoint.clone())
                .header("Accept", "application/json")
                .header("X-Requested-With", "XMLHttpRequest")
                .json(request);
            if let Some(token) = self.csrf_token.as_deref() {
                builder = builder.header("X-CSRF-TOKEN", token);
            }
            if let Some(cookie) = self.session_cookie.as_deref() {
                builder = builder.header("Cookie", cookie);
            }

            let response = builder.send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(Error::Registration(format!(
                    "backend responded with status {status}"
                )));
            }
            Ok(())
        })
    }
}
