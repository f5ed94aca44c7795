//! Hosted backend adapter.
//!
//! [`RestBackend`] speaks the hosted service's three surfaces:
//! - auth under `/auth/v1` ([`todo_auth::AuthService`])
//! - the task table under `/rest/v1/<table>` ([`todo_sync::TaskStore`])
//! - the push channel at `/realtime/v1/websocket` ([`todo_sync::ChangeFeed`])
//!
//! Every request carries the project's anon key in the `apikey` header. The
//! `Authorization` bearer is the session's access token once signed in, and
//! the anon key before that.

mod auth;
mod client;
mod data;
mod realtime;
pub mod session_file;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::broadcast;
use todo_auth::{Session, SessionChange};
use todo_core::BackendError;
use todo_settings::TodoSettings;

pub use realtime::Frame;

/// Connection settings for a [`RestBackend`].
#[derive(Clone, Debug)]
pub struct RestConfig {
    /// Project base URL, e.g. `https://xyz.example.co`.
    pub url: String,
    /// Public (anon) API key.
    pub anon_key: String,
    /// Task table name.
    pub table: String,
    /// Push-channel heartbeat period.
    pub heartbeat_interval: Duration,
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// Where the session is persisted; `None` keeps it in memory only.
    pub session_path: Option<PathBuf>,
}

impl RestConfig {
    /// Build from loaded settings.
    pub fn from_settings(settings: &TodoSettings) -> Self {
        Self {
            url: settings.backend.url.trim_end_matches('/').to_string(),
            anon_key: settings.backend.anon_key.clone(),
            table: settings.backend.table.clone(),
            heartbeat_interval: Duration::from_millis(settings.backend.heartbeat_interval_ms),
            request_timeout: Duration::from_millis(settings.backend.request_timeout_ms),
            session_path: settings
                .session
                .persist
                .then(|| todo_settings::session_path(settings)),
        }
    }
}

struct Inner {
    config: RestConfig,
    http: reqwest::Client,
    session: RwLock<Option<Session>>,
    session_changes: broadcast::Sender<SessionChange>,
}

/// Client for the hosted service. Cheap to clone; clones share the session.
#[derive(Clone)]
pub struct RestBackend {
    inner: Arc<Inner>,
}

impl RestBackend {
    /// Create a client. No request is made until the first call.
    pub fn new(config: RestConfig) -> Result<Self, BackendError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| BackendError::new(format!("failed to build HTTP client: {e}")))?;
        let (session_changes, _) = broadcast::channel(32);
        Ok(Self {
            inner: Arc::new(Inner {
                config,
                http,
                session: RwLock::new(None),
                session_changes,
            }),
        })
    }

    /// The configuration in use.
    pub fn config(&self) -> &RestConfig {
        &self.inner.config
    }

    /// The session currently held in memory.
    pub fn current_session(&self) -> Option<Session> {
        self.inner.session.read().clone()
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.inner.config.url.trim_end_matches('/'))
    }

    /// Access token when signed in, anon key otherwise.
    fn bearer(&self) -> String {
        self.inner
            .session
            .read()
            .as_ref()
            .map_or_else(|| self.inner.config.anon_key.clone(), |s| s.access_token.clone())
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.inner
            .http
            .request(method, self.endpoint(path))
            .header("apikey", &self.inner.config.anon_key)
            .bearer_auth(self.bearer())
    }
}
