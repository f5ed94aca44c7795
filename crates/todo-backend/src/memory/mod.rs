//! In-process backend.
//!
//! [`MemoryBackend`] holds the user registry, issued sessions and the task
//! table. Each [`MemoryClient`] is one connected client with its own session,
//! like one browser tab against the hosted service. Writes go through the
//! same access policy the hosted table enforces and are announced to every
//! open push-channel subscription.

mod auth;
mod tasks;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use tokio::sync::broadcast;
use uuid::Uuid;
use todo_auth::{Session, SessionChange};
use todo_core::{BackendError, Identity, Task, UserId};
use todo_sync::ChangeEvent;

/// Minimum accepted password length.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Lifetime of an issued access token, in seconds.
const SESSION_TTL_SECS: i64 = 3_600;

/// Behaviour switches for a [`MemoryBackend`].
#[derive(Clone, Debug)]
pub struct MemoryConfig {
    /// New users must confirm their email before signing in.
    pub require_email_confirmation: bool,
    /// Table name reported in change events.
    pub table: String,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            require_email_confirmation: false,
            table: "todos".to_string(),
        }
    }
}

/// Backend calls that can be made to fail with [`MemoryBackend::fail_next`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    /// `get_session`
    GetSession,
    /// `get_user`
    GetUser,
    /// `sign_up`
    SignUp,
    /// `sign_in_with_password`
    SignIn,
    /// `sign_out`
    SignOut,
    /// `resend`
    Resend,
    /// `select_all`
    Select,
    /// `insert`
    Insert,
    /// `update`
    Update,
    /// `delete`
    Delete,
    /// `subscribe`
    Subscribe,
}

struct UserRecord {
    identity: Identity,
    password_digest: String,
}

#[derive(Default)]
struct State {
    /// Keyed by lowercased email.
    users: HashMap<String, UserRecord>,
    /// Access token to user.
    sessions: HashMap<String, UserId>,
    rows: Vec<Task>,
    outbox: Vec<String>,
    faults: HashMap<Operation, String>,
    subscriptions: usize,
}

struct Shared {
    config: MemoryConfig,
    state: Mutex<State>,
    changes: broadcast::Sender<ChangeEvent>,
}

impl Shared {
    /// Consume an injected fault for `op`.
    fn check_fault(&self, op: Operation) -> Result<(), BackendError> {
        match self.state.lock().faults.remove(&op) {
            Some(message) => Err(BackendError::with_status(500, message)),
            None => Ok(()),
        }
    }

    fn user_for_token(&self, token: &str) -> Option<Identity> {
        let state = self.state.lock();
        let user_id = state.sessions.get(token)?;
        state
            .users
            .values()
            .find(|u| &u.identity.id == user_id)
            .map(|u| u.identity.clone())
    }

    fn announce(&self, event: ChangeEvent) {
        let _ = self.changes.send(event);
    }
}

/// The shared in-process service.
#[derive(Clone)]
pub struct MemoryBackend {
    shared: Arc<Shared>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new(MemoryConfig::default())
    }
}

impl MemoryBackend {
    /// Empty service with `config`.
    pub fn new(config: MemoryConfig) -> Self {
        let (changes, _) = broadcast::channel(256);
        Self {
            shared: Arc::new(Shared {
                config,
                state: Mutex::new(State::default()),
                changes,
            }),
        }
    }

    /// A new client with no session.
    pub fn client(&self) -> MemoryClient {
        let (session_changes, _) = broadcast::channel(32);
        MemoryClient {
            shared: Arc::clone(&self.shared),
            session: Mutex::new(None),
            session_changes,
        }
    }

    /// Make the next call of `op`, from any client, fail with `message`.
    pub fn fail_next(&self, op: Operation, message: impl Into<String>) {
        let _ = self.shared.state.lock().faults.insert(op, message.into());
    }

    /// Mark the user's email as confirmed, as following the emailed link
    /// would. Returns `false` for an unknown email.
    pub fn confirm_email(&self, email: &str) -> bool {
        let mut state = self.shared.state.lock();
        match state.users.get_mut(&email_key(email)) {
            Some(user) => {
                user.identity.email_confirmed_at = Some(Utc::now());
                true
            }
            None => false,
        }
    }

    /// Addresses confirmation messages were sent to, one entry per message.
    pub fn confirmations_sent(&self) -> Vec<String> {
        self.shared.state.lock().outbox.clone()
    }

    /// The task table as stored, ordered by category then `sort_order`.
    pub fn tasks(&self) -> Vec<Task> {
        let mut rows = self.shared.state.lock().rows.clone();
        todo_core::ordering::sort_tasks(&mut rows);
        rows
    }

    /// Number of open push-channel subscriptions.
    pub fn active_subscriptions(&self) -> usize {
        self.shared.state.lock().subscriptions
    }
}

/// One connected client of a [`MemoryBackend`].
///
/// Implements [`todo_auth::AuthService`], [`todo_sync::TaskStore`] and
/// [`todo_sync::ChangeFeed`].
pub struct MemoryClient {
    shared: Arc<Shared>,
    session: Mutex<Option<Session>>,
    session_changes: broadcast::Sender<SessionChange>,
}

impl MemoryClient {
    /// The identity behind this client's session, if the session is still
    /// valid at the service.
    fn current_user(&self) -> Option<Identity> {
        let token = self.session.lock().as_ref()?.access_token.clone();
        self.shared.user_for_token(&token)
    }

    fn emit(&self, change: SessionChange) {
        let _ = self.session_changes.send(change);
    }
}

fn email_key(email: &str) -> String {
    email.trim().to_lowercase()
}

fn password_digest(user_id: &UserId, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(user_id.as_str().as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn issue_session(state: &mut State, user: Identity) -> Session {
    let access_token = format!("mem-at-{}", Uuid::now_v7().simple());
    let refresh_token = format!("mem-rt-{}", Uuid::now_v7().simple());
    let _ = state.sessions.insert(access_token.clone(), user.id.clone());
    Session {
        access_token,
        refresh_token,
        expires_at: Utc::now().timestamp() + SESSION_TTL_SECS,
        user,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
