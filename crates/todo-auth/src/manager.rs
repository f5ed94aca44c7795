//! Session state manager.
//!
//! Tracks the current identity and its confirmation status. On start it
//! subscribes to session-change notifications, then fetches the persisted
//! session; afterwards every notification replaces the local state, so
//! sign-in/out elsewhere is reflected without polling. State only moves on
//! backend notifications and explicit sign-in/out calls.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use todo_core::{Identity, IdentitySource};
use tracing::{debug, info, instrument, warn};

use crate::errors::AuthError;
use crate::service::AuthService;
use crate::types::{ResendKind, Session, SessionChange, SessionState, SessionStatus, SignUpOutcome};

/// Owns the session state for one client.
///
/// Create with [`SessionManager::start`] inside a tokio runtime; tear down with
/// [`SessionManager::shutdown`] (also done on drop).
pub struct SessionManager {
    service: Arc<dyn AuthService>,
    state: Arc<watch::Sender<SessionState>>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl SessionManager {
    /// Begin tracking the session behind `service`.
    ///
    /// Returns immediately in the `Loading` state; use [`ready`](Self::ready)
    /// to wait for the persisted session to be resolved.
    pub fn start(service: Arc<dyn AuthService>) -> Self {
        let (tx, _rx) = watch::channel(SessionState::Loading);
        let state = Arc::new(tx);
        let changes = service.on_session_change();
        let listener = tokio::spawn(run_listener(
            Arc::clone(&service),
            Arc::clone(&state),
            changes,
        ));
        Self {
            service,
            state,
            listener: Mutex::new(Some(listener)),
        }
    }

    /// Current state snapshot.
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Flattened status.
    pub fn status(&self) -> SessionStatus {
        self.state.borrow().status()
    }

    /// Whether the persisted session is still being fetched.
    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading()
    }

    /// The active session.
    pub fn session(&self) -> Option<Session> {
        self.state.borrow().session().cloned()
    }

    /// The signed-in identity.
    pub fn identity(&self) -> Option<Identity> {
        self.state.borrow().identity().cloned()
    }

    /// Whether the signed-in identity has confirmed its email.
    ///
    /// `false` while signed out or loading.
    pub fn is_email_confirmed(&self) -> bool {
        self.state
            .borrow()
            .identity()
            .is_some_and(Identity::is_email_confirmed)
    }

    /// Observe state changes.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Wait until the initial fetch has resolved and return the state.
    pub async fn ready(&self) -> SessionState {
        let mut rx = self.state.subscribe();
        match rx.wait_for(|s| !s.is_loading()).await {
            Ok(state) => state.clone(),
            Err(_) => self.state(),
        }
    }

    /// Register a new identity.
    ///
    /// When the service requires confirmation the outcome carries no session
    /// and the manager stays unauthenticated.
    #[instrument(skip_all)]
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, AuthError> {
        validate_credentials(email, password)?;
        let outcome = self.service.sign_up(email.trim(), password).await?;
        if let Some(session) = &outcome.session {
            self.replace(SessionState::SignedIn(session.clone()));
        } else {
            info!("sign-up pending email confirmation");
        }
        Ok(outcome)
    }

    /// Authenticate and hold the resulting session.
    #[instrument(skip_all)]
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        validate_credentials(email, password)?;
        let session = self
            .service
            .sign_in_with_password(email.trim(), password)
            .await?;
        info!(user_id = %session.user.id, "signed in");
        self.replace(SessionState::SignedIn(session.clone()));
        Ok(session)
    }

    /// Invalidate the local session.
    ///
    /// The local state is cleared even when the service call fails; the
    /// failure is still returned.
    #[instrument(skip_all)]
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        let result = self.service.sign_out().await;
        self.replace(SessionState::SignedOut);
        if let Err(ref e) = result {
            warn!(error = %e, "sign-out failed at the auth service");
        }
        result.map_err(AuthError::from)
    }

    /// Re-trigger the sign-up confirmation message.
    #[instrument(skip_all)]
    pub async fn resend_confirmation_email(&self, email: &str) -> Result<(), AuthError> {
        let email = email.trim();
        if email.is_empty() {
            return Err(AuthError::InvalidInput("email is required".to_string()));
        }
        self.service.resend(ResendKind::Signup, email).await?;
        Ok(())
    }

    /// Stop listening for session changes.
    pub fn shutdown(&self) {
        if let Some(handle) = self.listener.lock().take() {
            handle.abort();
            debug!("session listener stopped");
        }
    }

    fn replace(&self, next: SessionState) {
        let _ = self.state.send_replace(next);
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl IdentitySource for SessionManager {
    fn current_identity(&self) -> Option<Identity> {
        self.identity()
    }
}

fn validate_credentials(email: &str, password: &str) -> Result<(), AuthError> {
    if email.trim().is_empty() || password.is_empty() {
        return Err(AuthError::InvalidInput(
            "email and password are required".to_string(),
        ));
    }
    Ok(())
}

/// Resolve the persisted session, then apply notifications until the
/// service closes the channel.
async fn run_listener(
    service: Arc<dyn AuthService>,
    state: Arc<watch::Sender<SessionState>>,
    mut changes: broadcast::Receiver<SessionChange>,
) {
    let initial = match service.get_session().await {
        Ok(session) => session,
        Err(e) => {
            warn!(error = %e, "failed to fetch persisted session");
            None
        }
    };
    // An explicit sign-in that finished first wins over the stale fetch.
    let _ = state.send_if_modified(|current| {
        if current.is_loading() {
            *current = SessionState::from_session(initial);
            true
        } else {
            false
        }
    });

    loop {
        match changes.recv().await {
            Ok(change) => {
                debug!(event = ?change.event, "session change");
                let _ = state.send_replace(SessionState::from_session(change.session));
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!(lagged = n, "session listener lagged, refetching session");
                match service.get_session().await {
                    Ok(session) => {
                        let _ = state.send_replace(SessionState::from_session(session));
                    }
                    Err(e) => warn!(error = %e, "session refetch failed"),
                }
            }
            Err(broadcast::error::RecvError::Closed) => {
                debug!("session change channel closed");
                break;
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
