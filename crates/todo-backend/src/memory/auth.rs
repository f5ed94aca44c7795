//! Auth service over the in-process registry.

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::broadcast;
use todo_auth::{AuthChangeEvent, AuthService, ResendKind, Session, SessionChange, SignUpOutcome};
use todo_core::{BackendError, Identity, UserId};
use tracing::{debug, instrument};

use super::{MIN_PASSWORD_LEN, MemoryClient, Operation, UserRecord, email_key, issue_session, password_digest};

#[async_trait]
impl AuthService for MemoryClient {
    async fn get_session(&self) -> Result<Option<Session>, BackendError> {
        self.shared.check_fault(Operation::GetSession)?;
        let Some(mut session) = self.session.lock().clone() else {
            return Ok(None);
        };
        match self.shared.user_for_token(&session.access_token) {
            Some(user) => {
                session.user = user;
                Ok(Some(session))
            }
            None => {
                debug!("stored session was revoked");
                *self.session.lock() = None;
                Ok(None)
            }
        }
    }

    fn on_session_change(&self) -> broadcast::Receiver<SessionChange> {
        self.session_changes.subscribe()
    }

    #[instrument(skip_all)]
    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, BackendError> {
        self.shared.check_fault(Operation::SignUp)?;
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(BackendError::with_status(
                422,
                format!("Password should be at least {MIN_PASSWORD_LEN} characters."),
            )
            .code("weak_password"));
        }

        let key = email_key(email);
        let require_confirmation = self.shared.config.require_email_confirmation;
        let mut state = self.shared.state.lock();
        if state.users.contains_key(&key) {
            return Err(BackendError::with_status(422, "User already registered").code("user_already_exists"));
        }

        let id = UserId::generate();
        let identity = Identity {
            id: id.clone(),
            email: key.clone(),
            email_confirmed_at: (!require_confirmation).then(Utc::now),
        };
        let _ = state.users.insert(
            key.clone(),
            UserRecord {
                identity: identity.clone(),
                password_digest: password_digest(&id, password),
            },
        );

        if require_confirmation {
            state.outbox.push(key);
            return Ok(SignUpOutcome {
                user: Some(identity),
                session: None,
            });
        }

        let session = issue_session(&mut state, identity.clone());
        drop(state);
        *self.session.lock() = Some(session.clone());
        self.emit(SessionChange::signed_in(AuthChangeEvent::SignedIn, session.clone()));
        Ok(SignUpOutcome {
            user: Some(identity),
            session: Some(session),
        })
    }

    #[instrument(skip_all)]
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, BackendError> {
        self.shared.check_fault(Operation::SignIn)?;
        let invalid = || BackendError::with_status(400, "Invalid login credentials").code("invalid_credentials");

        let mut state = self.shared.state.lock();
        let identity = {
            let user = state.users.get(&email_key(email)).ok_or_else(invalid)?;
            if user.password_digest != password_digest(&user.identity.id, password) {
                return Err(invalid());
            }
            if self.shared.config.require_email_confirmation && !user.identity.is_email_confirmed() {
                return Err(BackendError::with_status(400, "Email not confirmed").code("email_not_confirmed"));
            }
            user.identity.clone()
        };
        let session = issue_session(&mut state, identity);
        drop(state);

        *self.session.lock() = Some(session.clone());
        self.emit(SessionChange::signed_in(AuthChangeEvent::SignedIn, session.clone()));
        Ok(session)
    }

    #[instrument(skip_all)]
    async fn sign_out(&self) -> Result<(), BackendError> {
        self.shared.check_fault(Operation::SignOut)?;
        let session = self.session.lock().take();
        if let Some(session) = session {
            let _ = self.shared.state.lock().sessions.remove(&session.access_token);
        }
        self.emit(SessionChange::signed_out());
        Ok(())
    }

    async fn resend(&self, _kind: ResendKind, email: &str) -> Result<(), BackendError> {
        self.shared.check_fault(Operation::Resend)?;
        let key = email_key(email);
        let mut state = self.shared.state.lock();
        let pending = state
            .users
            .get(&key)
            .is_some_and(|u| !u.identity.is_email_confirmed());
        // Unknown or already-confirmed addresses are accepted silently.
        if pending {
            state.outbox.push(key);
        }
        Ok(())
    }

    async fn get_user(&self) -> Result<Option<Identity>, BackendError> {
        self.shared.check_fault(Operation::GetUser)?;
        Ok(self.current_user())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
