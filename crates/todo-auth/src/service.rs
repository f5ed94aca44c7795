//! Auth service contract.
//!
//! The hosted auth service owns signup, signin, session persistence and email
//! confirmation. Implementations live in `todo-backend`; tests use mocks.

use async_trait::async_trait;
use tokio::sync::broadcast;
use todo_core::{BackendError, Identity};

use crate::types::{ResendKind, Session, SessionChange, SignUpOutcome};

/// Client-side handle to the auth service.
#[async_trait]
pub trait AuthService: Send + Sync {
    /// The persisted session, if one survives from a previous run.
    async fn get_session(&self) -> Result<Option<Session>, BackendError>;

    /// Subscribe to session changes made anywhere (this client, token
    /// refresh, revocation). Dropping the receiver unsubscribes.
    fn on_session_change(&self) -> broadcast::Receiver<SessionChange>;

    /// Register a new user.
    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, BackendError>;

    /// Authenticate with email and password.
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, BackendError>;

    /// End the current session.
    async fn sign_out(&self) -> Result<(), BackendError>;

    /// Re-send a confirmation message.
    async fn resend(&self, kind: ResendKind, email: &str) -> Result<(), BackendError>;

    /// The user behind the current session, verified by the service.
    async fn get_user(&self) -> Result<Option<Identity>, BackendError>;
}
