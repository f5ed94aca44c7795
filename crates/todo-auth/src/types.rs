//! Session and auth-event types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use todo_core::Identity;

/// An authenticated session issued by the auth service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Bearer token for data and push-channel calls.
    pub access_token: String,
    /// Token used to obtain a fresh session after expiry.
    pub refresh_token: String,
    /// Expiry as unix seconds.
    pub expires_at: i64,
    /// The signed-in user.
    pub user: Identity,
}

impl Session {
    /// Whether the access token has expired at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.expires_at
    }
}

/// Result of a sign-up.
///
/// When the service requires email confirmation no session is issued and the
/// new user is not authenticated yet.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignUpOutcome {
    /// The registered user, when the service returns it.
    pub user: Option<Identity>,
    /// Present only when no confirmation step is required.
    pub session: Option<Session>,
}

impl SignUpOutcome {
    /// Whether the user must confirm their email before a session exists.
    #[must_use]
    pub fn confirmation_required(&self) -> bool {
        self.session.is_none()
    }
}

/// What happened to the session, as reported by the auth service.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthChangeEvent {
    /// A persisted session was restored.
    InitialSession,
    /// A session was established.
    SignedIn,
    /// The session ended (explicit sign-out, revocation, failed refresh).
    SignedOut,
    /// The access token was refreshed.
    TokenRefreshed,
    /// User attributes changed (e.g. email confirmed).
    UserUpdated,
}

/// A session-change notification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionChange {
    /// What happened.
    pub event: AuthChangeEvent,
    /// The session after the change (`None` when signed out).
    pub session: Option<Session>,
}

impl SessionChange {
    /// Notification for a newly established or refreshed session.
    pub fn signed_in(event: AuthChangeEvent, session: Session) -> Self {
        Self {
            event,
            session: Some(session),
        }
    }

    /// Notification for the end of a session.
    pub fn signed_out() -> Self {
        Self {
            event: AuthChangeEvent::SignedOut,
            session: None,
        }
    }
}

/// Which confirmation message to resend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResendKind {
    /// Sign-up confirmation.
    Signup,
}

/// Session state held by the manager.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum SessionState {
    /// The persisted session has not been fetched yet.
    #[default]
    Loading,
    /// No session.
    SignedOut,
    /// An active session.
    SignedIn(Session),
}

impl SessionState {
    /// State for an optional session.
    pub fn from_session(session: Option<Session>) -> Self {
        session.map_or(Self::SignedOut, Self::SignedIn)
    }

    /// Whether the initial fetch is still pending.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    /// The active session, if any.
    #[must_use]
    pub fn session(&self) -> Option<&Session> {
        match self {
            Self::SignedIn(session) => Some(session),
            Self::Loading | Self::SignedOut => None,
        }
    }

    /// The signed-in identity, if any.
    #[must_use]
    pub fn identity(&self) -> Option<&Identity> {
        self.session().map(|s| &s.user)
    }

    /// Flattened status for display.
    #[must_use]
    pub fn status(&self) -> SessionStatus {
        match self {
            Self::Loading => SessionStatus::Loading,
            Self::SignedOut => SessionStatus::Unauthenticated,
            Self::SignedIn(session) => SessionStatus::Authenticated {
                confirmed: session.user.is_email_confirmed(),
            },
        }
    }
}

/// `loading → {authenticated, unauthenticated}`, with the authenticated
/// state split by email confirmation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionStatus {
    /// Initial fetch pending.
    Loading,
    /// No session.
    Unauthenticated,
    /// Signed in.
    Authenticated {
        /// Whether the user's email is confirmed.
        confirmed: bool,
    },
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
