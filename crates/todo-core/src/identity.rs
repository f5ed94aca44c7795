//! Authenticated identity and the seam the synchronizer reads it through.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::UserId;

/// An authenticated user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Opaque user id.
    pub id: UserId,
    /// Sign-in email.
    #[serde(default)]
    pub email: String,
    /// Set once the user has followed the confirmation link.
    #[serde(default)]
    pub email_confirmed_at: Option<DateTime<Utc>>,
}

impl Identity {
    /// Whether the confirmation timestamp is set.
    #[must_use]
    pub fn is_email_confirmed(&self) -> bool {
        self.email_confirmed_at.is_some()
    }
}

/// Source of the currently known identity.
///
/// Implemented by the session manager; mutation paths read it synchronously
/// before doing any optimistic work.
pub trait IdentitySource: Send + Sync {
    /// The current identity, or `None` while signed out or still loading.
    fn current_identity(&self) -> Option<Identity>;
}

impl<T: IdentitySource + ?Sized> IdentitySource for Arc<T> {
    fn current_identity(&self) -> Option<Identity> {
        (**self).current_identity()
    }
}

/// Fixed identity, for tools and tests that act as one user.
#[derive(Clone, Debug, Default)]
pub struct StaticIdentity(pub Option<Identity>);

impl IdentitySource for StaticIdentity {
    fn current_identity(&self) -> Option<Identity> {
        self.0.clone()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
