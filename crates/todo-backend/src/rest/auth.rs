//! Auth surface (`/auth/v1`) and session persistence.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Method;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::broadcast;
use todo_auth::{AuthChangeEvent, AuthService, ResendKind, Session, SessionChange, SignUpOutcome};
use todo_core::{BackendError, Identity};
use tracing::{debug, info, instrument, warn};

use super::RestBackend;
use super::client::{check, read_json, transport_error};
use super::session_file;

/// Token grant response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: i64,
    #[serde(default)]
    expires_at: Option<i64>,
    user: Identity,
}

impl TokenResponse {
    fn into_session(self) -> Session {
        let expires_at = self
            .expires_at
            .unwrap_or_else(|| Utc::now().timestamp() + self.expires_in);
        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
            user: self.user,
        }
    }
}

impl RestBackend {
    /// Hold `session`, persist it, and announce `event`.
    fn install(&self, session: Session, event: AuthChangeEvent) {
        if let Some(path) = &self.inner.config.session_path {
            if let Err(e) = session_file::save_session(path, &session) {
                warn!(error = %e, "session not persisted");
            }
        }
        *self.inner.session.write() = Some(session.clone());
        let _ = self
            .inner
            .session_changes
            .send(SessionChange::signed_in(event, session));
    }

    /// Drop the session from memory and disk, and announce the sign-out.
    fn discard(&self) {
        *self.inner.session.write() = None;
        if let Some(path) = &self.inner.config.session_path {
            session_file::clear_session(path);
        }
        let _ = self.inner.session_changes.send(SessionChange::signed_out());
    }

    async fn grant(&self, grant_type: &str, body: Value) -> Result<Session, BackendError> {
        let resp = self
            .request(Method::POST, "/auth/v1/token")
            .query(&[("grant_type", grant_type)])
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(&e))?;
        let token: TokenResponse = read_json(resp).await?;
        Ok(token.into_session())
    }

    /// Trade the refresh token for a new session.
    #[instrument(skip_all)]
    pub async fn refresh_session(&self, session: &Session) -> Result<Session, BackendError> {
        self.grant(
            "refresh_token",
            json!({ "refresh_token": session.refresh_token }),
        )
        .await
    }
}

#[async_trait]
impl AuthService for RestBackend {
    #[instrument(skip_all)]
    async fn get_session(&self) -> Result<Option<Session>, BackendError> {
        let held = self.current_session();
        let restored = held.is_none();
        let candidate = held.or_else(|| {
            self.inner
                .config
                .session_path
                .as_deref()
                .and_then(session_file::load_session)
        });
        let Some(session) = candidate else {
            return Ok(None);
        };

        if !session.is_expired_at(Utc::now()) {
            if restored {
                debug!(user_id = %session.user.id, "restored persisted session");
                *self.inner.session.write() = Some(session.clone());
            }
            return Ok(Some(session));
        }

        match self.refresh_session(&session).await {
            Ok(fresh) => {
                info!(user_id = %fresh.user.id, "session refreshed");
                self.install(fresh.clone(), AuthChangeEvent::TokenRefreshed);
                Ok(Some(fresh))
            }
            // Offline: keep the stale session for a later attempt.
            Err(e) if e.status == 0 => Err(e),
            Err(e) => {
                warn!(error = %e, "session refresh rejected, signing out");
                self.discard();
                Ok(None)
            }
        }
    }

    fn on_session_change(&self) -> broadcast::Receiver<SessionChange> {
        self.inner.session_changes.subscribe()
    }

    #[instrument(skip_all)]
    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, BackendError> {
        let resp = self
            .request(Method::POST, "/auth/v1/signup")
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(|e| transport_error(&e))?;
        let body: Value = read_json(resp).await?;

        // With auto-confirm the service answers with a token grant; otherwise
        // with the pending user alone.
        if body.get("access_token").is_some() {
            let token: TokenResponse = serde_json::from_value(body)
                .map_err(|e| BackendError::new(format!("unexpected sign-up response: {e}")))?;
            let session = token.into_session();
            self.install(session.clone(), AuthChangeEvent::SignedIn);
            return Ok(SignUpOutcome {
                user: Some(session.user.clone()),
                session: Some(session),
            });
        }

        let user_json = body.get("user").cloned().unwrap_or(body);
        let user = serde_json::from_value::<Identity>(user_json).ok();
        Ok(SignUpOutcome {
            user,
            session: None,
        })
    }

    #[instrument(skip_all)]
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, BackendError> {
        let session = self
            .grant("password", json!({ "email": email, "password": password }))
            .await?;
        self.install(session.clone(), AuthChangeEvent::SignedIn);
        Ok(session)
    }

    #[instrument(skip_all)]
    async fn sign_out(&self) -> Result<(), BackendError> {
        let result = if self.current_session().is_some() {
            match self.request(Method::POST, "/auth/v1/logout").send().await {
                Ok(resp) => check(resp).await.map(|_| ()),
                Err(e) => Err(transport_error(&e)),
            }
        } else {
            Ok(())
        };
        self.discard();
        result
    }

    #[instrument(skip_all)]
    async fn resend(&self, kind: ResendKind, email: &str) -> Result<(), BackendError> {
        let resp = self
            .request(Method::POST, "/auth/v1/resend")
            .json(&json!({ "type": kind, "email": email }))
            .send()
            .await
            .map_err(|e| transport_error(&e))?;
        let _ = check(resp).await?;
        Ok(())
    }

    #[instrument(skip_all)]
    async fn get_user(&self) -> Result<Option<Identity>, BackendError> {
        if self.current_session().is_none() {
            return Ok(None);
        }
        let resp = self
            .request(Method::GET, "/auth/v1/user")
            .send()
            .await
            .map_err(|e| transport_error(&e))?;
        if resp.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Ok(None);
        }
        read_json(resp).await.map(Some)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
