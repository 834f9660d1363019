//! Supabase-backed identity provider and profile store.
//!
//! ARCHITECTURE
//! ============
//! `SupabaseClient` keeps the current session in memory (and optionally on
//! disk), talks to GoTrue for sign-in, refresh, and sign-out, and reads
//! profiles from a PostgREST table. Every local session transition is
//! emitted on a `SessionHub`, which is what `on_session_change` subscribes to.
//!
//! Sign-in, refresh, and sign-out run one at a time under `token_lock`, and
//! each emits while still holding the session mutex, so the order handlers
//! see matches the order the stored session changed in.
//!
//! ERROR HANDLING
//! ==============
//! Persistence failures are logged and never fail the auth call that caused
//! them. A refresh that fails for a non-retryable reason ends the session
//! (the refresh token is dead); a transport failure keeps it for the next try.

pub mod refresh;
pub mod storage;
pub mod wire;

use std::sync::Mutex;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::auth::events::{SessionHub, Subscription};
use crate::auth::provider::{IdentityProvider, ProfileStore, SessionHandler};
use crate::auth::{AuthError, Session, SessionChange, SessionEvent, UserProfile, lock};
use crate::config::SupabaseConfig;
pub use refresh::spawn_auto_refresh;
use storage::SessionFile;

// =============================================================================
// CLIENT
// =============================================================================

pub struct SupabaseClient {
    http: reqwest::Client,
    config: SupabaseConfig,
    session: Mutex<Option<Session>>,
    storage: Option<SessionFile>,
    hub: SessionHub,
    /// Held by every call that replaces or ends the stored session.
    token_lock: tokio::sync::Mutex<()>,
}

impl SupabaseClient {
    /// Build a client and restore any persisted session.
    ///
    /// An unreadable session file is logged and ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub async fn from_config(config: SupabaseConfig) -> Result<Self, AuthError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeouts.request_secs))
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .build()
            .map_err(|e| AuthError::HttpClientBuild(e.to_string()))?;

        let storage = config.session_file.clone().map(SessionFile::new);
        let restored = match &storage {
            Some(file) => match file.load().await {
                Ok(session) => session,
                Err(e) => {
                    warn!(error = %e, "ignoring unreadable persisted session");
                    None
                }
            },
            None => None,
        };
        if let Some(session) = &restored {
            info!(subject = %session.subject_id, "restored persisted session");
        }

        Ok(Self {
            http,
            config,
            session: Mutex::new(restored),
            storage,
            hub: SessionHub::new(),
            token_lock: tokio::sync::Mutex::new(()),
        })
    }

    /// Snapshot of the stored session, without refreshing.
    #[must_use]
    pub fn current_session(&self) -> Option<Session> {
        lock(&self.session).clone()
    }

    /// Exchange email and password for a session.
    ///
    /// # Errors
    ///
    /// Returns the provider error if the credentials are rejected or the
    /// request fails.
    pub async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let _guard = self.token_lock.lock().await;
        let session = self
            .token_request("password", &wire::PasswordGrant { email, password })
            .await?;
        info!(subject = %session.subject_id, "signed in with password");
        self.store_session(session.clone(), SessionEvent::SignedIn).await;
        Ok(session)
    }

    /// Exchange the stored refresh token for a new session.
    ///
    /// # Errors
    ///
    /// Returns `NoSession` if there is nothing to refresh, otherwise the
    /// provider error. Non-retryable failures end the stored session.
    pub async fn refresh_session(&self) -> Result<Session, AuthError> {
        let _guard = self.token_lock.lock().await;
        self.refresh_locked().await
    }

    /// Refresh the stored session if it expires within `margin_secs`.
    ///
    /// Returns the (possibly refreshed) session, or `None` when signed out.
    ///
    /// # Errors
    ///
    /// Same as [`SupabaseClient::refresh_session`].
    pub async fn refresh_if_expiring(&self, margin_secs: i64) -> Result<Option<Session>, AuthError> {
        let _guard = self.token_lock.lock().await;
        match self.current_session() {
            None => Ok(None),
            Some(session) if !session.expires_within(unix_now(), margin_secs) => Ok(Some(session)),
            Some(_) => self.refresh_locked().await.map(Some),
        }
    }

    /// Caller must hold `token_lock`.
    async fn refresh_locked(&self) -> Result<Session, AuthError> {
        let refresh_token = self
            .current_session()
            .and_then(|s| s.refresh_token)
            .ok_or(AuthError::NoSession);

        let result = match refresh_token {
            Ok(token) => {
                self.token_request("refresh_token", &wire::RefreshGrant { refresh_token: &token })
                    .await
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(session) => {
                debug!(subject = %session.subject_id, expires_at = ?session.expires_at, "session refreshed");
                self.store_session(session.clone(), SessionEvent::TokenRefreshed)
                    .await;
                Ok(session)
            }
            Err(e) if e.retryable() => Err(e),
            Err(e) => {
                warn!(error = %e, "session refresh rejected; ending session");
                self.end_session().await;
                Err(e)
            }
        }
    }

    async fn token_request<B: serde::Serialize + ?Sized>(&self, grant_type: &str, body: &B) -> Result<Session, AuthError> {
        let response = self
            .http
            .post(wire::token_endpoint(&self.config.url, grant_type))
            .header("apikey", &self.config.anon_key)
            .json(body)
            .send()
            .await
            .map_err(|e| AuthError::ApiRequest(e.to_string()))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| AuthError::ApiRequest(e.to_string()))?;

        if status != 200 {
            return Err(AuthError::ApiResponse { status, body: text });
        }

        wire::parse_token_response(&text, unix_now())
    }

    async fn store_session(&self, session: Session, event: SessionEvent) {
        if let Some(file) = &self.storage {
            if let Err(e) = file.save(&session).await {
                warn!(error = %e, "failed to persist session");
            }
        }
        let mut current = lock(&self.session);
        *current = Some(session.clone());
        self.hub.emit(SessionChange::new(event, Some(session)));
    }

    async fn end_session(&self) {
        if let Some(file) = &self.storage {
            if let Err(e) = file.clear().await {
                warn!(error = %e, "failed to remove persisted session");
            }
        }
        let mut current = lock(&self.session);
        current.take();
        self.hub.emit(SessionChange::new(SessionEvent::SignedOut, None));
    }

    fn bearer(&self) -> String {
        let token = self
            .current_session()
            .map_or_else(|| self.config.anon_key.clone(), |s| s.access_token);
        format!("Bearer {token}")
    }
}

fn unix_now() -> i64 {
    time::OffsetDateTime::now_utc().unix_timestamp()
}

// =============================================================================
// CAPABILITIES
// =============================================================================

#[async_trait::async_trait]
impl IdentityProvider for SupabaseClient {
    async fn get_current_session(&self) -> Result<Option<Session>, AuthError> {
        match self.refresh_if_expiring(0).await {
            Ok(session) => Ok(session),
            Err(e) if e.retryable() => Err(e),
            Err(e) => {
                debug!(error = %e, "stored session could not be renewed");
                Ok(None)
            }
        }
    }

    fn on_session_change(&self, handler: SessionHandler) -> Result<Subscription, AuthError> {
        self.hub.subscribe(handler)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        // Waits out any in-flight refresh so its result cannot outlive the sign-out.
        let _guard = self.token_lock.lock().await;
        if let Some(session) = self.current_session() {
            let response = self
                .http
                .post(wire::logout_endpoint(&self.config.url))
                .header("apikey", &self.config.anon_key)
                .bearer_auth(&session.access_token)
                .send()
                .await
                .map_err(|e| AuthError::ApiRequest(e.to_string()))?;

            let status = response.status().as_u16();
            if !wire::logout_status_ok(status) {
                let body = response.text().await.unwrap_or_default();
                return Err(AuthError::ApiResponse { status, body });
            }
            info!(subject = %session.subject_id, "signed out");
        }
        self.end_session().await;
        Ok(())
    }
}

#[async_trait::async_trait]
impl ProfileStore for SupabaseClient {
    async fn get_profile(&self, subject_id: &str) -> Result<Option<UserProfile>, AuthError> {
        let response = self
            .http
            .get(wire::profile_endpoint(&self.config.url, &self.config.profile_table))
            .query(&wire::profile_query(subject_id))
            .header("apikey", &self.config.anon_key)
            .header("Authorization", self.bearer())
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| AuthError::ApiRequest(e.to_string()))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| AuthError::ApiRequest(e.to_string()))?;

        if status != 200 {
            return Err(AuthError::ApiResponse { status, body: text });
        }

        wire::parse_profile_rows(&text)
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
