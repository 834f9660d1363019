//! Auth types shared by the session manager and provider implementations.

use std::fmt;

use serde::{Deserialize, Serialize};

// =============================================================================
// ERROR
// =============================================================================

/// Errors produced by identity provider and profile store operations.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// A configuration value could not be parsed.
    #[error("config parse failed: {0}")]
    Config(String),

    /// A required environment variable is not set.
    #[error("missing config: env var {var} not set")]
    MissingEnv { var: String },

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),

    /// The HTTP request to the provider failed before a response arrived.
    #[error("provider request failed: {0}")]
    ApiRequest(String),

    /// The provider returned a non-success HTTP status.
    #[error("provider response error: status {status}")]
    ApiResponse { status: u16, body: String },

    /// The provider response body could not be deserialized.
    #[error("provider response parse failed: {0}")]
    ApiParse(String),

    /// The operation needs a live session and there is none.
    #[error("no active session")]
    NoSession,

    /// Reading or writing the persisted session failed.
    #[error("session storage failed: {0}")]
    Storage(String),

    /// Registering a change-notification handler failed.
    #[error("session subscription failed: {0}")]
    SubscriptionFailed(String),
}

impl AuthError {
    /// Whether retrying the same call later could plausibly succeed.
    #[must_use]
    pub fn retryable(&self) -> bool {
        matches!(self, Self::ApiRequest(_) | Self::ApiResponse { status: 429 | 500..=599, .. })
    }
}

// =============================================================================
// SESSION
// =============================================================================

/// Provider-issued proof that a subject is currently authenticated.
///
/// Tokens are opaque to this crate; they are carried only so the provider
/// client can authorize follow-up calls.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Stable identifier of the authenticated subject.
    pub subject_id: String,
    /// Email address the provider has on file, if any.
    pub email: Option<String>,
    /// Bearer token for provider calls.
    pub access_token: String,
    /// Token used to obtain a fresh `access_token`.
    pub refresh_token: Option<String>,
    /// Expiry as seconds since the Unix epoch, if the provider reported one.
    pub expires_at: Option<i64>,
}

impl Session {
    /// Whether the session has expired at `now` (seconds since the Unix epoch).
    #[must_use]
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.expires_within(now, 0)
    }

    /// Whether the session expires within `margin_secs` of `now`.
    /// Sessions without an expiry never do.
    #[must_use]
    pub fn expires_within(&self, now: i64, margin_secs: i64) -> bool {
        self.expires_at
            .is_some_and(|exp| exp <= now.saturating_add(margin_secs))
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("subject_id", &self.subject_id)
            .field("email", &self.email)
            .field("access_token", &"<redacted>")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Kind of session transition reported by the identity provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionEvent {
    InitialSession,
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
}

impl fmt::Display for SessionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::InitialSession => "INITIAL_SESSION",
            Self::SignedIn => "SIGNED_IN",
            Self::SignedOut => "SIGNED_OUT",
            Self::TokenRefreshed => "TOKEN_REFRESHED",
            Self::UserUpdated => "USER_UPDATED",
        };
        f.write_str(name)
    }
}

/// A single change notification: what happened and the session afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionChange {
    pub event: SessionEvent,
    pub session: Option<Session>,
}

impl SessionChange {
    #[must_use]
    pub fn new(event: SessionEvent, session: Option<Session>) -> Self {
        Self { event, session }
    }
}

// =============================================================================
// PROFILE + STATE
// =============================================================================

/// Displayable profile record for an authenticated subject.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub full_name: String,
    pub email: String,
}

/// Local view of who is logged in.
///
/// Fields are private so `is_authenticated` can never disagree with `user`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AuthState {
    user: Option<UserProfile>,
    is_authenticated: bool,
    loading: bool,
}

impl AuthState {
    /// State before the first authoritative answer: no user, still loading.
    #[must_use]
    pub fn initial() -> Self {
        Self { user: None, is_authenticated: false, loading: true }
    }

    /// State after an authoritative answer for `user`.
    #[must_use]
    pub fn resolved(user: Option<UserProfile>) -> Self {
        let is_authenticated = user.is_some();
        Self { user, is_authenticated, loading: false }
    }

    #[must_use]
    pub fn user(&self) -> Option<&UserProfile> {
        self.user.as_ref()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.is_authenticated
    }

    #[must_use]
    pub fn loading(&self) -> bool {
        self.loading
    }
}

impl Default for AuthState {
    fn default() -> Self {
        Self::initial()
    }
}

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;
