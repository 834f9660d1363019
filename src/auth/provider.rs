//! Capabilities the session manager consumes from the outside world.
//!
//! DESIGN
//! ======
//! The identity provider and the profile store are trait objects so the
//! manager can be driven by the HTTP client in production and by scripted
//! doubles in tests. Neither trait says anything about tokens or credentials;
//! those stay inside the implementation.

use std::sync::Arc;

use super::events::Subscription;
use super::types::{AuthError, Session, SessionChange, UserProfile};

/// Callback invoked for every session transition.
///
/// Implementations must invoke a registered handler serially and in the order
/// the transitions occurred.
pub type SessionHandler = Arc<dyn Fn(SessionChange) + Send + Sync>;

/// Source of truth for whether a live session exists.
#[async_trait::async_trait]
pub trait IdentityProvider: Send + Sync {
    /// One-shot query for the current session.
    async fn get_current_session(&self) -> Result<Option<Session>, AuthError>;

    /// Register `handler` for all subsequent session transitions.
    ///
    /// # Errors
    ///
    /// Returns `SubscriptionFailed` if the handler cannot be registered.
    fn on_session_change(&self, handler: SessionHandler) -> Result<Subscription, AuthError>;

    /// Ask the provider to end the current session.
    async fn sign_out(&self) -> Result<(), AuthError>;
}

/// Lookup of displayable profile records by subject identifier.
#[async_trait::async_trait]
pub trait ProfileStore: Send + Sync {
    /// Returns `Ok(None)` when the subject has no provisioned profile.
    async fn get_profile(&self, subject_id: &str) -> Result<Option<UserProfile>, AuthError>;
}
