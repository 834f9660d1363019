//! Authentication session management.
//!
//! ARCHITECTURE
//! ============
//! `SessionManager` is the only writer of `AuthState`. It listens to an
//! `IdentityProvider` (bootstrap query + change notifications) and resolves
//! profiles through a `ProfileStore`. Consumers read snapshots or watch for
//! changes; they never talk to the provider directly.

pub mod events;
pub mod guard;
pub mod manager;
pub mod provider;
pub mod types;

use std::sync::{Mutex, MutexGuard, PoisonError};

pub use events::{SessionHub, Subscription};
pub use manager::SessionManager;
pub use provider::{IdentityProvider, ProfileStore, SessionHandler};
pub use types::{AuthError, AuthState, Session, SessionChange, SessionEvent, UserProfile};

/// Lock a std mutex, recovering the guard if a previous holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
