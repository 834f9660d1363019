//! Session manager: the single writer of `AuthState`.
//!
//! DESIGN
//! ======
//! Startup issues the bootstrap query and registers for change notifications
//! without waiting on either. Both paths end in `reconcile`, which resolves the
//! profile for a session and hands the result to `apply`, the only place state
//! is written.
//!
//! Every reconciliation takes a generation number when it starts: the
//! bootstrap takes one at startup, each notification takes one at delivery,
//! and logout takes one when the provider confirms sign-out. `apply` accepts a
//! result only if its generation is higher than the last applied one, so a
//! slow bootstrap can never overwrite a newer notification and a slow profile
//! lookup can never overwrite a later transition.
//!
//! ERROR HANDLING
//! ==============
//! A failed bootstrap query reads as "no session" and a failed profile lookup
//! reads as "no profile". Neither is retried. Sign-out failures go back to the
//! `logout` caller and leave state untouched.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::events::Subscription;
use super::lock;
use super::provider::{IdentityProvider, ProfileStore, SessionHandler};
use super::types::{AuthError, AuthState, Session, SessionChange, UserProfile};
use crate::config::{ManagerConfig, MissingProfilePolicy};

// =============================================================================
// MANAGER
// =============================================================================

/// Owns the local auth state for one application scope.
///
/// Dropping the manager tears it down.
pub struct SessionManager {
    inner: Arc<Inner>,
}

struct Inner {
    identity: Arc<dyn IdentityProvider>,
    profiles: Arc<dyn ProfileStore>,
    config: ManagerConfig,
    runtime: Handle,
    state: watch::Sender<AuthState>,
    in_flight: watch::Sender<usize>,
    next_generation: AtomicU64,
    gate: Mutex<WriteGate>,
    subscription: Mutex<Option<Subscription>>,
}

/// Highest applied generation plus the liveness flag, checked together so a
/// write can never slip in after teardown.
struct WriteGate {
    applied: u64,
    live: bool,
}

impl SessionManager {
    /// Create a manager and run its initialization protocol.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    #[must_use]
    pub fn start(identity: Arc<dyn IdentityProvider>, profiles: Arc<dyn ProfileStore>, config: ManagerConfig) -> Self {
        let (state, _) = watch::channel(AuthState::initial());
        let (in_flight, _) = watch::channel(0_usize);
        let inner = Arc::new(Inner {
            identity,
            profiles,
            config,
            runtime: Handle::current(),
            state,
            in_flight,
            next_generation: AtomicU64::new(0),
            gate: Mutex::new(WriteGate { applied: 0, live: true }),
            subscription: Mutex::new(None),
        });

        Inner::spawn_bootstrap(&inner);
        Inner::install_subscription(&inner);

        Self { inner }
    }

    /// Current snapshot. Never blocks on the provider; still readable after teardown.
    #[must_use]
    pub fn current_state(&self) -> AuthState {
        self.inner.state.borrow().clone()
    }

    /// Watch for state changes. Receivers are woken only when the snapshot changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.inner.state.subscribe()
    }

    /// Wait until no reconciliation started by this manager is still running.
    pub async fn settle(&self) {
        let mut rx = self.inner.in_flight.subscribe();
        let _ = rx.wait_for(|n| *n == 0).await;
    }

    /// Sign out with the identity provider and clear local state on success.
    ///
    /// The change notification that usually follows is a no-op against the
    /// already-cleared state.
    ///
    /// # Errors
    ///
    /// Returns the provider error if sign-out fails; local state is unchanged.
    pub async fn logout(&self) -> Result<(), AuthError> {
        if let Err(e) = self.inner.identity.sign_out().await {
            warn!(error = %e, "sign-out failed; keeping local session state");
            return Err(e);
        }
        let generation = self.inner.issue_generation();
        if self.inner.apply(generation, None) {
            info!(generation, "signed out");
        }
        Ok(())
    }

    /// Release the change subscription and stop all further state writes.
    ///
    /// Safe to call more than once.
    pub fn teardown(&self) {
        let was_live = {
            let mut gate = lock(&self.inner.gate);
            std::mem::replace(&mut gate.live, false)
        };
        if let Some(mut subscription) = lock(&self.inner.subscription).take() {
            subscription.release();
        }
        if was_live {
            info!("session manager torn down");
        }
    }

    #[must_use]
    pub fn is_live(&self) -> bool {
        self.inner.is_live()
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        self.teardown();
    }
}

// =============================================================================
// RECONCILIATION
// =============================================================================

impl Inner {
    fn spawn_bootstrap(this: &Arc<Self>) {
        let generation = this.issue_generation();
        let inner = Arc::clone(this);
        debug!(generation, "bootstrap session query started");
        this.spawn_tracked(async move {
            let session = match inner.identity.get_current_session().await {
                Ok(session) => session,
                Err(e) => {
                    warn!(error = %e, "bootstrap session query failed; treating as signed out");
                    None
                }
            };
            debug!(generation, has_session = session.is_some(), "bootstrap session query resolved");
            inner.reconcile(generation, session).await;
        });
    }

    fn install_subscription(this: &Arc<Self>) {
        // Weak: the provider owns the handler, and `Inner` owns the provider.
        let weak = Arc::downgrade(this);
        let handler: SessionHandler = Arc::new(move |change: SessionChange| {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            if !inner.is_live() {
                return;
            }
            let generation = inner.issue_generation();
            info!(event = %change.event, generation, "session change received");
            let task_inner = Arc::clone(&inner);
            inner.spawn_tracked(async move {
                task_inner.reconcile(generation, change.session).await;
            });
        });

        match this.identity.on_session_change(handler) {
            Ok(subscription) => *lock(&this.subscription) = Some(subscription),
            Err(e) => warn!(error = %e, "session change subscription failed; relying on bootstrap only"),
        }
    }

    async fn reconcile(&self, generation: u64, session: Option<Session>) {
        let user = match session {
            Some(session) => self.resolve_user(&session).await,
            None => None,
        };
        self.apply(generation, user);
    }

    async fn resolve_user(&self, session: &Session) -> Option<UserProfile> {
        let profile = match self.profiles.get_profile(&session.subject_id).await {
            Ok(profile) => profile,
            Err(e) => {
                warn!(subject = %session.subject_id, error = %e, "profile lookup failed; treating as missing");
                None
            }
        };
        if profile.is_some() {
            return profile;
        }
        match self.config.missing_profile {
            MissingProfilePolicy::SignedOut => {
                debug!(subject = %session.subject_id, "session has no profile; treating as signed out");
                None
            }
            MissingProfilePolicy::SessionFallback => Some(fallback_profile(session)),
        }
    }

    /// Write `user` if `generation` is the newest result seen and the manager
    /// is live. Returns whether the write was accepted.
    fn apply(&self, generation: u64, user: Option<UserProfile>) -> bool {
        let mut gate = lock(&self.gate);
        if !gate.live {
            debug!(generation, "discarding reconciliation after teardown");
            return false;
        }
        if generation <= gate.applied {
            debug!(generation, applied = gate.applied, "discarding stale reconciliation");
            return false;
        }
        gate.applied = generation;

        let next = AuthState::resolved(user);
        self.state.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
        true
    }

    fn issue_generation(&self) -> u64 {
        self.next_generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_live(&self) -> bool {
        lock(&self.gate).live
    }

    fn spawn_tracked<F>(self: &Arc<Self>, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.in_flight.send_modify(|n| *n += 1);
        let guard = InFlightGuard(Arc::clone(self));
        self.runtime.spawn(async move {
            let _guard = guard;
            task.await;
        });
    }
}

/// Decrements the in-flight count even if the task panics or is cancelled.
struct InFlightGuard(Arc<Inner>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.in_flight.send_modify(|n| *n = n.saturating_sub(1));
    }
}

/// Profile stand-in for a session whose profile record does not exist yet.
fn fallback_profile(session: &Session) -> UserProfile {
    let email = session.email.clone().unwrap_or_default();
    let full_name = email.split('@').next().unwrap_or_default().to_owned();
    UserProfile { id: session.subject_id.clone(), full_name, email }
}

#[cfg(test)]
#[path = "manager_test.rs"]
mod tests;
