//! Session change fan-out and subscription handles.
//!
//! DESIGN
//! ======
//! Each subscriber gets its own unbounded queue drained by one dispatch task,
//! so a handler sees changes one at a time and in emission order no matter
//! which thread called `emit`. Emission holds the registry lock while
//! enqueueing, which makes the order identical across subscribers.
//!
//! TRADE-OFFS
//! ==========
//! Queues are unbounded. Session transitions are rare (sign-in, sign-out,
//! hourly refresh) so backpressure would only add a failure mode.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

use super::lock;
use super::provider::SessionHandler;
use super::types::{AuthError, SessionChange};

// =============================================================================
// SUBSCRIPTION
// =============================================================================

/// Owned registration of a change handler.
///
/// Once `release` returns no new invocation starts, though one already
/// running (including the one that called `release`) runs to completion.
/// Releasing more than once is a no-op; dropping the handle releases it too.
pub struct Subscription {
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self { release: Some(Box::new(release)) }
    }

    pub fn release(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }

    #[must_use]
    pub fn is_released(&self) -> bool {
        self.release.is_none()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("released", &self.is_released())
            .finish()
    }
}

// =============================================================================
// SESSION HUB
// =============================================================================

type Subscribers = HashMap<Uuid, mpsc::UnboundedSender<SessionChange>>;

/// Registry of change handlers with serial, order-preserving delivery.
#[derive(Clone, Default)]
pub struct SessionHub {
    subscribers: Arc<Mutex<Subscribers>>,
}

impl SessionHub {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` and spawn its dispatch task on the current runtime.
    ///
    /// # Errors
    ///
    /// Returns `SubscriptionFailed` when called outside a Tokio runtime.
    pub fn subscribe(&self, handler: SessionHandler) -> Result<Subscription, AuthError> {
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|e| AuthError::SubscriptionFailed(e.to_string()))?;

        let id = Uuid::new_v4();
        let active = Arc::new(AtomicBool::new(true));
        let (tx, mut rx) = mpsc::unbounded_channel::<SessionChange>();

        let task_active = Arc::clone(&active);
        let task = runtime.spawn(async move {
            while let Some(change) = rx.recv().await {
                // Checked with no await between it and the call.
                if !task_active.load(Ordering::Acquire) {
                    break;
                }
                handler(change);
            }
        });

        lock(&self.subscribers).insert(id, tx);
        debug!(%id, "session subscriber registered");

        let subscribers = Arc::clone(&self.subscribers);
        Ok(Subscription::new(move || {
            active.store(false, Ordering::Release);
            lock(&subscribers).remove(&id);
            task.abort();
            debug!(%id, "session subscriber released");
        }))
    }

    /// Queue `change` for every registered handler.
    pub fn emit(&self, change: SessionChange) {
        let mut subscribers = lock(&self.subscribers);
        subscribers.retain(|_, tx| tx.send(change.clone()).is_ok());
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        lock(&self.subscribers).len()
    }
}

#[cfg(test)]
#[path = "events_test.rs"]
mod tests;
