//! Background session auto-refresh.
//!
//! DESIGN
//! ======
//! A ticker checks the stored session every `interval` and refreshes it once
//! it is within `margin` of expiry. Missed ticks are skipped rather than
//! replayed, so a suspended process wakes up to one refresh attempt.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use super::SupabaseClient;

const MIN_INTERVAL: Duration = Duration::from_secs(1);

/// Spawn the auto-refresh task. Abort the returned handle to stop it.
pub fn spawn_auto_refresh(client: Arc<SupabaseClient>, interval: Duration, margin: Duration) -> JoinHandle<()> {
    let margin_secs = i64::try_from(margin.as_secs()).unwrap_or(i64::MAX);
    info!(interval_secs = interval.as_secs(), margin_secs, "session auto-refresh configured");

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval.max(MIN_INTERVAL));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            if let Err(e) = client.refresh_if_expiring(margin_secs).await {
                warn!(error = %e, retryable = e.retryable(), "session auto-refresh failed");
            }
        }
    })
}

#[cfg(test)]
#[path = "refresh_test.rs"]
mod tests;
