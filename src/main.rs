use std::sync::Arc;
use std::time::Duration;

use study_assistant::auth::{SessionManager, guard};
use study_assistant::config::{ManagerConfig, SupabaseConfig};
use study_assistant::supabase::{SupabaseClient, spawn_auto_refresh};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt::init();

    let supabase_config = SupabaseConfig::from_env().expect("supabase config");
    let manager_config = ManagerConfig::from_env().expect("session manager config");
    let refresh_interval = Duration::from_secs(supabase_config.refresh_interval_secs);
    let refresh_margin = Duration::from_secs(supabase_config.refresh_margin_secs);

    let client = Arc::new(
        SupabaseClient::from_config(supabase_config)
            .await
            .expect("supabase client init failed"),
    );

    if let (Ok(email), Ok(password)) = (std::env::var("STUDY_EMAIL"), std::env::var("STUDY_PASSWORD")) {
        if let Err(e) = client.sign_in_with_password(&email, &password).await {
            tracing::warn!(error = %e, "sign-in failed; continuing with stored session");
        }
    }

    let refresh = spawn_auto_refresh(client.clone(), refresh_interval, refresh_margin);
    let manager = SessionManager::start(client.clone(), client, manager_config);

    let mut changes = manager.subscribe();
    let watcher = tokio::spawn(async move {
        loop {
            {
                let state = changes.borrow_and_update();
                tracing::info!(
                    loading = state.loading(),
                    authenticated = state.is_authenticated(),
                    account = guard::account_label(&state),
                    email = state.user().map(|u| u.email.as_str()),
                    "auth state"
                );
            }
            if changes.changed().await.is_err() {
                break;
            }
        }
    });

    tracing::info!("watching session; press Ctrl-C to exit");
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for Ctrl-C");
    }

    if env_flag("STUDY_LOGOUT_ON_EXIT") {
        if let Err(e) = manager.logout().await {
            tracing::warn!(error = %e, "logout on exit failed");
        }
    }

    manager.teardown();
    refresh.abort();
    watcher.abort();
}

fn env_flag(key: &str) -> bool {
    std::env::var(key).is_ok_and(|v| matches!(v.trim(), "1" | "true" | "yes"))
}
