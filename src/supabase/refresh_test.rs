use std::path::PathBuf;

use tokio::sync::mpsc;

use super::*;
use crate::auth::provider::{IdentityProvider, SessionHandler};
use crate::auth::{Session, SessionChange, SessionEvent};
use crate::config::{HttpTimeouts, SupabaseConfig};
use crate::supabase::storage::SessionFile;

async fn client_with_expired_session() -> Arc<SupabaseClient> {
    let path: PathBuf = std::env::temp_dir()
        .join(format!("study-assistant-{}", uuid::Uuid::new_v4()))
        .join("session.json");
    let expired = Session {
        subject_id: "u1".into(),
        email: None,
        access_token: "at".into(),
        refresh_token: None,
        expires_at: Some(1),
    };
    SessionFile::new(&path).save(&expired).await.unwrap();

    let config = SupabaseConfig {
        url: "http://127.0.0.1:9".into(),
        anon_key: "anon".into(),
        profile_table: "users".into(),
        timeouts: HttpTimeouts { request_secs: 2, connect_secs: 1 },
        session_file: Some(path),
        refresh_margin_secs: 60,
        refresh_interval_secs: 1,
    };
    Arc::new(SupabaseClient::from_config(config).await.unwrap())
}

#[tokio::test]
async fn auto_refresh_ends_unrenewable_session() {
    let client = client_with_expired_session().await;
    let (tx, mut rx) = mpsc::unbounded_channel::<SessionChange>();
    let handler: SessionHandler = Arc::new(move |change| {
        let _ = tx.send(change);
    });
    let _sub = client.on_session_change(handler).unwrap();

    let task = spawn_auto_refresh(Arc::clone(&client), Duration::from_secs(1), Duration::from_secs(60));

    let change = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("auto-refresh did not run")
        .unwrap();
    assert_eq!(change.event, SessionEvent::SignedOut);
    assert!(client.current_session().is_none());

    task.abort();
}

#[tokio::test]
async fn auto_refresh_survives_missing_session() {
    let client = Arc::new(
        SupabaseClient::from_config(SupabaseConfig {
            url: "http://127.0.0.1:9".into(),
            anon_key: "anon".into(),
            profile_table: "users".into(),
            timeouts: HttpTimeouts { request_secs: 2, connect_secs: 1 },
            session_file: None,
            refresh_margin_secs: 60,
            refresh_interval_secs: 1,
        })
        .await
        .unwrap(),
    );

    let task = spawn_auto_refresh(client, Duration::ZERO, Duration::from_secs(60));
    tokio::task::yield_now().await;

    assert!(!task.is_finished());
    task.abort();
}
