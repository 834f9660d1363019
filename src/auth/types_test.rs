use super::*;

fn session(expires_at: Option<i64>) -> Session {
    Session {
        subject_id: "u1".into(),
        email: Some("ada@x.com".into()),
        access_token: "secret-access".into(),
        refresh_token: Some("secret-refresh".into()),
        expires_at,
    }
}

fn ada() -> UserProfile {
    UserProfile { id: "u1".into(), full_name: "Ada".into(), email: "ada@x.com".into() }
}

// =============================================================================
// AuthState
// =============================================================================

#[test]
fn initial_state_is_loading_and_signed_out() {
    let state = AuthState::initial();
    assert!(state.user().is_none());
    assert!(!state.is_authenticated());
    assert!(state.loading());
}

#[test]
fn default_matches_initial() {
    assert_eq!(AuthState::default(), AuthState::initial());
}

#[test]
fn resolved_with_user_is_authenticated() {
    let state = AuthState::resolved(Some(ada()));
    assert_eq!(state.user(), Some(&ada()));
    assert!(state.is_authenticated());
    assert!(!state.loading());
}

#[test]
fn resolved_without_user_is_not_authenticated() {
    let state = AuthState::resolved(None);
    assert!(state.user().is_none());
    assert!(!state.is_authenticated());
    assert!(!state.loading());
}

#[test]
fn auth_state_serializes_flag_with_user() {
    let json = serde_json::to_value(AuthState::resolved(Some(ada()))).unwrap();
    assert_eq!(json["is_authenticated"], true);
    assert_eq!(json["loading"], false);
    assert_eq!(json["user"]["full_name"], "Ada");
}

// =============================================================================
// Session
// =============================================================================

#[test]
fn session_debug_redacts_tokens() {
    let debug = format!("{:?}", session(Some(100)));
    assert!(debug.contains("u1"));
    assert!(!debug.contains("secret-access"));
    assert!(!debug.contains("secret-refresh"));
}

#[test]
fn session_without_expiry_never_expires() {
    let s = session(None);
    assert!(!s.is_expired_at(i64::MAX));
    assert!(!s.expires_within(0, i64::MAX));
}

#[test]
fn session_expired_at_boundary() {
    let s = session(Some(100));
    assert!(!s.is_expired_at(99));
    assert!(s.is_expired_at(100));
}

#[test]
fn session_expires_within_margin() {
    let s = session(Some(100));
    assert!(!s.expires_within(30, 60));
    assert!(s.expires_within(40, 60));
}

// =============================================================================
// SessionEvent / AuthError
// =============================================================================

#[test]
fn session_event_display_matches_wire_name() {
    assert_eq!(SessionEvent::TokenRefreshed.to_string(), "TOKEN_REFRESHED");
    let json = serde_json::to_string(&SessionEvent::SignedOut).unwrap();
    assert_eq!(json, "\"SIGNED_OUT\"");
}

#[test]
fn retryable_covers_transport_and_server_errors() {
    assert!(AuthError::ApiRequest("timeout".into()).retryable());
    assert!(AuthError::ApiResponse { status: 503, body: String::new() }.retryable());
    assert!(AuthError::ApiResponse { status: 429, body: String::new() }.retryable());
    assert!(!AuthError::ApiResponse { status: 400, body: String::new() }.retryable());
    assert!(!AuthError::NoSession.retryable());
}
