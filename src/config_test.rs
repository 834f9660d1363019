use std::sync::Mutex;

use super::*;

/// Env vars are process-global; tests in this file take this lock first.
static ENV_LOCK: Mutex<()> = Mutex::new(());

const VARS: &[&str] = &[
    "AUTH_MISSING_PROFILE_POLICY",
    "SUPABASE_URL",
    "SUPABASE_ANON_KEY",
    "SUPABASE_PROFILE_TABLE",
    "SUPABASE_REQUEST_TIMEOUT_SECS",
    "SUPABASE_CONNECT_TIMEOUT_SECS",
    "SUPABASE_SESSION_FILE",
    "SUPABASE_REFRESH_MARGIN_SECS",
    "SUPABASE_REFRESH_INTERVAL_SECS",
];

/// # Safety
/// Callers must hold `ENV_LOCK`.
unsafe fn clear_env() {
    for var in VARS {
        unsafe { std::env::remove_var(var) };
    }
}

// =============================================================================
// MissingProfilePolicy parsing
// =============================================================================

#[test]
fn policy_defaults_to_signed_out() {
    assert_eq!(parse_missing_profile_policy(None).unwrap(), MissingProfilePolicy::SignedOut);
    assert_eq!(parse_missing_profile_policy(Some("")).unwrap(), MissingProfilePolicy::SignedOut);
}

#[test]
fn policy_parses_session_fallback() {
    assert_eq!(
        parse_missing_profile_policy(Some(" session_fallback ")).unwrap(),
        MissingProfilePolicy::SessionFallback
    );
}

#[test]
fn policy_unknown_errors() {
    let err = parse_missing_profile_policy(Some("optimistic")).unwrap_err().to_string();
    assert!(err.contains("unknown AUTH_MISSING_PROFILE_POLICY"));
}

#[test]
fn manager_config_from_env() {
    let _guard = ENV_LOCK.lock().unwrap();
    unsafe {
        clear_env();
        std::env::set_var("AUTH_MISSING_PROFILE_POLICY", "session_fallback");
    }

    let cfg = ManagerConfig::from_env().unwrap();
    assert_eq!(cfg.missing_profile, MissingProfilePolicy::SessionFallback);

    unsafe { clear_env() };
}

// =============================================================================
// SupabaseConfig
// =============================================================================

#[test]
fn supabase_from_env_defaults() {
    let _guard = ENV_LOCK.lock().unwrap();
    unsafe {
        clear_env();
        std::env::set_var("SUPABASE_URL", "https://proj.supabase.co/");
        std::env::set_var("SUPABASE_ANON_KEY", "anon");
    }

    let cfg = SupabaseConfig::from_env().unwrap();
    assert_eq!(cfg.url, "https://proj.supabase.co");
    assert_eq!(cfg.anon_key, "anon");
    assert_eq!(cfg.profile_table, DEFAULT_PROFILE_TABLE);
    assert_eq!(
        cfg.timeouts,
        HttpTimeouts { request_secs: DEFAULT_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS }
    );
    assert!(cfg.session_file.is_none());
    assert_eq!(cfg.refresh_margin_secs, DEFAULT_REFRESH_MARGIN_SECS);
    assert_eq!(cfg.refresh_interval_secs, DEFAULT_REFRESH_INTERVAL_SECS);

    unsafe { clear_env() };
}

#[test]
fn supabase_from_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    unsafe {
        clear_env();
        std::env::set_var("SUPABASE_URL", "http://localhost:54321");
        std::env::set_var("SUPABASE_ANON_KEY", "anon");
        std::env::set_var("SUPABASE_PROFILE_TABLE", "profiles");
        std::env::set_var("SUPABASE_REQUEST_TIMEOUT_SECS", "5");
        std::env::set_var("SUPABASE_CONNECT_TIMEOUT_SECS", "2");
        std::env::set_var("SUPABASE_SESSION_FILE", "/tmp/study-session.json");
        std::env::set_var("SUPABASE_REFRESH_MARGIN_SECS", "120");
        std::env::set_var("SUPABASE_REFRESH_INTERVAL_SECS", "not-a-number");
    }

    let cfg = SupabaseConfig::from_env().unwrap();
    assert_eq!(cfg.profile_table, "profiles");
    assert_eq!(cfg.timeouts, HttpTimeouts { request_secs: 5, connect_secs: 2 });
    assert_eq!(cfg.session_file.as_deref(), Some(std::path::Path::new("/tmp/study-session.json")));
    assert_eq!(cfg.refresh_margin_secs, 120);
    assert_eq!(cfg.refresh_interval_secs, DEFAULT_REFRESH_INTERVAL_SECS);

    unsafe { clear_env() };
}

#[test]
fn supabase_from_env_missing_url_errors() {
    let _guard = ENV_LOCK.lock().unwrap();
    unsafe {
        clear_env();
        std::env::set_var("SUPABASE_ANON_KEY", "anon");
    }

    let err = SupabaseConfig::from_env().unwrap_err();
    assert!(matches!(err, AuthError::MissingEnv { ref var } if var == "SUPABASE_URL"));

    unsafe { clear_env() };
}

#[test]
fn supabase_from_env_blank_key_errors() {
    let _guard = ENV_LOCK.lock().unwrap();
    unsafe {
        clear_env();
        std::env::set_var("SUPABASE_URL", "http://localhost:54321");
        std::env::set_var("SUPABASE_ANON_KEY", "  ");
    }

    let err = SupabaseConfig::from_env().unwrap_err();
    assert!(matches!(err, AuthError::MissingEnv { ref var } if var == "SUPABASE_ANON_KEY"));

    unsafe { clear_env() };
}
