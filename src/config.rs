//! Configuration parsed from environment variables.

use crate::auth::AuthError;

pub const DEFAULT_PROFILE_TABLE: &str = "users";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_REFRESH_MARGIN_SECS: u64 = 60;
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 30;

// =============================================================================
// SESSION MANAGER
// =============================================================================

/// What a session without a profile record means to consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingProfilePolicy {
    /// Treat the subject as signed out until a profile exists.
    #[default]
    SignedOut,
    /// Sign the subject in with a profile derived from the session itself.
    SessionFallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ManagerConfig {
    pub missing_profile: MissingProfilePolicy,
}

impl ManagerConfig {
    /// Build from `AUTH_MISSING_PROFILE_POLICY`: `signed_out` (default) or
    /// `session_fallback`.
    ///
    /// # Errors
    ///
    /// Returns `Config` for any other policy name.
    pub fn from_env() -> Result<Self, AuthError> {
        let missing_profile = parse_missing_profile_policy(std::env::var("AUTH_MISSING_PROFILE_POLICY").ok().as_deref())?;
        Ok(Self { missing_profile })
    }
}

fn parse_missing_profile_policy(raw: Option<&str>) -> Result<MissingProfilePolicy, AuthError> {
    match raw.map(str::trim).unwrap_or("signed_out") {
        "signed_out" | "" => Ok(MissingProfilePolicy::SignedOut),
        "session_fallback" => Ok(MissingProfilePolicy::SessionFallback),
        other => Err(AuthError::Config(format!("unknown AUTH_MISSING_PROFILE_POLICY: {other}"))),
    }
}

// =============================================================================
// SUPABASE
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupabaseConfig {
    /// Project base URL without a trailing slash.
    pub url: String,
    /// Public API key sent as `apikey` on every request.
    pub anon_key: String,
    /// Table holding `id`, `email`, `full_name` profile rows.
    pub profile_table: String,
    pub timeouts: HttpTimeouts,
    /// Where to persist the session between runs, if anywhere.
    pub session_file: Option<std::path::PathBuf>,
    /// Refresh sessions this many seconds before they expire.
    pub refresh_margin_secs: u64,
    /// How often the auto-refresh task checks the session.
    pub refresh_interval_secs: u64,
}

impl SupabaseConfig {
    /// Build typed config from environment variables.
    ///
    /// Required:
    /// - `SUPABASE_URL`
    /// - `SUPABASE_ANON_KEY`
    ///
    /// Optional:
    /// - `SUPABASE_PROFILE_TABLE`: default `users`
    /// - `SUPABASE_REQUEST_TIMEOUT_SECS`: default 30
    /// - `SUPABASE_CONNECT_TIMEOUT_SECS`: default 10
    /// - `SUPABASE_SESSION_FILE`: no persistence when absent
    /// - `SUPABASE_REFRESH_MARGIN_SECS`: default 60
    /// - `SUPABASE_REFRESH_INTERVAL_SECS`: default 30
    ///
    /// # Errors
    ///
    /// Returns `MissingEnv` if a required variable is unset or blank.
    pub fn from_env() -> Result<Self, AuthError> {
        let url = required_env("SUPABASE_URL")?.trim_end_matches('/').to_string();
        let anon_key = required_env("SUPABASE_ANON_KEY")?;
        let profile_table = std::env::var("SUPABASE_PROFILE_TABLE")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_PROFILE_TABLE.to_string());
        let timeouts = HttpTimeouts {
            request_secs: env_parse("SUPABASE_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_secs: env_parse("SUPABASE_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS),
        };
        let session_file = std::env::var("SUPABASE_SESSION_FILE")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(std::path::PathBuf::from);

        Ok(Self {
            url,
            anon_key,
            profile_table,
            timeouts,
            session_file,
            refresh_margin_secs: env_parse("SUPABASE_REFRESH_MARGIN_SECS", DEFAULT_REFRESH_MARGIN_SECS),
            refresh_interval_secs: env_parse("SUPABASE_REFRESH_INTERVAL_SECS", DEFAULT_REFRESH_INTERVAL_SECS),
        })
    }
}

fn required_env(key: &str) -> Result<String, AuthError> {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| AuthError::MissingEnv { var: key.into() })
}

fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
