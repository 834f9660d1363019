//! Wire types for the Supabase auth (`/auth/v1`) and REST (`/rest/v1`) APIs.
//!
//! Pure parsing lives here so it can be tested without a network.

use serde::{Deserialize, Serialize};

use crate::auth::{AuthError, Session, UserProfile};

pub(crate) const PROFILE_COLUMNS: &str = "id,email,full_name";

// =============================================================================
// REQUESTS
// =============================================================================

#[derive(Serialize)]
pub(crate) struct PasswordGrant<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Serialize)]
pub(crate) struct RefreshGrant<'a> {
    pub refresh_token: &'a str,
}

pub(crate) fn token_endpoint(base_url: &str, grant_type: &str) -> String {
    format!("{base_url}/auth/v1/token?grant_type={grant_type}")
}

pub(crate) fn logout_endpoint(base_url: &str) -> String {
    format!("{base_url}/auth/v1/logout")
}

pub(crate) fn profile_endpoint(base_url: &str, table: &str) -> String {
    format!("{base_url}/rest/v1/{table}")
}

/// PostgREST filter selecting a single profile by subject.
pub(crate) fn profile_query(subject_id: &str) -> [(&'static str, String); 2] {
    [("id", format!("eq.{subject_id}")), ("select", PROFILE_COLUMNS.to_owned())]
}

/// Logout treats "already gone" as success.
pub(crate) fn logout_status_ok(status: u16) -> bool {
    (200..300).contains(&status) || status == 401 || status == 404
}

// =============================================================================
// RESPONSES
// =============================================================================

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
    expires_at: Option<i64>,
    user: AuthUser,
}

#[derive(Deserialize)]
struct AuthUser {
    id: String,
    email: Option<String>,
}

#[derive(Deserialize)]
struct ProfileRow {
    id: String,
    email: Option<String>,
    full_name: Option<String>,
}

/// Parse a `/auth/v1/token` response into a session.
///
/// `now` (seconds since the Unix epoch) anchors `expires_in` when the
/// response carries no absolute `expires_at`.
pub(crate) fn parse_token_response(json: &str, now: i64) -> Result<Session, AuthError> {
    let resp: TokenResponse = serde_json::from_str(json).map_err(|e| AuthError::ApiParse(e.to_string()))?;
    let expires_at = resp
        .expires_at
        .or_else(|| resp.expires_in.map(|secs| now.saturating_add(secs)));
    Ok(Session {
        subject_id: resp.user.id,
        email: resp.user.email,
        access_token: resp.access_token,
        refresh_token: resp.refresh_token,
        expires_at,
    })
}

/// Parse a PostgREST profile result with "maybe single" semantics.
pub(crate) fn parse_profile_rows(json: &str) -> Result<Option<UserProfile>, AuthError> {
    let mut rows: Vec<ProfileRow> = serde_json::from_str(json).map_err(|e| AuthError::ApiParse(e.to_string()))?;
    if rows.len() > 1 {
        return Err(AuthError::ApiParse(format!("expected at most one profile row, got {}", rows.len())));
    }
    Ok(rows.pop().map(|row| UserProfile {
        id: row.id,
        full_name: row.full_name.unwrap_or_default(),
        email: row.email.unwrap_or_default(),
    }))
}

#[cfg(test)]
#[path = "wire_test.rs"]
mod tests;
