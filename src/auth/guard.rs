//! Auth helpers for state consumers.
//!
//! SYSTEM CONTEXT
//! ==============
//! Pages and navigation read `AuthState` snapshots; these helpers keep the
//! redirect and account-label rules identical everywhere they are applied.

use super::types::AuthState;

const ACCOUNT_LABEL_FALLBACK: &str = "Account";

/// Whether a protected page should send the visitor to sign-in.
///
/// Never redirects while the first auth answer is still loading.
#[must_use]
pub fn should_redirect_unauth(state: &AuthState) -> bool {
    !state.loading() && state.user().is_none()
}

/// Label for the account menu button.
#[must_use]
pub fn account_label(state: &AuthState) -> &str {
    state
        .user()
        .map(|u| u.full_name.trim())
        .filter(|name| !name.is_empty())
        .unwrap_or(ACCOUNT_LABEL_FALLBACK)
}

#[cfg(test)]
#[path = "guard_test.rs"]
mod tests;
