//! # study-assistant
//!
//! Client-side authentication session management for the study-assistant
//! app. The `auth` module owns the local "who is logged in" view and keeps it
//! consistent with a remote identity provider; `supabase` is the concrete
//! provider the app talks to.

pub mod auth;
pub mod config;
pub mod supabase;
