// ============================
// crates/backend-lib/src/auth/session.rs
// ============================
//! Session issuance.
use authgate_common::Session;
use chrono::{Duration, Utc};

use super::token::generate_token;

/// Lifetime in hours of a session opened with `rememberMe: false`
pub const SHORT_SESSION_HOURS: i64 = 24;

/// Build a fresh session for a user, valid for `ttl` from now
pub fn issue_session(user_id: &str, ttl: Duration, user_agent: Option<String>) -> Session {
    let now = Utc::now();
    Session {
        id: generate_token(),
        user_id: user_id.to_string(),
        expires_at: now + ttl,
        created_at: now,
        user_agent,
    }
}

/// Pick the session lifetime for a sign-in
pub fn session_ttl_for(configured: Duration, remember_me: Option<bool>) -> Duration {
    match remember_me {
        Some(false) => configured.min(Duration::hours(SHORT_SESSION_HOURS)),
        _ => configured,
    }
}
