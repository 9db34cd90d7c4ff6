// ==============
// crates/backend-lib/src/metrics.rs

//! Central place for metric keys
pub const GUARD_REJECTED: &str = "auth.guard.rejected";
pub const SIGN_UP: &str = "auth.sign_up";
pub const SIGN_IN: &str = "auth.sign_in";
pub const SIGN_IN_FAILED: &str = "auth.sign_in.failed";
pub const PASSWORD_RESET_REQUESTED: &str = "auth.password_reset.requested";
pub const EMAIL_CHANGE_REQUESTED: &str = "auth.email_change.requested";
pub const EMAIL_CHANGED: &str = "auth.email_change.completed";
pub const STORE_RETRY: &str = "store.retry";
pub const STORE_RETRY_EXHAUSTED: &str = "store.retry_exhausted";
