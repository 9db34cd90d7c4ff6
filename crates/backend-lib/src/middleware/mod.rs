// crates/backend-lib/src/middleware/mod.rs

//! Middleware for the authgate server.

pub mod session;

pub use session::{bearer_token, require_admin, require_session, CurrentSession};
