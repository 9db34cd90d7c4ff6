// ============================
// crates/backend-lib/src/auth/mod.rs
// ============================
//! Authentication module.

pub mod password;
pub mod session;
pub mod token;
mod service;
mod service_impl;

pub use password::{verify_password, PasswordHasherConfig};
pub use service::AuthService;
pub use service_impl::LocalAuth;
pub use session::{issue_session, session_ttl_for};
pub use token::generate_token;
