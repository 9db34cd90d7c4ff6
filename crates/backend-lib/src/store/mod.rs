// ============================
// crates/backend-lib/src/store/mod.rs
// ============================
//! Storage abstraction for users, sessions and verification tokens.
//!
//! Adapters report failures as [`StoreError`]s whose [`StoreErrorKind`] is
//! decided by the adapter itself. Callers that want to ride out connection
//! trouble go through [`retry`].

pub mod flat_file;
pub mod memory;
pub mod retry;

use async_trait::async_trait;
use authgate_common::{Session, SessionWithUser, User};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io;
use thiserror::Error;

pub use flat_file::FlatFileStore;
pub use memory::MemoryStore;
pub use retry::{find_session_with_retry, find_user_with_retry, with_store_retry, RetryPolicy};

/// Driver messages that indicate a transient connection problem
const TRANSIENT_MARKERS: &[&str] = &["connection pool", "p2024", "timed out"];

/// Whether a failure is worth retrying
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorKind {
    Transient,
    Fatal,
}

impl StoreErrorKind {
    /// Classify raw driver text. Only used at the adapter boundary.
    pub fn classify(message: &str) -> Self {
        let lowered = message.to_lowercase();
        if TRANSIENT_MARKERS.iter().any(|marker| lowered.contains(marker)) {
            Self::Transient
        } else {
            Self::Fatal
        }
    }
}

/// Errors raised by store adapters
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("connection pool exhausted: {0}")]
    PoolExhausted(String),

    #[error("timed out: {0}")]
    Timeout(String),

    #[error("record not found: {0}")]
    NotFound(String),

    #[error("record already exists: {0}")]
    Conflict(String),

    #[error("corrupt record: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("store is closed")]
    Closed,

    #[error("{message}")]
    Driver {
        kind: StoreErrorKind,
        message: String,
    },
}

impl StoreError {
    /// Wrap raw driver text, classifying it once
    pub fn driver(message: impl Into<String>) -> Self {
        let message = message.into();
        StoreError::Driver {
            kind: StoreErrorKind::classify(&message),
            message,
        }
    }

    pub fn kind(&self) -> StoreErrorKind {
        match self {
            StoreError::PoolExhausted(_) | StoreError::Timeout(_) => StoreErrorKind::Transient,
            StoreError::Driver { kind, .. } => *kind,
            StoreError::NotFound(_)
            | StoreError::Conflict(_)
            | StoreError::Serialization(_)
            | StoreError::Closed => StoreErrorKind::Fatal,
        }
    }

    pub fn is_transient(&self) -> bool {
        self.kind() == StoreErrorKind::Transient
    }
}

impl From<io::Error> for StoreError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => {
                StoreError::Timeout(err.to_string())
            },
            _ => StoreError::driver(err.to_string()),
        }
    }
}

/// A user together with its credential
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserRecord {
    pub user: User,
    /// PHC-formatted scrypt hash, absent for accounts without a password
    #[serde(default)]
    pub password_hash: Option<String>,
}

/// Single-use token, consumed on read
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Verification {
    pub id: String,
    /// What the token unlocks, e.g. `reset-password:<user id>` or
    /// `change-email:<user id>:<new email>`
    pub identifier: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Verification {
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Trait for storage backends
#[async_trait]
pub trait Store: Send + Sync {
    /// Cheap round trip used by health checks
    async fn ping(&self) -> Result<(), StoreError>;

    /// Insert a new user; fails with `Conflict` when the email is taken
    async fn insert_user(&self, record: &UserRecord) -> Result<(), StoreError>;

    async fn find_user(&self, id: &str) -> Result<Option<UserRecord>, StoreError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError>;

    /// Replace an existing user; fails with `NotFound` when absent
    async fn update_user(&self, record: &UserRecord) -> Result<(), StoreError>;

    /// All users, oldest first
    async fn list_users(&self) -> Result<Vec<User>, StoreError>;

    async fn insert_session(&self, session: &Session) -> Result<(), StoreError>;

    /// Find a session including its owning user
    async fn find_session(&self, id: &str) -> Result<Option<SessionWithUser>, StoreError>;

    async fn delete_session(&self, id: &str) -> Result<(), StoreError>;

    /// Remove every session of a user, returning how many were removed
    async fn delete_user_sessions(&self, user_id: &str) -> Result<usize, StoreError>;

    /// Remove every session of a user except `keep_id`
    async fn delete_user_sessions_except(
        &self,
        user_id: &str,
        keep_id: &str,
    ) -> Result<usize, StoreError>;

    async fn insert_verification(&self, verification: &Verification) -> Result<(), StoreError>;

    /// Remove and return a verification token
    async fn take_verification(&self, id: &str) -> Result<Option<Verification>, StoreError>;

    /// Release the backend; later calls fail with `Closed`
    async fn close(&self) -> Result<(), StoreError>;
}
