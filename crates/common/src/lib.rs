// ================
// common/src/lib.rs
// ================
//! Common types and structures
//! shared between the `authgate` server and its clients.
//! This module defines the JSON bodies of the `/api/auth` endpoints and the
//! public views of users and sessions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role granted to users allowed into the admin area
pub const ADMIN_ROLE: &str = "admin";

/// Public view of an account
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Email address, stored lowercase
    pub email: String,
    /// Whether the address has been confirmed
    pub email_verified: bool,
    /// Optional role string (`"admin"` unlocks the admin area)
    #[serde(default)]
    pub role: Option<String>,
    /// Optional profile image reference
    #[serde(default)]
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Check whether the user carries the given role
    pub fn has_role(&self, role: &str) -> bool {
        self.role.as_deref() == Some(role)
    }
}

/// A session linking a user to a validity window.
/// The `id` doubles as the bearer token handed to the client.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub user_id: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl Session {
    /// Check whether the session is still inside its validity window
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// A session joined with its owning user
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SessionWithUser {
    pub session: Session,
    pub user: User,
}

/// Sign-up with email and password
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SignUpRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub image: Option<String>,
}

/// Sign-in with email and password
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub remember_me: Option<bool>,
}

/// Ask for a password reset link
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PasswordResetRequest {
    pub email: String,
    /// Client page the emailed link should point at
    #[serde(default)]
    pub redirect_to: Option<String>,
}

/// Complete a password reset with the emailed token
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub token: String,
    /// Also accepted as `password`
    #[serde(alias = "password")]
    pub new_password: String,
}

/// Change the password of the signed-in user
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    #[serde(alias = "password")]
    pub new_password: String,
    #[serde(default)]
    pub revoke_other_sessions: bool,
}

/// Update the profile of the signed-in user
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

/// Ask to move the signed-in account to a new address
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEmailRequest {
    pub new_email: String,
    /// Client page the emailed link should point at
    #[serde(default, rename = "callbackURL")]
    pub callback_url: Option<String>,
}

/// Confirm an email change with the emailed token
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct VerifyEmailChangeRequest {
    pub token: String,
}

/// Returned by sign-up and sign-in
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AuthResponse {
    /// Bearer token for subsequent requests
    pub token: String,
    pub user: User,
}

/// Generic acknowledgement body
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct StatusResponse {
    pub status: bool,
}

/// Database part of the health report
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct DatabaseHealth {
    /// `"healthy"` or `"unhealthy"`
    pub status: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Body of `GET /api/health`
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct HealthReport {
    /// `"ok"` or `"error"`
    pub status: String,
    pub database: DatabaseHealth,
    pub timestamp: DateTime<Utc>,
}

/// Error body produced by the server
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Error code and message
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}
