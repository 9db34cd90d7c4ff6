// ============================
// crates/backend-lib/src/auth/service.rs
// ============================
use async_trait::async_trait;
use authgate_common::{
    AuthResponse, ChangeEmailRequest, ChangePasswordRequest, PasswordResetRequest,
    ResetPasswordRequest, SessionWithUser, SignInRequest, SignUpRequest, UpdateUserRequest, User,
    VerifyEmailChangeRequest,
};

use crate::error::AppError;

/// Account and session operations behind the `/api/auth` endpoints.
///
/// Bodies reaching these methods have already passed the request guard.
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Create an account and open a session for it
    async fn sign_up(
        &self,
        req: SignUpRequest,
        user_agent: Option<String>,
    ) -> Result<AuthResponse, AppError>;

    async fn sign_in(
        &self,
        req: SignInRequest,
        user_agent: Option<String>,
    ) -> Result<AuthResponse, AppError>;

    async fn sign_out(&self, token: &str) -> Result<(), AppError>;

    /// Resolve a bearer token; expired sessions come back as `None`
    async fn get_session(&self, token: &str) -> Result<Option<SessionWithUser>, AppError>;

    /// Mail a reset link when the account exists. Succeeds either way.
    async fn request_password_reset(&self, req: PasswordResetRequest) -> Result<(), AppError>;

    async fn reset_password(&self, req: ResetPasswordRequest) -> Result<(), AppError>;

    async fn change_password(
        &self,
        token: &str,
        req: ChangePasswordRequest,
    ) -> Result<(), AppError>;

    async fn update_user(&self, token: &str, req: UpdateUserRequest) -> Result<User, AppError>;

    /// Mail a confirmation link for moving the account to `new_email`
    async fn change_email(&self, token: &str, req: ChangeEmailRequest) -> Result<(), AppError>;

    /// Apply a confirmed email change
    async fn verify_email_change(&self, req: VerifyEmailChangeRequest) -> Result<User, AppError>;

    async fn list_users(&self) -> Result<Vec<User>, AppError>;
}
