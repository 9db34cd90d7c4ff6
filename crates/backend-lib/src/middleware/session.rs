// ============================
// crates/backend-lib/src/middleware/session.rs
// ============================
//! Session and role gates for protected routes.
use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use authgate_common::{SessionWithUser, ADMIN_ROLE};
use std::sync::Arc;
use tracing::debug;

use crate::error::AppError;
use crate::store::Store;
use crate::AppState;

/// The session resolved by [`require_session`], stored as a request extension
#[derive(Debug, Clone)]
pub struct CurrentSession(pub SessionWithUser);

/// Token from an `Authorization: Bearer <token>` header
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Reject requests without a live session
pub async fn require_session<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(request.headers())
        .map(str::to_owned)
        .ok_or_else(|| AppError::Auth("missing bearer token".to_string()))?;

    let current = state
        .auth
        .get_session(&token)
        .await?
        .ok_or_else(|| AppError::Auth("invalid or expired session".to_string()))?;

    request.extensions_mut().insert(CurrentSession(current));
    Ok(next.run(request).await)
}

/// Reject sessions whose user is not an admin. Must run after [`require_session`].
pub async fn require_admin(request: Request, next: Next) -> Result<Response, AppError> {
    let Some(CurrentSession(current)) = request.extensions().get::<CurrentSession>() else {
        return Err(AppError::Auth("missing session".to_string()));
    };
    if !current.user.has_role(ADMIN_ROLE) {
        debug!(user_id = %current.user.id, "admin route refused");
        return Err(AppError::Forbidden("admin role required".to_string()));
    }
    Ok(next.run(request).await)
}
