// ============================
// crates/backend-lib/src/handlers/account.rs
// ============================
//! Session-protected pages.
use axum::{extract::State, Extension, Json};
use authgate_common::{SessionWithUser, User};
use std::sync::Arc;

use crate::error::AppError;
use crate::middleware::CurrentSession;
use crate::store::Store;
use crate::AppState;

/// `GET /api/dashboard`
pub async fn dashboard(
    Extension(CurrentSession(current)): Extension<CurrentSession>,
) -> Json<SessionWithUser> {
    Json(current)
}

/// `GET /api/admin/users`
pub async fn list_users<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<User>>, AppError> {
    Ok(Json(state.auth.list_users().await?))
}
