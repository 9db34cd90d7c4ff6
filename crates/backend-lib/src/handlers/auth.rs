// ============================
// crates/backend-lib/src/handlers/auth.rs
// ============================
//! `/api/auth` endpoints.
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header::USER_AGENT, HeaderMap},
    response::{IntoResponse, Response},
    Json,
};
use authgate_common::{SessionWithUser, StatusResponse};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::error::AppError;
use crate::guard::AuthOperation;
use crate::middleware::bearer_token;
use crate::store::Store;
use crate::AppState;

/// `POST /api/auth/{*operation}`: guard the body, then hand it to the auth service
pub async fn auth_post<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(operation): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    let path = format!("/{}", operation.trim_start_matches('/'));
    let operation = AuthOperation::from_path(&path)
        .ok_or_else(|| AppError::NotFound(format!("auth operation {path}")))?;

    let body = parse_object(&body)?;
    state.guard.check_operation(operation, &body)?;

    let auth = &state.auth;
    let response = match operation {
        AuthOperation::SignUpEmail => {
            Json(auth.sign_up(decode(body)?, user_agent(&headers)).await?).into_response()
        },
        AuthOperation::SignInEmail => {
            Json(auth.sign_in(decode(body)?, user_agent(&headers)).await?).into_response()
        },
        AuthOperation::SignOut => {
            auth.sign_out(require_token(&headers)?).await?;
            ok()
        },
        AuthOperation::RequestPasswordReset => {
            auth.request_password_reset(decode(body)?).await?;
            ok()
        },
        AuthOperation::ResetPassword => {
            auth.reset_password(decode(body)?).await?;
            ok()
        },
        AuthOperation::ChangePassword => {
            auth.change_password(require_token(&headers)?, decode(body)?)
                .await?;
            ok()
        },
        AuthOperation::UpdateUser => {
            Json(auth.update_user(require_token(&headers)?, decode(body)?).await?).into_response()
        },
        AuthOperation::ChangeEmail => {
            auth.change_email(require_token(&headers)?, decode(body)?)
                .await?;
            ok()
        },
        AuthOperation::VerifyEmailChange => {
            Json(auth.verify_email_change(decode(body)?).await?).into_response()
        },
    };

    Ok(response)
}

/// `GET /api/auth/get-session`: the caller's session, or `null`
pub async fn get_session<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
) -> Result<Json<Option<SessionWithUser>>, AppError> {
    let Some(token) = bearer_token(&headers) else {
        return Ok(Json(None));
    };
    Ok(Json(state.auth.get_session(token).await?))
}

/// An empty body is treated as `{}`
fn parse_object(body: &[u8]) -> Result<Map<String, Value>, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }
    match serde_json::from_slice::<Value>(body)? {
        Value::Object(map) => Ok(map),
        _ => Err(AppError::InvalidInput(
            "Request body must be a JSON object".to_string(),
        )),
    }
}

fn decode<T: DeserializeOwned>(body: Map<String, Value>) -> Result<T, AppError> {
    Ok(serde_json::from_value(Value::Object(body))?)
}

fn require_token(headers: &HeaderMap) -> Result<&str, AppError> {
    bearer_token(headers).ok_or_else(|| AppError::Auth("missing bearer token".to_string()))
}

fn user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
}

fn ok() -> Response {
    Json(StatusResponse { status: true }).into_response()
}
