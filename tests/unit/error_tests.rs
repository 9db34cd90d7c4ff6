// =========================
// tests/unit/error_tests.rs
// =========================
//! Unit tests for the error module
use axum::{body::to_bytes, http::StatusCode, response::IntoResponse};
use backend_lib::error::AppError;
use backend_lib::store::StoreError;
use backend_lib::validation::ValidationError;
use serde_json::Value;

async fn body_of(err: AppError) -> (StatusCode, Value) {
    let response = err.into_response();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_validation_error_body() {
    let (status, body) = body_of(AppError::Validation(ValidationError::InvalidEmail(
        "Please enter a valid email address".to_string(),
    )))
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VAL_001");
    assert_eq!(body["error"]["message"], "Please enter a valid email address");
}

#[tokio::test]
async fn test_store_error_mapping() {
    let (status, body) = body_of(StoreError::PoolExhausted("all busy".to_string()).into()).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["code"], "DB_001");

    let (status, body) = body_of(StoreError::driver("syntax error near SELECT").into()).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["code"], "DB_002");

    // Raw driver text classified at the boundary
    let (status, _) = body_of(StoreError::driver("Timed out fetching a connection").into()).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let (status, _) = body_of(StoreError::NotFound("user".to_string()).into()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[test]
fn test_sanitized_messages_hide_internals() {
    let err = AppError::Internal("disk full at /var/lib".to_string());
    assert_eq!(err.sanitized_message(), "An internal server error occurred");

    let err = AppError::from(StoreError::Timeout("pool".to_string()));
    assert!(!err.sanitized_message().contains("pool"));

    let err = AppError::InvalidInput("Invalid or expired token".to_string());
    assert_eq!(err.sanitized_message(), "Invalid or expired token");
}
