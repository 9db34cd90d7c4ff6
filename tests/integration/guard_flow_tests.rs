// =========================
// tests/integration/guard_flow_tests.rs
// =========================
//! Requests rejected before they reach the auth service
use crate::test_utils::{error_message, post_json, send, setup_test_env};
use axum::body::Body;
use axum::http::Request;
use backend_lib::store::Store;
use serde_json::json;

#[tokio::test]
async fn test_weak_password_never_creates_a_user() {
    let env = setup_test_env();
    let (status, body) = send(
        &env.app,
        post_json(
            "/api/auth/sign-up/email",
            &json!({ "name": "Ada", "email": "ada@example.com", "password": "password" }),
            None,
        ),
    )
    .await;

    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "VAL_001");
    assert_eq!(
        error_message(&body),
        "Password must contain at least one uppercase letter"
    );
    assert!(env.store.list_users().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_invalid_email_on_sign_in() {
    let env = setup_test_env();
    let (status, body) = send(
        &env.app,
        post_json(
            "/api/auth/sign-in/email",
            &json!({ "email": "not-an-email", "password": "whatever" }),
            None,
        ),
    )
    .await;
    assert_eq!(status, 400);
    assert_eq!(error_message(&body), "Please enter a valid email address");
}

#[tokio::test]
async fn test_reset_password_strength_via_password_field() {
    let env = setup_test_env();
    let (status, body) = send(
        &env.app,
        post_json(
            "/api/auth/reset-password",
            &json!({ "token": "abc", "password": "short" }),
            None,
        ),
    )
    .await;
    assert_eq!(status, 400);
    assert_eq!(error_message(&body), "Password must be at least 8 characters");

    // A strong password passes the guard and fails on the unknown token instead
    let (status, body) = send(
        &env.app,
        post_json(
            "/api/auth/reset-password",
            &json!({ "token": "abc", "password": "NewPassword456!" }),
            None,
        ),
    )
    .await;
    assert_eq!(status, 400);
    assert!(error_message(&body).contains("Invalid or expired token"));
}

#[tokio::test]
async fn test_malformed_bodies() {
    let env = setup_test_env();

    let (status, _) = send(
        &env.app,
        post_json("/api/auth/sign-up/email", &json!(["not", "an", "object"]), None),
    )
    .await;
    assert_eq!(status, 400);

    let request = Request::builder()
        .method("POST")
        .uri("/api/auth/sign-in/email")
        .header("content-type", "application/json")
        .body(Body::from("{broken"))
        .unwrap();
    let (status, body) = send(&env.app, request).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "JSON_001");

    // Passes the guard (nothing present) but lacks required fields
    let (status, _) = send(&env.app, post_json("/api/auth/sign-up/email", &json!({}), None)).await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn test_unknown_operation_is_not_found() {
    let env = setup_test_env();
    let (status, body) = send(
        &env.app,
        post_json("/api/auth/sign-in/magic-link", &json!({ "email": "a@example.com" }), None),
    )
    .await;
    assert_eq!(status, 404);
    assert_eq!(body["error"]["code"], "NF_001");
}
