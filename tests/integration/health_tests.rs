// =========================
// tests/integration/health_tests.rs
// =========================
use crate::test_utils::{get, post_json, send, setup_test_env};
use backend_lib::store::Store;
use serde_json::json;

#[tokio::test]
async fn test_health_reports_database_status() {
    let env = setup_test_env();

    let (status, body) = send(&env.app, get("/api/health", None)).await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"]["status"], "healthy");
    assert!(body["database"].get("error").is_none());

    env.state.store.close().await.unwrap();

    let (status, body) = send(&env.app, get("/api/health", None)).await;
    assert_eq!(status, 503);
    assert_eq!(body["status"], "error");
    assert_eq!(body["database"]["status"], "unhealthy");
    assert_eq!(body["database"]["error"], "store is closed");
}

#[tokio::test]
async fn test_closed_store_fails_auth_requests() {
    let env = setup_test_env();
    env.store.close().await.unwrap();

    let (status, body) = send(
        &env.app,
        post_json(
            "/api/auth/sign-in/email",
            &json!({ "email": "ada@example.com", "password": "Password123!" }),
            None,
        ),
    )
    .await;
    assert_eq!(status, 500);
    assert_eq!(body["error"]["code"], "DB_002");
}
