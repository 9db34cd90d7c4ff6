// ============================
// crates/backend-lib/src/router.rs
// ============================
//! HTTP router.
use axum::{
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use crate::handlers::{account, auth, health};
use crate::middleware::{require_admin, require_session};
use crate::store::Store;
use crate::AppState;

/// Create the application router
pub fn create_router<S: Store + 'static>(state: Arc<AppState<S>>) -> Router {
    let protected = Router::new()
        .route("/api/dashboard", get(account::dashboard))
        .route_layer(from_fn_with_state(state.clone(), require_session::<S>));

    // Layers added last run first, so the session is resolved before the role check
    let admin = Router::new()
        .route("/api/admin/users", get(account::list_users::<S>))
        .route_layer(from_fn(require_admin))
        .route_layer(from_fn_with_state(state.clone(), require_session::<S>));

    let cors = cors_layer(&state.settings.auth.trusted_origins);

    Router::new()
        .route("/api/health", get(health::health::<S>))
        .route("/api/auth/get-session", get(auth::get_session::<S>))
        .route("/api/auth/{*operation}", post(auth::auth_post::<S>))
        .merge(protected)
        .merge(admin)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Browser access is limited to the trusted origins
fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "ignoring invalid trusted origin");
                None
            },
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
}
