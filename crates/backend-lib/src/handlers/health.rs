// ============================
// crates/backend-lib/src/handlers/health.rs
// ============================
//! Health probe.
use axum::{extract::State, http::StatusCode, Json};
use authgate_common::{DatabaseHealth, HealthReport};
use chrono::Utc;
use std::sync::Arc;
use tracing::warn;

use crate::store::Store;
use crate::AppState;

/// Round-trip the store once
pub async fn database_health<S: Store + ?Sized>(store: &S) -> DatabaseHealth {
    match store.ping().await {
        Ok(()) => DatabaseHealth {
            status: "healthy".to_string(),
            timestamp: Utc::now(),
            error: None,
        },
        Err(err) => {
            warn!(error = %err, "database health check failed");
            DatabaseHealth {
                status: "unhealthy".to_string(),
                timestamp: Utc::now(),
                error: Some(err.to_string()),
            }
        },
    }
}

/// `GET /api/health`
pub async fn health<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> (StatusCode, Json<HealthReport>) {
    let database = database_health(&*state.store).await;
    let (code, status) = if database.error.is_none() {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "error")
    };

    let report = HealthReport {
        status: status.to_string(),
        database,
        timestamp: Utc::now(),
    };
    (code, Json(report))
}
