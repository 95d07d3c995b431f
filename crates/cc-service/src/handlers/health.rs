//! Health check handlers.
//!
//! - `/` and `/health`: Liveness probes - return OK if the process is running
//! - `/ready`: Readiness probe - checks the call record store
//! - `/metrics`: Prometheus exposition

use crate::models::ReadinessResponse;
use crate::routes::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

/// Liveness probe handler, also serving `GET /`.
///
/// Returns a static body to indicate the process is running. Does NOT check
/// any dependencies - failure means the process is hung or deadlocked.
pub async fn health_check() -> &'static str {
    "OK"
}

/// Readiness probe handler.
///
/// Checks the call record store to determine if the service can handle
/// traffic. Returns 200 if ready, 503 if not ready.
///
/// Error messages are intentionally generic to avoid leaking infrastructure
/// details; actual errors are logged server-side.
#[tracing::instrument(skip_all, name = "cc.health.readiness")]
pub async fn readiness_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    if let Err(e) = state.store.check_connectivity().await {
        tracing::warn!("Readiness check failed: store error: {}", e);
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadinessResponse {
                status: "not_ready",
                database: Some("unhealthy"),
                error: Some("Service dependencies unavailable".to_string()),
            }),
        );
    }

    (
        StatusCode::OK,
        Json(ReadinessResponse {
            status: "ready",
            database: Some("healthy"),
            error: None,
        }),
    )
}

/// Prometheus metrics exposition handler.
pub async fn metrics_handler(State(handle): State<PrometheusHandle>) -> String {
    handle.render()
}
