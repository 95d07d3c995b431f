//! HTTP routes for Call Controller.
//!
//! Defines the Axum router and application state.

use crate::config::Config;
use crate::handlers;
use crate::middleware::http_metrics_middleware;
use crate::repositories::CallStore;
use crate::services::PushClient;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Application state shared across all handlers.
///
/// The store and push clients are trait objects so tests can substitute
/// in-memory fakes; production wires `PgCallStore` and `FcmClient` at
/// startup.
#[derive(Clone)]
pub struct AppState {
    /// Service configuration.
    pub config: Config,

    /// Call record store.
    pub store: Arc<dyn CallStore>,

    /// Push delivery client.
    pub push: Arc<dyn PushClient>,
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `GET /` - Liveness probe (static text)
/// - `GET /health` - Liveness probe (Kubernetes convention)
/// - `GET /ready` - Readiness probe (checks the call record store)
/// - `GET /metrics` - Prometheus metrics endpoint
/// - `POST /sendRingingNotification` - Ringing fan-out to explicit tokens
/// - `POST /acceptCall` - Call acceptance with stop-ringing fan-out
/// - TraceLayer for request logging
/// - HTTP metrics middleware
/// - Request timeout from configuration
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let request_timeout = Duration::from_secs(state.config.request_timeout_seconds);

    let api_routes = Router::new()
        .route("/", get(handlers::health_check))
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route(
            "/sendRingingNotification",
            post(handlers::send_ringing_notification),
        )
        .route("/acceptCall", post(handlers::accept_call))
        .with_state(state);

    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    // Layer order (bottom-to-top execution):
    // 1. TimeoutLayer - Timeout the request (innermost)
    // 2. TraceLayer - Log request details
    // 3. http_metrics_middleware - Record ALL responses (outermost)
    api_routes
        .merge(metrics_routes)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(request_timeout))
        .layer(middleware::from_fn(http_metrics_middleware))
}
