//! HTTP metrics middleware.
//!
//! Records request metrics for ALL responses, including framework-level
//! errors produced before a handler runs (400 JSON parse failures, 404,
//! 405, 415). Applied as the outermost layer.

use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;

use crate::observability::metrics::record_http_request;

/// Middleware that records method, normalized path, status code and
/// duration for every HTTP response.
pub async fn http_metrics_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;

    let duration = start.elapsed();
    record_http_request(&method, &path, response.status().as_u16(), duration);

    response
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request as HttpRequest, StatusCode},
        middleware,
        routing::{get, post},
        Router,
    };
    use tower::ServiceExt;

    async fn ok_handler() -> &'static str {
        "OK"
    }

    async fn conflict_handler() -> (StatusCode, &'static str) {
        (StatusCode::CONFLICT, "conflict")
    }

    fn test_app() -> Router {
        Router::new()
            .route("/", get(ok_handler))
            .route("/acceptCall", post(conflict_handler))
            .layer(middleware::from_fn(http_metrics_middleware))
    }

    #[tokio::test]
    async fn test_middleware_passes_through_success() {
        let response = test_app()
            .oneshot(
                HttpRequest::builder()
                    .method("GET")
                    .uri("/")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_middleware_passes_through_error_status() {
        let response = test_app()
            .oneshot(
                HttpRequest::builder()
                    .method("POST")
                    .uri("/acceptCall")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_middleware_records_framework_404() {
        let response = test_app()
            .oneshot(
                HttpRequest::builder()
                    .method("GET")
                    .uri("/no-such-route")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
