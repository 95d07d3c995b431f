//! Call Controller error types.
//!
//! Errors map to the HTTP surface as follows:
//!
//! - `BadRequest` -> 400 `{error}` (validation failed, no side effects)
//! - `Conflict` -> 409 `{error}` (transition aborted)
//! - `Database` / `PushTransport` -> 500 `{error, details}`
//! - `Internal` -> 500 `{error}`
//!
//! Internal detail strings are logged server-side; the `details` field in
//! 500 responses carries only the dependency name, never connection strings
//! or credentials.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CcError {
    /// Request validation failed. No operation was attempted.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Call state transition aborted (race lost, stale call id, or the
    /// record is no longer ringing).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Call record store operation failed.
    #[error("Database error: {0}")]
    Database(String),

    /// Push transport (FCM) level failure. Per-token delivery failures are
    /// reported as data, not as this error.
    #[error("Push transport error: {0}")]
    PushTransport(String),

    /// Generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl CcError {
    /// Returns a bounded label string for the error variant (for metrics).
    ///
    /// Uses enum variant names, not error message content, so label
    /// cardinality stays bounded.
    pub fn error_type_label(&self) -> &'static str {
        match self {
            CcError::BadRequest(_) => "bad_request",
            CcError::Conflict(_) => "conflict",
            CcError::Database(_) => "database",
            CcError::PushTransport(_) => "push_transport",
            CcError::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for CcError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            CcError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, message.clone(), None)
            }
            CcError::Conflict(message) => (StatusCode::CONFLICT, message.clone(), None),
            CcError::Database(detail) => {
                tracing::error!(target: "cc.errors", error = %detail, "Database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                    Some("call record store unavailable".to_string()),
                )
            }
            CcError::PushTransport(detail) => {
                tracing::error!(target: "cc.errors", error = %detail, "Push transport error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to send notification".to_string(),
                    Some("push transport unavailable".to_string()),
                )
            }
            CcError::Internal(detail) => {
                tracing::error!(target: "cc.errors", error = %detail, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        (status, Json(ErrorResponse { error, details })).into_response()
    }
}

impl From<sqlx::Error> for CcError {
    fn from(err: sqlx::Error) -> Self {
        CcError::Database(err.to_string())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn response_parts(err: CcError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        (status, body)
    }

    #[tokio::test]
    async fn test_bad_request_maps_to_400() {
        let (status, body) =
            response_parts(CcError::BadRequest("Missing required field: callId".into())).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Missing required field: callId");
        assert!(body.get("details").is_none());
    }

    #[tokio::test]
    async fn test_conflict_maps_to_409() {
        let (status, body) =
            response_parts(CcError::Conflict("Call already accepted".into())).await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "Call already accepted");
    }

    #[tokio::test]
    async fn test_database_error_hides_internal_detail() {
        let (status, body) = response_parts(CcError::Database(
            "connection refused at 192.168.1.100:5432".into(),
        ))
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "An internal error occurred");
        let details = body["details"].as_str().unwrap();
        assert!(!details.contains("192.168"));
    }

    #[tokio::test]
    async fn test_push_transport_error_maps_to_500_with_details() {
        let (status, body) =
            response_parts(CcError::PushTransport("token fetch failed".into())).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Failed to send notification");
        assert_eq!(body["details"], "push transport unavailable");
    }

    #[test]
    fn test_error_type_label_exhaustive() {
        assert_eq!(
            CcError::BadRequest("x".into()).error_type_label(),
            "bad_request"
        );
        assert_eq!(CcError::Conflict("x".into()).error_type_label(), "conflict");
        assert_eq!(CcError::Database("x".into()).error_type_label(), "database");
        assert_eq!(
            CcError::PushTransport("x".into()).error_type_label(),
            "push_transport"
        );
        assert_eq!(CcError::Internal("x".into()).error_type_label(), "internal");
    }

    #[test]
    fn test_display_formatting() {
        assert_eq!(
            format!("{}", CcError::Conflict("already accepted".to_string())),
            "Conflict: already accepted"
        );
        assert_eq!(
            format!("{}", CcError::Database("timeout".to_string())),
            "Database error: timeout"
        );
    }
}
