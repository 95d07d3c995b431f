//! Ringing notification handler.
//!
//! Implements `POST /sendRingingNotification`: a direct, un-gated use of
//! the push dispatcher with no state transition. The caller supplies the
//! target tokens and the five data fields, which are forwarded verbatim.

use crate::errors::CcError;
use crate::models::{RingingNotificationRequest, RingingNotificationResponse};
use crate::routes::AppState;
use crate::services::push_client::NotificationData;
use axum::{extract::State, Json};
use std::sync::Arc;
use tracing::{info, instrument};

/// Handler for POST /sendRingingNotification
///
/// # Response
///
/// - 200 OK: Batch dispatched; body carries aggregate counts and per-token
///   outcomes (partial delivery failure is data, not an error)
/// - 400 Bad Request: Empty token array, missing/empty field, or malformed
///   body
/// - 500 Internal Server Error: Push transport unavailable
#[instrument(
    skip_all,
    name = "cc.call.notify_ringing",
    fields(
        method = "POST",
        endpoint = "/sendRingingNotification",
    )
)]
pub async fn send_ringing_notification(
    State(state): State<Arc<AppState>>,
    body: axum::body::Bytes,
) -> Result<Json<RingingNotificationResponse>, CcError> {
    // Deserialize request body manually to return 400 (not Axum's default 422)
    let request: RingingNotificationRequest = serde_json::from_slice(&body).map_err(|e| {
        tracing::debug!(target: "cc.handlers.notifications", error = %e, "Invalid request body");
        CcError::BadRequest("Invalid request body".to_string())
    })?;

    request
        .validate()
        .map_err(|e| CcError::BadRequest(e.to_string()))?;

    let data = NotificationData::ringing(
        &request.caller_id,
        &request.call_id,
        &request.kind,
        &request.channel,
        &request.token,
    );

    let report = state.push.send_to_tokens(&request.fcm_tokens, &data).await?;

    info!(
        target: "cc.handlers.notifications",
        call_id = %request.call_id,
        caller_id = %request.caller_id,
        delivered = report.success_count,
        failed = report.failure_count,
        "Ringing notification dispatched"
    );

    Ok(Json(RingingNotificationResponse {
        message: "Notification sent".to_string(),
        success_count: report.success_count,
        failure_count: report.failure_count,
        details: report.outcomes,
    }))
}
