//! Call acceptance handler.
//!
//! Implements `POST /acceptCall`: the race-free "first writer wins"
//! transition of a user's call record from `ringing` to `in_progress`,
//! followed by a stop-ringing fan-out to the losing devices.
//!
//! # Ordering
//!
//! The fan-out is only ever issued after the transition has committed; no
//! notification is sent for an aborted acceptance. Once committed, the
//! accept always succeeds toward the caller — post-commit dependency
//! failures (directory read, push dispatch) are logged and swallowed,
//! committed transitions are never rolled back.

use crate::errors::CcError;
use crate::models::{AcceptCallRequest, AcceptCallResponse, CallRecord, CallStatus, DeviceEntry};
use crate::observability::metrics;
use crate::routes::AppState;
use crate::services::push_client::NotificationData;
use axum::{extract::State, Json};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

/// Handler for POST /acceptCall
///
/// # Response
///
/// - 200 OK: Transition committed; body echoes `callId`,
///   `acceptedByDeviceId` and the passthrough `token`/`channel`
/// - 400 Bad Request: Missing/empty field or malformed body
/// - 409 Conflict: Transition aborted (already accepted by another device,
///   or the call is no longer active / the call id is stale)
/// - 500 Internal Server Error: Call record store unavailable
#[instrument(
    skip_all,
    name = "cc.call.accept",
    fields(
        method = "POST",
        endpoint = "/acceptCall",
    )
)]
pub async fn accept_call(
    State(state): State<Arc<AppState>>,
    body: axum::body::Bytes,
) -> Result<Json<AcceptCallResponse>, CcError> {
    let start = Instant::now();

    // Deserialize request body manually to return 400 (not Axum's default 422)
    let request: AcceptCallRequest = serde_json::from_slice(&body).map_err(|e| {
        tracing::debug!(target: "cc.handlers.calls", error = %e, "Invalid request body");
        metrics::record_call_accept("error", Some("bad_request"), start.elapsed());
        CcError::BadRequest("Invalid request body".to_string())
    })?;

    request.validate().map_err(|e| {
        metrics::record_call_accept("error", Some("bad_request"), start.elapsed());
        CcError::BadRequest(e.to_string())
    })?;

    // Conditional transition; the store serializes concurrent attempts.
    let committed = state
        .store
        .accept_ringing_call(
            &request.current_uid,
            &request.call_id,
            &request.accepted_by_device_id,
        )
        .await
        .inspect_err(|_| {
            metrics::record_call_accept("error", Some("store"), start.elapsed());
        })?;

    let record = match committed {
        Some(record) => record,
        None => {
            // Re-read to distinguish the two abort causes. Best-effort: the
            // record may change again between abort and re-read, so this is
            // diagnostic detail, not a correctness-bearing guarantee.
            let reread = state.store.get_active_call(&request.current_uid).await;
            let (reason, message) = classify_conflict(&reread);

            metrics::record_call_accept("conflict", Some(reason), start.elapsed());
            warn!(
                target: "cc.handlers.calls",
                user_id = %request.current_uid,
                call_id = %request.call_id,
                device_id = %request.accepted_by_device_id,
                reason,
                "Call acceptance aborted"
            );
            return Err(CcError::Conflict(message.to_string()));
        }
    };

    // Post-commit phase: compute losers and fan out the stop-ringing
    // signal. Failures here never downgrade the committed accept.
    match state.store.list_devices(&request.current_uid).await {
        Ok(devices) => {
            let loser_tokens = losing_device_tokens(&devices, &request.accepted_by_device_id);

            if loser_tokens.is_empty() {
                debug!(
                    target: "cc.handlers.calls",
                    user_id = %request.current_uid,
                    "No losing devices to notify"
                );
            } else {
                let data =
                    NotificationData::ring_ended(&request.call_id, &request.accepted_by_device_id);

                match state.push.send_to_tokens(&loser_tokens, &data).await {
                    Ok(report) => {
                        info!(
                            target: "cc.handlers.calls",
                            user_id = %request.current_uid,
                            call_id = %request.call_id,
                            delivered = report.success_count,
                            failed = report.failure_count,
                            "Stop-ringing fan-out dispatched"
                        );
                    }
                    Err(e) => {
                        warn!(
                            target: "cc.handlers.calls",
                            user_id = %request.current_uid,
                            call_id = %request.call_id,
                            error = %e,
                            "Stop-ringing fan-out failed; accept already committed"
                        );
                    }
                }
            }
        }
        Err(e) => {
            warn!(
                target: "cc.handlers.calls",
                user_id = %request.current_uid,
                call_id = %request.call_id,
                error = %e,
                "Device directory read failed; skipping stop-ringing fan-out"
            );
        }
    }

    metrics::record_call_accept("committed", None, start.elapsed());
    info!(
        target: "cc.handlers.calls",
        user_id = %record.user_id,
        call_id = %record.call_id,
        device_id = %request.accepted_by_device_id,
        "Call accepted"
    );

    Ok(Json(AcceptCallResponse {
        message: "Call accepted".to_string(),
        call_id: request.call_id,
        accepted_by_device_id: request.accepted_by_device_id,
        token: request.token,
        channel: request.channel,
    }))
}

/// Classify an aborted transition from the post-abort re-read.
///
/// Returns `(metrics reason label, client-facing message)`.
fn classify_conflict(
    reread: &Result<Option<CallRecord>, CcError>,
) -> (&'static str, &'static str) {
    match reread {
        Ok(Some(record)) if record.status == CallStatus::InProgress => (
            "already_accepted",
            "Call already accepted by another device",
        ),
        // Absent record, stale call id, or a failed diagnostic re-read all
        // collapse to the generic cause.
        _ => (
            "inactive",
            "Call is no longer active or the call id is invalid",
        ),
    }
}

/// Compute the stop-ringing target tokens: every directory entry other than
/// the accepting device that carries a non-empty push token.
fn losing_device_tokens(devices: &[DeviceEntry], accepted_by_device_id: &str) -> Vec<String> {
    devices
        .iter()
        .filter(|device| device.device_id != accepted_by_device_id)
        .filter_map(|device| device.fcm_token.clone())
        .filter(|token| !token.is_empty())
        .collect()
}
