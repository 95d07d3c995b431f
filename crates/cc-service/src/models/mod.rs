//! Call Controller models.
//!
//! Contains data types used across the Call Controller service: the stored
//! call record and device directory entries, and the request/response bodies
//! of the HTTP surface.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Call status enumeration.
///
/// Lifecycle state of a user's active call. Terminal states (ended,
/// declined) are owned by external collaborators and never stored by this
/// service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallStatus {
    /// Call is ringing on the user's registered devices.
    Ringing,

    /// Call has been accepted by exactly one device.
    InProgress,
}

impl CallStatus {
    /// Returns the string representation of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            CallStatus::Ringing => "ringing",
            CallStatus::InProgress => "in_progress",
        }
    }

    /// Parse a stored status value.
    pub fn parse(s: &str) -> Result<Self, String> {
        match s {
            "ringing" => Ok(CallStatus::Ringing),
            "in_progress" => Ok(CallStatus::InProgress),
            other => Err(format!("Invalid call status: {}", other)),
        }
    }
}

/// A user's active call record.
///
/// One row per user. Created and overwritten by the external "start ringing"
/// collaborator; this service only ever performs the single
/// ringing -> in_progress transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRecord {
    /// Owning user identifier.
    pub user_id: String,

    /// Opaque identifier of the current call attempt.
    pub call_id: String,

    /// Current call status.
    pub status: CallStatus,

    /// Device that accepted the call. Set exactly once, when the status
    /// moves to `in_progress`.
    pub accepted_by_device_id: Option<String>,

    /// Last update timestamp (maintained by the store).
    pub updated_at: DateTime<Utc>,
}

/// A registered device entry from the per-user device directory.
///
/// Registration and removal are owned by an external collaborator; this
/// service only reads the directory to compute stop-ringing targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceEntry {
    /// Unique device identifier within the user's directory.
    pub device_id: String,

    /// Push-delivery address. Absent for devices that never registered a
    /// token or whose token was revoked.
    pub fcm_token: Option<String>,
}

// ============================================================================
// Readiness
// ============================================================================

/// Readiness check response.
///
/// Returned by the `/ready` endpoint (readiness probe).
#[derive(Debug, Clone, Serialize)]
pub struct ReadinessResponse {
    /// Service readiness status ("ready" or "not_ready").
    pub status: &'static str,

    /// Call record store connectivity status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<&'static str>,

    /// Error message (generic, no infrastructure details).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ============================================================================
// Accept Call API Models
// ============================================================================

/// Request body for `POST /acceptCall`.
///
/// `token` and `channel` are opaque passthrough fields echoed back to the
/// caller for joining the media session; the service never interprets them.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptCallRequest {
    /// Call attempt the device is accepting.
    pub call_id: String,

    /// Device performing the acceptance.
    pub accepted_by_device_id: String,

    /// User whose call record is being transitioned.
    pub current_uid: String,

    /// Opaque media session token, echoed back verbatim.
    pub token: String,

    /// Opaque media channel name, echoed back verbatim.
    pub channel: String,
}

impl AcceptCallRequest {
    /// Validate that all required fields are present and non-empty.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.call_id.trim().is_empty() {
            return Err("callId is required");
        }
        if self.accepted_by_device_id.trim().is_empty() {
            return Err("acceptedByDeviceId is required");
        }
        if self.current_uid.trim().is_empty() {
            return Err("currentUid is required");
        }
        if self.token.trim().is_empty() {
            return Err("token is required");
        }
        if self.channel.trim().is_empty() {
            return Err("channel is required");
        }
        Ok(())
    }
}

/// Response body for a successful `POST /acceptCall`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptCallResponse {
    /// Human-readable confirmation.
    pub message: String,

    /// Accepted call attempt.
    pub call_id: String,

    /// Device that won the acceptance.
    pub accepted_by_device_id: String,

    /// Passthrough media session token from the request.
    pub token: String,

    /// Passthrough media channel name from the request.
    pub channel: String,
}

// ============================================================================
// Ringing Notification API Models
// ============================================================================

/// Request body for `POST /sendRingingNotification`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RingingNotificationRequest {
    /// Target device push tokens. Must be non-empty.
    pub fcm_tokens: Vec<String>,

    /// Calling user identifier, forwarded verbatim in the payload.
    pub caller_id: String,

    /// Call attempt identifier, forwarded verbatim in the payload.
    pub call_id: String,

    /// Notification kind, forwarded verbatim in the payload.
    #[serde(rename = "type")]
    pub kind: String,

    /// Opaque media channel name, forwarded verbatim in the payload.
    pub channel: String,

    /// Opaque media session token, forwarded verbatim in the payload.
    pub token: String,
}

impl RingingNotificationRequest {
    /// Validate that the token list is non-empty and all scalar fields are
    /// present and non-empty.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.fcm_tokens.is_empty() {
            return Err("fcmTokens must be a non-empty array");
        }
        if self.caller_id.trim().is_empty() {
            return Err("callerId is required");
        }
        if self.call_id.trim().is_empty() {
            return Err("callId is required");
        }
        if self.kind.trim().is_empty() {
            return Err("type is required");
        }
        if self.channel.trim().is_empty() {
            return Err("channel is required");
        }
        if self.token.trim().is_empty() {
            return Err("token is required");
        }
        Ok(())
    }
}

/// Response body for a successful `POST /sendRingingNotification`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RingingNotificationResponse {
    /// Human-readable confirmation.
    pub message: String,

    /// Number of tokens that accepted delivery.
    pub success_count: usize,

    /// Number of tokens that failed delivery.
    pub failure_count: usize,

    /// Per-token delivery outcomes.
    pub details: Vec<crate::services::push_client::SendOutcome>,
}
