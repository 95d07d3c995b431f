//! Push delivery client for the FCM HTTP v1 API.
//!
//! Each target token gets its own `messages:send` request (the v1 API has no
//! server-side multicast), and outcomes are collected independently: one
//! token's failure never affects delivery to the others. Only a
//! credential-level failure (OAuth token fetch) is a dispatcher error.
//!
//! Messages are data-only with high-delivery-priority and wake-in-background
//! hints on every platform, so receivers can stop ringing even when not
//! foregrounded.

use crate::errors::CcError;
use crate::observability::metrics;
use async_trait::async_trait;
use gcp_auth::{CustomServiceAccount, TokenProvider};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, instrument, warn};

/// OAuth scope required by the FCM v1 send endpoint.
const FCM_SCOPES: &[&str] = &["https://www.googleapis.com/auth/firebase.messaging"];

/// A notification payload: a message kind plus string key/value fields.
///
/// Rendered into the FCM `data` map with the kind under the `"type"` key.
/// Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationData {
    pub kind: String,
    pub fields: Vec<(String, String)>,
}

impl NotificationData {
    /// Stop-ringing fan-out payload sent to losing devices after an
    /// acceptance commits.
    pub fn ring_ended(call_id: &str, accepted_by_device_id: &str) -> Self {
        Self {
            kind: "ring_ended".to_string(),
            fields: vec![
                ("callId".to_string(), call_id.to_string()),
                (
                    "acceptedByDeviceId".to_string(),
                    accepted_by_device_id.to_string(),
                ),
            ],
        }
    }

    /// Ringing payload carrying the caller's five data fields verbatim.
    /// The kind comes from the request, not a constant.
    pub fn ringing(
        caller_id: &str,
        call_id: &str,
        kind: &str,
        channel: &str,
        token: &str,
    ) -> Self {
        Self {
            kind: kind.to_string(),
            fields: vec![
                ("callerId".to_string(), caller_id.to_string()),
                ("callId".to_string(), call_id.to_string()),
                ("channel".to_string(), channel.to_string()),
                ("token".to_string(), token.to_string()),
            ],
        }
    }

    /// Render the FCM `data` map (kind under `"type"`, then the fields).
    pub fn to_data_map(&self) -> serde_json::Map<String, serde_json::Value> {
        let mut map = serde_json::Map::new();
        map.insert(
            "type".to_string(),
            serde_json::Value::String(self.kind.clone()),
        );
        for (key, value) in &self.fields {
            map.insert(key.clone(), serde_json::Value::String(value.clone()));
        }
        map
    }
}

/// Delivery outcome for a single token.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SendOutcome {
    /// Target token.
    pub token: String,

    /// Whether the transport accepted the message for this token.
    pub success: bool,

    /// Error detail for failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Aggregate result of one dispatch batch.
#[derive(Debug, Clone)]
pub struct DispatchReport {
    pub success_count: usize,
    pub failure_count: usize,
    pub outcomes: Vec<SendOutcome>,
}

impl DispatchReport {
    fn from_outcomes(outcomes: Vec<SendOutcome>) -> Self {
        let success_count = outcomes.iter().filter(|o| o.success).count();
        let failure_count = outcomes.len() - success_count;
        Self {
            success_count,
            failure_count,
            outcomes,
        }
    }
}

/// Abstraction over the push transport.
///
/// Injected into the application state as a trait object so handlers can be
/// exercised against [`mock::MockPushClient`] in tests.
#[async_trait]
pub trait PushClient: Send + Sync {
    /// Deliver `data` to each token independently.
    ///
    /// Per-token failures are reported in the returned report, never as an
    /// `Err`. `Err` means the dispatch as a whole could not be attempted
    /// (e.g., credentials unavailable).
    async fn send_to_tokens(
        &self,
        tokens: &[String],
        data: &NotificationData,
    ) -> Result<DispatchReport, CcError>;
}

/// FCM HTTP v1 push client.
pub struct FcmClient {
    http: reqwest::Client,
    auth: Arc<dyn TokenProvider>,
    project_id: String,
}

impl FcmClient {
    /// Build a client from a service-account JSON file.
    pub fn new(
        project_id: String,
        credentials_path: impl AsRef<Path>,
    ) -> Result<Self, CcError> {
        let service_account = CustomServiceAccount::from_file(credentials_path.as_ref())
            .map_err(|e| {
                CcError::PushTransport(format!("Failed to load service account: {}", e))
            })?;

        Ok(Self {
            http: reqwest::Client::new(),
            auth: Arc::new(service_account),
            project_id,
        })
    }

    fn send_url(&self) -> String {
        format!(
            "https://fcm.googleapis.com/v1/projects/{}/messages:send",
            self.project_id
        )
    }

    /// Build the FCM v1 message body for one token.
    ///
    /// High-delivery-priority and background-wake hints on every platform.
    fn message_body(token: &str, data: &NotificationData) -> serde_json::Value {
        serde_json::json!({
            "message": {
                "token": token,
                "data": data.to_data_map(),
                "android": { "priority": "high" },
                "apns": {
                    "headers": { "apns-priority": "10" },
                    "payload": { "aps": { "content-available": 1 } }
                },
                "webpush": { "headers": { "Urgency": "high" } },
            }
        })
    }
}

#[async_trait]
impl PushClient for FcmClient {
    #[instrument(skip_all, name = "cc.push.send", fields(tokens = tokens.len()))]
    async fn send_to_tokens(
        &self,
        tokens: &[String],
        data: &NotificationData,
    ) -> Result<DispatchReport, CcError> {
        let start = Instant::now();

        let oauth_token = self.auth.token(FCM_SCOPES).await.map_err(|e| {
            metrics::record_push_dispatch("error", 0, 0, start.elapsed());
            CcError::PushTransport(format!("Failed to obtain FCM access token: {}", e))
        })?;

        let url = self.send_url();
        let mut outcomes = Vec::with_capacity(tokens.len());

        for token in tokens {
            let body = Self::message_body(token, data);

            let outcome = match self
                .http
                .post(&url)
                .bearer_auth(oauth_token.as_str())
                .json(&body)
                .send()
                .await
            {
                Ok(response) if response.status().is_success() => {
                    debug!(target: "cc.push", kind = %data.kind, "Push delivered");
                    SendOutcome {
                        token: token.clone(),
                        success: true,
                        error: None,
                    }
                }
                Ok(response) => {
                    let status = response.status();
                    let detail = response.text().await.unwrap_or_default();
                    warn!(
                        target: "cc.push",
                        kind = %data.kind,
                        status = %status,
                        "Push rejected by transport"
                    );
                    SendOutcome {
                        token: token.clone(),
                        success: false,
                        error: Some(format!("HTTP {}: {}", status, detail)),
                    }
                }
                Err(e) => {
                    warn!(target: "cc.push", kind = %data.kind, error = %e, "Push request failed");
                    SendOutcome {
                        token: token.clone(),
                        success: false,
                        error: Some(e.to_string()),
                    }
                }
            };

            outcomes.push(outcome);
        }

        let report = DispatchReport::from_outcomes(outcomes);
        metrics::record_push_dispatch(
            "success",
            report.success_count,
            report.failure_count,
            start.elapsed(),
        );

        Ok(report)
    }
}

pub mod mock {
    //! In-memory `PushClient` for tests.

    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;

    /// A dispatch captured by [`MockPushClient`] for test assertions.
    #[derive(Debug, Clone)]
    pub struct RecordedDispatch {
        pub tokens: Vec<String>,
        pub data: NotificationData,
    }

    /// Mock push client.
    ///
    /// Delivery succeeds per token unless the token was listed as failing;
    /// `unavailable()` makes every dispatch fail as a transport error.
    pub struct MockPushClient {
        failing_tokens: HashSet<String>,
        unavailable: bool,
        dispatches: Mutex<Vec<RecordedDispatch>>,
    }

    impl MockPushClient {
        /// A client that delivers to every token.
        pub fn delivering() -> Self {
            Self {
                failing_tokens: HashSet::new(),
                unavailable: false,
                dispatches: Mutex::new(Vec::new()),
            }
        }

        /// A client that fails delivery to the given tokens and delivers to
        /// the rest.
        pub fn failing_tokens(tokens: &[&str]) -> Self {
            Self {
                failing_tokens: tokens.iter().map(|t| (*t).to_string()).collect(),
                unavailable: false,
                dispatches: Mutex::new(Vec::new()),
            }
        }

        /// A client whose every dispatch fails as a transport-level error.
        pub fn unavailable() -> Self {
            Self {
                failing_tokens: HashSet::new(),
                unavailable: true,
                dispatches: Mutex::new(Vec::new()),
            }
        }

        /// Dispatches recorded so far (test inspection).
        pub fn dispatches(&self) -> Vec<RecordedDispatch> {
            self.dispatches
                .lock()
                .map(|d| d.clone())
                .unwrap_or_default()
        }
    }

    #[async_trait]
    impl PushClient for MockPushClient {
        async fn send_to_tokens(
            &self,
            tokens: &[String],
            data: &NotificationData,
        ) -> Result<DispatchReport, CcError> {
            if self.unavailable {
                return Err(CcError::PushTransport(
                    "mock push transport unavailable".to_string(),
                ));
            }

            if let Ok(mut dispatches) = self.dispatches.lock() {
                dispatches.push(RecordedDispatch {
                    tokens: tokens.to_vec(),
                    data: data.clone(),
                });
            }

            let outcomes = tokens
                .iter()
                .map(|token| {
                    if self.failing_tokens.contains(token) {
                        SendOutcome {
                            token: token.clone(),
                            success: false,
                            error: Some("mock delivery failure".to_string()),
                        }
                    } else {
                        SendOutcome {
                            token: token.clone(),
                            success: true,
                            error: None,
                        }
                    }
                })
                .collect();

            Ok(DispatchReport::from_outcomes(outcomes))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::mock::MockPushClient;
    use super::*;

    fn tokens(list: &[&str]) -> Vec<String> {
        list.iter().map(|t| (*t).to_string()).collect()
    }

    #[test]
    fn test_ring_ended_payload_shape() {
        let data = NotificationData::ring_ended("c1", "d1");
        let map = data.to_data_map();

        assert_eq!(map["type"], "ring_ended");
        assert_eq!(map["callId"], "c1");
        assert_eq!(map["acceptedByDeviceId"], "d1");
        assert_eq!(map.len(), 3);
    }

    #[test]
    fn test_ringing_payload_forwards_fields_verbatim() {
        let data = NotificationData::ringing("caller", "c1", "incoming_call", "chan", "tok");
        let map = data.to_data_map();

        assert_eq!(map["type"], "incoming_call");
        assert_eq!(map["callerId"], "caller");
        assert_eq!(map["callId"], "c1");
        assert_eq!(map["channel"], "chan");
        assert_eq!(map["token"], "tok");
    }

    #[test]
    fn test_message_body_delivery_hints() {
        let data = NotificationData::ring_ended("c1", "d1");
        let body = FcmClient::message_body("t1", &data);

        assert_eq!(body["message"]["token"], "t1");
        assert_eq!(body["message"]["android"]["priority"], "high");
        assert_eq!(body["message"]["apns"]["headers"]["apns-priority"], "10");
        assert_eq!(
            body["message"]["apns"]["payload"]["aps"]["content-available"],
            1
        );
        assert_eq!(body["message"]["webpush"]["headers"]["Urgency"], "high");
    }

    #[test]
    fn test_send_outcome_serialization_omits_error_on_success() {
        let outcome = SendOutcome {
            token: "t1".to_string(),
            success: true,
            error: None,
        };

        let json = serde_json::to_string(&outcome).unwrap();
        assert!(json.contains("\"token\":\"t1\""));
        assert!(json.contains("\"success\":true"));
        assert!(!json.contains("\"error\""));
    }

    #[tokio::test]
    async fn test_mock_delivers_to_all_tokens() {
        let client = MockPushClient::delivering();
        let data = NotificationData::ring_ended("c1", "d1");

        let report = client
            .send_to_tokens(&tokens(&["t1", "t2"]), &data)
            .await
            .unwrap();

        assert_eq!(report.success_count, 2);
        assert_eq!(report.failure_count, 0);
        assert_eq!(client.dispatches().len(), 1);
        assert_eq!(client.dispatches()[0].tokens, tokens(&["t1", "t2"]));
    }

    #[tokio::test]
    async fn test_mock_partial_failure_is_data_not_error() {
        let client = MockPushClient::failing_tokens(&["t2"]);
        let data = NotificationData::ring_ended("c1", "d1");

        let report = client
            .send_to_tokens(&tokens(&["t1", "t2"]), &data)
            .await
            .unwrap();

        assert_eq!(report.success_count, 1);
        assert_eq!(report.failure_count, 1);
        assert!(report.outcomes[0].success);
        assert!(!report.outcomes[1].success);
        assert!(report.outcomes[1].error.is_some());
    }

    #[tokio::test]
    async fn test_mock_unavailable_is_transport_error() {
        let client = MockPushClient::unavailable();
        let data = NotificationData::ring_ended("c1", "d1");

        let err = client
            .send_to_tokens(&tokens(&["t1"]), &data)
            .await
            .expect_err("unavailable transport should error");
        assert!(matches!(err, CcError::PushTransport(_)));
    }
}
