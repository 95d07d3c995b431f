//! Integration tests for POST /sendRingingNotification.
//!
//! Tests the direct notification path through the real router:
//! - Verbatim forwarding of the five data fields
//! - Aggregate counts and per-token outcome details
//! - Partial delivery failure reported as data with overall 200
//! - Input validation (empty token array, missing scalars, malformed body)
//! - Transport-level failure mapping to 500

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]

use anyhow::Result;
use cc_service::repositories::MockCallStore;
use cc_service::services::MockPushClient;
use cc_test_utils::TestCcServer;
use std::sync::Arc;

fn ringing_body(tokens: &[&str]) -> serde_json::Value {
    serde_json::json!({
        "fcmTokens": tokens,
        "callerId": "caller-1",
        "callId": "c1",
        "type": "incoming_call",
        "channel": "media-channel",
        "token": "media-token",
    })
}

async fn spawn_with_push(push: Arc<MockPushClient>) -> Result<TestCcServer> {
    let store = Arc::new(MockCallStore::empty());
    Ok(TestCcServer::spawn(store, push).await?)
}

async fn post_ringing(
    server: &TestCcServer,
    body: &serde_json::Value,
) -> Result<reqwest::Response> {
    Ok(reqwest::Client::new()
        .post(format!("{}/sendRingingNotification", server.url()))
        .json(body)
        .send()
        .await?)
}

#[tokio::test]
async fn test_ringing_dispatches_to_all_tokens() -> Result<()> {
    let push = Arc::new(MockPushClient::delivering());
    let server = spawn_with_push(push.clone()).await?;

    let response = post_ringing(&server, &ringing_body(&["t1", "t2"])).await?;
    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["successCount"], 2);
    assert_eq!(body["failureCount"], 0);
    assert_eq!(body["details"].as_array().unwrap().len(), 2);

    let dispatches = push.dispatches();
    assert_eq!(dispatches.len(), 1);
    assert_eq!(
        dispatches[0].tokens,
        vec!["t1".to_string(), "t2".to_string()]
    );

    Ok(())
}

#[tokio::test]
async fn test_ringing_forwards_data_fields_verbatim() -> Result<()> {
    let push = Arc::new(MockPushClient::delivering());
    let server = spawn_with_push(push.clone()).await?;

    let response = post_ringing(&server, &ringing_body(&["t1"])).await?;
    assert_eq!(response.status(), 200);

    let dispatches = push.dispatches();
    let data = &dispatches[0].data;
    assert_eq!(data.kind, "incoming_call");
    assert!(data
        .fields
        .contains(&("callerId".to_string(), "caller-1".to_string())));
    assert!(data
        .fields
        .contains(&("callId".to_string(), "c1".to_string())));
    assert!(data
        .fields
        .contains(&("channel".to_string(), "media-channel".to_string())));
    assert!(data
        .fields
        .contains(&("token".to_string(), "media-token".to_string())));

    Ok(())
}

#[tokio::test]
async fn test_ringing_partial_failure_is_still_200() -> Result<()> {
    let push = Arc::new(MockPushClient::failing_tokens(&["tB"]));
    let server = spawn_with_push(push).await?;

    let response = post_ringing(&server, &ringing_body(&["tA", "tB"])).await?;
    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["successCount"], 1);
    assert_eq!(body["failureCount"], 1);

    let details = body["details"].as_array().unwrap();
    assert_eq!(details[0]["token"], "tA");
    assert_eq!(details[0]["success"], true);
    assert_eq!(details[1]["token"], "tB");
    assert_eq!(details[1]["success"], false);
    assert!(details[1]["error"].is_string());

    Ok(())
}

#[tokio::test]
async fn test_ringing_empty_token_array_is_bad_request() -> Result<()> {
    let push = Arc::new(MockPushClient::delivering());
    let server = spawn_with_push(push.clone()).await?;

    let response = post_ringing(&server, &ringing_body(&[])).await?;
    assert_eq!(response.status(), 400);

    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["error"], "fcmTokens must be a non-empty array");

    // Nothing was dispatched.
    assert!(push.dispatches().is_empty());

    Ok(())
}

#[tokio::test]
async fn test_ringing_missing_scalar_is_bad_request() -> Result<()> {
    let push = Arc::new(MockPushClient::delivering());
    let server = spawn_with_push(push).await?;

    let mut body = ringing_body(&["t1"]);
    body["callerId"] = serde_json::Value::String(String::new());

    let response = post_ringing(&server, &body).await?;
    assert_eq!(response.status(), 400);

    let error: serde_json::Value = response.json().await?;
    assert_eq!(error["error"], "callerId is required");

    Ok(())
}

#[tokio::test]
async fn test_ringing_malformed_body_is_bad_request() -> Result<()> {
    let push = Arc::new(MockPushClient::delivering());
    let server = spawn_with_push(push).await?;

    let response = reqwest::Client::new()
        .post(format!("{}/sendRingingNotification", server.url()))
        .header("content-type", "application/json")
        .body(r#"{"fcmTokens": "not-an-array"}"#)
        .send()
        .await?;
    assert_eq!(response.status(), 400);

    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["error"], "Invalid request body");

    Ok(())
}

#[tokio::test]
async fn test_ringing_transport_failure_is_internal_error() -> Result<()> {
    let push = Arc::new(MockPushClient::unavailable());
    let server = spawn_with_push(push).await?;

    let response = post_ringing(&server, &ringing_body(&["t1"])).await?;
    assert_eq!(response.status(), 500);

    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["error"], "Failed to send notification");
    assert_eq!(body["details"], "push transport unavailable");

    Ok(())
}
