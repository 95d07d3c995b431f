//! Metrics definitions for Call Controller.
//!
//! All metrics follow Prometheus naming conventions:
//! - `cc_` prefix for Call Controller
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded to prevent cardinality explosion:
//! - `method`: 7 values max
//! - `endpoint`: fixed route set (unknown paths collapse to "other")
//! - `outcome` / `reason`: bounded by code
//! - `operation`: bounded by repository method names

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize Prometheus metrics recorder and return the handle for serving
/// metrics via HTTP.
///
/// Must be called before any metrics are recorded.
///
/// # Errors
///
/// Returns error if the Prometheus recorder fails to install (e.g., already
/// installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Prefix("cc_http_request".to_string()),
            &[
                0.005, 0.010, 0.025, 0.050, 0.100, 0.150, 0.200, 0.300, 0.500, 1.000, 2.000,
            ],
        )
        .map_err(|e| format!("Failed to set HTTP request buckets: {e}"))?
        .set_buckets_for_metric(
            Matcher::Prefix("cc_db_query".to_string()),
            &[
                0.001, 0.002, 0.005, 0.010, 0.020, 0.050, 0.100, 0.250, 0.500, 1.000,
            ],
        )
        .map_err(|e| format!("Failed to set DB query buckets: {e}"))?
        .set_buckets_for_metric(
            Matcher::Prefix("cc_push_dispatch".to_string()),
            &[
                0.010, 0.025, 0.050, 0.100, 0.200, 0.500, 1.000, 2.000, 5.000,
            ],
        )
        .map_err(|e| format!("Failed to set push dispatch buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

// ============================================================================
// HTTP Request Metrics
// ============================================================================

/// Record HTTP request completion.
///
/// Metric: `cc_http_requests_total`, `cc_http_request_duration_seconds`
/// Labels: `method`, `endpoint`, `status` / `status_code`
///
/// Captures ALL HTTP responses including framework-level errors like 415,
/// 400 (JSON parse), 404 and 405.
pub fn record_http_request(method: &str, endpoint: &str, status_code: u16, duration: Duration) {
    let normalized_endpoint = normalize_endpoint(endpoint);
    let status = categorize_status_code(status_code);

    histogram!("cc_http_request_duration_seconds",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint.clone(),
        "status" => status.to_string()
    )
    .record(duration.as_secs_f64());

    counter!("cc_http_requests_total",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

/// Categorize HTTP status code into success/error/timeout.
fn categorize_status_code(status_code: u16) -> &'static str {
    match status_code {
        200..=299 => "success",
        408 | 504 => "timeout",
        _ => "error",
    }
}

/// Normalize endpoint path to prevent label cardinality explosion.
///
/// The route set is fixed; anything else collapses to "other".
fn normalize_endpoint(path: &str) -> String {
    match path {
        "/" | "/health" | "/ready" | "/metrics" | "/acceptCall" | "/sendRingingNotification" => {
            path.to_string()
        }
        _ => "other".to_string(),
    }
}

// ============================================================================
// Call Acceptance Metrics
// ============================================================================

/// Record a call acceptance attempt.
///
/// Metric: `cc_call_accept_total`, `cc_call_accept_duration_seconds`
/// Labels: `outcome` (committed|conflict|error), `reason` (bounded)
pub fn record_call_accept(outcome: &str, reason: Option<&str>, duration: Duration) {
    let reason = reason.unwrap_or("none");

    counter!("cc_call_accept_total",
        "outcome" => outcome.to_string(),
        "reason" => reason.to_string()
    )
    .increment(1);

    histogram!("cc_call_accept_duration_seconds",
        "outcome" => outcome.to_string()
    )
    .record(duration.as_secs_f64());
}

// ============================================================================
// Push Dispatch Metrics
// ============================================================================

/// Record a push dispatch batch.
///
/// Metric: `cc_push_dispatch_total`, `cc_push_dispatch_duration_seconds`,
/// `cc_push_tokens_total`
/// Labels: `outcome` (success|error), `result` (delivered|failed)
pub fn record_push_dispatch(
    outcome: &str,
    delivered: usize,
    failed: usize,
    duration: Duration,
) {
    counter!("cc_push_dispatch_total", "outcome" => outcome.to_string()).increment(1);

    histogram!("cc_push_dispatch_duration_seconds",
        "outcome" => outcome.to_string()
    )
    .record(duration.as_secs_f64());

    counter!("cc_push_tokens_total", "result" => "delivered").increment(delivered as u64);
    counter!("cc_push_tokens_total", "result" => "failed").increment(failed as u64);
}

// ============================================================================
// Database Query Metrics
// ============================================================================

/// Record a call record store query.
///
/// Metric: `cc_db_queries_total`, `cc_db_query_duration_seconds`
/// Labels: `operation`, `status` (success|error)
pub fn record_db_query(operation: &str, status: &str, duration: Duration) {
    counter!("cc_db_queries_total",
        "operation" => operation.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!("cc_db_query_duration_seconds",
        "operation" => operation.to_string()
    )
    .record(duration.as_secs_f64());
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_categorize_status_code() {
        assert_eq!(categorize_status_code(200), "success");
        assert_eq!(categorize_status_code(201), "success");
        assert_eq!(categorize_status_code(400), "error");
        assert_eq!(categorize_status_code(409), "error");
        assert_eq!(categorize_status_code(500), "error");
        assert_eq!(categorize_status_code(408), "timeout");
        assert_eq!(categorize_status_code(504), "timeout");
    }

    #[test]
    fn test_normalize_endpoint_known_paths() {
        assert_eq!(normalize_endpoint("/"), "/");
        assert_eq!(normalize_endpoint("/health"), "/health");
        assert_eq!(normalize_endpoint("/ready"), "/ready");
        assert_eq!(normalize_endpoint("/metrics"), "/metrics");
        assert_eq!(normalize_endpoint("/acceptCall"), "/acceptCall");
        assert_eq!(
            normalize_endpoint("/sendRingingNotification"),
            "/sendRingingNotification"
        );
    }

    #[test]
    fn test_normalize_endpoint_unknown_paths_collapse() {
        assert_eq!(normalize_endpoint("/unknown"), "other");
        assert_eq!(normalize_endpoint("/acceptCall/extra"), "other");
        assert_eq!(normalize_endpoint(""), "other");
    }

    #[test]
    fn test_record_functions_do_not_panic_without_recorder() {
        // The metrics crate no-ops when no global recorder is installed.
        record_http_request("POST", "/acceptCall", 200, Duration::from_millis(5));
        record_call_accept("committed", None, Duration::from_millis(5));
        record_call_accept("conflict", Some("already_accepted"), Duration::from_millis(5));
        record_push_dispatch("success", 3, 1, Duration::from_millis(5));
        record_db_query("accept_ringing_call", "success", Duration::from_millis(5));
    }
}
