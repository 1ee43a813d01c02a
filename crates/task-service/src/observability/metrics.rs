//! Metrics definitions for the task service.
//!
//! All metrics follow Prometheus naming conventions:
//! - `ts_` prefix for the task service
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded to prevent cardinality explosion:
//! - `method`: HTTP methods
//! - `endpoint`: normalized route templates (task IDs collapse to `{id}`)
//! - `status`: `success`, `error`, `timeout`
//! - `error_type`: bounded by `AuthError` variants
//! - `operation`: bounded by repository functions

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize Prometheus metrics recorder and return the handle
/// for serving metrics via HTTP.
///
/// Must be called before any metrics are recorded.
///
/// # Errors
///
/// Returns error if Prometheus recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Prefix("ts_http_request".to_string()),
            &[
                0.005, 0.010, 0.025, 0.050, 0.100, 0.150, 0.200, 0.300, 0.500, 1.000, 2.000,
            ],
        )
        .map_err(|e| format!("Failed to set HTTP request buckets: {e}"))?
        // RSA signing and verification are sub-10ms on a 2048-bit key
        .set_buckets_for_metric(
            Matcher::Prefix("ts_token".to_string()),
            &[0.0005, 0.001, 0.002, 0.005, 0.010, 0.025, 0.050, 0.100],
        )
        .map_err(|e| format!("Failed to set token buckets: {e}"))?
        .set_buckets_for_metric(
            Matcher::Prefix("ts_assertion".to_string()),
            &[0.0005, 0.001, 0.002, 0.005, 0.010, 0.025, 0.050, 0.100],
        )
        .map_err(|e| format!("Failed to set assertion buckets: {e}"))?
        .set_buckets_for_metric(
            Matcher::Prefix("ts_db_query".to_string()),
            &[
                0.001, 0.002, 0.005, 0.010, 0.020, 0.050, 0.100, 0.250, 0.500, 1.000,
            ],
        )
        .map_err(|e| format!("Failed to set DB query buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

// ============================================================================
// HTTP Request Metrics
// ============================================================================

/// Record HTTP request completion
///
/// Metric: `ts_http_requests_total`, `ts_http_request_duration_seconds`
/// Labels: `method`, `endpoint`, `status`
///
/// Captures all responses, including framework-level rejections (404, 405,
/// 415) and auth-gate short-circuits.
pub fn record_http_request(method: &str, endpoint: &str, status_code: u16, duration: Duration) {
    let normalized_endpoint = normalize_endpoint(endpoint);
    let status = categorize_status_code(status_code);

    histogram!("ts_http_request_duration_seconds",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint.clone(),
        "status" => status.to_string()
    )
    .record(duration.as_secs_f64());

    counter!("ts_http_requests_total",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

/// Categorize HTTP status code into success/error/timeout
fn categorize_status_code(status_code: u16) -> &'static str {
    match status_code {
        200..=299 => "success",
        408 | 504 => "timeout",
        _ => "error",
    }
}

/// Normalize endpoint path to prevent label cardinality explosion
fn normalize_endpoint(path: &str) -> String {
    match path {
        "/" | "/health" | "/metrics" | "/me" | "/token" | "/tasks" => path.to_string(),
        _ => normalize_dynamic_endpoint(path),
    }
}

/// Normalize paths with dynamic segments
fn normalize_dynamic_endpoint(path: &str) -> String {
    // /tasks/{id}
    if let Some(id) = path.strip_prefix("/tasks/") {
        if !id.is_empty() && !id.contains('/') {
            return "/tasks/{id}".to_string();
        }
    }

    "/other".to_string()
}

// ============================================================================
// Auth Metrics
// ============================================================================

/// Record access token issuance
///
/// Metric: `ts_token_issuance_total`, `ts_token_issuance_duration_seconds`
/// Labels: `status`, `error_type`
pub fn record_token_issuance(status: &str, error_type: Option<&str>, duration: Duration) {
    histogram!("ts_token_issuance_duration_seconds").record(duration.as_secs_f64());

    counter!("ts_token_issuance_total",
        "status" => status.to_string(),
        "error_type" => error_type.unwrap_or("none").to_string()
    )
    .increment(1);
}

/// Record client assertion validation
///
/// Metric: `ts_assertion_validations_total`, `ts_assertion_validation_duration_seconds`
/// Labels: `status`, `error_type`
pub fn record_assertion_validation(status: &str, error_type: Option<&str>, duration: Duration) {
    histogram!("ts_assertion_validation_duration_seconds").record(duration.as_secs_f64());

    counter!("ts_assertion_validations_total",
        "status" => status.to_string(),
        "error_type" => error_type.unwrap_or("none").to_string()
    )
    .increment(1);
}

/// Record access token validation on a protected route
///
/// Metric: `ts_token_validations_total`, `ts_token_validation_duration_seconds`
/// Labels: `status`, `error_type`
pub fn record_token_validation(status: &str, error_type: Option<&str>, duration: Duration) {
    histogram!("ts_token_validation_duration_seconds").record(duration.as_secs_f64());

    counter!("ts_token_validations_total",
        "status" => status.to_string(),
        "error_type" => error_type.unwrap_or("none").to_string()
    )
    .increment(1);
}

// ============================================================================
// Database Metrics
// ============================================================================

/// Record database query execution
///
/// Metric: `ts_db_query_duration_seconds`, `ts_db_queries_total`
/// Labels: `operation`, `status`
pub fn record_db_query(operation: &str, status: &str, duration: Duration) {
    histogram!("ts_db_query_duration_seconds",
        "operation" => operation.to_string()
    )
    .record(duration.as_secs_f64());

    counter!("ts_db_queries_total",
        "operation" => operation.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}
