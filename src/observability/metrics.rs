//! Metrics recorded by the shell.
//!
//! # Metrics
//! - `shell_requests_total` (counter): completed requests by method, status
//! - `shell_requests_rejected_total` (counter): requests refused during drain
//! - `shell_request_duration_seconds` (histogram): latency distribution
//! - `shell_requests_active` (gauge): requests currently in flight

use std::time::Instant;

use axum::http::{Method, StatusCode};

pub(crate) fn record_request(method: &Method, status: StatusCode, started: Instant) {
    metrics::counter!(
        "shell_requests_total",
        "method" => method.to_string(),
        "status" => status.as_u16().to_string()
    )
    .increment(1);
    metrics::histogram!("shell_request_duration_seconds").record(started.elapsed().as_secs_f64());
}

pub(crate) fn record_rejected() {
    metrics::counter!("shell_requests_rejected_total").increment(1);
}

pub(crate) fn set_active_requests(count: usize) {
    metrics::gauge!("shell_requests_active").set(count as f64);
}
