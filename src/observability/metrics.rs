//! Metrics collection and exposition.
//!
//! # Metrics
//! - `dbpool_endpoint_workable` (gauge): 1=workable, 0=not, per endpoint
//! - `dbpool_connect_attempts_total` (counter): open attempts by endpoint, outcome
//! - `dbpool_selections_total` (counter): requests routed per endpoint
//! - `dbpool_errors_total` (counter): classified errors by kind
//! - `dbpool_operation_duration_seconds` (histogram): facade call latency

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::errors::ErrorKind;

/// Install the Prometheus exporter. Must run inside a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_endpoint_health(endpoint: &str, workable: bool) {
    metrics::gauge!("dbpool_endpoint_workable", "endpoint" => endpoint.to_string())
        .set(if workable { 1.0 } else { 0.0 });
}

pub fn record_connect_attempt(endpoint: &str, success: bool) {
    let outcome = if success { "success" } else { "failure" };
    metrics::counter!(
        "dbpool_connect_attempts_total",
        "endpoint" => endpoint.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_selection(endpoint: &str) {
    metrics::counter!("dbpool_selections_total", "endpoint" => endpoint.to_string()).increment(1);
}

pub fn record_error(kind: ErrorKind) {
    metrics::counter!("dbpool_errors_total", "kind" => kind.as_str()).increment(1);
}

pub fn record_operation(endpoint: &str, elapsed: Duration) {
    metrics::histogram!("dbpool_operation_duration_seconds", "endpoint" => endpoint.to_string())
        .record(elapsed.as_secs_f64());
}
