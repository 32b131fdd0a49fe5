//! Metrics collection and exposition.
//!
//! # Metrics
//! - `http_requests_total` (counter): completed requests by method, status
//! - `http_requests_rejected_total` (counter): security rejections by code
//! - `http_request_duration_seconds` (histogram): handler latency
//! - `rate_limit_entries` (gauge): keys tracked by the rate limiter
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed, so tests and
//!   deployments without `METRICS_ADDRESS` pay nothing
//! - Prometheus text exposition on a separate listener

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::http::response::ErrorCode;

/// Install the Prometheus recorder and its scrape listener on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_request(method: &str, status: u16, elapsed: Duration) {
    ::metrics::counter!(
        "http_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    ::metrics::histogram!("http_request_duration_seconds").record(elapsed.as_secs_f64());
}

pub fn record_rejection(code: ErrorCode) {
    ::metrics::counter!("http_requests_rejected_total", "code" => code.as_str()).increment(1);
}

pub fn record_rate_limit_entries(entries: usize) {
    ::metrics::gauge!("rate_limit_entries").set(entries as f64);
}
