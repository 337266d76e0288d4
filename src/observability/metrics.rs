//! Metrics collection and exposition.
//!
//! # Metrics
//! - `relay_requests_total` (counter): requests by endpoint, status
//! - `relay_request_duration_seconds` (histogram): latency by endpoint
//! - `relay_rate_limited_total` (counter): upload requests denied
//! - `relay_upload_failures_total` (counter): by pipeline stage and error kind
//! - `relay_assets_deleted_total` (counter): files confirmed deleted
//! - `relay_rate_limit_identities` (gauge): identities tracked after a sweep

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(endpoint: &'static str, status: u16, start: Instant) {
    counter!("relay_requests_total", "endpoint" => endpoint, "status" => status.to_string()).increment(1);
    histogram!("relay_request_duration_seconds", "endpoint" => endpoint)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_rate_limited() {
    counter!("relay_rate_limited_total").increment(1);
}

pub fn record_upload_failure(stage: &'static str, kind: &'static str) {
    counter!("relay_upload_failures_total", "stage" => stage, "kind" => kind).increment(1);
}

pub fn record_assets_deleted(count: usize) {
    counter!("relay_assets_deleted_total").increment(count as u64);
}

pub fn record_tracked_identities(count: usize) {
    gauge!("relay_rate_limit_identities").set(count as f64);
}
