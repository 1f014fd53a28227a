//! Metrics collection and exposition.
//!
//! # Metrics
//! - `webhost_requests_total` (counter): requests by method, status, handler
//! - `webhost_request_duration_seconds` (histogram): latency per handler
//! - `webhost_active_connections` (gauge): open client connections
//! - `webhost_etag_computations_total` (counter): ETags hashed and cached
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed
//! - The Prometheus exporter is optional and owns its own listener

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;

    describe_counter!("webhost_requests_total", "Requests answered, by method, status and handler");
    describe_histogram!(
        "webhost_request_duration_seconds",
        metrics::Unit::Seconds,
        "Time spent producing a response"
    );
    describe_gauge!("webhost_active_connections", "Open client connections");
    describe_counter!("webhost_etag_computations_total", "Resource ETags computed and cached");

    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

/// Record one answered request.
pub fn record_request(method: &str, status: u16, handler: &'static str, start: Instant) {
    counter!(
        "webhost_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "handler" => handler,
    )
    .increment(1);
    histogram!("webhost_request_duration_seconds", "handler" => handler).record(start.elapsed().as_secs_f64());
}

pub fn set_active_connections(count: u64) {
    gauge!("webhost_active_connections").set(count as f64);
}

pub fn record_etag_computed() {
    counter!("webhost_etag_computations_total").increment(1);
}
