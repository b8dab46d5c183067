//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by route, status
//! - `gateway_request_duration_seconds` (histogram): latency by route
//! - `gateway_errors_total` (counter): failed requests by error kind
//! - `gateway_verification_total` (counter): gate decisions by outcome
//! - `gateway_upgrades_total` (counter): update calls made
//! - `gateway_redirects_refused_total` (counter): canister redirects blocked
//! - `gateway_stream_chunks_total` (counter): continuation chunks fetched
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op
//! - Labels are static strings only

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Metric names used throughout the gateway.
pub mod names {
    pub const REQUESTS_TOTAL: &str = "gateway_requests_total";
    pub const REQUEST_DURATION_SECONDS: &str = "gateway_request_duration_seconds";
    pub const ERRORS_TOTAL: &str = "gateway_errors_total";
    pub const VERIFICATION_TOTAL: &str = "gateway_verification_total";
    pub const UPGRADES_TOTAL: &str = "gateway_upgrades_total";
    pub const REDIRECTS_REFUSED_TOTAL: &str = "gateway_redirects_refused_total";
    pub const STREAM_CHUNKS_TOTAL: &str = "gateway_stream_chunks_total";
}

/// Install the Prometheus recorder and its scrape listener on `addr`.
///
/// Must be called from inside the Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Record a finished request.
pub fn record_request(route: &'static str, status: u16, start: Instant) {
    counter!(names::REQUESTS_TOTAL, "route" => route, "status" => status.to_string())
        .increment(1);
    histogram!(names::REQUEST_DURATION_SECONDS, "route" => route)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_error(kind: &'static str) {
    counter!(names::ERRORS_TOTAL, "kind" => kind).increment(1);
}

pub fn record_verification(outcome: &'static str) {
    counter!(names::VERIFICATION_TOTAL, "outcome" => outcome).increment(1);
}

pub fn record_upgrade() {
    counter!(names::UPGRADES_TOTAL).increment(1);
}

pub fn record_redirect_refused() {
    counter!(names::REDIRECTS_REFUSED_TOTAL).increment(1);
}

pub fn record_stream_chunks(chunks: u64) {
    counter!(names::STREAM_CHUNKS_TOTAL).increment(chunks);
}
