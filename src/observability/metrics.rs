//! Metrics collection and exposition.
//!
//! # Metrics
//! - `mock_api_requests_total` (counter): completed requests by method, status
//! - `mock_api_request_duration_seconds` (histogram): latency by method
//! - `mock_api_rate_limited_total` (counter): requests rejected with 429
//!
//! Recording is a no-op until [`init_metrics`] installs the Prometheus recorder.

use std::net::SocketAddr;
use std::time::Instant;

use axum::{body::Body, http::Request, middleware::Next, response::Response};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Records every completed request, independent of the access log.
pub async fn track_requests(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let response = next.run(request).await;
    record_request(method.as_str(), response.status().as_u16(), start);
    response
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    metrics::counter!(
        "mock_api_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("mock_api_request_duration_seconds", "method" => method.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_rate_limited() {
    metrics::counter!("mock_api_rate_limited_total").increment(1);
}
