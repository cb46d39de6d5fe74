//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gatekeeper_requests_total` (counter): completed requests by method, status
//! - `gatekeeper_request_duration_seconds` (histogram): latency distribution
//! - `gatekeeper_rejections_total` (counter): short-circuits by stage, reason
//! - `gatekeeper_rate_limit_tracked_clients` (gauge): live rate-limit windows
//!
//! # Design Decisions
//! - Recording is a no-op until `init_metrics` installs the recorder
//! - Labels are static strings where possible to bound cardinality

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => {
            describe();
            tracing::info!(address = %addr, "Metrics exporter listening");
        }
        Err(e) => {
            tracing::error!(error = %e, address = %addr, "Failed to install metrics exporter");
        }
    }
}

fn describe() {
    ::metrics::describe_counter!("gatekeeper_requests_total", "Completed HTTP requests");
    ::metrics::describe_histogram!(
        "gatekeeper_request_duration_seconds",
        "Time spent inside the pipeline per request"
    );
    ::metrics::describe_counter!(
        "gatekeeper_rejections_total",
        "Requests short-circuited by a pipeline stage"
    );
    ::metrics::describe_gauge!(
        "gatekeeper_rate_limit_tracked_clients",
        "Clients with a live rate-limit window"
    );
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    ::metrics::counter!(
        "gatekeeper_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    ::metrics::histogram!(
        "gatekeeper_request_duration_seconds",
        "method" => method.to_string()
    )
    .record(start.elapsed().as_secs_f64());
}

/// Count a request that a stage answered without calling the handler.
pub fn record_rejection(stage: &'static str, reason: &'static str) {
    ::metrics::counter!(
        "gatekeeper_rejections_total",
        "stage" => stage,
        "reason" => reason
    )
    .increment(1);
}

pub fn record_tracked_clients(count: usize) {
    ::metrics::gauge!("gatekeeper_rate_limit_tracked_clients").set(count as f64);
}
