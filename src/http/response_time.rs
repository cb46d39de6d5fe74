//! Per-request latency reporting.

use std::time::{Duration, Instant};

use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};

use crate::observability::metrics;

pub const X_RESPONSE_TIME: HeaderName = HeaderName::from_static("x-response-time");

/// Milliseconds with microsecond precision, e.g. `1.234ms`.
pub fn format_duration(elapsed: Duration) -> String {
    format!("{:.3}ms", elapsed.as_secs_f64() * 1000.0)
}

/// Times everything downstream of this stage, including later rejections.
pub async fn response_time_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let mut response = next.run(req).await;

    let elapsed = start.elapsed();
    let formatted = format_duration(elapsed);
    if let Ok(value) = HeaderValue::from_str(&formatted) {
        response.headers_mut().insert(X_RESPONSE_TIME, value);
    }

    let status = response.status();
    tracing::info!(
        method = %method,
        path = %path,
        status = status.as_u16(),
        duration = %formatted,
        "Request completed"
    );
    metrics::record_request(method.as_str(), status.as_u16(), start);

    response
}
