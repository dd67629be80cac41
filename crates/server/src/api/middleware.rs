//! Metrics middleware for API routes.

use axum::{body::Body, extract::State, http::Request, middleware::Next, response::Response};
use std::sync::Arc;
use std::time::Instant;

use crate::metrics::normalize_path;
use crate::state::AppState;

/// Metrics middleware that tracks HTTP request duration and counts.
///
/// This middleware records:
/// - Request duration (histogram)
/// - Request count (counter)
/// - Requests in flight (gauge)
pub async fn metrics_middleware(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let http = state.metrics().http();
    let start = Instant::now();
    let method = request.method().to_string();
    let path = normalize_path(request.uri().path());

    http.requests_in_flight.inc();

    let response = next.run(request).await;

    http.requests_in_flight.dec();

    let duration = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    http.request_duration
        .with_label_values(&[&method, &path, &status])
        .observe(duration);
    http.requests_total
        .with_label_values(&[&method, &path, &status])
        .inc();

    response
}
