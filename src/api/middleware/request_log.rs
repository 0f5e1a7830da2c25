//! Request lifecycle logging.

use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;

/// Log the received and sent ends of every request.
///
/// The stages in between (`parsed`, `resolved`, `executed`,
/// `serialized`) are logged by the handlers at debug level.
pub async fn request_log_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();
    tracing::debug!(stage = "received", %method, %path, "Request received");

    let response = next.run(request).await;

    let status = response.status();
    let latency_ms = started.elapsed().as_millis() as u64;
    if status.is_server_error() {
        tracing::warn!(stage = "sent", %method, %path, status = status.as_u16(), latency_ms, "Request failed");
    } else {
        tracing::info!(stage = "sent", %method, %path, status = status.as_u16(), latency_ms, "Request completed");
    }

    response
}
