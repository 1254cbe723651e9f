//! Request span helpers.
//!
//! One span per gateway request. The `http.status` field is declared empty
//! and filled once the response is known.

use tracing::Span;

/// Start a span for a gateway request against `queue`.
pub fn start_request_span(method: &str, queue: &str) -> Span {
    tracing::info_span!(
        "tasq.request",
        "http.method" = method,
        "tasq.queue" = queue,
        "http.status" = tracing::field::Empty,
    )
}

/// Record the response status on the request span.
pub fn record_status(span: &Span, status: u16) {
    span.record("http.status", status);
}
