//! Metric instrument factories for tasq-rs.
//!
//! Uses the OTel Meter API with the globally-registered `MeterProvider`.
//! Without an OTLP endpoint the global provider is a no-op.

use opentelemetry::KeyValue;
use opentelemetry::metrics::{Counter, Histogram, Meter};

fn meter() -> Meter {
    opentelemetry::global::meter("tasq-rs")
}

/// Counter: queue operations served.
/// Labels: `operation` ("enqueue" | "list" | "dequeue"), `outcome`
/// ("ok" | "empty" | "error"). Queue names are client-chosen and unbounded,
/// so they go on the request span, not on metrics.
pub fn queue_operations() -> Counter<u64> {
    meter()
        .u64_counter("tasq.queue.operations")
        .with_description("Number of queue operations")
        .build()
}

/// Histogram: request handling time in milliseconds.
/// Labels: `method`, `status`.
pub fn request_duration_ms() -> Histogram<f64> {
    meter()
        .f64_histogram("tasq.request.duration_ms")
        .with_description("Request duration in milliseconds")
        .with_unit("ms")
        .build()
}

/// Count one queue operation.
pub fn record_queue_operation(operation: &'static str, outcome: &'static str) {
    queue_operations().add(1, &queue_operation_labels(operation, outcome));
}

/// Label set for [`queue_operations`].
pub fn queue_operation_labels(operation: &'static str, outcome: &'static str) -> [KeyValue; 2] {
    [
        KeyValue::new("operation", operation),
        KeyValue::new("outcome", outcome),
    ]
}
