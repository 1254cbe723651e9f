//! Integration tests for telemetry initialization and span helpers.

use tasq_rs::telemetry::metrics;
use tasq_rs::telemetry::request::{record_status, start_request_span};

#[test]
fn telemetry_initializes_without_endpoint() {
    // A global subscriber can only be set once per process; a second
    // init returning Err is acceptable here.
    let config = tasq_rs::telemetry::TelemetryConfig {
        endpoint: None,
        service_name: "tasq-test".to_string(),
        default_filter: "debug".to_string(),
    };
    if let Ok(guard) = tasq_rs::telemetry::init_telemetry(config) {
        assert!(!guard.is_exporting());
        guard.force_flush();
    }
}

#[test]
fn request_span_creates_and_records_status() {
    let span = start_request_span("PUT", "builds");
    record_status(&span, 200);
}

#[test]
fn metrics_record_without_provider() {
    metrics::record_queue_operation("enqueue", "ok");
    metrics::request_duration_ms().record(1.5, &[]);
}

#[test]
fn queue_operation_labels_are_bounded() {
    let labels = metrics::queue_operation_labels("dequeue", "empty");
    let keys: Vec<&str> = labels.iter().map(|kv| kv.key.as_str()).collect();
    assert_eq!(keys, vec!["operation", "outcome"]);
}
