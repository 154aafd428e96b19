//! Integration tests for telemetry initialization and span helpers.

#[test]
fn telemetry_initializes_without_endpoint() {
    // Note: tracing subscriber can only be set once per process.
    // Using try_init() in the implementation avoids panics if another
    // test already initialized a subscriber.
    let config = prospector::telemetry::TelemetryConfig::local("debug");
    // This may return Err if a global subscriber was already set by
    // another test in this process; that is acceptable.
    let _guard = prospector::telemetry::init_telemetry(config);
}

#[test]
fn run_span_records_outcome() {
    let span = prospector::telemetry::workflow::start_run_span("session-1", "icp-1");
    prospector::telemetry::workflow::record_run_outcome(&span, "complete");
}

#[test]
fn stage_span_and_transition_event() {
    let span = prospector::telemetry::workflow::start_stage_span("2.1", 12);
    span.in_scope(|| {
        prospector::telemetry::workflow::record_substep_transition("2.1", "pending", "in-progress");
    });
}

#[test]
fn metric_instruments_build() {
    use opentelemetry::KeyValue;
    use prospector::telemetry::metrics;

    metrics::substep_transitions().add(1, &[KeyValue::new("to", "completed")]);
    metrics::entity_failures().add(1, &[KeyValue::new("stage", "3.1")]);
    metrics::stage_duration_ms().record(4.0, &[KeyValue::new("stage", "3.1")]);
    metrics::runs_finished().add(1, &[KeyValue::new("outcome", "complete")]);
    metrics::progress_dropped().add(1, &[KeyValue::new("reason", "publish")]);
}
