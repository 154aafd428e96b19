//! Metric instruments for workflow runs.
//!
//! Instruments come from the global `"prospector"` meter; without a
//! configured `MeterProvider` they are no-ops.

use opentelemetry::metrics::{Counter, Histogram, Meter};

fn meter() -> Meter {
    opentelemetry::global::meter("prospector")
}

/// Counter: substep status changes.
/// Labels: `substep`, `to`.
pub fn substep_transitions() -> Counter<u64> {
    meter()
        .u64_counter("prospector.substep.transitions")
        .with_description("Number of substep status transitions")
        .build()
}

/// Counter: per-company failures contained inside a stage.
/// Labels: `stage`.
pub fn entity_failures() -> Counter<u64> {
    meter()
        .u64_counter("prospector.stage.entity_failures")
        .with_description("Per-company failures isolated by a fan-out stage")
        .build()
}

/// Histogram: wall time of one fan-out stage.
/// Labels: `stage`.
pub fn stage_duration_ms() -> Histogram<f64> {
    meter()
        .f64_histogram("prospector.stage.duration_ms")
        .with_description("Fan-out stage duration in milliseconds")
        .with_unit("ms")
        .build()
}

/// Counter: finished runs.
/// Labels: `outcome` ("complete" | "error").
pub fn runs_finished() -> Counter<u64> {
    meter()
        .u64_counter("prospector.runs.finished")
        .with_description("Number of workflow runs that reached a terminal state")
        .build()
}

/// Counter: progress updates that were not delivered.
/// Labels: `reason` ("persist" | "publish").
pub fn progress_dropped() -> Counter<u64> {
    meter()
        .u64_counter("prospector.progress.dropped")
        .with_description("Progress updates lost to a persistence or publish failure")
        .build()
}
