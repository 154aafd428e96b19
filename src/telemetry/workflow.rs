//! Span helpers for workflow runs and their stages.

use tracing::Span;

/// Start the span wrapping one `execute()` call.
///
/// `run.outcome` is filled in when the run ends via [`record_run_outcome`].
pub fn start_run_span(session_id: &str, icp_model_id: &str) -> Span {
    tracing::info_span!(
        "workflow.run",
        "run.session_id" = session_id,
        "run.icp_model_id" = icp_model_id,
        "run.outcome" = tracing::field::Empty,
    )
}

/// Start a span for one fan-out stage.
pub fn start_stage_span(stage: &str, entities: usize) -> Span {
    tracing::info_span!(
        "workflow.stage",
        "stage.name" = stage,
        "stage.entities" = entities,
        "stage.failed" = tracing::field::Empty,
    )
}

pub fn record_run_outcome(span: &Span, outcome: &str) {
    span.record("run.outcome", outcome);
}

/// Emit a substep transition event in the current span.
pub fn record_substep_transition(substep: &str, from: &str, to: &str) {
    tracing::info!(substep, from, to, "substep_transition");
}
