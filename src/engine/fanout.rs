//! Per-company fan-out with failure isolation.
//!
//! A stage applies one call to every company. A failing or panicking call
//! only costs that company the stage's contribution: it stays in the list and
//! the other calls run to completion. The join waits for every call to
//! settle and never aborts early.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Instant;

use futures::future::join_all;
use futures::stream::{self, StreamExt};
use futures::FutureExt;
use opentelemetry::KeyValue;
use tracing::{Instrument, info, warn};

use crate::error::{Error, Result};
use crate::model::Company;
use crate::telemetry::{metrics, workflow::start_stage_span};

/// How many per-company calls a stage may have in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Concurrency {
    /// All at once. For local or cheap stages.
    Eager,
    /// At most this many. For rate-limited providers.
    Bounded(usize),
}

/// Tally of one stage run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageReport {
    pub stage: String,
    pub attempted: usize,
    pub succeeded: usize,
    /// Companies the call declined, e.g. because a gate wasn't met.
    pub skipped: usize,
    pub failed: usize,
}

impl StageReport {
    /// Human-readable completion message, e.g. "Enriched 8/10 companies (2 failed)".
    pub fn describe(&self, verb: &str) -> String {
        let mut msg = format!("{verb} {}/{} companies", self.succeeded, self.attempted);
        match (self.skipped, self.failed) {
            (0, 0) => {}
            (s, 0) => msg.push_str(&format!(" ({s} skipped)")),
            (0, f) => msg.push_str(&format!(" ({f} failed)")),
            (s, f) => msg.push_str(&format!(" ({s} skipped, {f} failed)")),
        }
        msg
    }
}

/// Run `call` for every company and `apply` each success back onto it.
///
/// `call` gets its own copy of the company and returns `Ok(None)` to decline
/// it. Per-company errors are logged with the company's name and counted;
/// only a malformed stage is returned as an error.
pub async fn run_stage<T, F, Fut, A>(
    stage: &str,
    companies: &mut [Company],
    concurrency: Concurrency,
    call: F,
    mut apply: A,
) -> Result<StageReport>
where
    F: Fn(Company) -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
    A: FnMut(&mut Company, T),
{
    if concurrency == Concurrency::Bounded(0) {
        return Err(Error::Stage {
            stage: stage.to_string(),
            reason: "concurrency bound must be at least 1".to_string(),
        });
    }

    let span = start_stage_span(stage, companies.len());
    let started = Instant::now();

    let calls = companies.iter().enumerate().map(|(idx, company)| {
        let fut = call(company.clone());
        async move { (idx, AssertUnwindSafe(fut).catch_unwind().await) }
    });

    let outcomes: Vec<_> = async {
        match concurrency {
            Concurrency::Eager => join_all(calls).await,
            Concurrency::Bounded(limit) => {
                stream::iter(calls)
                    .buffer_unordered(limit)
                    .collect::<Vec<_>>()
                    .await
            }
        }
    }
    .instrument(span.clone())
    .await;

    let mut report = StageReport {
        stage: stage.to_string(),
        attempted: companies.len(),
        ..StageReport::default()
    };

    for (idx, outcome) in outcomes {
        let company = &mut companies[idx];
        let error = match outcome {
            Ok(Ok(Some(value))) => {
                apply(company, value);
                report.succeeded += 1;
                continue;
            }
            Ok(Ok(None)) => {
                report.skipped += 1;
                continue;
            }
            Ok(Err(e)) => e.to_string(),
            Err(panic) => panic_message(panic.as_ref()),
        };

        report.failed += 1;
        span.in_scope(|| {
            warn!(stage, company = %company.name, error = %error, "stage failed for company");
        });
        metrics::entity_failures().add(1, &[KeyValue::new("stage", stage.to_string())]);
    }

    let elapsed_ms = started.elapsed().as_millis() as u64;
    span.record("stage.failed", report.failed);
    metrics::stage_duration_ms().record(
        elapsed_ms as f64,
        &[KeyValue::new("stage", stage.to_string())],
    );
    info!(
        stage,
        succeeded = report.succeeded,
        skipped = report.skipped,
        failed = report.failed,
        duration_ms = elapsed_ms,
        "stage finished"
    );

    Ok(report)
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {s}")
    } else {
        "panicked".to_string()
    }
}
