//! Phase/substep state machine.
//!
//! Owns every substep status change of a run and reports each one. Status
//! only moves forward: pending → in-progress → completed | error, with
//! pending → error reserved for aborts.

use chrono::Utc;
use opentelemetry::KeyValue;
use serde_json::json;

use super::plan::{self, SubstepDef};
use super::reporter::ProgressReporter;
use crate::error::{Error, Result};
use crate::model::{Company, RunSummary, SearchStage, SubstepStatus, WorkflowRun};
use crate::telemetry::{metrics, workflow::record_substep_transition};

pub struct StateMachine {
    reporter: ProgressReporter,
}

impl StateMachine {
    pub fn new(reporter: ProgressReporter) -> Self {
        Self { reporter }
    }

    pub fn reporter(&self) -> &ProgressReporter {
        &self.reporter
    }

    /// Seed the plan as pending and send the one full-list status. Every
    /// later update is a delta.
    pub async fn initialize(&self, run: &mut WorkflowRun, plan: &[SubstepDef]) {
        run.substeps = plan::seed(plan);
        let status = run.search_status(SearchStage::Searching, "Search started");
        self.reporter.report_snapshot(&run.substeps, &status).await;
    }

    pub async fn begin(&self, run: &mut WorkflowRun, id: &str) -> Result<()> {
        self.transition(run, id, SubstepStatus::InProgress, None)
            .await
    }

    pub async fn finish(
        &self,
        run: &mut WorkflowRun,
        id: &str,
        message: impl Into<String>,
    ) -> Result<()> {
        self.transition(run, id, SubstepStatus::Completed, Some(message.into()))
            .await
    }

    /// Mark one substep failed. The run carries on; halting is the
    /// caller's decision.
    pub async fn fail(
        &self,
        run: &mut WorkflowRun,
        id: &str,
        message: impl Into<String>,
    ) -> Result<()> {
        self.transition(run, id, SubstepStatus::Error, Some(message.into()))
            .await
    }

    /// Move every non-terminal substep to error with `message`, then send the
    /// terminal error status. After this nothing in the run is left looking
    /// in-progress.
    pub async fn abort_all(&self, run: &mut WorkflowRun, message: &str) {
        let now = Utc::now();
        let mut aborted = Vec::new();
        for substep in run.substeps.iter_mut().filter(|s| !s.status.is_terminal()) {
            record_substep_transition(&substep.id, &substep.status.to_string(), "error");
            metrics::substep_transitions().add(
                1,
                &[
                    KeyValue::new("substep", substep.id.clone()),
                    KeyValue::new("to", "error"),
                ],
            );
            substep.status = SubstepStatus::Error;
            substep.message = message.to_string();
            substep.completed_at = Some(now);
            aborted.push(substep.clone());
        }

        let status = run.search_status(SearchStage::Error, message);
        self.reporter.report_snapshot(&aborted, &status).await;
    }

    /// Send the terminal success status with the final list and summary.
    /// The list is persisted, so transient contacts are left out.
    pub async fn complete(&self, run: &WorkflowRun, summary: &RunSummary) {
        let companies: Vec<Company> =
            run.companies.iter().map(Company::without_transient).collect();
        let status = run
            .search_status(SearchStage::Complete, summary.headline())
            .with_details(json!({
                "companies": companies,
                "summary": summary,
            }));
        self.reporter.report_status(&status).await;
    }

    async fn transition(
        &self,
        run: &mut WorkflowRun,
        id: &str,
        to: SubstepStatus,
        message: Option<String>,
    ) -> Result<()> {
        let substep = run
            .substep_mut(id)
            .ok_or_else(|| Error::UnknownSubstep(id.to_string()))?;

        let from = substep.status;
        if !from.can_transition_to(to) {
            return Err(Error::InvalidTransition {
                id: id.to_string(),
                from,
                to,
            });
        }

        let now = Utc::now();
        substep.status = to;
        match to {
            SubstepStatus::InProgress => substep.started_at = Some(now),
            SubstepStatus::Completed | SubstepStatus::Error => substep.completed_at = Some(now),
            SubstepStatus::Pending => {}
        }
        if let Some(message) = message {
            substep.message = message;
        }

        record_substep_transition(id, &from.to_string(), &to.to_string());
        metrics::substep_transitions().add(
            1,
            &[
                KeyValue::new("substep", id.to_string()),
                KeyValue::new("to", to.to_string()),
            ],
        );

        let snapshot = substep.clone();
        self.reporter.report_substep(&snapshot).await;
        Ok(())
    }
}
