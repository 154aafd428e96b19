//! Run-level state: the workflow run aggregate, its substeps, and the
//! coarse status observers see.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::company::Company;

// ---------------------------------------------------------------------------
// Workflow Run
// ---------------------------------------------------------------------------

/// Everything one `execute()` call owns. Created per call, never shared.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowRun {
    pub session_id: String,
    pub user_id: String,
    /// Substeps in plan order.
    pub substeps: Vec<Substep>,
    pub companies: Vec<Company>,
}

impl WorkflowRun {
    pub fn new(
        session_id: impl Into<String>,
        user_id: impl Into<String>,
        substeps: Vec<Substep>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            user_id: user_id.into(),
            substeps,
            companies: Vec::new(),
        }
    }

    pub fn substep(&self, id: &str) -> Option<&Substep> {
        self.substeps.iter().find(|s| s.id == id)
    }

    pub fn substep_mut(&mut self, id: &str) -> Option<&mut Substep> {
        self.substeps.iter_mut().find(|s| s.id == id)
    }

    pub fn completed_count(&self) -> usize {
        self.substeps
            .iter()
            .filter(|s| s.status == SubstepStatus::Completed)
            .count()
    }

    /// Project the run onto the coarse status shape.
    pub fn search_status(&self, stage: SearchStage, message: impl Into<String>) -> SearchStatus {
        let total = self.substeps.len();
        let done = self.completed_count();
        let progress = match stage {
            SearchStage::Complete => 100,
            SearchStage::Error => 0,
            SearchStage::Searching if total == 0 => 0,
            SearchStage::Searching => (done * 100 / total) as u8,
        };
        // 1-based position of the first unfinished substep.
        let current_step = self
            .substeps
            .iter()
            .position(|s| !s.status.is_terminal())
            .map_or(total, |i| i + 1);

        SearchStatus {
            stage,
            message: message.into(),
            progress,
            current_step,
            total_steps: total,
            details: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Substep
// ---------------------------------------------------------------------------

/// Smallest independently-reportable unit of progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Substep {
    /// "phase.step", e.g. "2.1".
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: String,
    pub priority: i32,
    /// Capability tags of the collaborators this substep calls.
    pub tools: BTreeSet<String>,
    pub status: SubstepStatus,
    pub message: String,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SubstepStatus {
    Pending,
    InProgress,
    Completed,
    Error,
}

impl SubstepStatus {
    /// Can transition from self to `to`?
    pub fn can_transition_to(self, to: SubstepStatus) -> bool {
        use SubstepStatus::*;
        matches!(
            (self, to),
            (Pending, InProgress)
                | (Pending, Error)      // aborted before it started
                | (InProgress, Completed)
                | (InProgress, Error)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, SubstepStatus::Completed | SubstepStatus::Error)
    }
}

impl std::fmt::Display for SubstepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SubstepStatus::Pending => "pending",
            SubstepStatus::InProgress => "in-progress",
            SubstepStatus::Completed => "completed",
            SubstepStatus::Error => "error",
        };
        write!(f, "{s}")
    }
}

// ---------------------------------------------------------------------------
// Search Status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStage {
    Searching,
    Complete,
    Error,
}

/// Coarse projection of a run for observers that don't need substeps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchStatus {
    pub stage: SearchStage,
    pub message: String,
    /// 0–100.
    pub progress: u8,
    pub current_step: usize,
    pub total_steps: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl SearchStatus {
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

/// End-of-run digest attached to the terminal status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub total: usize,
    pub scored: usize,
    pub with_contacts: usize,
    pub with_intent: usize,
    pub average_fit_score: Option<f64>,
    /// Names of the best-fitting companies, best first.
    pub top_companies: Vec<String>,
}

impl RunSummary {
    const TOP_N: usize = 5;

    /// Summarize a ranked company list.
    pub fn from_companies(companies: &[Company]) -> Self {
        let fit: Vec<f64> = companies.iter().filter_map(Company::fit_score).collect();
        let average_fit_score = if fit.is_empty() {
            None
        } else {
            Some(fit.iter().sum::<f64>() / fit.len() as f64)
        };

        Self {
            total: companies.len(),
            scored: fit.len(),
            with_contacts: companies.iter().filter(|c| !c.employees.is_empty()).count(),
            with_intent: companies
                .iter()
                .filter(|c| c.intent_score().is_some())
                .count(),
            average_fit_score,
            top_companies: companies
                .iter()
                .filter(|c| c.fit_score().is_some())
                .take(Self::TOP_N)
                .map(|c| c.name.clone())
                .collect(),
        }
    }

    pub fn headline(&self) -> String {
        format!(
            "Found {} companies ({} scored, {} with contacts, {} with intent)",
            self.total, self.scored, self.with_contacts, self.with_intent
        )
    }
}
