//! Workflow orchestrator: one run, one session.
//!
//! Walks the phase plan, drives the state machine and fan-out stages, and is
//! the only place a run-level failure is handled. Anything that escapes a
//! phase lands in [`Orchestrator::execute`], which aborts every open substep,
//! reports the error and returns it.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use opentelemetry::KeyValue;
use tracing::{Instrument, error, info, warn};

use super::fanout::{Concurrency, StageReport, run_stage};
use super::machine::StateMachine;
use super::plan::{self, PHASE_PLAN};
use super::reporter::ProgressReporter;
use crate::config::WorkflowSettings;
use crate::error::Result;
use crate::merge::{merge, parse_domain};
use crate::model::{
    Company, Employee, EmployeeRef, FirmographicRecord, FitScore, IcpModel, IntentScore,
    IntentSignal, PersonaFilters, RawRecord, RunSummary, ScoringMetrics, StructuredQuery,
    WorkflowRun,
};
use crate::provider::{
    DiscoveryProvider, EnrichmentProvider, FitScorer, IntentProvider, IntentScorer,
    PersonaProvider,
};
use crate::store::{NotificationChannel, PersistenceStore, RunStateUpdate};
use crate::telemetry::metrics;
use crate::telemetry::workflow::{record_run_outcome, start_run_span};

/// Everything a run talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub discovery: Arc<dyn DiscoveryProvider>,
    pub enrichment: Arc<dyn EnrichmentProvider>,
    pub fit_scorer: Arc<dyn FitScorer>,
    pub persona: Arc<dyn PersonaProvider>,
    pub intent: Arc<dyn IntentProvider>,
    pub intent_scorer: Arc<dyn IntentScorer>,
    pub store: Arc<dyn PersistenceStore>,
    pub channel: Arc<dyn NotificationChannel>,
}

pub struct Orchestrator {
    session_id: String,
    user_id: String,
    collaborators: Collaborators,
    settings: WorkflowSettings,
}

impl Orchestrator {
    pub fn new(
        session_id: impl Into<String>,
        user_id: impl Into<String>,
        collaborators: Collaborators,
        settings: WorkflowSettings,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            user_id: user_id.into(),
            collaborators,
            settings,
        }
    }

    /// Run the whole workflow for `query` against `icp`.
    ///
    /// Returns the ranked companies. On failure every unfinished substep is
    /// marked as errored, a terminal error status and an error notification
    /// are sent, and the error is returned.
    pub async fn execute(&self, query: &str, icp: &IcpModel) -> Result<Vec<Company>> {
        let span = start_run_span(&self.session_id, &icp.id);

        async {
            let reporter = ProgressReporter::new(
                self.session_id.clone(),
                Arc::clone(&self.collaborators.store),
                Arc::clone(&self.collaborators.channel),
            );
            let machine = StateMachine::new(reporter);
            let mut run = WorkflowRun::new(
                self.session_id.clone(),
                self.user_id.clone(),
                plan::seed(PHASE_PLAN),
            );

            info!(user_id = %self.user_id, "search started");

            match self.run_phases(&machine, &mut run, query, icp).await {
                Ok(summary) => {
                    machine.complete(&run, &summary).await;
                    record_run_outcome(&span, "complete");
                    metrics::runs_finished().add(1, &[KeyValue::new("outcome", "complete")]);
                    info!(companies = run.companies.len(), "search complete");
                    Ok(run.companies)
                }
                Err(e) => {
                    let message = e.to_string();
                    error!(error = %message, "search failed");
                    machine.abort_all(&mut run, &message).await;
                    machine.reporter().report_error(&message).await;
                    record_run_outcome(&span, "error");
                    metrics::runs_finished().add(1, &[KeyValue::new("outcome", "error")]);
                    Err(e)
                }
            }
        }
        .instrument(span.clone())
        .await
    }

    async fn run_phases(
        &self,
        machine: &StateMachine,
        run: &mut WorkflowRun,
        query: &str,
        icp: &IcpModel,
    ) -> Result<RunSummary> {
        self.collaborators
            .store
            .update_run_state(&self.session_id, &RunStateUpdate::query(query))
            .await?;
        machine.initialize(run, PHASE_PLAN).await;

        self.discover(machine, run, query, icp).await?;
        self.enrich_and_score(machine, run, icp).await?;
        self.find_contacts(machine, run, icp).await?;
        self.detect_intent(machine, run, icp).await?;
        self.persist(machine, run, icp).await
    }

    // -----------------------------------------------------------------------
    // Phase 1: discovery
    // -----------------------------------------------------------------------

    async fn discover(
        &self,
        machine: &StateMachine,
        run: &mut WorkflowRun,
        query: &str,
        icp: &IcpModel,
    ) -> Result<()> {
        // Query analysis stays open until discovery has accepted the query,
        // so a failed search takes both substeps down with it.
        machine.begin(run, plan::QUERY_ANALYSIS).await?;
        let structured = StructuredQuery::build(query, &icp.config);

        machine.begin(run, plan::DISCOVERY).await?;
        let candidates = self
            .collaborators
            .discovery
            .search(&structured, self.settings.discovery_count_hint)
            .await?;
        machine
            .finish(
                run,
                plan::QUERY_ANALYSIS,
                format!(
                    "Searched for \"{}\" in {} industries, {} geographies",
                    structured.text,
                    structured.industries.len(),
                    structured.geographies.len()
                ),
            )
            .await?;
        let found = candidates.len();
        machine
            .finish(run, plan::DISCOVERY, format!("Found {found} candidates"))
            .await?;

        machine.begin(run, plan::VALIDATION).await?;
        run.companies = validate(
            candidates
                .into_iter()
                .map(|c| merge(RawRecord::Discovery(c)))
                .collect(),
        );
        let kept = run.companies.len();
        info!(found, kept, "discovery finished");
        machine
            .finish(
                run,
                plan::VALIDATION,
                format!("Kept {kept} of {found} candidates"),
            )
            .await
    }

    // -----------------------------------------------------------------------
    // Phase 2: firmographics, fit, ranking
    // -----------------------------------------------------------------------

    async fn enrich_and_score(
        &self,
        machine: &StateMachine,
        run: &mut WorkflowRun,
        icp: &IcpModel,
    ) -> Result<()> {
        machine.begin(run, plan::FIRMOGRAPHICS).await?;
        let urls: Vec<String> = run
            .companies
            .iter()
            .filter_map(|c| c.website.clone())
            .collect();

        match self.collaborators.enrichment.enrich_by_urls(&urls).await {
            Ok(records) => {
                let by_domain = index_by_domain(records);
                let report = run_stage(
                    plan::FIRMOGRAPHICS,
                    &mut run.companies,
                    Concurrency::Eager,
                    |company| {
                        let record = by_domain.get(&company.domain).cloned();
                        async move { Ok(record.map(|r| merge(RawRecord::Firmographic(r)))) }
                    },
                    |company: &mut Company, enriched: Company| company.absorb(enriched),
                )
                .await?;
                close_stage(machine, run, plan::FIRMOGRAPHICS, &report, "Enriched").await?;
            }
            Err(e) => {
                // Batch lookup is best-effort; carry on without firmographics.
                warn!(error = %e, "firmographic enrichment unavailable");
                machine
                    .fail(
                        run,
                        plan::FIRMOGRAPHICS,
                        format!("Enrichment unavailable: {e}"),
                    )
                    .await?;
            }
        }

        machine.begin(run, plan::FIT_SCORING).await?;
        let scorer = &self.collaborators.fit_scorer;
        let config = &icp.config;
        let report = run_stage(
            plan::FIT_SCORING,
            &mut run.companies,
            Concurrency::Eager,
            |company| async move { scorer.score(&company, config).await.map(Some) },
            |company: &mut Company, fit: FitScore| {
                company.scoring_metrics.merge(ScoringMetrics {
                    fit_score: Some(fit),
                    intent_score: None,
                });
            },
        )
        .await?;
        close_stage(machine, run, plan::FIT_SCORING, &report, "Scored").await?;

        machine.begin(run, plan::RANKING).await?;
        rank(&mut run.companies);
        let message = match run.companies.first() {
            Some(top) => match top.scoring_metrics.fit_score {
                Some(ref fit) => format!(
                    "Ranked {} companies; best fit {} ({:.2}): {}",
                    run.companies.len(),
                    top.name,
                    fit.score,
                    fit.reasoning
                ),
                None => format!("Ranked {} companies; none scored", run.companies.len()),
            },
            None => "No companies to rank".to_string(),
        };
        machine.finish(run, plan::RANKING, message).await
    }

    // -----------------------------------------------------------------------
    // Phase 3: contacts
    // -----------------------------------------------------------------------

    async fn find_contacts(
        &self,
        machine: &StateMachine,
        run: &mut WorkflowRun,
        icp: &IcpModel,
    ) -> Result<()> {
        let persona = &self.collaborators.persona;
        let limit = Concurrency::Bounded(self.settings.persona_concurrency);
        let filters = PersonaFilters {
            personas: icp.config.target_personas.clone(),
            limit: self.settings.employees_per_company,
        };
        let filters = &filters;

        machine.begin(run, plan::PERSONA_SEARCH).await?;
        let report = run_stage(
            plan::PERSONA_SEARCH,
            &mut run.companies,
            limit,
            |company| async move {
                // Only companies that were fit-scored and can be looked up.
                let (Some(_), Some(id)) = (company.fit_score(), company.enrichment_id.as_deref())
                else {
                    return Ok(None);
                };
                persona.search_employees(id, filters).await.map(Some)
            },
            |company: &mut Company, refs: Vec<EmployeeRef>| {
                company.employees = refs.into_iter().map(Employee::from).collect();
            },
        )
        .await?;
        close_stage(machine, run, plan::PERSONA_SEARCH, &report, "Searched").await?;

        machine.begin(run, plan::CONTACT_COLLECTION).await?;
        let report = run_stage(
            plan::CONTACT_COLLECTION,
            &mut run.companies,
            limit,
            |company| async move {
                if company.employees.is_empty() {
                    return Ok(None);
                }
                let refs: Vec<EmployeeRef> =
                    company.employees.iter().map(EmployeeRef::from).collect();
                persona.collect_employees(&refs).await.map(Some)
            },
            |company: &mut Company, employees: Vec<Employee>| company.employees = employees,
        )
        .await?;
        close_stage(
            machine,
            run,
            plan::CONTACT_COLLECTION,
            &report,
            "Collected contacts for",
        )
        .await
    }

    // -----------------------------------------------------------------------
    // Phase 4: intent, persistence
    // -----------------------------------------------------------------------

    async fn detect_intent(
        &self,
        machine: &StateMachine,
        run: &mut WorkflowRun,
        icp: &IcpModel,
    ) -> Result<()> {
        let triggers = &icp.config.buying_triggers;
        if triggers.is_empty() {
            for id in [plan::INTENT_DETECTION, plan::INTENT_SCORING] {
                machine.begin(run, id).await?;
                machine
                    .finish(run, id, "No buying triggers configured; skipped")
                    .await?;
            }
            return Ok(());
        }

        // Unlike contact search, intent detection is not gated on a fit score.
        machine.begin(run, plan::INTENT_DETECTION).await?;
        let intent = &self.collaborators.intent;
        let report = run_stage(
            plan::INTENT_DETECTION,
            &mut run.companies,
            Concurrency::Bounded(self.settings.intent_concurrency),
            |company| async move {
                // Nothing to look up without an address.
                let url = company.website.as_deref().unwrap_or(company.domain.as_str());
                if url.is_empty() {
                    return Ok(None);
                }
                intent
                    .detect(&company.name, url, triggers)
                    .await
                    .map(Some)
            },
            |company: &mut Company, signal: IntentSignal| company.intent = Some(signal),
        )
        .await?;
        close_stage(machine, run, plan::INTENT_DETECTION, &report, "Checked").await?;

        machine.begin(run, plan::INTENT_SCORING).await?;
        let scorer = &self.collaborators.intent_scorer;
        let report = run_stage(
            plan::INTENT_SCORING,
            &mut run.companies,
            Concurrency::Eager,
            |company| async move {
                match company.intent {
                    Some(ref signal) => scorer.score(signal).await.map(Some),
                    None => Ok(None),
                }
            },
            |company: &mut Company, score: IntentScore| {
                company.scoring_metrics.merge(ScoringMetrics {
                    fit_score: None,
                    intent_score: Some(score),
                });
            },
        )
        .await?;
        close_stage(machine, run, plan::INTENT_SCORING, &report, "Scored intent for").await
    }

    async fn persist(
        &self,
        machine: &StateMachine,
        run: &mut WorkflowRun,
        icp: &IcpModel,
    ) -> Result<RunSummary> {
        machine.begin(run, plan::PERSIST).await?;
        let store = &self.collaborators.store;
        let session_id = self.session_id.as_str();
        let icp_model_id = icp.id.as_str();
        let report = run_stage(
            plan::PERSIST,
            &mut run.companies,
            Concurrency::Eager,
            |company| async move {
                let entity_id = store
                    .save_entity(session_id, icp_model_id, &company.without_transient())
                    .await?;
                if !company.employees.is_empty() {
                    store.save_employees(&company.employees, &entity_id).await?;
                }
                Ok(Some(()))
            },
            // Stored companies are not touched again.
            |_: &mut Company, (): ()| {},
        )
        .await?;

        let summary = RunSummary::from_companies(&run.companies);
        let message = match report.failed {
            0 => summary.headline(),
            failed => format!("{} ({failed} not saved)", summary.headline()),
        };
        machine.finish(run, plan::PERSIST, message).await?;
        Ok(summary)
    }
}

/// Close a fan-out substep: completed unless every company failed.
async fn close_stage(
    machine: &StateMachine,
    run: &mut WorkflowRun,
    id: &str,
    report: &StageReport,
    verb: &str,
) -> Result<()> {
    let message = report.describe(verb);
    if report.attempted > 0 && report.failed == report.attempted {
        machine.fail(run, id, message).await
    } else {
        machine.finish(run, id, message).await
    }
}

/// Drop nameless candidates and duplicate domains, keeping the first seen.
fn validate(candidates: Vec<Company>) -> Vec<Company> {
    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|c| !c.name.is_empty())
        .filter(|c| c.domain.is_empty() || seen.insert(c.domain.clone()))
        .collect()
}

fn index_by_domain(records: Vec<FirmographicRecord>) -> HashMap<String, FirmographicRecord> {
    let mut by_domain = HashMap::new();
    for record in records {
        let domain = parse_domain(record.website.as_deref());
        if !domain.is_empty() {
            by_domain.entry(domain).or_insert(record);
        }
    }
    by_domain
}

/// Best fit first; unscored companies keep their order at the end.
fn rank(companies: &mut [Company]) {
    companies.sort_by(|a, b| match (a.fit_score(), b.fit_score()) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
}
