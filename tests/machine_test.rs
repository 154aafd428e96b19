//! Tests for substep transitions and run-level status reporting.

mod common;

use std::sync::Arc;

use common::{Journal, JournalStore, RecordingChannel};
use prospector::engine::plan::{self, PHASE_PLAN};
use prospector::engine::{ProgressReporter, StateMachine};
use prospector::error::Error;
use prospector::model::*;
use prospector::store::ProgressMessage;

struct Fixture {
    machine: StateMachine,
    store: Arc<JournalStore>,
    channel: Arc<RecordingChannel>,
    run: WorkflowRun,
}

async fn fixture() -> Fixture {
    let journal = Journal::default();
    let store = Arc::new(JournalStore::new(journal.clone()));
    let channel = Arc::new(RecordingChannel::new(journal));
    let reporter = ProgressReporter::new("s1", store.clone(), channel.clone());
    let machine = StateMachine::new(reporter);
    let mut run = WorkflowRun::new("s1", "u1", Vec::new());
    machine.initialize(&mut run, PHASE_PLAN).await;
    Fixture {
        machine,
        store,
        channel,
        run,
    }
}

// ---------------------------------------------------------------------------
// Status transitions
// ---------------------------------------------------------------------------

#[test]
fn allowed_transitions() {
    use SubstepStatus::*;
    assert!(Pending.can_transition_to(InProgress));
    assert!(Pending.can_transition_to(Error));
    assert!(InProgress.can_transition_to(Completed));
    assert!(InProgress.can_transition_to(Error));
}

#[test]
fn terminal_and_backward_transitions_are_rejected() {
    use SubstepStatus::*;
    assert!(!Completed.can_transition_to(InProgress));
    assert!(!Completed.can_transition_to(Error));
    assert!(!Error.can_transition_to(InProgress));
    assert!(!Error.can_transition_to(Completed));
    assert!(!InProgress.can_transition_to(Pending));
    assert!(!Pending.can_transition_to(Completed));
}

#[test]
fn status_serializes_kebab_case() {
    let json = serde_json::to_string(&SubstepStatus::InProgress).unwrap();
    assert_eq!(json, "\"in-progress\"");
}

// ---------------------------------------------------------------------------
// Machine
// ---------------------------------------------------------------------------

#[tokio::test]
async fn initialize_seeds_plan_and_sends_full_list_once() {
    let f = fixture().await;

    assert_eq!(f.run.substeps.len(), PHASE_PLAN.len());
    assert!(f.run.substeps.iter().all(|s| s.status == SubstepStatus::Pending));

    let messages = f.channel.messages();
    assert_eq!(messages.len(), 1);
    let ProgressMessage::Status(ref status) = messages[0] else {
        panic!("expected status, got {:?}", messages[0]);
    };
    assert_eq!(status.stage, SearchStage::Searching);
    assert_eq!(status.progress, 0);
    assert_eq!(status.current_step, 1);
    assert_eq!(status.total_steps, PHASE_PLAN.len());
    let listed = status.details.as_ref().unwrap()["substeps"].as_array().unwrap().len();
    assert_eq!(listed, PHASE_PLAN.len());

    let state = f.store.inner.run_state("s1").unwrap();
    assert_eq!(state.substeps.len(), PHASE_PLAN.len());
}

#[tokio::test]
async fn begin_and_finish_stamp_times_and_emit_deltas() {
    let mut f = fixture().await;

    f.machine.begin(&mut f.run, plan::QUERY_ANALYSIS).await.unwrap();
    let substep = f.run.substep(plan::QUERY_ANALYSIS).unwrap();
    assert_eq!(substep.status, SubstepStatus::InProgress);
    assert!(substep.started_at.is_some());
    assert!(substep.completed_at.is_none());

    f.machine
        .finish(&mut f.run, plan::QUERY_ANALYSIS, "done")
        .await
        .unwrap();
    let substep = f.run.substep(plan::QUERY_ANALYSIS).unwrap();
    assert_eq!(substep.status, SubstepStatus::Completed);
    assert_eq!(substep.message, "done");
    assert!(substep.completed_at.is_some());

    assert_eq!(
        f.channel.history(plan::QUERY_ANALYSIS),
        vec![SubstepStatus::InProgress, SubstepStatus::Completed]
    );
    let stored = f.store.inner.run_state("s1").unwrap();
    assert_eq!(
        stored.substeps[plan::QUERY_ANALYSIS].status,
        SubstepStatus::Completed
    );
}

#[tokio::test]
async fn begin_on_completed_substep_is_rejected() {
    let mut f = fixture().await;
    f.machine.begin(&mut f.run, plan::DISCOVERY).await.unwrap();
    f.machine.finish(&mut f.run, plan::DISCOVERY, "ok").await.unwrap();

    let err = f.machine.begin(&mut f.run, plan::DISCOVERY).await.unwrap_err();
    assert!(matches!(
        err,
        Error::InvalidTransition {
            from: SubstepStatus::Completed,
            to: SubstepStatus::InProgress,
            ..
        }
    ));
    assert_eq!(
        f.run.substep(plan::DISCOVERY).unwrap().status,
        SubstepStatus::Completed
    );
}

#[tokio::test]
async fn finish_without_begin_is_rejected() {
    let mut f = fixture().await;
    let err = f
        .machine
        .finish(&mut f.run, plan::RANKING, "too soon")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidTransition { .. }));
    assert!(f.channel.history(plan::RANKING).is_empty());
}

#[tokio::test]
async fn unknown_substep_is_an_error() {
    let mut f = fixture().await;
    let err = f.machine.begin(&mut f.run, "9.9").await.unwrap_err();
    assert!(matches!(err, Error::UnknownSubstep(ref id) if id == "9.9"));
}

#[tokio::test]
async fn fail_marks_error_without_touching_others() {
    let mut f = fixture().await;
    f.machine.begin(&mut f.run, plan::FIRMOGRAPHICS).await.unwrap();
    f.machine
        .fail(&mut f.run, plan::FIRMOGRAPHICS, "provider down")
        .await
        .unwrap();

    let failed = f.run.substep(plan::FIRMOGRAPHICS).unwrap();
    assert_eq!(failed.status, SubstepStatus::Error);
    assert_eq!(failed.message, "provider down");
    assert_eq!(
        f.run.substep(plan::FIT_SCORING).unwrap().status,
        SubstepStatus::Pending
    );
}

#[tokio::test]
async fn abort_all_errors_every_open_substep_with_one_message() {
    let mut f = fixture().await;
    f.machine.begin(&mut f.run, plan::QUERY_ANALYSIS).await.unwrap();
    f.machine
        .finish(&mut f.run, plan::QUERY_ANALYSIS, "ok")
        .await
        .unwrap();
    f.machine.begin(&mut f.run, plan::DISCOVERY).await.unwrap();

    f.machine.abort_all(&mut f.run, "search exploded").await;

    // Completed work stays completed; everything else is errored.
    assert_eq!(
        f.run.substep(plan::QUERY_ANALYSIS).unwrap().status,
        SubstepStatus::Completed
    );
    for substep in f.run.substeps.iter().skip(1) {
        assert_eq!(substep.status, SubstepStatus::Error, "{}", substep.id);
        assert_eq!(substep.message, "search exploded");
        assert!(substep.completed_at.is_some());
    }

    let last = f.channel.messages().pop().unwrap();
    let ProgressMessage::Status(status) = last else {
        panic!("expected terminal status");
    };
    assert_eq!(status.stage, SearchStage::Error);
    assert_eq!(status.progress, 0);
    assert_eq!(status.message, "search exploded");

    let stored = f.store.inner.run_state("s1").unwrap();
    assert!(stored
        .substeps
        .values()
        .all(|s| s.status.is_terminal()));
    assert_eq!(stored.status.unwrap().stage, SearchStage::Error);
}

#[tokio::test]
async fn complete_sends_summary_and_full_progress() {
    let mut f = fixture().await;
    f.run.companies.push(Company {
        name: "Acme".to_string(),
        ..Company::default()
    });
    let summary = RunSummary::from_companies(&f.run.companies);

    f.machine.complete(&f.run, &summary).await;

    let ProgressMessage::Status(status) = f.channel.messages().pop().unwrap() else {
        panic!("expected terminal status");
    };
    assert_eq!(status.stage, SearchStage::Complete);
    assert_eq!(status.progress, 100);
    let details = status.details.unwrap();
    assert_eq!(details["summary"]["total"], 1);
    assert_eq!(details["companies"][0]["name"], "Acme");
}

// ---------------------------------------------------------------------------
// Status projection
// ---------------------------------------------------------------------------

#[test]
fn search_status_tracks_completed_share() {
    let mut run = WorkflowRun::new("s", "u", plan::seed(&PHASE_PLAN[..4]));
    run.substeps[0].status = SubstepStatus::Completed;
    run.substeps[1].status = SubstepStatus::InProgress;

    let status = run.search_status(SearchStage::Searching, "working");
    assert_eq!(status.progress, 25);
    assert_eq!(status.current_step, 2);
    assert_eq!(status.total_steps, 4);
}

#[test]
fn summary_counts_and_tops() {
    let scored = |name: &str, score: f64| {
        let mut c = Company {
            name: name.to_string(),
            ..Company::default()
        };
        c.scoring_metrics.fit_score = Some(FitScore {
            score,
            reasoning: String::new(),
            details: serde_json::Value::Null,
        });
        c
    };
    let companies = vec![
        scored("A", 0.9),
        scored("B", 0.5),
        Company {
            name: "C".to_string(),
            ..Company::default()
        },
    ];

    let summary = RunSummary::from_companies(&companies);
    assert_eq!(summary.total, 3);
    assert_eq!(summary.scored, 2);
    assert_eq!(summary.top_companies, vec!["A", "B"]);
    assert!((summary.average_fit_score.unwrap() - 0.7).abs() < 1e-9);
}
