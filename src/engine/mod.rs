//! Workflow engine: phase plan, state machine, progress reporting, fan-out
//! and the orchestrator tying them together.

pub mod fanout;
pub mod machine;
pub mod orchestrator;
pub mod plan;
pub mod reporter;

pub use fanout::{Concurrency, StageReport, run_stage};
pub use machine::StateMachine;
pub use orchestrator::{Collaborators, Orchestrator};
pub use reporter::ProgressReporter;
