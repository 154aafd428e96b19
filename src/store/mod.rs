//! Persistence and notification contracts, plus the messages that flow
//! through them.
//!
//! The durable copy of a run is built from [`RunStateUpdate`] deltas; live
//! observers receive [`ProgressMessage`]s. An observer that joins late can
//! rebuild everything from the durable copy.

pub mod memory;

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::{Company, Employee, SearchStatus, Substep};

/// Durable storage for run state and results.
#[async_trait]
pub trait PersistenceStore: Send + Sync {
    /// Store one finished company. Returns the stored entity's id.
    async fn save_entity(
        &self,
        session_id: &str,
        icp_model_id: &str,
        company: &Company,
    ) -> Result<String>;

    async fn save_employees(&self, employees: &[Employee], entity_id: &str) -> Result<()>;

    /// Apply a partial update to the session's run state.
    async fn update_run_state(&self, session_id: &str, update: &RunStateUpdate) -> Result<()>;
}

/// Push channel to live observers. Delivery is best-effort.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    async fn publish(&self, session_id: &str, message: &ProgressMessage) -> Result<()>;
}

// ---------------------------------------------------------------------------
// Run state
// ---------------------------------------------------------------------------

/// Partial update to a session's durable run state. Absent fields are left
/// as they are; substeps are upserted by id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStateUpdate {
    pub query: Option<String>,
    pub status: Option<SearchStatus>,
    #[serde(default)]
    pub substeps: Vec<Substep>,
}

impl RunStateUpdate {
    pub fn query(query: impl Into<String>) -> Self {
        Self {
            query: Some(query.into()),
            ..Self::default()
        }
    }

    pub fn status(status: SearchStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn substep(substep: Substep) -> Self {
        Self {
            substeps: vec![substep],
            ..Self::default()
        }
    }

    pub fn substeps(substeps: Vec<Substep>) -> Self {
        Self {
            substeps,
            ..Self::default()
        }
    }
}

/// The durable view of one session, as a late-joining observer sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunState {
    pub session_id: String,
    pub query: Option<String>,
    pub status: Option<SearchStatus>,
    /// Substeps keyed by id.
    pub substeps: BTreeMap<String, Substep>,
    pub updated_at: DateTime<Utc>,
}

impl RunState {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            query: None,
            status: None,
            substeps: BTreeMap::new(),
            updated_at: Utc::now(),
        }
    }

    pub fn apply(&mut self, update: &RunStateUpdate) {
        if let Some(ref query) = update.query {
            self.query = Some(query.clone());
        }
        if let Some(ref status) = update.status {
            self.status = Some(status.clone());
        }
        for substep in &update.substeps {
            self.substeps.insert(substep.id.clone(), substep.clone());
        }
        self.updated_at = Utc::now();
    }
}

// ---------------------------------------------------------------------------
// Live messages
// ---------------------------------------------------------------------------

/// What gets pushed to observers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ProgressMessage {
    /// Aggregate status. Sent once at start and once at the end.
    Status(SearchStatus),
    /// One substep changed.
    Substep(Substep),
    /// The run failed.
    Error { message: String },
}

impl ProgressMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            ProgressMessage::Status(_) => "status",
            ProgressMessage::Substep(_) => "substep",
            ProgressMessage::Error { .. } => "error",
        }
    }
}

/// A message addressed to a session, as delivered to subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub session_id: String,
    pub message: ProgressMessage,
}
