//! Progress reporting: persist, then publish.
//!
//! Every update is written to the durable session store first and pushed to
//! observers only after that write succeeds, so the durable copy is never
//! behind what anyone has seen live. Reporting is best-effort: failures are
//! logged and counted, never returned.

use std::sync::Arc;

use opentelemetry::KeyValue;
use tracing::{debug, warn};

use crate::model::{SearchStatus, Substep};
use crate::store::{NotificationChannel, PersistenceStore, ProgressMessage, RunStateUpdate};
use crate::telemetry::metrics;

/// Reports progress for one session.
#[derive(Clone)]
pub struct ProgressReporter {
    session_id: String,
    store: Arc<dyn PersistenceStore>,
    channel: Arc<dyn NotificationChannel>,
}

impl ProgressReporter {
    pub fn new(
        session_id: impl Into<String>,
        store: Arc<dyn PersistenceStore>,
        channel: Arc<dyn NotificationChannel>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            store,
            channel,
        }
    }

    /// Aggregate status update.
    pub async fn report_status(&self, status: &SearchStatus) {
        self.persist_then_publish(
            RunStateUpdate::status(status.clone()),
            ProgressMessage::Status(status.clone()),
        )
        .await;
    }

    /// Single substep delta.
    pub async fn report_substep(&self, substep: &Substep) {
        self.persist_then_publish(
            RunStateUpdate::substep(substep.clone()),
            ProgressMessage::Substep(substep.clone()),
        )
        .await;
    }

    /// A batch of substeps plus status, in one durable write and one
    /// message. The published status carries the batch under
    /// `details.substeps`.
    pub async fn report_snapshot(&self, substeps: &[Substep], status: &SearchStatus) {
        let status = status
            .clone()
            .with_details(serde_json::json!({ "substeps": substeps }));
        let update = RunStateUpdate {
            query: None,
            status: Some(status.clone()),
            substeps: substeps.to_vec(),
        };
        self.persist_then_publish(update, ProgressMessage::Status(status))
            .await;
    }

    /// Tell observers the run failed. Publish only: the terminal error
    /// status has already been persisted by then.
    pub async fn report_error(&self, message: &str) {
        self.publish(&ProgressMessage::Error {
            message: message.to_string(),
        })
        .await;
    }

    async fn persist_then_publish(&self, update: RunStateUpdate, message: ProgressMessage) {
        if let Err(e) = self
            .store
            .update_run_state(&self.session_id, &update)
            .await
        {
            warn!(
                session_id = %self.session_id,
                kind = message.kind(),
                error = %e,
                "failed to persist progress, not publishing"
            );
            metrics::progress_dropped().add(1, &[KeyValue::new("reason", "persist")]);
            return;
        }
        self.publish(&message).await;
    }

    async fn publish(&self, message: &ProgressMessage) {
        match self.channel.publish(&self.session_id, message).await {
            Ok(()) => debug!(session_id = %self.session_id, kind = message.kind(), "published"),
            Err(e) => {
                warn!(
                    session_id = %self.session_id,
                    kind = message.kind(),
                    error = %e,
                    "failed to publish progress"
                );
                metrics::progress_dropped().add(1, &[KeyValue::new("reason", "publish")]);
            }
        }
    }
}
