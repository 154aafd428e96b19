//! Live progress over Postgres LISTEN/NOTIFY.
//!
//! NOTIFY payloads are capped by Postgres (8000 bytes by default). Messages
//! that don't fit are sent as a reference telling the listener to reload the
//! session from `search_sessions`, which is always written first.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgListener;

use super::Db;
use crate::error::Result;
use crate::store::{Notification, NotificationChannel, ProgressMessage};

/// Postgres channel progress is published on.
pub const PROGRESS_CHANNEL: &str = "search_progress";

/// Largest payload sent inline; leaves headroom under the server limit.
const MAX_INLINE_PAYLOAD: usize = 7900;

/// What travels over the NOTIFY channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireNotification {
    Inline(Notification),
    /// Too large to send; reload the session's durable state instead.
    Reference { session_id: String, kind: String },
}

impl WireNotification {
    pub fn session_id(&self) -> &str {
        match self {
            WireNotification::Inline(n) => &n.session_id,
            WireNotification::Reference { session_id, .. } => session_id,
        }
    }
}

/// Encode a message for NOTIFY, falling back to a reference when too large.
pub fn encode(session_id: &str, message: &ProgressMessage) -> Result<String> {
    let inline = serde_json::to_string(&WireNotification::Inline(Notification {
        session_id: session_id.to_string(),
        message: message.clone(),
    }))?;
    if inline.len() <= MAX_INLINE_PAYLOAD {
        return Ok(inline);
    }
    Ok(serde_json::to_string(&WireNotification::Reference {
        session_id: session_id.to_string(),
        kind: message.kind().to_string(),
    })?)
}

#[async_trait]
impl NotificationChannel for Db {
    async fn publish(&self, session_id: &str, message: &ProgressMessage) -> Result<()> {
        let payload = encode(session_id, message)?;
        sqlx::query("SELECT pg_notify($1, $2)")
            .bind(PROGRESS_CHANNEL)
            .bind(payload)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

impl Db {
    /// Open a listener subscribed to progress notifications.
    pub async fn listen_progress(&self) -> Result<PgListener> {
        let mut listener = PgListener::connect_with(&self.pool).await?;
        listener.listen(PROGRESS_CHANNEL).await?;
        Ok(listener)
    }
}
