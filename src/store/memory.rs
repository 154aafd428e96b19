//! In-process store and channel, for tests and single-process hosts.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::broadcast;
use uuid::Uuid;

use super::{
    Notification, NotificationChannel, PersistenceStore, ProgressMessage, RunState,
    RunStateUpdate,
};
use crate::error::{Error, Result};
use crate::model::{Company, Employee};

/// A company as stored, with the keys it was saved under.
#[derive(Debug, Clone)]
pub struct StoredEntity {
    pub id: String,
    pub session_id: String,
    pub icp_model_id: String,
    pub company: Company,
}

#[derive(Default)]
struct Inner {
    runs: HashMap<String, RunState>,
    entities: Vec<StoredEntity>,
    employees: HashMap<String, Vec<Employee>>,
}

/// [`PersistenceStore`] backed by process memory.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| Error::Other("memory store lock poisoned".to_string()))
    }

    /// Durable view of a session, if anything was ever written for it.
    pub fn run_state(&self, session_id: &str) -> Option<RunState> {
        self.lock().ok()?.runs.get(session_id).cloned()
    }

    pub fn entities(&self, session_id: &str) -> Vec<StoredEntity> {
        self.lock()
            .map(|inner| {
                inner
                    .entities
                    .iter()
                    .filter(|e| e.session_id == session_id)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn employees(&self, entity_id: &str) -> Vec<Employee> {
        self.lock()
            .ok()
            .and_then(|inner| inner.employees.get(entity_id).cloned())
            .unwrap_or_default()
    }
}

#[async_trait]
impl PersistenceStore for MemoryStore {
    async fn save_entity(
        &self,
        session_id: &str,
        icp_model_id: &str,
        company: &Company,
    ) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        self.lock()?.entities.push(StoredEntity {
            id: id.clone(),
            session_id: session_id.to_string(),
            icp_model_id: icp_model_id.to_string(),
            company: company.clone(),
        });
        Ok(id)
    }

    async fn save_employees(&self, employees: &[Employee], entity_id: &str) -> Result<()> {
        self.lock()?
            .employees
            .entry(entity_id.to_string())
            .or_default()
            .extend_from_slice(employees);
        Ok(())
    }

    async fn update_run_state(&self, session_id: &str, update: &RunStateUpdate) -> Result<()> {
        self.lock()?
            .runs
            .entry(session_id.to_string())
            .or_insert_with(|| RunState::new(session_id))
            .apply(update);
        Ok(())
    }
}

/// [`NotificationChannel`] fanning messages out to in-process subscribers.
pub struct BroadcastChannel {
    sender: broadcast::Sender<Notification>,
}

impl BroadcastChannel {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }
}

impl Default for BroadcastChannel {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl NotificationChannel for BroadcastChannel {
    async fn publish(&self, session_id: &str, message: &ProgressMessage) -> Result<()> {
        // No subscribers is not an error.
        let _ = self.sender.send(Notification {
            session_id: session_id.to_string(),
            message: message.clone(),
        });
        Ok(())
    }
}
