//! Fake collaborators shared by the engine tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use prospector::engine::Collaborators;
use prospector::error::{Error, Result};
use prospector::model::*;
use prospector::provider::*;
use prospector::store::memory::{BroadcastChannel, MemoryStore};
use prospector::store::{NotificationChannel, PersistenceStore, ProgressMessage, RunStateUpdate};
use serde_json::json;

// ---------------------------------------------------------------------------
// Providers
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeDiscovery {
    pub candidates: Vec<DiscoveryCandidate>,
    pub fail: Option<String>,
    pub calls: AtomicUsize,
}

#[async_trait]
impl DiscoveryProvider for FakeDiscovery {
    async fn search(&self, _: &StructuredQuery, _: usize) -> Result<Vec<DiscoveryCandidate>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.fail {
            Some(ref msg) => Err(Error::Provider(msg.clone())),
            None => Ok(self.candidates.clone()),
        }
    }
}

#[derive(Default)]
pub struct FakeEnrichment {
    pub records: Vec<FirmographicRecord>,
    pub fail: bool,
    pub calls: AtomicUsize,
}

#[async_trait]
impl EnrichmentProvider for FakeEnrichment {
    async fn enrich_by_urls(&self, urls: &[String]) -> Result<Vec<FirmographicRecord>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(Error::Provider("enrichment down".to_string()));
        }
        let wanted: HashSet<String> = urls
            .iter()
            .map(|u| prospector::merge::parse_domain(Some(u)))
            .collect();
        Ok(self
            .records
            .iter()
            .filter(|r| wanted.contains(&prospector::merge::parse_domain(r.website.as_deref())))
            .cloned()
            .collect())
    }
}

/// Scores by name; names in `fail_for` error, unknown names get 0.5.
#[derive(Default)]
pub struct FakeFitScorer {
    pub scores: HashMap<String, f64>,
    pub fail_for: HashSet<String>,
}

#[async_trait]
impl FitScorer for FakeFitScorer {
    async fn score(&self, company: &Company, _: &IcpConfig) -> Result<FitScore> {
        if self.fail_for.contains(&company.name) {
            return Err(Error::Provider(format!("scorer choked on {}", company.name)));
        }
        Ok(FitScore {
            score: self.scores.get(&company.name).copied().unwrap_or(0.5),
            reasoning: format!("{} looks relevant", company.name),
            details: json!({}),
        })
    }
}

#[derive(Default)]
pub struct FakePersona {
    pub fail_for: HashSet<String>,
    pub searches: AtomicUsize,
    pub collections: AtomicUsize,
}

#[async_trait]
impl PersonaProvider for FakePersona {
    async fn search_employees(
        &self,
        enrichment_id: &str,
        filters: &PersonaFilters,
    ) -> Result<Vec<EmployeeRef>> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        if self.fail_for.contains(enrichment_id) {
            return Err(Error::Provider("rate limited".to_string()));
        }
        Ok((0..filters.limit.min(2))
            .map(|i| EmployeeRef {
                id: format!("{enrichment_id}-{i}"),
                name: Some(format!("Person {i}")),
                title: Some("VP Sales".to_string()),
            })
            .collect())
    }

    async fn collect_employees(&self, refs: &[EmployeeRef]) -> Result<Vec<Employee>> {
        self.collections.fetch_add(1, Ordering::SeqCst);
        Ok(refs
            .iter()
            .map(|r| Employee {
                id: r.id.clone(),
                name: r.name.clone().unwrap_or_default(),
                title: r.title.clone(),
                email: Some(format!("{}@example.com", r.id)),
                linkedin: None,
                raw: json!({ "id": r.id }),
            })
            .collect())
    }
}

#[derive(Default)]
pub struct CountingIntent {
    pub calls: AtomicUsize,
    pub fail_for: HashSet<String>,
}

#[async_trait]
impl IntentProvider for CountingIntent {
    async fn detect(&self, name: &str, _: &str, triggers: &[String]) -> Result<IntentSignal> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_for.contains(name) {
            return Err(Error::Provider(format!("no signal source for {name}")));
        }
        Ok(IntentSignal {
            summary: format!("{name} is hiring"),
            evidence: triggers.to_vec(),
        })
    }
}

#[derive(Default)]
pub struct CountingIntentScorer {
    pub calls: AtomicUsize,
}

#[async_trait]
impl IntentScorer for CountingIntentScorer {
    async fn score(&self, signal: &IntentSignal) -> Result<IntentScore> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(IntentScore {
            score: signal.evidence.len() as f64 / 10.0,
            details: json!({}),
        })
    }
}

// ---------------------------------------------------------------------------
// Store and channel
// ---------------------------------------------------------------------------

/// Ordered log of store writes and publishes, shared by the journaling
/// store and channel.
pub type Journal = Arc<Mutex<Vec<String>>>;

/// MemoryStore that journals writes and can be told to fail them.
pub struct JournalStore {
    pub inner: MemoryStore,
    pub journal: Journal,
    /// Reject every run-state write.
    pub fail_updates: bool,
    /// Reject run-state writes other than the initial query.
    pub fail_progress: bool,
    pub fail_entities: HashSet<String>,
}

impl JournalStore {
    pub fn new(journal: Journal) -> Self {
        Self {
            inner: MemoryStore::new(),
            journal,
            fail_updates: false,
            fail_progress: false,
            fail_entities: HashSet::new(),
        }
    }
}

#[async_trait]
impl PersistenceStore for JournalStore {
    async fn save_entity(
        &self,
        session_id: &str,
        icp_model_id: &str,
        company: &Company,
    ) -> Result<String> {
        if self.fail_entities.contains(&company.name) {
            return Err(Error::Other("disk full".to_string()));
        }
        self.journal
            .lock()
            .unwrap()
            .push(format!("save:{}", company.name));
        self.inner.save_entity(session_id, icp_model_id, company).await
    }

    async fn save_employees(&self, employees: &[Employee], entity_id: &str) -> Result<()> {
        self.inner.save_employees(employees, entity_id).await
    }

    async fn update_run_state(&self, session_id: &str, update: &RunStateUpdate) -> Result<()> {
        if self.fail_updates || (self.fail_progress && update.query.is_none()) {
            return Err(Error::Other("store unavailable".to_string()));
        }
        self.journal.lock().unwrap().push(format!("persist:{}", label(update)));
        self.inner.update_run_state(session_id, update).await
    }
}

fn label(update: &RunStateUpdate) -> String {
    if update.query.is_some() {
        "query".to_string()
    } else if update.status.is_some() {
        "status".to_string()
    } else {
        update
            .substeps
            .iter()
            .map(|s| s.id.clone())
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Channel that records every published message.
#[derive(Default)]
pub struct RecordingChannel {
    pub journal: Journal,
    pub messages: Mutex<Vec<ProgressMessage>>,
    pub inner: BroadcastChannel,
}

impl RecordingChannel {
    pub fn new(journal: Journal) -> Self {
        Self {
            journal,
            messages: Mutex::new(Vec::new()),
            inner: BroadcastChannel::default(),
        }
    }

    pub fn messages(&self) -> Vec<ProgressMessage> {
        self.messages.lock().unwrap().clone()
    }

    /// Every status a given substep was published with, in order.
    pub fn history(&self, substep_id: &str) -> Vec<SubstepStatus> {
        self.messages()
            .into_iter()
            .filter_map(|m| match m {
                ProgressMessage::Substep(s) if s.id == substep_id => Some(s.status),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl NotificationChannel for RecordingChannel {
    async fn publish(&self, session_id: &str, message: &ProgressMessage) -> Result<()> {
        let label = match message {
            ProgressMessage::Substep(s) => s.id.clone(),
            other => other.kind().to_string(),
        };
        self.journal.lock().unwrap().push(format!("publish:{label}"));
        self.messages.lock().unwrap().push(message.clone());
        self.inner.publish(session_id, message).await
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct Harness {
    pub discovery: Arc<FakeDiscovery>,
    pub enrichment: Arc<FakeEnrichment>,
    pub fit: Arc<FakeFitScorer>,
    pub persona: Arc<FakePersona>,
    pub intent: Arc<CountingIntent>,
    pub intent_scorer: Arc<CountingIntentScorer>,
    pub store: Arc<JournalStore>,
    pub channel: Arc<RecordingChannel>,
    pub journal: Journal,
}

impl Harness {
    /// Three discovered companies, all with firmographics.
    pub fn new() -> Self {
        let journal = Journal::default();
        Self {
            discovery: Arc::new(FakeDiscovery {
                candidates: vec![
                    candidate("Acme", "https://acme.com"),
                    candidate("Globex", "https://www.globex.io"),
                    candidate("Initech", "https://initech.net"),
                ],
                ..FakeDiscovery::default()
            }),
            enrichment: Arc::new(FakeEnrichment {
                records: vec![
                    firmographic("acme-1", "https://acme.com", Some(40)),
                    firmographic("globex-1", "https://globex.io", Some(120)),
                    firmographic("initech-1", "https://initech.net", None),
                ],
                ..FakeEnrichment::default()
            }),
            fit: Arc::new(FakeFitScorer {
                scores: HashMap::from([
                    ("Acme".to_string(), 0.6),
                    ("Globex".to_string(), 0.9),
                    ("Initech".to_string(), 0.3),
                ]),
                fail_for: HashSet::new(),
            }),
            persona: Arc::new(FakePersona::default()),
            intent: Arc::new(CountingIntent::default()),
            intent_scorer: Arc::new(CountingIntentScorer::default()),
            store: Arc::new(JournalStore::new(journal.clone())),
            channel: Arc::new(RecordingChannel::new(journal.clone())),
            journal,
        }
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            discovery: self.discovery.clone(),
            enrichment: self.enrichment.clone(),
            fit_scorer: self.fit.clone(),
            persona: self.persona.clone(),
            intent: self.intent.clone(),
            intent_scorer: self.intent_scorer.clone(),
            store: self.store.clone(),
            channel: self.channel.clone(),
        }
    }

    pub fn journal(&self) -> Vec<String> {
        self.journal.lock().unwrap().clone()
    }
}

pub fn candidate(name: &str, url: &str) -> DiscoveryCandidate {
    DiscoveryCandidate {
        name: Some(name.to_string()),
        url: Some(url.to_string()),
        description: None,
        payload: json!({ "name": name, "url": url }),
    }
}

pub fn firmographic(id: &str, website: &str, employees: Option<u64>) -> FirmographicRecord {
    let mut payload = json!({ "id": id, "website": website });
    if let Some(n) = employees {
        payload["employees_count"] = json!(n);
    }
    FirmographicRecord::from_payload(payload)
}

pub fn icp(triggers: &[&str]) -> IcpModel {
    IcpModel {
        id: "icp-1".to_string(),
        config: IcpConfig {
            industries: vec!["Software".to_string()],
            geographies: vec!["US".to_string()],
            target_personas: vec!["VP Sales".to_string()],
            buying_triggers: triggers.iter().map(|t| t.to_string()).collect(),
            ..IcpConfig::default()
        },
    }
}
