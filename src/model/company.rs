//! The canonical company record and its scoring/contact attachments.
//!
//! Every field a provider may not know is an explicit `Option`. Composite
//! sub-objects (location, contact, social) are either fully absent or carry at
//! least one populated field; see [`collapse`].

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Company
// ---------------------------------------------------------------------------

/// One business record moving through the pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Company {
    pub name: String,
    /// Host parsed from `website`, without `www.`. Empty when unknown.
    pub domain: String,
    pub website: Option<String>,
    pub logo: Option<String>,

    pub description: Option<String>,
    pub industry: Option<String>,
    pub business_model: Option<BusinessModel>,
    pub target_market: Option<TargetMarket>,
    pub founded_year: Option<i32>,

    pub location: Option<Location>,
    pub contact: Option<Contact>,
    pub social: Option<Social>,

    pub employee_count: Option<u64>,
    pub revenue: Option<String>,
    pub funding_stage: Option<FundingStage>,
    pub total_funding: Option<f64>,

    #[serde(default)]
    pub technologies: Vec<String>,
    #[serde(default)]
    pub customers: Vec<String>,
    #[serde(default)]
    pub partners: Vec<String>,
    #[serde(default)]
    pub competitors: Vec<String>,

    #[serde(default)]
    pub scoring_metrics: ScoringMetrics,

    /// Provider key used for employee lookups.
    pub enrichment_id: Option<String>,

    /// Detected buying intent, input to intent scoring.
    pub intent: Option<IntentSignal>,

    /// Verbatim provider payload, kept for traceability.
    pub raw_enrichment: Option<serde_json::Value>,

    /// Contacts found during persona enrichment. Transient: stripped before
    /// the company is handed to persistence.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub employees: Vec<Employee>,
}

impl Company {
    /// Overlay a freshly merged record onto this one.
    ///
    /// Populated fields of `enriched` win; absent ones keep what is already
    /// known. Scoring metrics, intent and contacts are owned by later stages
    /// and are left untouched.
    pub fn absorb(&mut self, enriched: Company) {
        let Company {
            name,
            domain,
            website,
            logo,
            description,
            industry,
            business_model,
            target_market,
            founded_year,
            location,
            contact,
            social,
            employee_count,
            revenue,
            funding_stage,
            total_funding,
            technologies,
            customers,
            partners,
            competitors,
            enrichment_id,
            raw_enrichment,
            scoring_metrics: _,
            intent: _,
            employees: _,
        } = enriched;

        if !name.is_empty() {
            self.name = name;
        }
        if !domain.is_empty() {
            self.domain = domain;
        }
        overlay(&mut self.website, website);
        overlay(&mut self.logo, logo);
        overlay(&mut self.description, description);
        overlay(&mut self.industry, industry);
        overlay(&mut self.business_model, business_model);
        overlay(&mut self.target_market, target_market);
        overlay(&mut self.founded_year, founded_year);
        overlay(&mut self.location, location);
        overlay(&mut self.contact, contact);
        overlay(&mut self.social, social);
        overlay(&mut self.employee_count, employee_count);
        overlay(&mut self.revenue, revenue);
        overlay(&mut self.funding_stage, funding_stage);
        overlay(&mut self.total_funding, total_funding);
        overlay_list(&mut self.technologies, technologies);
        overlay_list(&mut self.customers, customers);
        overlay_list(&mut self.partners, partners);
        overlay_list(&mut self.competitors, competitors);
        overlay(&mut self.enrichment_id, enrichment_id);
        overlay(&mut self.raw_enrichment, raw_enrichment);
    }

    /// Copy suitable for persistence: transient fields removed.
    pub fn without_transient(&self) -> Company {
        Company {
            employees: Vec::new(),
            ..self.clone()
        }
    }

    pub fn fit_score(&self) -> Option<f64> {
        self.scoring_metrics.fit_score.as_ref().map(|f| f.score)
    }

    pub fn intent_score(&self) -> Option<f64> {
        self.scoring_metrics.intent_score.as_ref().map(|i| i.score)
    }
}

fn overlay<T>(slot: &mut Option<T>, incoming: Option<T>) {
    if incoming.is_some() {
        *slot = incoming;
    }
}

fn overlay_list(slot: &mut Vec<String>, incoming: Vec<String>) {
    if !incoming.is_empty() {
        *slot = incoming;
    }
}

// ---------------------------------------------------------------------------
// Classifications
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BusinessModel {
    B2B,
    B2C,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetMarket {
    #[serde(rename = "SMB")]
    Smb,
    #[serde(rename = "Mid-Market")]
    MidMarket,
    Enterprise,
}

impl TargetMarket {
    /// Bucket a headcount: under 50 is SMB, under 500 Mid-Market.
    pub fn from_employee_count(count: u64) -> Self {
        match count {
            0..50 => TargetMarket::Smb,
            50..500 => TargetMarket::MidMarket,
            _ => TargetMarket::Enterprise,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FundingStage {
    Public,
    Seed,
    #[serde(rename = "Series A")]
    SeriesA,
    #[serde(rename = "Series B")]
    SeriesB,
    #[serde(rename = "Series C")]
    SeriesC,
    Bootstrapped,
}

impl std::fmt::Display for FundingStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FundingStage::Public => "Public",
            FundingStage::Seed => "Seed",
            FundingStage::SeriesA => "Series A",
            FundingStage::SeriesB => "Series B",
            FundingStage::SeriesC => "Series C",
            FundingStage::Bootstrapped => "Bootstrapped",
        };
        write!(f, "{s}")
    }
}

// ---------------------------------------------------------------------------
// Composite sub-objects
// ---------------------------------------------------------------------------

/// A sub-object that may turn out to carry nothing at all.
pub trait Composite: Sized {
    /// True when every inner field is absent.
    fn is_vacant(&self) -> bool;
}

/// Collapse a composite to `None` when every inner field is absent, so
/// consumers test presence once.
pub fn collapse<T: Composite>(value: T) -> Option<T> {
    if value.is_vacant() { None } else { Some(value) }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub address: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
}

impl Composite for Location {
    fn is_vacant(&self) -> bool {
        self.address.is_none()
            && self.city.is_none()
            && self.region.is_none()
            && self.country.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl Composite for Contact {
    fn is_vacant(&self) -> bool {
        self.email.is_none() && self.phone.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Social {
    pub linkedin: Option<String>,
    pub twitter: Option<String>,
    pub facebook: Option<String>,
}

impl Composite for Social {
    fn is_vacant(&self) -> bool {
        self.linkedin.is_none() && self.twitter.is_none() && self.facebook.is_none()
    }
}

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

/// Scores accumulated across stages. Each stage sets its own slot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoringMetrics {
    pub fit_score: Option<FitScore>,
    pub intent_score: Option<IntentScore>,
}

impl ScoringMetrics {
    /// Merge another set of metrics in; populated slots of `other` win.
    pub fn merge(&mut self, other: ScoringMetrics) {
        overlay(&mut self.fit_score, other.fit_score);
        overlay(&mut self.intent_score, other.intent_score);
    }
}

/// ICP fit as judged by a [`FitScorer`](crate::provider::FitScorer).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitScore {
    pub score: f64,
    pub reasoning: String,
    /// Provider-specific breakdown.
    #[serde(default)]
    pub details: serde_json::Value,
}

/// Buying-intent evidence returned by an intent provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentSignal {
    pub summary: String,
    #[serde(default)]
    pub evidence: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentScore {
    pub score: f64,
    #[serde(default)]
    pub details: serde_json::Value,
}

// ---------------------------------------------------------------------------
// Contacts
// ---------------------------------------------------------------------------

/// Lightweight handle returned by an employee search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeRef {
    pub id: String,
    pub name: Option<String>,
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    pub id: String,
    pub name: String,
    pub title: Option<String>,
    pub email: Option<String>,
    pub linkedin: Option<String>,
    /// Verbatim provider payload.
    #[serde(default)]
    pub raw: serde_json::Value,
}

impl From<EmployeeRef> for Employee {
    /// Placeholder record until full contact details are collected.
    fn from(r: EmployeeRef) -> Self {
        Self {
            id: r.id,
            name: r.name.unwrap_or_default(),
            title: r.title,
            email: None,
            linkedin: None,
            raw: serde_json::Value::Null,
        }
    }
}

impl From<&Employee> for EmployeeRef {
    fn from(e: &Employee) -> Self {
        Self {
            id: e.id.clone(),
            name: (!e.name.is_empty()).then(|| e.name.clone()),
            title: e.title.clone(),
        }
    }
}
