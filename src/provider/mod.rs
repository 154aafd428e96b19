//! Contracts for the external discovery, enrichment and scoring services.
//!
//! The engine only ever sees these traits. Implementations own their own
//! transport, retries and timeouts; a returned `Err` is treated as a failure
//! for the entity the call was about.

use async_trait::async_trait;

use crate::error::Result;
use crate::model::{
    Company, DiscoveryCandidate, Employee, EmployeeRef, FirmographicRecord, FitScore, IcpConfig,
    IntentScore, IntentSignal, PersonaFilters, StructuredQuery,
};

/// Finds candidate companies for a query.
#[async_trait]
pub trait DiscoveryProvider: Send + Sync {
    /// `count_hint` is how many candidates the caller would like; providers
    /// may return fewer or more.
    async fn search(
        &self,
        query: &StructuredQuery,
        count_hint: usize,
    ) -> Result<Vec<DiscoveryCandidate>>;
}

/// Looks up firmographic data by company URL.
#[async_trait]
pub trait EnrichmentProvider: Send + Sync {
    /// Best-effort: URLs the provider doesn't know are simply missing from
    /// the result.
    async fn enrich_by_urls(&self, urls: &[String]) -> Result<Vec<FirmographicRecord>>;
}

/// Judges how well a company matches the ICP.
#[async_trait]
pub trait FitScorer: Send + Sync {
    async fn score(&self, company: &Company, icp: &IcpConfig) -> Result<FitScore>;
}

/// Finds people at a company matching the target personas.
#[async_trait]
pub trait PersonaProvider: Send + Sync {
    async fn search_employees(
        &self,
        enrichment_id: &str,
        filters: &PersonaFilters,
    ) -> Result<Vec<EmployeeRef>>;

    async fn collect_employees(&self, refs: &[EmployeeRef]) -> Result<Vec<Employee>>;
}

/// Looks for buying signals about a company.
#[async_trait]
pub trait IntentProvider: Send + Sync {
    async fn detect(&self, name: &str, url: &str, triggers: &[String]) -> Result<IntentSignal>;
}

#[async_trait]
pub trait IntentScorer: Send + Sync {
    async fn score(&self, signal: &IntentSignal) -> Result<IntentScore>;
}
