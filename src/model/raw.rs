//! Raw provider records, one variant per provider family.
//!
//! Providers hand these to the merger, which turns any of them into a
//! [`Company`](super::Company). Adding a provider means adding a variant here
//! and an arm in the merger.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum RawRecord {
    Discovery(DiscoveryCandidate),
    Firmographic(FirmographicRecord),
}

/// A company candidate found by discovery.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryCandidate {
    pub name: Option<String>,
    /// Canonical company URL.
    pub url: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub payload: Value,
}

/// A firmographic record from an enrichment provider. Every field is
/// optional; providers fill what they know.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FirmographicRecord {
    pub id: Option<String>,
    pub name: Option<String>,
    pub website: Option<String>,
    pub logo: Option<String>,
    pub description: Option<String>,
    pub industry: Option<String>,
    pub is_b2b: Option<bool>,
    pub is_public: Option<bool>,
    pub employee_count: Option<u64>,
    pub founded_year: Option<i32>,
    pub revenue: Option<String>,
    /// Name of the latest funding round, e.g. "Series B".
    pub last_funding_round: Option<String>,
    pub total_funding: Option<f64>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub linkedin_url: Option<String>,
    pub twitter_url: Option<String>,
    pub facebook_url: Option<String>,
    #[serde(default)]
    pub technologies: Vec<String>,
    #[serde(default)]
    pub customers: Vec<String>,
    #[serde(default)]
    pub partners: Vec<String>,
    #[serde(default)]
    pub competitors: Vec<String>,
    /// The record exactly as the provider sent it.
    #[serde(default)]
    pub payload: Value,
}

impl FirmographicRecord {
    /// Read a provider payload leniently. Fields with an unexpected type are
    /// treated as absent rather than failing the whole record.
    pub fn from_payload(payload: Value) -> Self {
        let p = &payload;
        Self {
            id: text(p, &["id", "enrichment_id"]),
            name: text(p, &["name"]),
            website: text(p, &["website", "url"]),
            logo: text(p, &["logo", "logo_url"]),
            description: text(p, &["description"]),
            industry: text(p, &["industry"]),
            is_b2b: flag(p, "is_b2b"),
            is_public: flag(p, "is_public"),
            employee_count: p
                .get("employee_count")
                .or_else(|| p.get("employees_count"))
                .and_then(Value::as_u64),
            founded_year: p
                .get("founded_year")
                .or_else(|| p.get("founded"))
                .and_then(Value::as_i64)
                .and_then(|y| i32::try_from(y).ok()),
            revenue: text(p, &["revenue"]),
            last_funding_round: text(p, &["last_funding_round", "latest_funding_round"]),
            total_funding: p.get("total_funding").and_then(Value::as_f64),
            address: text(p, &["address"]),
            city: text(p, &["city"]),
            region: text(p, &["region", "state"]),
            country: text(p, &["country"]),
            email: text(p, &["email"]),
            phone: text(p, &["phone"]),
            linkedin_url: text(p, &["linkedin_url"]),
            twitter_url: text(p, &["twitter_url"]),
            facebook_url: text(p, &["facebook_url"]),
            technologies: list(p, "technologies"),
            customers: list(p, "customers"),
            partners: list(p, "partners"),
            competitors: list(p, "competitors"),
            payload,
        }
    }
}

/// First non-blank string under any of `keys`.
fn text(v: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| v.get(*k).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

fn flag(v: &Value, key: &str) -> Option<bool> {
    v.get(key).and_then(Value::as_bool)
}

fn list(v: &Value, key: &str) -> Vec<String> {
    v.get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
