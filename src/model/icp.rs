//! Ideal-Customer-Profile input and the queries derived from it.

use serde::{Deserialize, Serialize};

/// Caller-supplied targeting criteria. Read-only for the engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IcpModel {
    pub id: String,
    pub config: IcpConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IcpConfig {
    #[serde(default)]
    pub industries: Vec<String>,
    #[serde(default)]
    pub geographies: Vec<String>,
    #[serde(default)]
    pub employee_range: Option<EmployeeRange>,
    #[serde(default)]
    pub target_personas: Vec<String>,
    /// Signals worth looking for during intent detection. Empty disables
    /// intent detection entirely.
    #[serde(default)]
    pub buying_triggers: Vec<String>,
    /// Anything else the caller put in the profile; passed through to scorers.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeRange {
    pub min: Option<u64>,
    pub max: Option<u64>,
}

/// Free-text query combined with the ICP's hard filters, handed to discovery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredQuery {
    pub text: String,
    pub industries: Vec<String>,
    pub geographies: Vec<String>,
    pub employee_range: Option<EmployeeRange>,
}

impl StructuredQuery {
    pub fn build(query: &str, icp: &IcpConfig) -> Self {
        Self {
            text: query.trim().to_string(),
            industries: icp.industries.clone(),
            geographies: icp.geographies.clone(),
            employee_range: icp.employee_range,
        }
    }
}

/// Filters for employee searches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonaFilters {
    pub personas: Vec<String>,
    pub limit: usize,
}
