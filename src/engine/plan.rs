//! The fixed phase plan. Data, not code: the orchestrator walks it by id.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::model::{Substep, SubstepStatus};

/// Static definition of one substep.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SubstepDef {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub category: &'static str,
    pub priority: i32,
    pub tools: &'static [&'static str],
}

impl SubstepDef {
    /// A fresh, pending substep.
    pub fn seed(&self) -> Substep {
        Substep {
            id: self.id.to_string(),
            name: self.name.to_string(),
            description: self.description.to_string(),
            category: self.category.to_string(),
            priority: self.priority,
            tools: self.tools.iter().map(|t| t.to_string()).collect::<BTreeSet<_>>(),
            status: SubstepStatus::Pending,
            message: String::new(),
            started_at: None,
            completed_at: None,
        }
    }
}

pub const QUERY_ANALYSIS: &str = "1.1";
pub const DISCOVERY: &str = "1.2";
pub const VALIDATION: &str = "1.3";
pub const FIRMOGRAPHICS: &str = "2.1";
pub const FIT_SCORING: &str = "2.2";
pub const RANKING: &str = "2.3";
pub const PERSONA_SEARCH: &str = "3.1";
pub const CONTACT_COLLECTION: &str = "3.2";
pub const INTENT_DETECTION: &str = "4.1";
pub const INTENT_SCORING: &str = "4.2";
pub const PERSIST: &str = "4.3";

pub const PHASE_PLAN: &[SubstepDef] = &[
    SubstepDef {
        id: QUERY_ANALYSIS,
        name: "Query analysis",
        description: "Combine the query with the ICP's hard filters",
        category: "discovery",
        priority: 1,
        tools: &["icp"],
    },
    SubstepDef {
        id: DISCOVERY,
        name: "Company discovery",
        description: "Search for companies matching the query",
        category: "discovery",
        priority: 1,
        tools: &["search"],
    },
    SubstepDef {
        id: VALIDATION,
        name: "Candidate validation",
        description: "Normalize candidates and drop duplicates",
        category: "discovery",
        priority: 2,
        tools: &["merge"],
    },
    SubstepDef {
        id: FIRMOGRAPHICS,
        name: "Firmographic enrichment",
        description: "Look up size, funding and location for each company",
        category: "enrichment",
        priority: 1,
        tools: &["enrichment"],
    },
    SubstepDef {
        id: FIT_SCORING,
        name: "ICP fit scoring",
        description: "Score each company against the ICP",
        category: "scoring",
        priority: 1,
        tools: &["fit-scorer"],
    },
    SubstepDef {
        id: RANKING,
        name: "Ranking & reasoning",
        description: "Order companies by fit and keep the scorer's reasoning",
        category: "scoring",
        priority: 2,
        tools: &["ranking"],
    },
    SubstepDef {
        id: PERSONA_SEARCH,
        name: "Persona search",
        description: "Find people matching the target personas",
        category: "contacts",
        priority: 2,
        tools: &["persona"],
    },
    SubstepDef {
        id: CONTACT_COLLECTION,
        name: "Contact collection",
        description: "Fetch full contact records for matched people",
        category: "contacts",
        priority: 2,
        tools: &["persona"],
    },
    SubstepDef {
        id: INTENT_DETECTION,
        name: "Intent detection",
        description: "Look for the ICP's buying triggers",
        category: "intent",
        priority: 3,
        tools: &["intent"],
    },
    SubstepDef {
        id: INTENT_SCORING,
        name: "Intent scoring",
        description: "Score detected buying intent",
        category: "intent",
        priority: 3,
        tools: &["intent-scorer"],
    },
    SubstepDef {
        id: PERSIST,
        name: "Persist & summarize",
        description: "Save results and summarize the run",
        category: "persistence",
        priority: 1,
        tools: &["store"],
    },
];

/// Seed every substep of a plan as pending, in order.
pub fn seed(plan: &[SubstepDef]) -> Vec<Substep> {
    plan.iter().map(SubstepDef::seed).collect()
}
