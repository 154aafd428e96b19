//! Core data model.
//!
//! A run takes a query and an ICP, tracks progress through substeps, and
//! accumulates companies. Raw provider records are kept apart from the
//! canonical [`Company`] shape; the merger bridges the two.

pub mod company;
pub mod icp;
pub mod raw;
pub mod run;

pub use company::*;
pub use icp::*;
pub use raw::*;
pub use run::*;
