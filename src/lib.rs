//! # prospector
//!
//! Turns a free-text business query plus an Ideal-Customer-Profile into a
//! ranked list of enriched company records, reporting progress as it goes.
//!
//! The [`engine`] sequences discovery, enrichment, scoring and contact
//! lookups across pluggable [`provider`]s, isolating per-company failures.
//! Progress is persisted through a [`store`] before it is published; [`db`]
//! provides the Postgres implementation.

pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod merge;
pub mod model;
pub mod provider;
pub mod store;
pub mod telemetry;
