//! Error types for prospector.

use thiserror::Error;

use crate::model::SubstepStatus;

#[derive(Debug, Error)]
pub enum Error {
    #[error("unknown substep: {0}")]
    UnknownSubstep(String),

    #[error("invalid transition for substep {id}: {from} -> {to}")]
    InvalidTransition {
        id: String,
        from: SubstepStatus,
        to: SubstepStatus,
    },

    /// The stage itself is broken, as opposed to one entity's provider call.
    #[error("stage {stage} failed: {reason}")]
    Stage { stage: String, reason: String },

    #[error("provider error: {0}")]
    Provider(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
