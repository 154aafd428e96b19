//! Typed configuration.
//!
//! Process configuration comes from environment variables and is loaded once
//! at startup. Workflow tuning lives in an optional TOML file; every setting
//! has a default.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

#[derive(Debug)]
pub struct Config {
    pub database_url: SecretString,
    pub otel_endpoint: Option<String>,
    pub log_level: String,
    /// Path to a `WorkflowSettings` TOML file.
    pub settings_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// In local dev, call `dotenvy::dotenv().ok()` before this.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            database_url: SecretString::from(required_var("DATABASE_URL")?),
            otel_endpoint: std::env::var("OTEL_ENDPOINT").ok(),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            settings_path: settings_path_from_env(),
        })
    }

    /// Workflow settings from `settings_path`, or defaults when unset.
    pub fn workflow_settings(&self) -> Result<WorkflowSettings> {
        WorkflowSettings::load_or_default(self.settings_path.as_deref())
    }
}

/// `PROSPECTOR_SETTINGS`, if set. Readable without the rest of [`Config`].
pub fn settings_path_from_env() -> Option<PathBuf> {
    std::env::var("PROSPECTOR_SETTINGS").ok().map(PathBuf::from)
}

fn required_var(name: &str) -> Result<String> {
    std::env::var(name)
        .map_err(|_| Error::Config(format!("required environment variable {name} is not set")))
}

/// Knobs for a workflow run.
///
/// Concurrency bounds apply to rate-limited provider stages only; local
/// stages always run eagerly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowSettings {
    /// How many candidates to ask discovery for.
    pub discovery_count_hint: usize,
    /// Concurrent employee lookups.
    pub persona_concurrency: usize,
    /// Concurrent intent detections.
    pub intent_concurrency: usize,
    /// Upper bound on contacts fetched per company.
    pub employees_per_company: usize,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            discovery_count_hint: 25,
            persona_concurrency: 3,
            intent_concurrency: 3,
            employees_per_company: 5,
        }
    }
}

impl WorkflowSettings {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read settings {}: {e}", path.display()))
        })?;
        Self::from_toml(&content)
            .map_err(|e| Error::Config(format!("bad settings {}: {e}", path.display())))
    }

    /// Load from `path` when given, otherwise defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let settings: Self =
            toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.persona_concurrency == 0 || self.intent_concurrency == 0 {
            return Err(Error::Config(
                "concurrency limits must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
