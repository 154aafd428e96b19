//! Session run state and result rows.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use super::Db;
use crate::error::{Error, Result};
use crate::model::{Company, Employee, SearchStatus, Substep};
use crate::store::{PersistenceStore, RunState, RunStateUpdate};

#[async_trait]
impl PersistenceStore for Db {
    async fn save_entity(
        &self,
        session_id: &str,
        icp_model_id: &str,
        company: &Company,
    ) -> Result<String> {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO companies (id, session_id, icp_model_id, name, domain, fit_score, intent_score, data)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(id)
        .bind(session_id)
        .bind(icp_model_id)
        .bind(&company.name)
        .bind(&company.domain)
        .bind(company.fit_score())
        .bind(company.intent_score())
        .bind(serde_json::to_value(company)?)
        .execute(&self.pool)
        .await?;

        debug!(session_id, company = %company.name, entity_id = %id, "company saved");
        Ok(id.to_string())
    }

    async fn save_employees(&self, employees: &[Employee], entity_id: &str) -> Result<()> {
        let company_id = Uuid::parse_str(entity_id)
            .map_err(|e| Error::Other(format!("bad entity id {entity_id}: {e}")))?;

        let mut tx = self.pool.begin().await?;
        for employee in employees {
            sqlx::query(
                "INSERT INTO employees (id, company_id, external_id, name, title, data)
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(Uuid::new_v4())
            .bind(company_id)
            .bind(&employee.id)
            .bind(&employee.name)
            .bind(&employee.title)
            .bind(serde_json::to_value(employee)?)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn update_run_state(&self, session_id: &str, update: &RunStateUpdate) -> Result<()> {
        let status = update
            .status
            .as_ref()
            .map(serde_json::to_value)
            .transpose()?;
        let substeps: serde_json::Map<String, Value> = update
            .substeps
            .iter()
            .map(|s| -> Result<(String, Value)> { Ok((s.id.clone(), serde_json::to_value(s)?)) })
            .collect::<Result<_>>()?;

        // Substep deltas are merged into the stored object by id.
        sqlx::query(
            "INSERT INTO search_sessions (session_id, query, status, substeps, updated_at)
             VALUES ($1, $2, $3, $4, now())
             ON CONFLICT (session_id) DO UPDATE SET
                query = COALESCE(EXCLUDED.query, search_sessions.query),
                status = COALESCE(EXCLUDED.status, search_sessions.status),
                substeps = search_sessions.substeps || EXCLUDED.substeps,
                updated_at = now()",
        )
        .bind(session_id)
        .bind(&update.query)
        .bind(status)
        .bind(Value::Object(substeps))
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

impl Db {
    /// Rebuild a session's durable run state.
    pub async fn load_run_state(&self, session_id: &str) -> Result<RunState> {
        let row: Option<RunStateRow> = sqlx::query_as(
            "SELECT session_id, query, status, substeps, updated_at
             FROM search_sessions WHERE session_id = $1",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or_else(|| Error::NotFound(format!("session {session_id}")))?
            .try_into_run_state()
    }

    /// Companies saved for a session, best fit first.
    pub async fn load_companies(&self, session_id: &str) -> Result<Vec<Company>> {
        let rows: Vec<(Value,)> = sqlx::query_as(
            "SELECT data FROM companies WHERE session_id = $1
             ORDER BY fit_score DESC NULLS LAST, created_at",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(data,)| serde_json::from_value(data).map_err(Error::from))
            .collect()
    }
}

/// Internal row type for sqlx::FromRow.
#[derive(sqlx::FromRow)]
struct RunStateRow {
    session_id: String,
    query: Option<String>,
    status: Option<Value>,
    substeps: Value,
    updated_at: DateTime<Utc>,
}

impl RunStateRow {
    fn try_into_run_state(self) -> Result<RunState> {
        let status: Option<SearchStatus> = self.status.map(serde_json::from_value).transpose()?;
        let substeps: BTreeMap<String, Substep> = serde_json::from_value(self.substeps)?;
        Ok(RunState {
            session_id: self.session_id,
            query: self.query,
            status,
            substeps,
            updated_at: self.updated_at,
        })
    }
}
