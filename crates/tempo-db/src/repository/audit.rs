//! # Audit Log Repository
//!
//! Append-only sink for business actions (punches, approvals, corrections,
//! limit changes). Writes are best-effort from the service layer: a failed
//! audit insert is logged and swallowed there, it never fails the action it
//! describes.

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{FromRow, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;

/// One audit log row.
#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub id: String,
    /// Machine-readable action name, e.g. `time_clock.correct`.
    pub action: String,
    pub entity_type: String,
    pub entity_id: String,
    /// Who performed the action.
    pub actor_id: String,
    /// Whose data was affected, when different from the actor.
    pub target_id: Option<String>,
    pub description: String,
    /// Optional JSON payload with action-specific detail.
    pub metadata: Option<Value>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct AuditRow {
    id: String,
    action: String,
    entity_type: String,
    entity_id: String,
    actor_id: String,
    target_id: Option<String>,
    description: String,
    metadata: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<AuditRow> for AuditEntry {
    fn from(row: AuditRow) -> Self {
        AuditEntry {
            id: row.id,
            action: row.action,
            entity_type: row.entity_type,
            entity_id: row.entity_id,
            actor_id: row.actor_id,
            target_id: row.target_id,
            description: row.description,
            metadata: row.metadata.and_then(|m| serde_json::from_str(&m).ok()),
            created_at: row.created_at,
        }
    }
}

impl AuditEntry {
    /// Builds an entry with a fresh UUID and the current timestamp.
    pub fn new(
        action: impl Into<String>,
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
        actor_id: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        AuditEntry {
            id: Uuid::new_v4().to_string(),
            action: action.into(),
            entity_type: entity_type.into(),
            entity_id: entity_id.into(),
            actor_id: actor_id.into(),
            target_id: None,
            description: description.into(),
            metadata: None,
            created_at: Utc::now(),
        }
    }

    /// Sets the affected employee when different from the actor.
    pub fn target(mut self, target_id: impl Into<String>) -> Self {
        self.target_id = Some(target_id.into());
        self
    }

    /// Attaches a JSON payload.
    pub fn metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Repository for audit log operations.
#[derive(Debug, Clone)]
pub struct AuditRepository {
    pool: SqlitePool,
}

impl AuditRepository {
    /// Creates a new AuditRepository.
    pub fn new(pool: SqlitePool) -> Self {
        AuditRepository { pool }
    }

    /// Appends an entry.
    pub async fn insert(&self, entry: &AuditEntry) -> DbResult<()> {
        debug!(action = %entry.action, entity_id = %entry.entity_id, "writing audit entry");

        let metadata = entry
            .metadata
            .as_ref()
            .map(|m| m.to_string());

        sqlx::query(
            r#"
            INSERT INTO audit_log (
                id, action, entity_type, entity_id, actor_id, target_id,
                description, metadata, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.action)
        .bind(&entry.entity_type)
        .bind(&entry.entity_id)
        .bind(&entry.actor_id)
        .bind(&entry.target_id)
        .bind(&entry.description)
        .bind(metadata)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Lists the entries touching one entity, newest first.
    pub async fn list_for_entity(
        &self,
        entity_type: &str,
        entity_id: &str,
    ) -> DbResult<Vec<AuditEntry>> {
        let rows: Vec<AuditRow> = sqlx::query_as(
            r#"
            SELECT id, action, entity_type, entity_id, actor_id, target_id,
                   description, metadata, created_at
            FROM audit_log
            WHERE entity_type = ?1 AND entity_id = ?2
            ORDER BY created_at DESC
            "#,
        )
        .bind(entity_type)
        .bind(entity_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use serde_json::json;

    #[tokio::test]
    async fn test_insert_and_list() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.audit();

        let entry = AuditEntry::new(
            "time_clock.correct",
            "time_clock_record",
            "rec-1",
            "admin-1",
            "corrected exit punch",
        )
        .target("emp-1")
        .metadata(json!({ "field": "exit_time" }));
        repo.insert(&entry).await.unwrap();

        repo.insert(&AuditEntry::new(
            "hour_bank.approve",
            "hour_bank_record",
            "hb-1",
            "mgr-1",
            "approved credit",
        ))
        .await
        .unwrap();

        let for_record = repo.list_for_entity("time_clock_record", "rec-1").await.unwrap();
        assert_eq!(for_record.len(), 1);
        assert_eq!(for_record[0].actor_id, "admin-1");
        assert_eq!(for_record[0].target_id.as_deref(), Some("emp-1"));
        assert_eq!(
            for_record[0].metadata.as_ref().unwrap()["field"],
            json!("exit_time")
        );
    }
}
