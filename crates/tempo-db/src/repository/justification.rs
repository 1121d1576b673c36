//! Justification catalog. Entries are soft-deleted (`is_active = 0`) so a
//! reference from an old punch never dangles.

use sqlx::{FromRow, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use tempo_core::Justification;

/// Repository for the justification catalog.
#[derive(Debug, Clone)]
pub struct JustificationRepository {
    pool: SqlitePool,
}

#[derive(Debug, FromRow)]
struct JustificationRow {
    id: String,
    description: String,
    is_active: bool,
}

impl From<JustificationRow> for Justification {
    fn from(row: JustificationRow) -> Self {
        Justification {
            id: row.id,
            description: row.description,
            is_active: row.is_active,
        }
    }
}

impl JustificationRepository {
    /// Creates a new JustificationRepository.
    pub fn new(pool: SqlitePool) -> Self {
        JustificationRepository { pool }
    }

    /// Inserts a catalog entry.
    pub async fn insert(&self, justification: &Justification) -> DbResult<()> {
        debug!(id = %justification.id, "inserting justification");

        sqlx::query("INSERT INTO justifications (id, description, is_active) VALUES (?1, ?2, ?3)")
            .bind(&justification.id)
            .bind(&justification.description)
            .bind(justification.is_active)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Gets an entry by ID (active or not).
    pub async fn find_by_id(&self, id: &str) -> DbResult<Option<Justification>> {
        let row: Option<JustificationRow> =
            sqlx::query_as("SELECT id, description, is_active FROM justifications WHERE id = ?1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(Into::into))
    }

    /// Lists the active catalog, the set offered to a late employee.
    pub async fn list_active(&self) -> DbResult<Vec<Justification>> {
        let rows: Vec<JustificationRow> = sqlx::query_as(
            "SELECT id, description, is_active FROM justifications WHERE is_active = 1 ORDER BY description",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Soft-deletes an entry.
    pub async fn deactivate(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("UPDATE justifications SET is_active = 0 WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Justification", id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    #[tokio::test]
    async fn test_catalog_lifecycle() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.justifications();

        repo.insert(&Justification {
            id: "j-1".to_string(),
            description: "Medical appointment".to_string(),
            is_active: true,
        })
        .await
        .unwrap();
        repo.insert(&Justification {
            id: "j-2".to_string(),
            description: "Public transport strike".to_string(),
            is_active: true,
        })
        .await
        .unwrap();

        assert_eq!(repo.list_active().await.unwrap().len(), 2);

        repo.deactivate("j-2").await.unwrap();
        let active = repo.list_active().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, "j-1");

        // deactivated entry is still resolvable by id
        let gone = repo.find_by_id("j-2").await.unwrap().unwrap();
        assert!(!gone.is_active);

        assert!(matches!(
            repo.deactivate("missing").await,
            Err(DbError::NotFound { .. })
        ));
    }
}
