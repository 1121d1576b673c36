//! Company-settings singleton (row id = 1). Reads lazily seed the defaults
//! so a fresh database behaves sensibly before an admin ever touches the
//! settings screen.

use sqlx::{FromRow, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use tempo_core::{CompanySettings, LatenessPolicy, Minutes};

/// Repository for the company settings singleton.
#[derive(Debug, Clone)]
pub struct SettingsRepository {
    pool: SqlitePool,
}

#[derive(Debug, FromRow)]
struct SettingsRow {
    default_overtime_limit_minutes: i64,
    default_accumulation_limit_minutes: i64,
    default_usage_limit_minutes: i64,
    late_policy: LatenessPolicy,
}

impl From<SettingsRow> for CompanySettings {
    fn from(row: SettingsRow) -> Self {
        CompanySettings {
            default_overtime_limit: Minutes::new(row.default_overtime_limit_minutes),
            default_accumulation_limit: Minutes::new(row.default_accumulation_limit_minutes),
            default_usage_limit: Minutes::new(row.default_usage_limit_minutes),
            late_policy: row.late_policy,
        }
    }
}

impl SettingsRepository {
    /// Creates a new SettingsRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SettingsRepository { pool }
    }

    /// Gets the settings, seeding the defaults on first access.
    pub async fn get_or_create(&self) -> DbResult<CompanySettings> {
        let row: Option<SettingsRow> = sqlx::query_as(
            r#"
            SELECT default_overtime_limit_minutes,
                   default_accumulation_limit_minutes,
                   default_usage_limit_minutes,
                   late_policy
            FROM company_settings WHERE id = 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(row.into()),
            None => {
                let defaults = CompanySettings::default();
                self.update(&defaults).await?;
                Ok(defaults)
            }
        }
    }

    /// Writes the settings (insert or overwrite the singleton row).
    pub async fn update(&self, settings: &CompanySettings) -> DbResult<()> {
        debug!("updating company settings");

        sqlx::query(
            r#"
            INSERT INTO company_settings (
                id, default_overtime_limit_minutes, default_accumulation_limit_minutes,
                default_usage_limit_minutes, late_policy, updated_at
            ) VALUES (1, ?1, ?2, ?3, ?4, ?5)
            ON CONFLICT (id) DO UPDATE SET
                default_overtime_limit_minutes = excluded.default_overtime_limit_minutes,
                default_accumulation_limit_minutes = excluded.default_accumulation_limit_minutes,
                default_usage_limit_minutes = excluded.default_usage_limit_minutes,
                late_policy = excluded.late_policy,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(settings.default_overtime_limit.minutes())
        .bind(settings.default_accumulation_limit.minutes())
        .bind(settings.default_usage_limit.minutes())
        .bind(settings.late_policy)
        .bind(chrono::Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    #[tokio::test]
    async fn test_first_read_seeds_defaults() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.settings();

        let settings = repo.get_or_create().await.unwrap();
        assert_eq!(settings, CompanySettings::default());

        // second read comes from the stored row
        let again = repo.get_or_create().await.unwrap();
        assert_eq!(again, settings);
    }

    #[tokio::test]
    async fn test_update_overwrites_singleton() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.settings();

        let mut settings = repo.get_or_create().await.unwrap();
        settings.default_accumulation_limit = Minutes::from_whole_hours(80);
        settings.late_policy = LatenessPolicy::RequireJustification;
        repo.update(&settings).await.unwrap();

        let stored = repo.get_or_create().await.unwrap();
        assert_eq!(stored.default_accumulation_limit, Minutes::from_whole_hours(80));
        assert_eq!(stored.late_policy, LatenessPolicy::RequireJustification);
    }
}
