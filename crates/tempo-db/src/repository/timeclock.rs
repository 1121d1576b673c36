//! # Time Clock Repository
//!
//! Persistence for the one-row-per-(employee, date) punch records.
//!
//! ## Write Paths
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  clock-in            insert()           UNIQUE(employee_id, date)       │
//! │                                         loses race → UniqueViolation    │
//! │                                                                         │
//! │  later punches       update()           single-row UPDATE by id         │
//! │                                                                         │
//! │  clock-out           finalize()         one transaction:                │
//! │                        record write-back + auto ledger entry inserts    │
//! │                      partial failure rolls both back                    │
//! │                                                                         │
//! │  admin correction    apply_correction() one transaction:                │
//! │                        1. UPDATE the record (punches + derived totals)  │
//! │                        2. reject still-pending auto ledger entries      │
//! │                        3. insert fresh pending entries                  │
//! │                      partial failure rolls all three back               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use sqlx::{FromRow, Sqlite, SqlitePool, Transaction};
use tracing::debug;

use crate::error::{DbError, DbResult};
use tempo_core::{HourBankRecord, Minutes, TimeClockRecord};

/// Repository for time-clock record operations.
#[derive(Debug, Clone)]
pub struct TimeClockRepository {
    pool: SqlitePool,
}

#[derive(Debug, FromRow)]
struct TimeClockRow {
    id: String,
    employee_id: String,
    date: NaiveDate,
    entry_time: Option<NaiveDateTime>,
    lunch_exit_time: Option<NaiveDateTime>,
    lunch_return_time: Option<NaiveDateTime>,
    exit_time: Option<NaiveDateTime>,
    late_minutes: i64,
    lunch_late_minutes: i64,
    worked_minutes: Option<i64>,
    scheduled_minutes: Option<i64>,
    overtime_minutes: Option<i64>,
    negative_minutes: Option<i64>,
    hour_bank_credit_id: Option<String>,
    hour_bank_debit_id: Option<String>,
    justification_id: Option<String>,
    justification: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<TimeClockRow> for TimeClockRecord {
    fn from(row: TimeClockRow) -> Self {
        TimeClockRecord {
            id: row.id,
            employee_id: row.employee_id,
            date: row.date,
            entry_time: row.entry_time,
            lunch_exit_time: row.lunch_exit_time,
            lunch_return_time: row.lunch_return_time,
            exit_time: row.exit_time,
            late_minutes: Minutes::new(row.late_minutes),
            lunch_late_minutes: Minutes::new(row.lunch_late_minutes),
            worked_minutes: row.worked_minutes.map(Minutes::new),
            scheduled_minutes: row.scheduled_minutes.map(Minutes::new),
            overtime_minutes: row.overtime_minutes.map(Minutes::new),
            negative_minutes: row.negative_minutes.map(Minutes::new),
            hour_bank_credit_id: row.hour_bank_credit_id,
            hour_bank_debit_id: row.hour_bank_debit_id,
            justification_id: row.justification_id,
            justification: row.justification,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const SELECT_RECORD: &str = r#"
    SELECT id, employee_id, date,
           entry_time, lunch_exit_time, lunch_return_time, exit_time,
           late_minutes, lunch_late_minutes,
           worked_minutes, scheduled_minutes, overtime_minutes, negative_minutes,
           hour_bank_credit_id, hour_bank_debit_id,
           justification_id, justification,
           created_at, updated_at
    FROM time_clock_records
"#;

impl TimeClockRepository {
    /// Creates a new TimeClockRepository.
    pub fn new(pool: SqlitePool) -> Self {
        TimeClockRepository { pool }
    }

    /// Inserts a freshly-opened record.
    ///
    /// The `UNIQUE(employee_id, date)` business key makes the loser of a
    /// concurrent clock-in race fail here with [`DbError::UniqueViolation`]
    /// instead of creating a second row.
    pub async fn insert(&self, record: &TimeClockRecord) -> DbResult<()> {
        debug!(
            id = %record.id,
            employee_id = %record.employee_id,
            date = %record.date,
            "inserting time clock record"
        );

        sqlx::query(
            r#"
            INSERT INTO time_clock_records (
                id, employee_id, date,
                entry_time, lunch_exit_time, lunch_return_time, exit_time,
                late_minutes, lunch_late_minutes,
                worked_minutes, scheduled_minutes, overtime_minutes, negative_minutes,
                hour_bank_credit_id, hour_bank_debit_id,
                justification_id, justification,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)
            "#,
        )
        .bind(&record.id)
        .bind(&record.employee_id)
        .bind(record.date)
        .bind(record.entry_time)
        .bind(record.lunch_exit_time)
        .bind(record.lunch_return_time)
        .bind(record.exit_time)
        .bind(record.late_minutes.minutes())
        .bind(record.lunch_late_minutes.minutes())
        .bind(record.worked_minutes.map(|m| m.minutes()))
        .bind(record.scheduled_minutes.map(|m| m.minutes()))
        .bind(record.overtime_minutes.map(|m| m.minutes()))
        .bind(record.negative_minutes.map(|m| m.minutes()))
        .bind(&record.hour_bank_credit_id)
        .bind(&record.hour_bank_debit_id)
        .bind(&record.justification_id)
        .bind(&record.justification)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets a record by ID.
    pub async fn find_by_id(&self, id: &str) -> DbResult<Option<TimeClockRecord>> {
        let row: Option<TimeClockRow> = sqlx::query_as(&format!("{SELECT_RECORD} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    /// Gets the record for the business key (employee, date), if any.
    pub async fn find_by_employee_date(
        &self,
        employee_id: &str,
        date: NaiveDate,
    ) -> DbResult<Option<TimeClockRecord>> {
        let row: Option<TimeClockRow> =
            sqlx::query_as(&format!("{SELECT_RECORD} WHERE employee_id = ?1 AND date = ?2"))
                .bind(employee_id)
                .bind(date)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(Into::into))
    }

    /// Lists an employee's records within an inclusive date range, newest
    /// first.
    pub async fn list_for_employee(
        &self,
        employee_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> DbResult<Vec<TimeClockRecord>> {
        let rows: Vec<TimeClockRow> = sqlx::query_as(&format!(
            "{SELECT_RECORD} WHERE employee_id = ?1 AND date BETWEEN ?2 AND ?3 ORDER BY date DESC"
        ))
        .bind(employee_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Writes back the mutable columns of an existing record (punches,
    /// derived totals, ledger backrefs, justification).
    pub async fn update(&self, record: &TimeClockRecord) -> DbResult<()> {
        debug!(id = %record.id, "updating time clock record");

        let result = bind_update(record).execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("TimeClockRecord", &record.id));
        }
        Ok(())
    }

    /// Finalizes a clock-out atomically: the record write-back and the
    /// auto-generated ledger entries commit together, so a failure mid-way
    /// never leaves ledger rows whose record still shows no exit punch.
    ///
    /// A unique-index loss on an entry rolls the whole finalization back
    /// and surfaces as [`DbError::UniqueViolation`]; the caller adopts the
    /// entries the winning writer committed.
    pub async fn finalize(
        &self,
        record: &TimeClockRecord,
        new_entries: &[HourBankRecord],
    ) -> DbResult<()> {
        debug!(
            id = %record.id,
            inserted = new_entries.len(),
            "finalizing time clock record"
        );

        let mut tx: Transaction<'_, Sqlite> = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        let result = bind_update(record).execute(&mut *tx).await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("TimeClockRecord", &record.id));
        }

        for entry in new_entries {
            insert_entry(&mut tx, entry).await?;
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        Ok(())
    }

    /// Applies an administrative correction atomically.
    ///
    /// In one transaction:
    /// 1. the corrected record (punches and recomputed totals) is written,
    /// 2. the listed auto-generated ledger entries are rejected as
    ///    superseded, touching only rows still `pending`,
    /// 3. the replacement pending entries are inserted.
    ///
    /// Any failure rolls the whole correction back.
    pub async fn apply_correction(
        &self,
        record: &TimeClockRecord,
        superseded_entry_ids: &[String],
        rejected_by: &str,
        new_entries: &[HourBankRecord],
    ) -> DbResult<()> {
        debug!(
            id = %record.id,
            superseded = superseded_entry_ids.len(),
            inserted = new_entries.len(),
            "applying time clock correction"
        );

        let mut tx: Transaction<'_, Sqlite> = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        let result = bind_update(record).execute(&mut *tx).await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("TimeClockRecord", &record.id));
        }

        let now = Utc::now();
        for entry_id in superseded_entry_ids {
            // Approved entries are left alone; the guard keeps a concurrent
            // approval from being silently overwritten.
            sqlx::query(
                r#"
                UPDATE hour_bank_records
                SET status = 'rejected', rejected_by = ?2, rejected_at = ?3
                WHERE id = ?1 AND status = 'pending'
                "#,
            )
            .bind(entry_id)
            .bind(rejected_by)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        for entry in new_entries {
            insert_entry(&mut tx, entry).await?;
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        Ok(())
    }
}

/// Ledger entry insert shared by the finalization and correction
/// transactions.
async fn insert_entry(tx: &mut Transaction<'_, Sqlite>, entry: &HourBankRecord) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO hour_bank_records (
            id, employee_id, date, entry_type, minutes, reason, status,
            created_by, approved_by, approved_at, rejected_by, rejected_at,
            overtime_request_id, time_clock_record_id, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
        "#,
    )
    .bind(&entry.id)
    .bind(&entry.employee_id)
    .bind(entry.date)
    .bind(entry.entry_type)
    .bind(entry.minutes.minutes())
    .bind(&entry.reason)
    .bind(entry.status)
    .bind(&entry.created_by)
    .bind(&entry.approved_by)
    .bind(entry.approved_at)
    .bind(&entry.rejected_by)
    .bind(entry.rejected_at)
    .bind(&entry.overtime_request_id)
    .bind(&entry.time_clock_record_id)
    .bind(entry.created_at)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// Shared UPDATE used by the plain write-back, the finalization and the
/// correction transactions.
fn bind_update(
    record: &TimeClockRecord,
) -> sqlx::query::Query<'_, Sqlite, sqlx::sqlite::SqliteArguments<'_>> {
    sqlx::query(
        r#"
        UPDATE time_clock_records SET
            entry_time = ?2,
            lunch_exit_time = ?3,
            lunch_return_time = ?4,
            exit_time = ?5,
            late_minutes = ?6,
            lunch_late_minutes = ?7,
            worked_minutes = ?8,
            scheduled_minutes = ?9,
            overtime_minutes = ?10,
            negative_minutes = ?11,
            hour_bank_credit_id = ?12,
            hour_bank_debit_id = ?13,
            justification_id = ?14,
            justification = ?15,
            updated_at = ?16
        WHERE id = ?1
        "#,
    )
    .bind(&record.id)
    .bind(record.entry_time)
    .bind(record.lunch_exit_time)
    .bind(record.lunch_return_time)
    .bind(record.exit_time)
    .bind(record.late_minutes.minutes())
    .bind(record.lunch_late_minutes.minutes())
    .bind(record.worked_minutes.map(|m| m.minutes()))
    .bind(record.scheduled_minutes.map(|m| m.minutes()))
    .bind(record.overtime_minutes.map(|m| m.minutes()))
    .bind(record.negative_minutes.map(|m| m.minutes()))
    .bind(&record.hour_bank_credit_id)
    .bind(&record.hour_bank_debit_id)
    .bind(&record.justification_id)
    .bind(&record.justification)
    .bind(record.updated_at)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::NaiveTime;
    use tempo_core::{DaySchedule, Employee, LedgerEntryType, RecordStatus, Role, WorkSchedule};

    async fn test_db() -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.employees().insert(&employee("emp-1")).await.unwrap();
        db
    }

    fn employee(id: &str) -> Employee {
        let now = Utc::now();
        Employee {
            id: id.to_string(),
            name: "Ana Souza".to_string(),
            email: format!("{id}@example.com"),
            role: Role::Employee,
            department: "engineering".to_string(),
            overtime_limit: None,
            overtime_exceptions: Vec::new(),
            schedule: WorkSchedule::empty(),
            lunch_break: Minutes::new(60),
            late_tolerance: Minutes::new(10),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn record(id: &str, date: &str) -> TimeClockRecord {
        let now = Utc::now();
        let date: NaiveDate = date.parse().unwrap();
        TimeClockRecord {
            id: id.to_string(),
            employee_id: "emp-1".to_string(),
            date,
            entry_time: Some(date.and_time(NaiveTime::from_hms_opt(9, 0, 0).unwrap())),
            lunch_exit_time: None,
            lunch_return_time: None,
            exit_time: None,
            late_minutes: Minutes::zero(),
            lunch_late_minutes: Minutes::zero(),
            worked_minutes: None,
            scheduled_minutes: None,
            overtime_minutes: None,
            negative_minutes: None,
            hour_bank_credit_id: None,
            hour_bank_debit_id: None,
            justification_id: None,
            justification: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_insert_and_find() {
        let db = test_db().await;
        let repo = db.time_clock();

        repo.insert(&record("rec-1", "2026-08-24")).await.unwrap();

        let found = repo.find_by_id("rec-1").await.unwrap().unwrap();
        assert_eq!(found.employee_id, "emp-1");
        assert!(found.entry_time.is_some());
        assert!(found.exit_time.is_none());

        let by_key = repo
            .find_by_employee_date("emp-1", "2026-08-24".parse().unwrap())
            .await
            .unwrap();
        assert!(by_key.is_some());
    }

    #[tokio::test]
    async fn test_duplicate_day_hits_unique_constraint() {
        let db = test_db().await;
        let repo = db.time_clock();

        repo.insert(&record("rec-1", "2026-08-24")).await.unwrap();
        let err = repo.insert(&record("rec-2", "2026-08-24")).await.unwrap_err();

        assert!(err.is_unique_violation_on("time_clock_records.employee_id"));
    }

    #[tokio::test]
    async fn test_update_writes_derived_totals() {
        let db = test_db().await;
        let repo = db.time_clock();
        repo.insert(&record("rec-1", "2026-08-24")).await.unwrap();

        let mut updated = repo.find_by_id("rec-1").await.unwrap().unwrap();
        updated.exit_time = updated.entry_time.map(|t| t + chrono::Duration::hours(9));
        updated.worked_minutes = Some(Minutes::new(480));
        updated.scheduled_minutes = Some(Minutes::new(480));
        updated.overtime_minutes = Some(Minutes::zero());
        updated.negative_minutes = Some(Minutes::zero());
        repo.update(&updated).await.unwrap();

        let found = repo.find_by_id("rec-1").await.unwrap().unwrap();
        assert_eq!(found.worked_minutes, Some(Minutes::new(480)));
        assert!(found.exit_time.is_some());
    }

    #[tokio::test]
    async fn test_list_range_newest_first() {
        let db = test_db().await;
        let repo = db.time_clock();
        repo.insert(&record("rec-1", "2026-08-24")).await.unwrap();
        repo.insert(&record("rec-2", "2026-08-25")).await.unwrap();
        repo.insert(&record("rec-3", "2026-09-01")).await.unwrap();

        let august = repo
            .list_for_employee(
                "emp-1",
                "2026-08-01".parse().unwrap(),
                "2026-08-31".parse().unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(august.len(), 2);
        assert_eq!(august[0].id, "rec-2");
    }

    #[tokio::test]
    async fn test_finalize_commits_record_and_entries_atomically() {
        let db = test_db().await;
        let repo = db.time_clock();

        let mut rec = record("rec-1", "2026-08-24");
        repo.insert(&rec).await.unwrap();

        // a live auto credit for the record already exists
        let now = Utc::now();
        let mut existing = HourBankRecord {
            id: "hb-live".to_string(),
            employee_id: "emp-1".to_string(),
            date: rec.date,
            entry_type: LedgerEntryType::Credit,
            minutes: Minutes::new(30),
            reason: "overtime on 2026-08-24".to_string(),
            status: RecordStatus::Pending,
            created_by: "emp-1".to_string(),
            approved_by: None,
            approved_at: None,
            rejected_by: None,
            rejected_at: None,
            overtime_request_id: None,
            time_clock_record_id: Some(rec.id.clone()),
            created_at: now,
        };
        db.hour_bank().insert(&existing).await.unwrap();

        rec.exit_time = rec.entry_time.map(|t| t + chrono::Duration::hours(10));
        rec.worked_minutes = Some(Minutes::new(540));
        let ours = HourBankRecord {
            id: "hb-ours".to_string(),
            minutes: Minutes::new(60),
            ..existing.clone()
        };

        // the colliding entry rolls the record write-back back with it
        let err = repo.finalize(&rec, &[ours.clone()]).await.unwrap_err();
        assert!(err.is_unique_violation_on("hour_bank_records.time_clock_record_id"));
        let stored = repo.find_by_id("rec-1").await.unwrap().unwrap();
        assert!(stored.exit_time.is_none());
        assert!(stored.worked_minutes.is_none());

        // with the collision gone both commit together
        existing.reject("adm-1", now).unwrap();
        assert!(db.hour_bank().set_status(&existing).await.unwrap());
        repo.finalize(&rec, &[ours]).await.unwrap();

        let stored = repo.find_by_id("rec-1").await.unwrap().unwrap();
        assert!(stored.exit_time.is_some());
        assert_eq!(stored.worked_minutes, Some(Minutes::new(540)));
        let entry = db.hour_bank().find_by_id("hb-ours").await.unwrap().unwrap();
        assert_eq!(entry.minutes, Minutes::new(60));
    }

    #[tokio::test]
    async fn test_correction_rejects_pending_and_inserts_replacements() {
        let db = test_db().await;
        let repo = db.time_clock();

        let mut rec = record("rec-1", "2026-08-24");
        rec.exit_time = rec.entry_time.map(|t| t + chrono::Duration::hours(10));
        repo.insert(&rec).await.unwrap();

        // stale auto credit awaiting approval
        let now = Utc::now();
        let stale = HourBankRecord {
            id: "hb-stale".to_string(),
            employee_id: "emp-1".to_string(),
            date: rec.date,
            entry_type: LedgerEntryType::Credit,
            minutes: Minutes::new(120),
            reason: "overtime on 2026-08-24".to_string(),
            status: RecordStatus::Pending,
            created_by: "emp-1".to_string(),
            approved_by: None,
            approved_at: None,
            rejected_by: None,
            rejected_at: None,
            overtime_request_id: None,
            time_clock_record_id: Some(rec.id.clone()),
            created_at: now,
        };
        db.hour_bank().insert(&stale).await.unwrap();

        let replacement = HourBankRecord {
            id: "hb-new".to_string(),
            minutes: Minutes::new(30),
            ..stale.clone()
        };

        rec.worked_minutes = Some(Minutes::new(510));
        rec.overtime_minutes = Some(Minutes::new(30));
        rec.hour_bank_credit_id = Some("hb-new".to_string());
        repo.apply_correction(&rec, &["hb-stale".to_string()], "admin-1", &[replacement])
            .await
            .unwrap();

        let stale = db.hour_bank().find_by_id("hb-stale").await.unwrap().unwrap();
        assert_eq!(stale.status, RecordStatus::Rejected);
        assert_eq!(stale.rejected_by.as_deref(), Some("admin-1"));

        let fresh = db.hour_bank().find_by_id("hb-new").await.unwrap().unwrap();
        assert_eq!(fresh.status, RecordStatus::Pending);
        assert_eq!(fresh.minutes, Minutes::new(30));
    }
}
