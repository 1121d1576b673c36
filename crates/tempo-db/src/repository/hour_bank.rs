//! # Hour Bank Repository
//!
//! Persistence for the append-only compensatory-time ledger.
//!
//! Rows are inserted once and never deleted; the only columns that ever
//! change afterwards are the status-transition fields, and those only move
//! off `pending` once. The `WHERE status = 'pending'` guard on the status
//! write makes a second approval of the same entry a no-op at the storage
//! level, whatever the services raced on.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use tempo_core::{HourBankRecord, LedgerEntryType, Minutes, RecordStatus};

/// Repository for hour-bank ledger operations.
#[derive(Debug, Clone)]
pub struct HourBankRepository {
    pool: SqlitePool,
}

#[derive(Debug, FromRow)]
struct LedgerRow {
    id: String,
    employee_id: String,
    date: NaiveDate,
    entry_type: LedgerEntryType,
    minutes: i64,
    reason: String,
    status: RecordStatus,
    created_by: String,
    approved_by: Option<String>,
    approved_at: Option<DateTime<Utc>>,
    rejected_by: Option<String>,
    rejected_at: Option<DateTime<Utc>>,
    overtime_request_id: Option<String>,
    time_clock_record_id: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<LedgerRow> for HourBankRecord {
    fn from(row: LedgerRow) -> Self {
        HourBankRecord {
            id: row.id,
            employee_id: row.employee_id,
            date: row.date,
            entry_type: row.entry_type,
            minutes: Minutes::new(row.minutes),
            reason: row.reason,
            status: row.status,
            created_by: row.created_by,
            approved_by: row.approved_by,
            approved_at: row.approved_at,
            rejected_by: row.rejected_by,
            rejected_at: row.rejected_at,
            overtime_request_id: row.overtime_request_id,
            time_clock_record_id: row.time_clock_record_id,
            created_at: row.created_at,
        }
    }
}

const SELECT_ENTRY: &str = r#"
    SELECT id, employee_id, date, entry_type, minutes, reason, status,
           created_by, approved_by, approved_at, rejected_by, rejected_at,
           overtime_request_id, time_clock_record_id, created_at
    FROM hour_bank_records
"#;

impl HourBankRepository {
    /// Creates a new HourBankRepository.
    pub fn new(pool: SqlitePool) -> Self {
        HourBankRepository { pool }
    }

    /// Appends a ledger entry.
    ///
    /// The idempotency guards live in the schema: a second credit for the
    /// same overtime request, or a second live auto entry of the same
    /// direction for the same finalized day, fails with a unique violation.
    pub async fn insert(&self, entry: &HourBankRecord) -> DbResult<()> {
        debug!(
            id = %entry.id,
            employee_id = %entry.employee_id,
            entry_type = ?entry.entry_type,
            minutes = entry.minutes.minutes(),
            "inserting hour bank entry"
        );

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
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets an entry by ID.
    pub async fn find_by_id(&self, id: &str) -> DbResult<Option<HourBankRecord>> {
        let row: Option<LedgerRow> = sqlx::query_as(&format!("{SELECT_ENTRY} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    /// Gets the credit minted for an overtime request, if approval already
    /// went through once.
    pub async fn find_by_overtime_request(
        &self,
        overtime_request_id: &str,
    ) -> DbResult<Option<HourBankRecord>> {
        let row: Option<LedgerRow> =
            sqlx::query_as(&format!("{SELECT_ENTRY} WHERE overtime_request_id = ?1"))
                .bind(overtime_request_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(Into::into))
    }

    /// Gets the live (non-rejected) auto entry of a given direction for a
    /// finalized time-clock day, if one exists.
    pub async fn find_auto_entry(
        &self,
        time_clock_record_id: &str,
        entry_type: LedgerEntryType,
    ) -> DbResult<Option<HourBankRecord>> {
        let row: Option<LedgerRow> = sqlx::query_as(&format!(
            "{SELECT_ENTRY} WHERE time_clock_record_id = ?1 AND entry_type = ?2 AND status != 'rejected'"
        ))
        .bind(time_clock_record_id)
        .bind(entry_type)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    /// Lists an employee's ledger entries, newest first, optionally bounded
    /// by an inclusive date range.
    pub async fn list_for_employee(
        &self,
        employee_id: &str,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> DbResult<Vec<HourBankRecord>> {
        let rows: Vec<LedgerRow> = sqlx::query_as(&format!(
            r#"
            {SELECT_ENTRY}
            WHERE employee_id = ?1
              AND (?2 IS NULL OR date >= ?2)
              AND (?3 IS NULL OR date <= ?3)
            ORDER BY date DESC, created_at DESC
            "#
        ))
        .bind(employee_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Writes a status transition, guarded so only a `pending` row moves.
    ///
    /// Returns `false` when the row was no longer pending (someone else
    /// decided first); the caller re-reads and reports the current state.
    pub async fn set_status(&self, entry: &HourBankRecord) -> DbResult<bool> {
        debug!(id = %entry.id, status = entry.status.as_str(), "transitioning hour bank entry");

        let result = sqlx::query(
            r#"
            UPDATE hour_bank_records
            SET status = ?2,
                approved_by = ?3, approved_at = ?4,
                rejected_by = ?5, rejected_at = ?6
            WHERE id = ?1 AND status = 'pending'
            "#,
        )
        .bind(&entry.id)
        .bind(entry.status)
        .bind(&entry.approved_by)
        .bind(entry.approved_at)
        .bind(&entry.rejected_by)
        .bind(entry.rejected_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use tempo_core::{Employee, Role, WorkSchedule};

    async fn test_db() -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let now = Utc::now();
        db.employees()
            .insert(&Employee {
                id: "emp-1".to_string(),
                name: "Ana Souza".to_string(),
                email: "ana@example.com".to_string(),
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
            })
            .await
            .unwrap();
        db
    }

    fn entry(id: &str, date: &str, entry_type: LedgerEntryType) -> HourBankRecord {
        HourBankRecord {
            id: id.to_string(),
            employee_id: "emp-1".to_string(),
            date: date.parse().unwrap(),
            entry_type,
            minutes: Minutes::new(90),
            reason: "project push".to_string(),
            status: RecordStatus::Pending,
            created_by: "emp-1".to_string(),
            approved_by: None,
            approved_at: None,
            rejected_by: None,
            rejected_at: None,
            overtime_request_id: None,
            time_clock_record_id: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_list() {
        let db = test_db().await;
        let repo = db.hour_bank();

        repo.insert(&entry("hb-1", "2026-08-20", LedgerEntryType::Credit))
            .await
            .unwrap();
        repo.insert(&entry("hb-2", "2026-08-25", LedgerEntryType::Debit))
            .await
            .unwrap();

        let all = repo.list_for_employee("emp-1", None, None).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, "hb-2");

        let bounded = repo
            .list_for_employee("emp-1", Some("2026-08-21".parse().unwrap()), None)
            .await
            .unwrap();
        assert_eq!(bounded.len(), 1);
        assert_eq!(bounded[0].id, "hb-2");
    }

    #[tokio::test]
    async fn test_status_guard_blocks_second_decision() {
        let db = test_db().await;
        let repo = db.hour_bank();
        repo.insert(&entry("hb-1", "2026-08-20", LedgerEntryType::Credit))
            .await
            .unwrap();

        let mut decided = repo.find_by_id("hb-1").await.unwrap().unwrap();
        decided.approve("mgr-1", Utc::now()).unwrap();
        assert!(repo.set_status(&decided).await.unwrap());

        // Second decision sees a non-pending row and changes nothing.
        let mut again = decided.clone();
        again.status = RecordStatus::Rejected;
        assert!(!repo.set_status(&again).await.unwrap());

        let stored = repo.find_by_id("hb-1").await.unwrap().unwrap();
        assert_eq!(stored.status, RecordStatus::Approved);
    }

    #[tokio::test]
    async fn test_overtime_request_credit_is_unique() {
        let db = test_db().await;
        let repo = db.hour_bank();

        // The referenced overtime request must exist.
        db.overtime()
            .insert(&tempo_core::OvertimeRequest {
                id: "ot-1".to_string(),
                employee_id: "emp-1".to_string(),
                date: "2026-08-20".parse().unwrap(),
                start_time: chrono::NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
                end_time: chrono::NaiveTime::from_hms_opt(20, 0, 0).unwrap(),
                minutes: Minutes::new(120),
                reason: "release".to_string(),
                status: RecordStatus::Approved,
                created_by: "emp-1".to_string(),
                approved_by: Some("mgr-1".to_string()),
                approved_at: Some(Utc::now()),
                rejected_by: None,
                rejected_at: None,
                created_at: Utc::now(),
            })
            .await
            .unwrap();

        let mut first = entry("hb-1", "2026-08-20", LedgerEntryType::Credit);
        first.overtime_request_id = Some("ot-1".to_string());
        repo.insert(&first).await.unwrap();

        let mut second = entry("hb-2", "2026-08-20", LedgerEntryType::Credit);
        second.overtime_request_id = Some("ot-1".to_string());
        let err = repo.insert(&second).await.unwrap_err();
        assert!(err.is_unique_violation_on("overtime_request_id"));

        let found = repo.find_by_overtime_request("ot-1").await.unwrap().unwrap();
        assert_eq!(found.id, "hb-1");
    }
}
