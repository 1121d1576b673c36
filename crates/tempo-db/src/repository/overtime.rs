//! # Overtime Request Repository
//!
//! Persistence for manually-submitted extra-hours requests. Same shape as
//! the ledger: insert once, status fields are the only thing that moves,
//! and the `pending` guard serializes racing decisions.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::{FromRow, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use tempo_core::{Minutes, OvertimeRequest, RecordStatus};

/// Repository for overtime request operations.
#[derive(Debug, Clone)]
pub struct OvertimeRepository {
    pool: SqlitePool,
}

#[derive(Debug, FromRow)]
struct RequestRow {
    id: String,
    employee_id: String,
    date: NaiveDate,
    start_time: NaiveTime,
    end_time: NaiveTime,
    minutes: i64,
    reason: String,
    status: RecordStatus,
    created_by: String,
    approved_by: Option<String>,
    approved_at: Option<DateTime<Utc>>,
    rejected_by: Option<String>,
    rejected_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<RequestRow> for OvertimeRequest {
    fn from(row: RequestRow) -> Self {
        OvertimeRequest {
            id: row.id,
            employee_id: row.employee_id,
            date: row.date,
            start_time: row.start_time,
            end_time: row.end_time,
            minutes: Minutes::new(row.minutes),
            reason: row.reason,
            status: row.status,
            created_by: row.created_by,
            approved_by: row.approved_by,
            approved_at: row.approved_at,
            rejected_by: row.rejected_by,
            rejected_at: row.rejected_at,
            created_at: row.created_at,
        }
    }
}

const SELECT_REQUEST: &str = r#"
    SELECT id, employee_id, date, start_time, end_time, minutes, reason, status,
           created_by, approved_by, approved_at, rejected_by, rejected_at, created_at
    FROM overtime_requests
"#;

impl OvertimeRepository {
    /// Creates a new OvertimeRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OvertimeRepository { pool }
    }

    /// Inserts a request.
    pub async fn insert(&self, request: &OvertimeRequest) -> DbResult<()> {
        debug!(
            id = %request.id,
            employee_id = %request.employee_id,
            minutes = request.minutes.minutes(),
            "inserting overtime request"
        );

        sqlx::query(
            r#"
            INSERT INTO overtime_requests (
                id, employee_id, date, start_time, end_time, minutes, reason, status,
                created_by, approved_by, approved_at, rejected_by, rejected_at, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            "#,
        )
        .bind(&request.id)
        .bind(&request.employee_id)
        .bind(request.date)
        .bind(request.start_time)
        .bind(request.end_time)
        .bind(request.minutes.minutes())
        .bind(&request.reason)
        .bind(request.status)
        .bind(&request.created_by)
        .bind(&request.approved_by)
        .bind(request.approved_at)
        .bind(&request.rejected_by)
        .bind(request.rejected_at)
        .bind(request.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets a request by ID.
    pub async fn find_by_id(&self, id: &str) -> DbResult<Option<OvertimeRequest>> {
        let row: Option<RequestRow> = sqlx::query_as(&format!("{SELECT_REQUEST} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    /// Lists an employee's requests, newest first.
    pub async fn list_for_employee(&self, employee_id: &str) -> DbResult<Vec<OvertimeRequest>> {
        let rows: Vec<RequestRow> = sqlx::query_as(&format!(
            "{SELECT_REQUEST} WHERE employee_id = ?1 ORDER BY date DESC, created_at DESC"
        ))
        .bind(employee_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Lists an employee's requests dated in one calendar month.
    ///
    /// Input to the monthly-cap check: approved and pending requests of the
    /// month are what count against the cap.
    pub async fn list_for_employee_month(
        &self,
        employee_id: &str,
        year: i32,
        month: u32,
    ) -> DbResult<Vec<OvertimeRequest>> {
        // date is stored as 'YYYY-MM-DD' text
        let prefix = format!("{year:04}-{month:02}-%");
        let rows: Vec<RequestRow> = sqlx::query_as(&format!(
            "{SELECT_REQUEST} WHERE employee_id = ?1 AND date LIKE ?2 ORDER BY date"
        ))
        .bind(employee_id)
        .bind(prefix)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Writes a status transition, guarded so only a `pending` row moves.
    ///
    /// Returns `false` when the request was already decided.
    pub async fn set_status(&self, request: &OvertimeRequest) -> DbResult<bool> {
        debug!(id = %request.id, status = request.status.as_str(), "transitioning overtime request");

        let result = sqlx::query(
            r#"
            UPDATE overtime_requests
            SET status = ?2,
                approved_by = ?3, approved_at = ?4,
                rejected_by = ?5, rejected_at = ?6
            WHERE id = ?1 AND status = 'pending'
            "#,
        )
        .bind(&request.id)
        .bind(request.status)
        .bind(&request.approved_by)
        .bind(request.approved_at)
        .bind(&request.rejected_by)
        .bind(request.rejected_at)
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

    fn request(id: &str, date: &str, minutes: i64) -> OvertimeRequest {
        OvertimeRequest {
            id: id.to_string(),
            employee_id: "emp-1".to_string(),
            date: date.parse().unwrap(),
            start_time: NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(20, 0, 0).unwrap(),
            minutes: Minutes::new(minutes),
            reason: "release window".to_string(),
            status: RecordStatus::Pending,
            created_by: "emp-1".to_string(),
            approved_by: None,
            approved_at: None,
            rejected_by: None,
            rejected_at: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_insert_find_and_list() {
        let db = test_db().await;
        let repo = db.overtime();

        repo.insert(&request("ot-1", "2026-08-20", 120)).await.unwrap();
        repo.insert(&request("ot-2", "2026-08-25", 60)).await.unwrap();

        let found = repo.find_by_id("ot-1").await.unwrap().unwrap();
        assert_eq!(found.minutes, Minutes::new(120));

        let all = repo.list_for_employee("emp-1").await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, "ot-2");
    }

    #[tokio::test]
    async fn test_month_listing_filters_by_month() {
        let db = test_db().await;
        let repo = db.overtime();

        repo.insert(&request("ot-1", "2026-08-20", 120)).await.unwrap();
        repo.insert(&request("ot-2", "2026-09-02", 60)).await.unwrap();

        let august = repo.list_for_employee_month("emp-1", 2026, 8).await.unwrap();
        assert_eq!(august.len(), 1);
        assert_eq!(august[0].id, "ot-1");
    }

    #[tokio::test]
    async fn test_status_guard() {
        let db = test_db().await;
        let repo = db.overtime();
        repo.insert(&request("ot-1", "2026-08-20", 120)).await.unwrap();

        let mut decided = repo.find_by_id("ot-1").await.unwrap().unwrap();
        decided.approve("mgr-1", Utc::now()).unwrap();
        assert!(repo.set_status(&decided).await.unwrap());
        assert!(!repo.set_status(&decided).await.unwrap());

        let stored = repo.find_by_id("ot-1").await.unwrap().unwrap();
        assert_eq!(stored.status, RecordStatus::Approved);
    }
}
