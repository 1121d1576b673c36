//! # Employee Repository
//!
//! The local backing of the user directory: identity, role, department,
//! overtime limits and exceptions, weekly schedule, lunch break and late
//! tolerance.
//!
//! The weekly schedule is stored as normalized per-day rows
//! (`UNIQUE(employee_id, weekday)`) and assembled into the domain's
//! fixed-size `[Option<DaySchedule>; 7]` on read.

use chrono::{DateTime, Utc, Weekday};
use sqlx::{FromRow, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use tempo_core::{DaySchedule, Employee, Minutes, OvertimeException, Role, WorkSchedule};

/// Repository for employee (user directory) operations.
#[derive(Debug, Clone)]
pub struct EmployeeRepository {
    pool: SqlitePool,
}

#[derive(Debug, FromRow)]
struct EmployeeRow {
    id: String,
    name: String,
    email: String,
    role: Role,
    department: String,
    overtime_limit_minutes: Option<i64>,
    lunch_break_minutes: i64,
    late_tolerance_minutes: i64,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct ScheduleRow {
    weekday: i64,
    start_time: chrono::NaiveTime,
    end_time: chrono::NaiveTime,
}

#[derive(Debug, FromRow)]
struct ExceptionRow {
    month: i64,
    year: i64,
    additional_minutes: i64,
}

const SELECT_EMPLOYEE: &str = r#"
    SELECT id, name, email, role, department,
           overtime_limit_minutes, lunch_break_minutes, late_tolerance_minutes,
           is_active, created_at, updated_at
    FROM employees
"#;

impl EmployeeRepository {
    /// Creates a new EmployeeRepository.
    pub fn new(pool: SqlitePool) -> Self {
        EmployeeRepository { pool }
    }

    /// Inserts an employee row (schedule and exceptions are written through
    /// their own operations).
    pub async fn insert(&self, employee: &Employee) -> DbResult<()> {
        debug!(id = %employee.id, "inserting employee");

        sqlx::query(
            r#"
            INSERT INTO employees (
                id, name, email, role, department,
                overtime_limit_minutes, lunch_break_minutes, late_tolerance_minutes,
                is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&employee.id)
        .bind(&employee.name)
        .bind(&employee.email)
        .bind(employee.role)
        .bind(&employee.department)
        .bind(employee.overtime_limit.map(|m| m.minutes()))
        .bind(employee.lunch_break.minutes())
        .bind(employee.late_tolerance.minutes())
        .bind(employee.is_active)
        .bind(employee.created_at)
        .bind(employee.updated_at)
        .execute(&self.pool)
        .await?;

        for (weekday, day) in employee.schedule.iter() {
            if let Some(day) = day {
                self.set_schedule_day(&employee.id, weekday, Some(*day)).await?;
            }
        }
        for exception in &employee.overtime_exceptions {
            self.upsert_overtime_exception(&employee.id, *exception).await?;
        }

        Ok(())
    }

    /// Gets an employee by ID, with schedule and exceptions assembled.
    pub async fn find_by_id(&self, id: &str) -> DbResult<Option<Employee>> {
        let row: Option<EmployeeRow> =
            sqlx::query_as(&format!("{SELECT_EMPLOYEE} WHERE id = ?1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        match row {
            Some(row) => Ok(Some(self.assemble(row).await?)),
            None => Ok(None),
        }
    }

    /// Gets all active employees of a department.
    pub async fn find_by_department(&self, department: &str) -> DbResult<Vec<Employee>> {
        let rows: Vec<EmployeeRow> = sqlx::query_as(&format!(
            "{SELECT_EMPLOYEE} WHERE department = ?1 AND is_active = 1 ORDER BY name"
        ))
        .bind(department)
        .fetch_all(&self.pool)
        .await?;

        let mut employees = Vec::with_capacity(rows.len());
        for row in rows {
            employees.push(self.assemble(row).await?);
        }
        Ok(employees)
    }

    /// Updates the monthly overtime cap override (`None` clears it back to
    /// the company default).
    pub async fn update_overtime_limit(&self, id: &str, limit: Option<Minutes>) -> DbResult<()> {
        self.touch_column(id, "overtime_limit_minutes", limit.map(|m| m.minutes()))
            .await
    }

    /// Updates the expected unpaid lunch duration.
    pub async fn update_lunch_break(&self, id: &str, lunch: Minutes) -> DbResult<()> {
        self.touch_column(id, "lunch_break_minutes", Some(lunch.minutes()))
            .await
    }

    /// Updates the lateness grace period.
    pub async fn update_late_tolerance(&self, id: &str, tolerance: Minutes) -> DbResult<()> {
        self.touch_column(id, "late_tolerance_minutes", Some(tolerance.minutes()))
            .await
    }

    /// Sets or clears the working window for one weekday.
    pub async fn set_schedule_day(
        &self,
        id: &str,
        weekday: Weekday,
        day: Option<DaySchedule>,
    ) -> DbResult<()> {
        let weekday_index = weekday.num_days_from_monday() as i64;

        match day {
            Some(day) => {
                sqlx::query(
                    r#"
                    INSERT INTO work_schedules (employee_id, weekday, start_time, end_time)
                    VALUES (?1, ?2, ?3, ?4)
                    ON CONFLICT (employee_id, weekday)
                    DO UPDATE SET start_time = excluded.start_time, end_time = excluded.end_time
                    "#,
                )
                .bind(id)
                .bind(weekday_index)
                .bind(day.start)
                .bind(day.end)
                .execute(&self.pool)
                .await?;
            }
            None => {
                sqlx::query("DELETE FROM work_schedules WHERE employee_id = ?1 AND weekday = ?2")
                    .bind(id)
                    .bind(weekday_index)
                    .execute(&self.pool)
                    .await?;
            }
        }
        Ok(())
    }

    /// Upserts a per-month overtime exception.
    ///
    /// At most one row per (employee, month, year): a duplicate write merges
    /// into the existing row, last write wins on the additional minutes.
    pub async fn upsert_overtime_exception(
        &self,
        id: &str,
        exception: OvertimeException,
    ) -> DbResult<()> {
        debug!(
            employee_id = %id,
            month = exception.month,
            year = exception.year,
            "upserting overtime exception"
        );

        sqlx::query(
            r#"
            INSERT INTO overtime_exceptions (employee_id, month, year, additional_minutes)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT (employee_id, month, year)
            DO UPDATE SET additional_minutes = excluded.additional_minutes
            "#,
        )
        .bind(id)
        .bind(exception.month as i64)
        .bind(exception.year as i64)
        .bind(exception.additional.minutes())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn assemble(&self, row: EmployeeRow) -> DbResult<Employee> {
        let schedule_rows: Vec<ScheduleRow> = sqlx::query_as(
            "SELECT weekday, start_time, end_time FROM work_schedules WHERE employee_id = ?1",
        )
        .bind(&row.id)
        .fetch_all(&self.pool)
        .await?;

        let mut days: [Option<DaySchedule>; 7] = [None; 7];
        for day in schedule_rows {
            if let Some(slot) = days.get_mut(day.weekday as usize) {
                *slot = Some(DaySchedule {
                    start: day.start_time,
                    end: day.end_time,
                });
            }
        }

        let exception_rows: Vec<ExceptionRow> = sqlx::query_as(
            r#"
            SELECT month, year, additional_minutes
            FROM overtime_exceptions
            WHERE employee_id = ?1
            ORDER BY year, month
            "#,
        )
        .bind(&row.id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Employee {
            id: row.id,
            name: row.name,
            email: row.email,
            role: row.role,
            department: row.department,
            overtime_limit: row.overtime_limit_minutes.map(Minutes::new),
            overtime_exceptions: exception_rows
                .into_iter()
                .map(|e| OvertimeException {
                    month: e.month as u32,
                    year: e.year as i32,
                    additional: Minutes::new(e.additional_minutes),
                })
                .collect(),
            schedule: WorkSchedule::from_days(days),
            lunch_break: Minutes::new(row.lunch_break_minutes),
            late_tolerance: Minutes::new(row.late_tolerance_minutes),
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }

    async fn touch_column(&self, id: &str, column: &str, value: Option<i64>) -> DbResult<()> {
        // column names come from this module only, never from input
        let sql = format!("UPDATE employees SET {column} = ?2, updated_at = ?3 WHERE id = ?1");
        let result = sqlx::query(&sql)
            .bind(id)
            .bind(value)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Employee", id));
        }
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::NaiveTime;

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn sample(id: &str, role: Role) -> Employee {
        let now = Utc::now();
        let mut schedule = WorkSchedule::empty();
        schedule.set_day(Weekday::Mon, Some(DaySchedule::new(t(9, 0), t(18, 0)).unwrap()));

        Employee {
            id: id.to_string(),
            name: "Ana Souza".to_string(),
            email: format!("{id}@example.com"),
            role,
            department: "engineering".to_string(),
            overtime_limit: None,
            overtime_exceptions: Vec::new(),
            schedule,
            lunch_break: Minutes::new(60),
            late_tolerance: Minutes::new(10),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_insert_and_find_round_trip() {
        let db = test_db().await;
        let repo = db.employees();

        repo.insert(&sample("emp-1", Role::Employee)).await.unwrap();

        let found = repo.find_by_id("emp-1").await.unwrap().unwrap();
        assert_eq!(found.name, "Ana Souza");
        assert_eq!(found.role, Role::Employee);
        assert_eq!(found.lunch_break.minutes(), 60);
        assert!(found.schedule.day(Weekday::Mon).is_some());
        assert!(found.schedule.day(Weekday::Sun).is_none());

        assert!(repo.find_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_by_department() {
        let db = test_db().await;
        let repo = db.employees();

        repo.insert(&sample("emp-1", Role::Employee)).await.unwrap();
        repo.insert(&sample("emp-2", Role::Manager)).await.unwrap();
        let mut other = sample("emp-3", Role::Employee);
        other.department = "sales".to_string();
        repo.insert(&other).await.unwrap();

        let engineering = repo.find_by_department("engineering").await.unwrap();
        assert_eq!(engineering.len(), 2);
    }

    #[tokio::test]
    async fn test_overtime_exception_merges_duplicates() {
        let db = test_db().await;
        let repo = db.employees();
        repo.insert(&sample("emp-1", Role::Employee)).await.unwrap();

        let exception = OvertimeException {
            month: 12,
            year: 2026,
            additional: Minutes::from_whole_hours(10),
        };
        repo.upsert_overtime_exception("emp-1", exception).await.unwrap();

        // Same month/year again: merged, last write wins
        let updated = OvertimeException {
            month: 12,
            year: 2026,
            additional: Minutes::from_whole_hours(4),
        };
        repo.upsert_overtime_exception("emp-1", updated).await.unwrap();

        let employee = repo.find_by_id("emp-1").await.unwrap().unwrap();
        assert_eq!(employee.overtime_exceptions.len(), 1);
        assert_eq!(
            employee.overtime_exceptions[0].additional,
            Minutes::from_whole_hours(4)
        );
    }

    #[tokio::test]
    async fn test_schedule_day_update_and_clear() {
        let db = test_db().await;
        let repo = db.employees();
        repo.insert(&sample("emp-1", Role::Employee)).await.unwrap();

        // overwrite Monday
        repo.set_schedule_day(
            "emp-1",
            Weekday::Mon,
            Some(DaySchedule::new(t(8, 0), t(16, 0)).unwrap()),
        )
        .await
        .unwrap();

        let employee = repo.find_by_id("emp-1").await.unwrap().unwrap();
        assert_eq!(employee.schedule.day(Weekday::Mon).unwrap().start, t(8, 0));

        // clear Monday → day off
        repo.set_schedule_day("emp-1", Weekday::Mon, None).await.unwrap();
        let employee = repo.find_by_id("emp-1").await.unwrap().unwrap();
        assert!(employee.schedule.day(Weekday::Mon).is_none());
    }

    #[tokio::test]
    async fn test_update_limits() {
        let db = test_db().await;
        let repo = db.employees();
        repo.insert(&sample("emp-1", Role::Employee)).await.unwrap();

        repo.update_overtime_limit("emp-1", Some(Minutes::from_whole_hours(20)))
            .await
            .unwrap();
        repo.update_late_tolerance("emp-1", Minutes::new(5)).await.unwrap();

        let employee = repo.find_by_id("emp-1").await.unwrap().unwrap();
        assert_eq!(employee.overtime_limit, Some(Minutes::from_whole_hours(20)));
        assert_eq!(employee.late_tolerance.minutes(), 5);

        let err = repo
            .update_overtime_limit("missing", Some(Minutes::new(1)))
            .await;
        assert!(matches!(err, Err(DbError::NotFound { .. })));
    }
}
