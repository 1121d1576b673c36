//! # Domain Types
//!
//! Core domain types used throughout Tempo.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌──────────────────┐   ┌──────────────────┐     │
//! │  │    Employee     │   │ TimeClockRecord  │   │  HourBankRecord  │     │
//! │  │  ─────────────  │   │  ──────────────  │   │  ──────────────  │     │
//! │  │  id (UUID)      │   │  (employee,date) │   │  id (UUID)       │     │
//! │  │  role           │   │  4 punch columns │   │  credit | debit  │     │
//! │  │  department     │   │  derived minutes │   │  minutes > 0     │     │
//! │  │  workSchedule   │   │  ledger backrefs │   │  pending/appr/rej│     │
//! │  └─────────────────┘   └──────────────────┘   └──────────────────┘     │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌──────────────────┐   ┌──────────────────┐     │
//! │  │ OvertimeRequest │   │ CompanySettings  │   │  Justification   │     │
//! │  │  start/end/min  │   │  3 limits + late │   │  catalog entry   │     │
//! │  │  status         │   │  policy          │   │                  │     │
//! │  └─────────────────┘   └──────────────────┘   └──────────────────┘     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Identity
//! Every entity has a UUID v4 string `id`; the time-clock record additionally
//! has the business key (employee_id, date), unique at the storage layer.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::minutes::Minutes;
use crate::schedule::WorkSchedule;

// =============================================================================
// Roles & Access
// =============================================================================

/// Employee role, the input to access-scope resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "TEXT", rename_all = "snake_case"))]
pub enum Role {
    Admin,
    Manager,
    Employee,
}

impl Role {
    /// Managers and admins may operate on records beyond their own.
    pub fn is_privileged(&self) -> bool {
        matches!(self, Role::Admin | Role::Manager)
    }
}

// =============================================================================
// Employee (User Directory entity)
// =============================================================================

/// A per-employee, per-month raise of the overtime cap.
///
/// At most one entry per (month, year); duplicate writes merge with
/// last-write-wins on the additional minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OvertimeException {
    /// 1-12.
    pub month: u32,
    pub year: i32,
    /// Extra minutes added to the monthly cap for that month.
    pub additional: Minutes,
}

/// An employee as provided by the user directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Employee {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name.
    pub name: String,

    /// Login / notification address.
    pub email: String,

    /// Role driving access-scope resolution.
    pub role: Role,

    /// Department, the boundary of a manager's scope.
    pub department: String,

    /// Monthly overtime cap; `None` falls back to the company default.
    pub overtime_limit: Option<Minutes>,

    /// Per-month cap overrides.
    pub overtime_exceptions: Vec<OvertimeException>,

    /// Weekly working windows, Monday first.
    pub schedule: WorkSchedule,

    /// Expected unpaid lunch duration when no explicit lunch punches exist.
    pub lunch_break: Minutes,

    /// Grace period before lateness counts.
    pub late_tolerance: Minutes,

    /// Soft-delete flag.
    pub is_active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Employee {
    /// Returns the exception for a given month/year, if any.
    pub fn exception_for(&self, month: u32, year: i32) -> Option<&OvertimeException> {
        self.overtime_exceptions
            .iter()
            .find(|e| e.month == month && e.year == year)
    }
}

// =============================================================================
// Time Clock
// =============================================================================

/// The four punch events of a working day, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PunchKind {
    ClockIn,
    LunchExit,
    LunchReturn,
    ClockOut,
}

impl PunchKind {
    /// Human label used in audit descriptions and notifications.
    pub fn label(&self) -> &'static str {
        match self {
            PunchKind::ClockIn => "clock-in",
            PunchKind::LunchExit => "lunch exit",
            PunchKind::LunchReturn => "lunch return",
            PunchKind::ClockOut => "clock-out",
        }
    }
}

/// One record per (employee, calendar date); the record is the state of the
/// day's punch state machine.
///
/// Timestamps are civil local time (`NaiveDateTime`), not UTC-normalized:
/// lateness is judged against the wall clock the schedule was written in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeClockRecord {
    pub id: String,
    pub employee_id: String,

    /// Business key together with `employee_id`.
    pub date: NaiveDate,

    pub entry_time: Option<NaiveDateTime>,
    pub lunch_exit_time: Option<NaiveDateTime>,
    pub lunch_return_time: Option<NaiveDateTime>,
    pub exit_time: Option<NaiveDateTime>,

    /// Computed at clock-in against the resolved schedule and tolerance.
    pub late_minutes: Minutes,

    /// Computed at lunch return.
    pub lunch_late_minutes: Minutes,

    /// Derived at clock-out; unset until the day is finalized.
    pub worked_minutes: Option<Minutes>,
    pub scheduled_minutes: Option<Minutes>,
    pub overtime_minutes: Option<Minutes>,
    pub negative_minutes: Option<Minutes>,

    /// Back-reference to the auto-generated ledger credit, at most one.
    pub hour_bank_credit_id: Option<String>,
    /// Back-reference to the auto-generated ledger debit, at most one.
    pub hour_bank_debit_id: Option<String>,

    /// Optional reference into the justification catalog.
    pub justification_id: Option<String>,
    /// Denormalized snapshot of the justification text at punch time.
    pub justification: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Hour Bank Ledger
// =============================================================================

/// Direction of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "TEXT", rename_all = "snake_case"))]
pub enum LedgerEntryType {
    Credit,
    Debit,
}

/// Approval status shared by ledger entries and overtime requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "TEXT", rename_all = "snake_case"))]
pub enum RecordStatus {
    Pending,
    Approved,
    Rejected,
}

impl RecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Pending => "pending",
            RecordStatus::Approved => "approved",
            RecordStatus::Rejected => "rejected",
        }
    }
}

/// An append-only hour-bank ledger entry.
///
/// Immutable once created except for the status-transition fields; never
/// deleted. Only `approved` entries affect the balance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HourBankRecord {
    pub id: String,
    pub employee_id: String,
    pub date: NaiveDate,
    pub entry_type: LedgerEntryType,

    /// Always positive; direction comes from `entry_type`.
    pub minutes: Minutes,

    pub reason: String,
    pub status: RecordStatus,

    pub created_by: String,
    pub approved_by: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejected_by: Option<String>,
    pub rejected_at: Option<DateTime<Utc>>,

    /// Set when the entry was created by approving an overtime request.
    pub overtime_request_id: Option<String>,
    /// Set when the entry was auto-generated from a finalized time-clock day.
    pub time_clock_record_id: Option<String>,

    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Overtime Requests
// =============================================================================

/// A manually-submitted extra-hours request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OvertimeRequest {
    pub id: String,
    pub employee_id: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,

    /// Derived from start/end; spans crossing midnight wrap modulo 24h.
    pub minutes: Minutes,

    pub reason: String,
    pub status: RecordStatus,

    pub created_by: String,
    pub approved_by: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejected_by: Option<String>,
    pub rejected_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Company Settings
// =============================================================================

/// What happens when a late employee clocks in without a justification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "TEXT", rename_all = "snake_case"))]
pub enum LatenessPolicy {
    /// Accept the punch, flag it for later review.
    Flag,
    /// Reject the punch until a justification is attached (only enforced
    /// while the justification catalog is non-empty).
    RequireJustification,
}

/// Company-wide defaults, a singleton.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanySettings {
    /// Monthly overtime cap applied when the employee has no override.
    pub default_overtime_limit: Minutes,

    /// Maximum positive balance an employee may hold. Zero = unlimited.
    pub default_accumulation_limit: Minutes,

    /// Maximum debit minutes consumable per calendar month. Zero = unlimited.
    pub default_usage_limit: Minutes,

    pub late_policy: LatenessPolicy,
}

impl Default for CompanySettings {
    fn default() -> Self {
        CompanySettings {
            // 40h overtime/month, unlimited bank, unlimited usage
            default_overtime_limit: Minutes::from_whole_hours(40),
            default_accumulation_limit: Minutes::zero(),
            default_usage_limit: Minutes::zero(),
            late_policy: LatenessPolicy::Flag,
        }
    }
}

// =============================================================================
// Justification Catalog
// =============================================================================

/// A reason an employee can attach to a late or short day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Justification {
    pub id: String,
    pub description: String,
    pub is_active: bool,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    #[test]
    fn test_role_privilege() {
        assert!(Role::Admin.is_privileged());
        assert!(Role::Manager.is_privileged());
        assert!(!Role::Employee.is_privileged());
    }

    #[test]
    fn test_exception_lookup() {
        let mut employee = sample_employee();
        employee.overtime_exceptions = vec![
            OvertimeException {
                month: 12,
                year: 2026,
                additional: Minutes::from_whole_hours(10),
            },
            OvertimeException {
                month: 1,
                year: 2027,
                additional: Minutes::from_whole_hours(5),
            },
        ];

        assert_eq!(
            employee.exception_for(12, 2026).unwrap().additional,
            Minutes::from_whole_hours(10)
        );
        assert!(employee.exception_for(12, 2027).is_none());
    }

    #[test]
    fn test_settings_defaults() {
        let settings = CompanySettings::default();
        assert_eq!(settings.default_overtime_limit.minutes(), 2_400);
        assert!(settings.default_accumulation_limit.is_zero());
        assert_eq!(settings.late_policy, LatenessPolicy::Flag);
    }

    pub(crate) fn sample_employee() -> Employee {
        let now = Utc::now();
        Employee {
            id: "emp-1".to_string(),
            name: "Ana Souza".to_string(),
            email: "ana@example.com".to_string(),
            role: Role::Employee,
            department: "engineering".to_string(),
            overtime_limit: None,
            overtime_exceptions: Vec::new(),
            schedule: WorkSchedule::empty(),
            lunch_break: Minutes::from_whole_hours(1),
            late_tolerance: Minutes::new(10),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}
