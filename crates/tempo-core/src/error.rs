//! # Error Types
//!
//! Domain-specific error types for tempo-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  tempo-core errors (this file)                                         │
//! │  ├── CoreError        - Business-rule rejections                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  tempo-db errors (separate crate)                                      │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  tempo-service errors (separate crate)                                 │
//! │  └── ServiceError     - What API callers see (serialized)              │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → ServiceError → client             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Limit errors carry {current, limit, requested} so a client UI can
//!    explain the rejection without a second round trip
//! 3. Errors are enum variants, never String
//! 4. These are business-rule rejections, not exceptional faults

use chrono::NaiveDate;
use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business-rule errors.
///
/// Punch-sequence violations, limit rejections, and status-transition
/// failures all live here. The service layer maps them to a structured
/// wire shape unchanged.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The employee already clocked in on this date.
    #[error("employee {employee_id} already clocked in on {date}")]
    DuplicateEntry {
        employee_id: String,
        date: NaiveDate,
    },

    /// A punch arrived before the clock-in that must precede it.
    #[error("no clock-in recorded for {date}")]
    MissingEntry { date: NaiveDate },

    /// Lunch exit was already recorded for this date.
    #[error("lunch exit already recorded for {date}")]
    DuplicateLunchExit { date: NaiveDate },

    /// Lunch return requires a lunch exit first.
    #[error("no lunch exit recorded for {date}")]
    MissingLunchExit { date: NaiveDate },

    /// Lunch return was already recorded for this date.
    #[error("lunch return already recorded for {date}")]
    DuplicateLunchReturn { date: NaiveDate },

    /// Clock-out was already recorded; the day is finalized.
    #[error("clock-out already recorded for {date}")]
    DuplicateExit { date: NaiveDate },

    /// The employee has no working window configured for this weekday,
    /// so there are no expected hours to measure against.
    #[error("no work schedule configured for employee {employee_id} on {date}")]
    NoScheduleConfigured {
        employee_id: String,
        date: NaiveDate,
    },

    /// Crediting would push the balance past the accumulation limit.
    #[error(
        "accumulation limit exceeded: balance {current_minutes}min + requested \
         {requested_minutes}min > limit {limit_minutes}min"
    )]
    AccumulationLimitExceeded {
        current_minutes: i64,
        limit_minutes: i64,
        requested_minutes: i64,
    },

    /// Debiting more than the available approved balance.
    #[error(
        "insufficient balance: available {available_minutes}min, requested {requested_minutes}min"
    )]
    InsufficientBalance {
        available_minutes: i64,
        requested_minutes: i64,
    },

    /// Debiting would exceed the monthly usage limit.
    #[error(
        "usage limit exceeded: {used_minutes}min already used this month + requested \
         {requested_minutes}min > limit {limit_minutes}min"
    )]
    UsageLimitExceeded {
        used_minutes: i64,
        limit_minutes: i64,
        requested_minutes: i64,
    },

    /// An overtime request would exceed the monthly overtime cap.
    #[error(
        "monthly overtime limit exceeded: {current_minutes}min submitted this month + requested \
         {requested_minutes}min > limit {limit_minutes}min"
    )]
    MonthlyLimitExceeded {
        current_minutes: i64,
        limit_minutes: i64,
        requested_minutes: i64,
    },

    /// Status change attempted on a record that is no longer pending.
    #[error("record {record_id} is {current_status}, only pending records can change status")]
    NotPending {
        record_id: String,
        current_status: String,
    },

    /// Validation error (wraps ValidationError).
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before business logic runs, for malformed hours, dates and
/// out-of-order punch timestamps.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Value must be strictly positive (ledger hours, overtime duration).
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (bad date, inverted window, malformed id).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Punch timestamps must be monotonic within a day.
    #[error("{punch} at {at} is not after the preceding punch at {previous}")]
    OutOfOrderPunch {
        punch: String,
        at: chrono::NaiveDateTime,
        previous: chrono::NaiveDateTime,
    },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

/// Convenience type alias for Results with ValidationError.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_error_carries_context() {
        let err = CoreError::AccumulationLimitExceeded {
            current_minutes: 2_280,
            limit_minutes: 2_400,
            requested_minutes: 180,
        };
        assert_eq!(
            err.to_string(),
            "accumulation limit exceeded: balance 2280min + requested 180min > limit 2400min"
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::MustBePositive {
            field: "hours".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }

    #[test]
    fn test_punch_error_messages() {
        let date = NaiveDate::from_ymd_opt(2026, 8, 24).unwrap();
        let err = CoreError::DuplicateEntry {
            employee_id: "emp-1".to_string(),
            date,
        };
        assert_eq!(
            err.to_string(),
            "employee emp-1 already clocked in on 2026-08-24"
        );
    }
}
