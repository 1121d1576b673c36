//! # Service Error Types
//!
//! The machine-checkable surface callers program against. Every rejection
//! a client can act on is a distinct variant with the context a UI needs to
//! explain it, and every variant serializes to the same structured shape:
//!
//! ```json
//! {
//!   "code": "ACCUMULATION_LIMIT_EXCEEDED",
//!   "message": "accumulation limit exceeded: ...",
//!   "context": { "currentMinutes": 2280, "limitMinutes": 2400, "requestedMinutes": 180 }
//! }
//! ```
//!
//! Core business errors pass through with their variant identity intact;
//! storage constraint races arrive as [`DbError`] and are translated at the
//! call site that knows which business rule the constraint encodes (a
//! unique-key loss on clock-in becomes `DuplicateEntry` there, not here).

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

use tempo_core::{CoreError, ValidationError};
use tempo_db::DbError;

/// Service-level errors.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The employee already clocked in on this date.
    #[error("employee {employee_id} already clocked in on {date}")]
    DuplicateEntry {
        employee_id: String,
        date: NaiveDate,
    },

    /// A punch arrived before the clock-in that must precede it.
    #[error("no clock-in recorded for {date}")]
    MissingEntry { date: NaiveDate },

    /// Lunch exit was already recorded.
    #[error("lunch exit already recorded for {date}")]
    DuplicateLunchExit { date: NaiveDate },

    /// Lunch return requires a lunch exit first.
    #[error("no lunch exit recorded for {date}")]
    MissingLunchExit { date: NaiveDate },

    /// Lunch return was already recorded.
    #[error("lunch return already recorded for {date}")]
    DuplicateLunchReturn { date: NaiveDate },

    /// The day is already finalized.
    #[error("clock-out already recorded for {date}")]
    DuplicateExit { date: NaiveDate },

    /// No working window configured for this weekday.
    #[error("no work schedule configured for employee {employee_id} on {date}")]
    NoScheduleConfigured {
        employee_id: String,
        date: NaiveDate,
    },

    /// Late clock-in needs a justification under the current policy.
    #[error("clock-in is {late_minutes}min late and requires a justification")]
    JustificationRequired { late_minutes: i64 },

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

    /// Entity not found.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// The actor's scope does not cover the target employee.
    #[error("forbidden: {message}")]
    Forbidden { message: String },

    /// Input validation failure.
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Storage failure with no business meaning.
    #[error("database error: {0}")]
    Database(DbError),
}

/// Structured wire shape of a rejection.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub context: Value,
}

impl ServiceError {
    /// Stable machine-readable code for each variant.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::DuplicateEntry { .. } => "DUPLICATE_ENTRY",
            ServiceError::MissingEntry { .. } => "MISSING_ENTRY",
            ServiceError::DuplicateLunchExit { .. } => "DUPLICATE_LUNCH_EXIT",
            ServiceError::MissingLunchExit { .. } => "MISSING_LUNCH_EXIT",
            ServiceError::DuplicateLunchReturn { .. } => "DUPLICATE_LUNCH_RETURN",
            ServiceError::DuplicateExit { .. } => "DUPLICATE_EXIT",
            ServiceError::NoScheduleConfigured { .. } => "NO_SCHEDULE_CONFIGURED",
            ServiceError::JustificationRequired { .. } => "JUSTIFICATION_REQUIRED",
            ServiceError::AccumulationLimitExceeded { .. } => "ACCUMULATION_LIMIT_EXCEEDED",
            ServiceError::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
            ServiceError::UsageLimitExceeded { .. } => "USAGE_LIMIT_EXCEEDED",
            ServiceError::MonthlyLimitExceeded { .. } => "MONTHLY_LIMIT_EXCEEDED",
            ServiceError::NotPending { .. } => "NOT_PENDING",
            ServiceError::NotFound { .. } => "NOT_FOUND",
            ServiceError::Forbidden { .. } => "FORBIDDEN",
            ServiceError::Validation { .. } => "VALIDATION_ERROR",
            ServiceError::Database(_) => "DATABASE_ERROR",
        }
    }

    /// The variant's context fields as JSON, `null` when there are none.
    pub fn context(&self) -> Value {
        match self {
            ServiceError::JustificationRequired { late_minutes } => {
                json!({ "lateMinutes": late_minutes })
            }
            ServiceError::AccumulationLimitExceeded {
                current_minutes,
                limit_minutes,
                requested_minutes,
            }
            | ServiceError::MonthlyLimitExceeded {
                current_minutes,
                limit_minutes,
                requested_minutes,
            } => json!({
                "currentMinutes": current_minutes,
                "limitMinutes": limit_minutes,
                "requestedMinutes": requested_minutes,
            }),
            ServiceError::UsageLimitExceeded {
                used_minutes,
                limit_minutes,
                requested_minutes,
            } => json!({
                "usedMinutes": used_minutes,
                "limitMinutes": limit_minutes,
                "requestedMinutes": requested_minutes,
            }),
            ServiceError::InsufficientBalance {
                available_minutes,
                requested_minutes,
            } => json!({
                "availableMinutes": available_minutes,
                "requestedMinutes": requested_minutes,
            }),
            _ => Value::Null,
        }
    }

    /// Builds the serializable wire body.
    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            code: self.code(),
            message: self.to_string(),
            context: self.context(),
        }
    }

    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        ServiceError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ServiceError::Forbidden {
            message: message.into(),
        }
    }
}

impl From<CoreError> for ServiceError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::DuplicateEntry { employee_id, date } => {
                ServiceError::DuplicateEntry { employee_id, date }
            }
            CoreError::MissingEntry { date } => ServiceError::MissingEntry { date },
            CoreError::DuplicateLunchExit { date } => ServiceError::DuplicateLunchExit { date },
            CoreError::MissingLunchExit { date } => ServiceError::MissingLunchExit { date },
            CoreError::DuplicateLunchReturn { date } => {
                ServiceError::DuplicateLunchReturn { date }
            }
            CoreError::DuplicateExit { date } => ServiceError::DuplicateExit { date },
            CoreError::NoScheduleConfigured { employee_id, date } => {
                ServiceError::NoScheduleConfigured { employee_id, date }
            }
            CoreError::AccumulationLimitExceeded {
                current_minutes,
                limit_minutes,
                requested_minutes,
            } => ServiceError::AccumulationLimitExceeded {
                current_minutes,
                limit_minutes,
                requested_minutes,
            },
            CoreError::InsufficientBalance {
                available_minutes,
                requested_minutes,
            } => ServiceError::InsufficientBalance {
                available_minutes,
                requested_minutes,
            },
            CoreError::UsageLimitExceeded {
                used_minutes,
                limit_minutes,
                requested_minutes,
            } => ServiceError::UsageLimitExceeded {
                used_minutes,
                limit_minutes,
                requested_minutes,
            },
            CoreError::MonthlyLimitExceeded {
                current_minutes,
                limit_minutes,
                requested_minutes,
            } => ServiceError::MonthlyLimitExceeded {
                current_minutes,
                limit_minutes,
                requested_minutes,
            },
            CoreError::NotPending {
                record_id,
                current_status,
            } => ServiceError::NotPending {
                record_id,
                current_status,
            },
            CoreError::Validation(v) => v.into(),
        }
    }
}

impl From<ValidationError> for ServiceError {
    fn from(err: ValidationError) -> Self {
        ServiceError::Validation {
            message: err.to_string(),
        }
    }
}

impl From<DbError> for ServiceError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ServiceError::NotFound { entity, id },
            other => ServiceError::Database(other),
        }
    }
}

/// Result type for service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_error_body_shape() {
        let err = ServiceError::AccumulationLimitExceeded {
            current_minutes: 2_280,
            limit_minutes: 2_400,
            requested_minutes: 180,
        };
        let body = serde_json::to_value(err.to_body()).unwrap();

        assert_eq!(body["code"], "ACCUMULATION_LIMIT_EXCEEDED");
        assert_eq!(body["context"]["currentMinutes"], 2_280);
        assert_eq!(body["context"]["limitMinutes"], 2_400);
    }

    #[test]
    fn test_context_free_error_omits_context() {
        let err = ServiceError::forbidden("manager scope does not cover employee emp-9");
        let body = serde_json::to_value(err.to_body()).unwrap();

        assert_eq!(body["code"], "FORBIDDEN");
        assert!(body.get("context").is_none());
    }

    #[test]
    fn test_core_errors_keep_their_identity() {
        let core = CoreError::DuplicateExit {
            date: "2026-08-24".parse().unwrap(),
        };
        let service: ServiceError = core.into();
        assert!(matches!(service, ServiceError::DuplicateExit { .. }));
        assert_eq!(service.code(), "DUPLICATE_EXIT");
    }

    #[test]
    fn test_db_not_found_becomes_service_not_found() {
        let err: ServiceError = DbError::not_found("Employee", "emp-9").into();
        assert!(matches!(err, ServiceError::NotFound { .. }));
    }
}
