//! # Overtime Request Rules
//!
//! A manually-submitted variant of "extra hours worked": the employee asks
//! for a discrete start–end span on a date, a manager approves or rejects,
//! and approval credits the hour bank.
//!
//! The monthly cap resolves in three steps: the employee's own limit if set,
//! otherwise the company default, then any (month, year) exception adds on
//! top. Approved *and* pending requests both count against the cap — a stack
//! of pending requests cannot oversubscribe the month.

use chrono::{DateTime, NaiveTime, Utc};

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::minutes::Minutes;
use crate::types::{CompanySettings, Employee, OvertimeRequest, RecordStatus};

/// Minutes in a civil day.
const DAY_MINUTES: i64 = 24 * 60;

/// Duration of a start–end span on a wall clock.
///
/// A span that wraps past midnight (end before start) is read as a 24h-modulo
/// duration: 22:00 → 02:00 is four hours.
///
/// ## Example
/// ```rust
/// use chrono::NaiveTime;
/// use tempo_core::overtime::span_minutes;
///
/// let t = |h, m| NaiveTime::from_hms_opt(h, m, 0).unwrap();
/// assert_eq!(span_minutes(t(18, 0), t(20, 30)).minutes(), 150);
/// assert_eq!(span_minutes(t(22, 0), t(2, 0)).minutes(), 240);
/// ```
pub fn span_minutes(start: NaiveTime, end: NaiveTime) -> Minutes {
    let raw = (end - start).num_minutes();
    Minutes::new(raw.rem_euclid(DAY_MINUTES))
}

/// Validates a submitted span: zero-length requests carry no hours.
pub fn validate_span(start: NaiveTime, end: NaiveTime) -> CoreResult<Minutes> {
    let span = span_minutes(start, end);
    if !span.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "endTime - startTime".to_string(),
        }
        .into());
    }
    Ok(span)
}

/// Resolves the monthly overtime cap for an employee.
///
/// `employee.overtime_limit` overrides the company default; a matching
/// (month, year) exception raises whichever applied.
pub fn monthly_limit(employee: &Employee, settings: &CompanySettings, month: u32, year: i32) -> Minutes {
    let base = employee
        .overtime_limit
        .unwrap_or(settings.default_overtime_limit);
    let extra = employee
        .exception_for(month, year)
        .map(|e| e.additional)
        .unwrap_or(Minutes::zero());
    base + extra
}

/// Sum of approved and pending request minutes — the month's committed total.
pub fn committed_minutes(requests: &[OvertimeRequest]) -> Minutes {
    requests
        .iter()
        .filter(|r| matches!(r.status, RecordStatus::Approved | RecordStatus::Pending))
        .map(|r| r.minutes)
        .sum()
}

/// Rejects a submission that would push the month over its cap.
pub fn check_monthly_limit(committed: Minutes, limit: Minutes, requested: Minutes) -> CoreResult<()> {
    if (committed + requested) > limit {
        return Err(CoreError::MonthlyLimitExceeded {
            current_minutes: committed.minutes(),
            limit_minutes: limit.minutes(),
            requested_minutes: requested.minutes(),
        });
    }
    Ok(())
}

// =============================================================================
// Status Transitions
// =============================================================================

impl OvertimeRequest {
    /// Marks a pending request approved.
    pub fn approve(&mut self, actor_id: &str, now: DateTime<Utc>) -> CoreResult<()> {
        self.ensure_pending()?;
        self.status = RecordStatus::Approved;
        self.approved_by = Some(actor_id.to_string());
        self.approved_at = Some(now);
        self.rejected_by = None;
        self.rejected_at = None;
        Ok(())
    }

    /// Marks a pending request rejected.
    pub fn reject(&mut self, actor_id: &str, now: DateTime<Utc>) -> CoreResult<()> {
        self.ensure_pending()?;
        self.status = RecordStatus::Rejected;
        self.rejected_by = Some(actor_id.to_string());
        self.rejected_at = Some(now);
        self.approved_by = None;
        self.approved_at = None;
        Ok(())
    }

    fn ensure_pending(&self) -> CoreResult<()> {
        if self.status != RecordStatus::Pending {
            return Err(CoreError::NotPending {
                record_id: self.id.clone(),
                current_status: self.status.as_str().to_string(),
            });
        }
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
