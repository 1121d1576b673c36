//! # Hour-Bank Ledger Rules
//!
//! Balance computation and limit enforcement for the compensatory-time
//! ledger.
//!
//! ## The Fold
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  balance = Σ minutes(approved credits) − Σ minutes(approved debits)     │
//! │                                                                         │
//! │  pending entries NEVER affect the balance; they are reported            │
//! │  separately as pendingCredit / pendingDebit so a manager can see        │
//! │  what is queued. Rejected entries affect nothing.                       │
//! │                                                                         │
//! │  Recomputed from the full record set on every call: per-employee        │
//! │  record volume is small, and a cached running total is one more         │
//! │  invariant to break.                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Limit checks are used twice: proactively before an insert, and again at
//! approval time — the approval-time check is the authoritative gate when
//! concurrent inserts race the proactive one.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::minutes::Minutes;
use crate::types::{HourBankRecord, LedgerEntryType, RecordStatus};

// =============================================================================
// Balance
// =============================================================================

/// Snapshot of an employee's hour bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Balance {
    /// Approved credits minus approved debits.
    pub total: Minutes,
    /// What a debit may consume right now. Equal to `total` under the
    /// current policy (pending debits are not reserved).
    pub available: Minutes,
    /// Sum of pending credits, reported for visibility only.
    pub pending_credit: Minutes,
    /// Sum of pending debits, reported for visibility only.
    pub pending_debit: Minutes,
}

/// Folds an employee's full record set into a balance snapshot.
pub fn balance(records: &[HourBankRecord]) -> Balance {
    let mut total = Minutes::zero();
    let mut pending_credit = Minutes::zero();
    let mut pending_debit = Minutes::zero();

    for record in records {
        match (record.status, record.entry_type) {
            (RecordStatus::Approved, LedgerEntryType::Credit) => total += record.minutes,
            (RecordStatus::Approved, LedgerEntryType::Debit) => total -= record.minutes,
            (RecordStatus::Pending, LedgerEntryType::Credit) => pending_credit += record.minutes,
            (RecordStatus::Pending, LedgerEntryType::Debit) => pending_debit += record.minutes,
            (RecordStatus::Rejected, _) => {}
        }
    }

    Balance {
        total,
        available: total,
        pending_credit,
        pending_debit,
    }
}

/// Sum of approved debit minutes within one calendar month.
///
/// The usage limit is a monthly budget, so only debits dated inside the
/// month count against it.
pub fn month_debit_usage(records: &[HourBankRecord], year: i32, month: u32) -> Minutes {
    records
        .iter()
        .filter(|r| {
            r.status == RecordStatus::Approved
                && r.entry_type == LedgerEntryType::Debit
                && r.date.year() == year
                && r.date.month() == month
        })
        .map(|r| r.minutes)
        .sum()
}

// =============================================================================
// Limit Checks
// =============================================================================

/// Ledger entry minutes must be strictly positive.
pub fn validate_entry_minutes(minutes: Minutes) -> CoreResult<()> {
    if !minutes.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "hours".to_string(),
        }
        .into());
    }
    Ok(())
}

/// Rejects a credit that would push the balance past the accumulation limit.
///
/// A zero limit means unlimited accumulation.
pub fn check_accumulation_limit(
    current_total: Minutes,
    limit: Minutes,
    requested: Minutes,
) -> CoreResult<()> {
    if limit.is_positive() && (current_total + requested) > limit {
        return Err(CoreError::AccumulationLimitExceeded {
            current_minutes: current_total.minutes(),
            limit_minutes: limit.minutes(),
            requested_minutes: requested.minutes(),
        });
    }
    Ok(())
}

/// Rejects a debit larger than the available approved balance.
pub fn check_sufficient_balance(available: Minutes, requested: Minutes) -> CoreResult<()> {
    if available < requested {
        return Err(CoreError::InsufficientBalance {
            available_minutes: available.minutes(),
            requested_minutes: requested.minutes(),
        });
    }
    Ok(())
}

/// Rejects a debit that would exceed the monthly usage limit.
///
/// A zero limit means unlimited usage.
pub fn check_usage_limit(used_this_month: Minutes, limit: Minutes, requested: Minutes) -> CoreResult<()> {
    if limit.is_positive() && (used_this_month + requested) > limit {
        return Err(CoreError::UsageLimitExceeded {
            used_minutes: used_this_month.minutes(),
            limit_minutes: limit.minutes(),
            requested_minutes: requested.minutes(),
        });
    }
    Ok(())
}

/// Caps an automatic shortfall debit at the available balance.
///
/// Negative-hours adjustments never drive the balance negative; whatever
/// the cap cannot cover is simply not debited. Returns `None` when nothing
/// can be debited at all.
pub fn cap_shortfall_debit(shortfall: Minutes, available: Minutes) -> Option<Minutes> {
    let capped = shortfall.min(available.floor_zero());
    capped.is_positive().then_some(capped)
}

// =============================================================================
// Status Transitions
// =============================================================================

impl HourBankRecord {
    /// Marks a pending entry approved, clearing any rejection fields.
    pub fn approve(&mut self, actor_id: &str, now: DateTime<Utc>) -> CoreResult<()> {
        self.ensure_pending()?;
        self.status = RecordStatus::Approved;
        self.approved_by = Some(actor_id.to_string());
        self.approved_at = Some(now);
        self.rejected_by = None;
        self.rejected_at = None;
        Ok(())
    }

    /// Marks a pending entry rejected, clearing any approval fields.
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

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn entry(
        entry_type: LedgerEntryType,
        minutes: i64,
        status: RecordStatus,
        date: NaiveDate,
    ) -> HourBankRecord {
        HourBankRecord {
            id: uuid::Uuid::new_v4().to_string(),
            employee_id: "emp-1".to_string(),
            date,
            entry_type,
            minutes: Minutes::new(minutes),
            reason: "test".to_string(),
            status,
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

    fn aug(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, day).unwrap()
    }

    #[test]
    fn test_balance_folds_only_approved() {
        let records = vec![
            entry(LedgerEntryType::Credit, 120, RecordStatus::Approved, aug(3)),
            entry(LedgerEntryType::Credit, 60, RecordStatus::Approved, aug(4)),
            entry(LedgerEntryType::Debit, 30, RecordStatus::Approved, aug(5)),
            entry(LedgerEntryType::Credit, 45, RecordStatus::Pending, aug(6)),
            entry(LedgerEntryType::Debit, 15, RecordStatus::Pending, aug(7)),
            entry(LedgerEntryType::Credit, 500, RecordStatus::Rejected, aug(8)),
        ];

        let snapshot = balance(&records);
        assert_eq!(snapshot.total.minutes(), 150);
        assert_eq!(snapshot.available.minutes(), 150);
        assert_eq!(snapshot.pending_credit.minutes(), 45);
        assert_eq!(snapshot.pending_debit.minutes(), 15);
    }

    #[test]
    fn test_balance_of_empty_ledger_is_zero() {
        let snapshot = balance(&[]);
        assert!(snapshot.total.is_zero());
        assert!(snapshot.pending_credit.is_zero());
    }

    #[test]
    fn test_month_usage_filters_by_month_and_status() {
        let records = vec![
            entry(LedgerEntryType::Debit, 60, RecordStatus::Approved, aug(3)),
            entry(LedgerEntryType::Debit, 30, RecordStatus::Approved, aug(20)),
            entry(LedgerEntryType::Debit, 99, RecordStatus::Pending, aug(21)),
            entry(
                LedgerEntryType::Debit,
                45,
                RecordStatus::Approved,
                NaiveDate::from_ymd_opt(2026, 7, 30).unwrap(),
            ),
            entry(LedgerEntryType::Credit, 500, RecordStatus::Approved, aug(10)),
        ];

        assert_eq!(month_debit_usage(&records, 2026, 8).minutes(), 90);
        assert_eq!(month_debit_usage(&records, 2026, 7).minutes(), 45);
        assert_eq!(month_debit_usage(&records, 2026, 6).minutes(), 0);
    }

    #[test]
    fn test_accumulation_limit() {
        // limit 40h, balance 38h, requesting 3h → over
        let err = check_accumulation_limit(
            Minutes::from_whole_hours(38),
            Minutes::from_whole_hours(40),
            Minutes::from_whole_hours(3),
        );
        assert!(matches!(err, Err(CoreError::AccumulationLimitExceeded { .. })));

        // exactly at the limit is allowed
        check_accumulation_limit(
            Minutes::from_whole_hours(38),
            Minutes::from_whole_hours(40),
            Minutes::from_whole_hours(2),
        )
        .unwrap();

        // zero limit = unlimited
        check_accumulation_limit(
            Minutes::from_whole_hours(1_000),
            Minutes::zero(),
            Minutes::from_whole_hours(1_000),
        )
        .unwrap();
    }

    #[test]
    fn test_sufficient_balance() {
        assert!(matches!(
            check_sufficient_balance(Minutes::new(30), Minutes::new(60)),
            Err(CoreError::InsufficientBalance { .. })
        ));
        check_sufficient_balance(Minutes::new(60), Minutes::new(60)).unwrap();
    }

    #[test]
    fn test_usage_limit() {
        let err = check_usage_limit(
            Minutes::from_whole_hours(9),
            Minutes::from_whole_hours(10),
            Minutes::from_whole_hours(2),
        );
        assert!(matches!(err, Err(CoreError::UsageLimitExceeded { .. })));

        check_usage_limit(
            Minutes::from_whole_hours(9),
            Minutes::from_whole_hours(10),
            Minutes::from_whole_hours(1),
        )
        .unwrap();

        check_usage_limit(
            Minutes::from_whole_hours(99),
            Minutes::zero(),
            Minutes::from_whole_hours(99),
        )
        .unwrap();
    }

    #[test]
    fn test_cap_shortfall_debit() {
        // shortfall larger than balance: capped
        assert_eq!(
            cap_shortfall_debit(Minutes::new(120), Minutes::new(90)),
            Some(Minutes::new(90))
        );
        // shortfall within balance: full
        assert_eq!(
            cap_shortfall_debit(Minutes::new(60), Minutes::new(90)),
            Some(Minutes::new(60))
        );
        // empty balance: no debit at all
        assert_eq!(cap_shortfall_debit(Minutes::new(60), Minutes::zero()), None);
        assert_eq!(cap_shortfall_debit(Minutes::new(60), Minutes::new(-30)), None);
    }

    #[test]
    fn test_validate_entry_minutes() {
        assert!(validate_entry_minutes(Minutes::zero()).is_err());
        assert!(validate_entry_minutes(Minutes::new(-5)).is_err());
        validate_entry_minutes(Minutes::new(1)).unwrap();
    }

    #[test]
    fn test_status_transitions() {
        let mut record = entry(LedgerEntryType::Credit, 60, RecordStatus::Pending, aug(3));
        record.approve("mgr-1", Utc::now()).unwrap();
        assert_eq!(record.status, RecordStatus::Approved);
        assert_eq!(record.approved_by.as_deref(), Some("mgr-1"));
        assert!(record.rejected_by.is_none());

        // a second transition is rejected
        let err = record.reject("mgr-1", Utc::now());
        assert!(matches!(err, Err(CoreError::NotPending { .. })));

        let mut record = entry(LedgerEntryType::Debit, 60, RecordStatus::Pending, aug(3));
        record.reject("mgr-2", Utc::now()).unwrap();
        assert_eq!(record.status, RecordStatus::Rejected);
        assert!(record.approved_at.is_none());
    }
}
