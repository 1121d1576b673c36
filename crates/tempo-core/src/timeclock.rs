//! # Time-Clock State Machine
//!
//! One record per (employee, calendar date), driven through four punch
//! events. The record itself is the state; which punch columns are set
//! determines where in the day the machine stands.
//!
//! ## States
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  NotStarted ──clock_in──► Entered ──lunch_exit──► OnLunch               │
//! │                              │                       │                  │
//! │                              │                  lunch_return            │
//! │                              │                       │                  │
//! │                              │                       ▼                  │
//! │                              │               ReturnedFromLunch          │
//! │                              │                       │                  │
//! │                              └──────clock_out────────┘                  │
//! │                                        │                                │
//! │                                        ▼                                │
//! │                                     Exited  (terminal for the day)      │
//! │                                                                         │
//! │  clock_out is legal from Entered, OnLunch and ReturnedFromLunch;        │
//! │  a half-punched lunch falls back to the default lunch break.            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each punch may be recorded at most once, punches must be monotonic in
//! time, and finalization (clock-out) derives every total and proposes the
//! ledger side effects. Persistence, uniqueness races and balance capping
//! belong to the layers above; everything here is pure.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::minutes::Minutes;
use crate::schedule::DaySchedule;
use crate::timemath;
use crate::types::TimeClockRecord;

// =============================================================================
// Punch State
// =============================================================================

/// Where in the day the record stands, derived from the punch columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PunchState {
    NotStarted,
    Entered,
    OnLunch,
    ReturnedFromLunch,
    Exited,
}

// =============================================================================
// Ledger Proposal
// =============================================================================

/// The ledger side effects a finalized day asks for.
///
/// The credit is final (overtime minutes); the shortfall still has to be
/// capped at the employee's available balance by the ledger before a debit
/// is written, so it is carried separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LedgerProposal {
    /// Overtime to credit, zero when none.
    pub credit: Minutes,
    /// Uncapped shortfall to debit, zero when none.
    pub shortfall: Minutes,
}

// =============================================================================
// Transitions
// =============================================================================

impl TimeClockRecord {
    /// Creates the day's record from the first clock-in.
    ///
    /// The caller resolves the schedule first; requiring a [`DaySchedule`]
    /// here makes "no schedule, no clock-in" a type-level rule. Lateness is
    /// computed immediately against the window start and tolerance.
    pub fn open(
        id: String,
        employee_id: String,
        date: NaiveDate,
        at: NaiveDateTime,
        day: &DaySchedule,
        tolerance: Minutes,
        now: DateTime<Utc>,
    ) -> Self {
        let late = timemath::late_minutes(at, day.start, tolerance);

        TimeClockRecord {
            id,
            employee_id,
            date,
            entry_time: Some(at),
            lunch_exit_time: None,
            lunch_return_time: None,
            exit_time: None,
            late_minutes: late,
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

    /// Derives the current punch state from the punch columns.
    pub fn state(&self) -> PunchState {
        if self.exit_time.is_some() {
            PunchState::Exited
        } else if self.lunch_return_time.is_some() {
            PunchState::ReturnedFromLunch
        } else if self.lunch_exit_time.is_some() {
            PunchState::OnLunch
        } else if self.entry_time.is_some() {
            PunchState::Entered
        } else {
            PunchState::NotStarted
        }
    }

    /// True once the day is finalized.
    pub fn is_finalized(&self) -> bool {
        self.exit_time.is_some()
    }

    /// Records the lunch exit punch.
    pub fn punch_lunch_exit(&mut self, at: NaiveDateTime) -> CoreResult<()> {
        let entry = self.entry_time.ok_or(CoreError::MissingEntry { date: self.date })?;
        if self.lunch_exit_time.is_some() {
            return Err(CoreError::DuplicateLunchExit { date: self.date });
        }
        ensure_after("lunch exit", at, entry)?;

        self.lunch_exit_time = Some(at);
        Ok(())
    }

    /// Records the lunch return punch and the lunch lateness it implies.
    pub fn punch_lunch_return(
        &mut self,
        at: NaiveDateTime,
        expected_lunch: Minutes,
    ) -> CoreResult<()> {
        let lunch_exit = self
            .lunch_exit_time
            .ok_or(CoreError::MissingLunchExit { date: self.date })?;
        if self.lunch_return_time.is_some() {
            return Err(CoreError::DuplicateLunchReturn { date: self.date });
        }
        ensure_after("lunch return", at, lunch_exit)?;

        self.lunch_return_time = Some(at);
        self.lunch_late_minutes = timemath::lunch_late_minutes(lunch_exit, at, expected_lunch);
        Ok(())
    }

    /// Records the final clock-out, derives every total, and returns the
    /// ledger side effects the day calls for.
    pub fn punch_exit(
        &mut self,
        at: NaiveDateTime,
        day: &DaySchedule,
        default_lunch: Minutes,
    ) -> CoreResult<LedgerProposal> {
        let entry = self.entry_time.ok_or(CoreError::MissingEntry { date: self.date })?;
        if self.exit_time.is_some() {
            return Err(CoreError::DuplicateExit { date: self.date });
        }
        let previous = self
            .lunch_return_time
            .or(self.lunch_exit_time)
            .unwrap_or(entry);
        ensure_after("clock-out", at, previous)?;

        self.exit_time = Some(at);
        Ok(self.derive_totals(day, default_lunch))
    }

    /// Recomputes every derived field from the punch columns.
    ///
    /// Used after an administrative correction, where punches may have been
    /// overwritten out of sequence: nothing is patched incrementally, the
    /// whole derivation runs again. Returns the fresh ledger proposal when
    /// the record is finalized.
    pub fn recompute(
        &mut self,
        day: &DaySchedule,
        default_lunch: Minutes,
        tolerance: Minutes,
    ) -> Option<LedgerProposal> {
        self.late_minutes = match self.entry_time {
            Some(entry) => timemath::late_minutes(entry, day.start, tolerance),
            None => Minutes::zero(),
        };

        self.lunch_late_minutes = match (self.lunch_exit_time, self.lunch_return_time) {
            (Some(out), Some(back)) => timemath::lunch_late_minutes(out, back, default_lunch),
            _ => Minutes::zero(),
        };

        if self.exit_time.is_some() {
            Some(self.derive_totals(day, default_lunch))
        } else {
            self.worked_minutes = None;
            self.scheduled_minutes = None;
            self.overtime_minutes = None;
            self.negative_minutes = None;
            None
        }
    }

    /// Validates that overwritten punches still form a legal day.
    ///
    /// Corrections may rewrite any punch, but the result must keep the
    /// entry before everything, lunch punches paired in order, and cannot
    /// have an exit without an entry.
    pub fn validate_sequence(&self) -> CoreResult<()> {
        if self.exit_time.is_some() && self.entry_time.is_none() {
            return Err(CoreError::MissingEntry { date: self.date });
        }
        if self.lunch_return_time.is_some() && self.lunch_exit_time.is_none() {
            return Err(CoreError::MissingLunchExit { date: self.date });
        }

        let mut previous: Option<(&str, NaiveDateTime)> = None;
        let punches = [
            ("clock-in", self.entry_time),
            ("lunch exit", self.lunch_exit_time),
            ("lunch return", self.lunch_return_time),
            ("clock-out", self.exit_time),
        ];
        for (label, punch) in punches {
            if let Some(at) = punch {
                if let Some((_, prev_at)) = previous {
                    ensure_after(label, at, prev_at)?;
                }
                previous = Some((label, at));
            }
        }
        Ok(())
    }

    fn derive_totals(&mut self, day: &DaySchedule, default_lunch: Minutes) -> LedgerProposal {
        // punch_exit / validate_sequence guarantee entry and exit are set
        let entry = self.entry_time.expect("derive_totals requires entry_time");
        let exit = self.exit_time.expect("derive_totals requires exit_time");

        let worked = timemath::worked_minutes(
            entry,
            exit,
            self.lunch_exit_time,
            self.lunch_return_time,
            default_lunch,
        );
        let scheduled = timemath::scheduled_minutes(Some(day), default_lunch);

        let lunch_overtime = match (self.lunch_exit_time, self.lunch_return_time) {
            (Some(out), Some(back)) => timemath::lunch_overtime_minutes(out, back, default_lunch),
            _ => Minutes::zero(),
        };

        let overtime = timemath::overtime_minutes(worked, scheduled, lunch_overtime);
        let negative = timemath::negative_minutes(worked, scheduled);

        self.worked_minutes = Some(worked);
        self.scheduled_minutes = Some(scheduled);
        self.overtime_minutes = Some(overtime);
        self.negative_minutes = Some(negative);

        LedgerProposal {
            credit: overtime,
            shortfall: negative,
        }
    }
}

fn ensure_after(label: &str, at: NaiveDateTime, previous: NaiveDateTime) -> CoreResult<()> {
    if at <= previous {
        return Err(CoreError::Validation(ValidationError::OutOfOrderPunch {
            punch: label.to_string(),
            at,
            previous,
        }));
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 24).unwrap()
    }

    fn at(h: u32, m: u32) -> NaiveDateTime {
        monday().and_hms_opt(h, m, 0).unwrap()
    }

    fn nine_to_six() -> DaySchedule {
        DaySchedule::new(
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
        )
        .unwrap()
    }

    fn open_at(h: u32, m: u32) -> TimeClockRecord {
        TimeClockRecord::open(
            "tc-1".to_string(),
            "emp-1".to_string(),
            monday(),
            at(h, m),
            &nine_to_six(),
            Minutes::new(10),
            Utc::now(),
        )
    }

    #[test]
    fn test_open_computes_lateness() {
        let record = open_at(9, 20);
        assert_eq!(record.late_minutes.minutes(), 10);
        assert_eq!(record.state(), PunchState::Entered);

        let on_time = open_at(9, 5);
        assert_eq!(on_time.late_minutes.minutes(), 0);
    }

    #[test]
    fn test_full_day_walkthrough() {
        let mut record = open_at(9, 0);

        record.punch_lunch_exit(at(12, 0)).unwrap();
        assert_eq!(record.state(), PunchState::OnLunch);

        record.punch_lunch_return(at(13, 0), Minutes::new(60)).unwrap();
        assert_eq!(record.state(), PunchState::ReturnedFromLunch);
        assert_eq!(record.lunch_late_minutes.minutes(), 0);

        let proposal = record
            .punch_exit(at(18, 0), &nine_to_six(), Minutes::new(60))
            .unwrap();
        assert_eq!(record.state(), PunchState::Exited);
        assert_eq!(record.worked_minutes.unwrap().minutes(), 480);
        assert_eq!(record.scheduled_minutes.unwrap().minutes(), 480);
        assert_eq!(proposal.credit.minutes(), 0);
        assert_eq!(proposal.shortfall.minutes(), 0);
    }

    #[test]
    fn test_clock_out_without_lunch_punches() {
        // Late entry 09:20, exit 18:30, default 1h lunch:
        // worked 490min (8.17h), scheduled 480min, overtime 10min
        let mut record = open_at(9, 20);
        let proposal = record
            .punch_exit(at(18, 30), &nine_to_six(), Minutes::new(60))
            .unwrap();

        assert_eq!(record.late_minutes.minutes(), 10);
        assert_eq!(record.worked_minutes.unwrap().minutes(), 490);
        assert_eq!(record.worked_minutes.unwrap().hours_rounded(), 8.17);
        assert_eq!(record.scheduled_minutes.unwrap().minutes(), 480);
        assert_eq!(record.overtime_minutes.unwrap().minutes(), 10);
        assert_eq!(record.negative_minutes.unwrap().minutes(), 0);
        assert_eq!(proposal.credit.minutes(), 10);
    }

    #[test]
    fn test_short_day_proposes_shortfall() {
        let mut record = open_at(9, 0);
        let proposal = record
            .punch_exit(at(15, 0), &nine_to_six(), Minutes::new(60))
            .unwrap();

        assert_eq!(record.worked_minutes.unwrap().minutes(), 300);
        assert_eq!(record.negative_minutes.unwrap().minutes(), 180);
        assert_eq!(proposal.credit.minutes(), 0);
        assert_eq!(proposal.shortfall.minutes(), 180);
    }

    #[test]
    fn test_punch_order_is_enforced() {
        let mut record = open_at(9, 0);

        // lunch return before lunch exit
        let err = record.punch_lunch_return(at(13, 0), Minutes::new(60));
        assert!(matches!(err, Err(CoreError::MissingLunchExit { .. })));

        record.punch_lunch_exit(at(12, 0)).unwrap();
        let err = record.punch_lunch_exit(at(12, 30));
        assert!(matches!(err, Err(CoreError::DuplicateLunchExit { .. })));

        // lunch return must be after lunch exit
        let err = record.punch_lunch_return(at(11, 0), Minutes::new(60));
        assert!(matches!(err, Err(CoreError::Validation(_))));
    }

    #[test]
    fn test_double_exit_is_rejected_and_leaves_state_unchanged() {
        let mut record = open_at(9, 0);
        record
            .punch_exit(at(18, 0), &nine_to_six(), Minutes::new(60))
            .unwrap();
        let worked = record.worked_minutes;

        let err = record.punch_exit(at(19, 0), &nine_to_six(), Minutes::new(60));
        assert!(matches!(err, Err(CoreError::DuplicateExit { .. })));
        assert_eq!(record.worked_minutes, worked);
        assert_eq!(record.exit_time, Some(at(18, 0)));
    }

    #[test]
    fn test_short_lunch_counts_as_overtime() {
        let mut record = open_at(9, 0);
        record.punch_lunch_exit(at(12, 0)).unwrap();
        record.punch_lunch_return(at(12, 30), Minutes::new(60)).unwrap();

        let proposal = record
            .punch_exit(at(18, 0), &nine_to_six(), Minutes::new(60))
            .unwrap();

        // span 9h − 30min actual lunch = 510min worked vs 480 scheduled,
        // plus the 30min of lunch given back
        assert_eq!(record.worked_minutes.unwrap().minutes(), 510);
        assert_eq!(proposal.credit.minutes(), 60);
    }

    #[test]
    fn test_recompute_after_correction() {
        let mut record = open_at(9, 0);
        record
            .punch_exit(at(18, 0), &nine_to_six(), Minutes::new(60))
            .unwrap();

        // Correction: the employee actually left at 19:00
        record.exit_time = Some(at(19, 0));
        let proposal = record
            .recompute(&nine_to_six(), Minutes::new(60), Minutes::new(10))
            .unwrap();

        assert_eq!(record.worked_minutes.unwrap().minutes(), 540);
        assert_eq!(proposal.credit.minutes(), 60);
    }

    #[test]
    fn test_recompute_clears_totals_when_exit_removed() {
        let mut record = open_at(9, 0);
        record
            .punch_exit(at(18, 0), &nine_to_six(), Minutes::new(60))
            .unwrap();

        record.exit_time = None;
        let proposal = record.recompute(&nine_to_six(), Minutes::new(60), Minutes::new(10));
        assert!(proposal.is_none());
        assert!(record.worked_minutes.is_none());
        assert!(record.overtime_minutes.is_none());
    }

    #[test]
    fn test_validate_sequence() {
        let mut record = open_at(9, 0);
        record.lunch_exit_time = Some(at(12, 0));
        record.lunch_return_time = Some(at(13, 0));
        record.exit_time = Some(at(18, 0));
        assert!(record.validate_sequence().is_ok());

        record.lunch_return_time = Some(at(11, 0));
        assert!(record.validate_sequence().is_err());

        record.lunch_return_time = None;
        record.lunch_exit_time = None;
        assert!(record.validate_sequence().is_ok());

        record.entry_time = None;
        assert!(matches!(
            record.validate_sequence(),
            Err(CoreError::MissingEntry { .. })
        ));
    }
}
