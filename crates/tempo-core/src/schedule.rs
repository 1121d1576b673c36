//! # Work Schedule Resolver
//!
//! An employee's weekly schedule and the lookup from a calendar date to the
//! applicable start/end pair.
//!
//! ## Representation
//! A fixed-size array of 7 optional `{start, end}` entries, Monday first.
//! A `None` entry is a non-working day; clocking in on such a day is a
//! configuration error, because without a schedule there are no expected
//! hours to compare against.

use chrono::{Datelike, NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::{ValidationError, ValidationResult};
use crate::minutes::Minutes;

// =============================================================================
// Day Schedule
// =============================================================================

/// The expected working window for a single weekday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaySchedule {
    /// Expected clock-in time.
    pub start: NaiveTime,
    /// Expected clock-out time. Must be after `start`.
    pub end: NaiveTime,
}

impl DaySchedule {
    /// Creates a day schedule, rejecting inverted windows.
    pub fn new(start: NaiveTime, end: NaiveTime) -> ValidationResult<Self> {
        if end <= start {
            return Err(ValidationError::InvalidFormat {
                field: "workSchedule".to_string(),
                reason: format!("end time {} is not after start time {}", end, start),
            });
        }
        Ok(DaySchedule { start, end })
    }

    /// Gross span of the working window (lunch not yet subtracted).
    pub fn span(&self) -> Minutes {
        Minutes::new((self.end - self.start).num_minutes())
    }
}

// =============================================================================
// Weekly Schedule
// =============================================================================

/// A full weekly schedule: up to 7 weekday entries, Monday first.
///
/// ## Example
/// ```rust
/// use chrono::{NaiveDate, NaiveTime};
/// use tempo_core::schedule::{DaySchedule, WorkSchedule};
///
/// let nine = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
/// let six = NaiveTime::from_hms_opt(18, 0, 0).unwrap();
/// let mut schedule = WorkSchedule::empty();
/// schedule.set_day(chrono::Weekday::Mon, Some(DaySchedule::new(nine, six).unwrap()));
///
/// // 2026-08-24 is a Monday
/// let monday = NaiveDate::from_ymd_opt(2026, 8, 24).unwrap();
/// assert!(schedule.for_date(monday).is_some());
/// let tuesday = monday.succ_opt().unwrap();
/// assert!(schedule.for_date(tuesday).is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkSchedule {
    /// Index 0 = Monday … index 6 = Sunday.
    days: [Option<DaySchedule>; 7],
}

impl WorkSchedule {
    /// A schedule with no working days.
    pub const fn empty() -> Self {
        WorkSchedule { days: [None; 7] }
    }

    /// Builds a schedule from 7 optional entries, Monday first.
    pub const fn from_days(days: [Option<DaySchedule>; 7]) -> Self {
        WorkSchedule { days }
    }

    /// Sets or clears the entry for one weekday.
    pub fn set_day(&mut self, weekday: Weekday, day: Option<DaySchedule>) {
        self.days[weekday.num_days_from_monday() as usize] = day;
    }

    /// Returns the entry for one weekday.
    pub fn day(&self, weekday: Weekday) -> Option<&DaySchedule> {
        self.days[weekday.num_days_from_monday() as usize].as_ref()
    }

    /// Resolves the applicable working window for a calendar date.
    ///
    /// `None` means the date falls on a non-working day.
    pub fn for_date(&self, date: NaiveDate) -> Option<&DaySchedule> {
        self.day(date.weekday())
    }

    /// True when no weekday has a working window at all.
    pub fn is_empty(&self) -> bool {
        self.days.iter().all(Option::is_none)
    }

    /// Iterates `(weekday, entry)` pairs, Monday first.
    pub fn iter(&self) -> impl Iterator<Item = (Weekday, Option<&DaySchedule>)> {
        const WEEKDAYS: [Weekday; 7] = [
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
            Weekday::Sat,
            Weekday::Sun,
        ];
        WEEKDAYS
            .into_iter()
            .zip(self.days.iter().map(Option::as_ref))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_day_schedule_rejects_inverted_window() {
        assert!(DaySchedule::new(t(18, 0), t(9, 0)).is_err());
        assert!(DaySchedule::new(t(9, 0), t(9, 0)).is_err());
        assert!(DaySchedule::new(t(9, 0), t(18, 0)).is_ok());
    }

    #[test]
    fn test_span() {
        let day = DaySchedule::new(t(9, 0), t(18, 0)).unwrap();
        assert_eq!(day.span().minutes(), 540);
    }

    #[test]
    fn test_resolver_picks_weekday_entry() {
        let mut schedule = WorkSchedule::empty();
        schedule.set_day(Weekday::Mon, Some(DaySchedule::new(t(9, 0), t(18, 0)).unwrap()));
        schedule.set_day(Weekday::Fri, Some(DaySchedule::new(t(8, 0), t(14, 0)).unwrap()));

        let monday = NaiveDate::from_ymd_opt(2026, 8, 24).unwrap();
        assert_eq!(monday.weekday(), Weekday::Mon);

        assert_eq!(schedule.for_date(monday).unwrap().start, t(9, 0));

        let friday = NaiveDate::from_ymd_opt(2026, 8, 28).unwrap();
        assert_eq!(schedule.for_date(friday).unwrap().end, t(14, 0));

        // Saturday is a day off
        let saturday = NaiveDate::from_ymd_opt(2026, 8, 29).unwrap();
        assert!(schedule.for_date(saturday).is_none());
    }

    #[test]
    fn test_is_empty() {
        let mut schedule = WorkSchedule::empty();
        assert!(schedule.is_empty());
        schedule.set_day(Weekday::Wed, Some(DaySchedule::new(t(9, 0), t(17, 0)).unwrap()));
        assert!(!schedule.is_empty());
        schedule.set_day(Weekday::Wed, None);
        assert!(schedule.is_empty());
    }

    #[test]
    fn test_iter_order_is_monday_first() {
        let mut schedule = WorkSchedule::empty();
        schedule.set_day(Weekday::Sun, Some(DaySchedule::new(t(10, 0), t(16, 0)).unwrap()));
        let collected: Vec<_> = schedule.iter().collect();
        assert_eq!(collected.len(), 7);
        assert_eq!(collected[0].0, Weekday::Mon);
        assert!(collected[6].1.is_some());
    }
}
