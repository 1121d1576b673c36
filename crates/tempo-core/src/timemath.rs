//! # Time Arithmetic
//!
//! Pure, stateless functions deriving worked time, lateness and overtime
//! from punch timestamps and a day's working window.
//!
//! ## Where These Run
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                   Derivation at Clock-Out                               │
//! │                                                                         │
//! │  entry ── lunch_exit ── lunch_return ── exit                            │
//! │    │                                      │                             │
//! │    └──────────────┬───────────────────────┘                             │
//! │                   ▼                                                     │
//! │  worked_minutes(entry, exit, lunch punches, default lunch)              │
//! │  scheduled_minutes(day window, default lunch)                           │
//! │                   │                                                     │
//! │                   ▼                                                     │
//! │  overtime = max(0, worked − scheduled) + lunch_overtime                 │
//! │  negative = max(0, scheduled − worked)                                  │
//! │                   │                                                     │
//! │                   ▼                                                     │
//! │  overtime > 0 → pending hour-bank credit                                │
//! │  negative > 0 → pending hour-bank debit (capped at balance)             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All quantities are integer [`Minutes`]; chrono duration differences are
//! truncated to whole minutes, which is the resolution punch clocks report.

use chrono::{NaiveDateTime, NaiveTime};

use crate::minutes::Minutes;
use crate::schedule::DaySchedule;

/// Whole minutes elapsed from `from` to `to` (negative when `to` precedes).
fn minutes_between(from: NaiveDateTime, to: NaiveDateTime) -> Minutes {
    Minutes::new((to - from).num_minutes())
}

/// Elapsed working minutes between entry and exit, minus the lunch break.
///
/// When both lunch punches are present the actual lunch duration is
/// subtracted; otherwise the employee's default lunch break is assumed.
/// Floored at zero.
///
/// ## Example
/// ```rust
/// use chrono::NaiveDate;
/// use tempo_core::minutes::Minutes;
/// use tempo_core::timemath::worked_minutes;
///
/// let day = NaiveDate::from_ymd_opt(2026, 8, 24).unwrap();
/// let at = |h, m| day.and_hms_opt(h, m, 0).unwrap();
///
/// // 8h span, 1h punched lunch → 7h
/// let worked = worked_minutes(at(9, 0), at(17, 0), Some(at(12, 0)), Some(at(13, 0)), Minutes::new(60));
/// assert_eq!(worked.minutes(), 420);
///
/// // No lunch punches: fall back to the default break
/// let worked = worked_minutes(at(9, 0), at(17, 0), None, None, Minutes::new(60));
/// assert_eq!(worked.minutes(), 420);
/// ```
pub fn worked_minutes(
    entry: NaiveDateTime,
    exit: NaiveDateTime,
    lunch_exit: Option<NaiveDateTime>,
    lunch_return: Option<NaiveDateTime>,
    default_lunch: Minutes,
) -> Minutes {
    let span = minutes_between(entry, exit);
    let lunch = match (lunch_exit, lunch_return) {
        (Some(out), Some(back)) => minutes_between(out, back).floor_zero(),
        _ => default_lunch,
    };
    (span - lunch).floor_zero()
}

/// Expected working minutes for a day: window span minus the default lunch.
///
/// `None` (no schedule for that weekday) yields zero — a day off has no
/// expected hours.
pub fn scheduled_minutes(day: Option<&DaySchedule>, default_lunch: Minutes) -> Minutes {
    match day {
        Some(day) => (day.span() - default_lunch).floor_zero(),
        None => Minutes::zero(),
    }
}

/// Minutes late relative to the scheduled start, after the grace period.
///
/// ## Example
/// ```rust
/// use chrono::{NaiveDate, NaiveTime};
/// use tempo_core::minutes::Minutes;
/// use tempo_core::timemath::late_minutes;
///
/// let day = NaiveDate::from_ymd_opt(2026, 8, 24).unwrap();
/// let nine = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
///
/// let on_time = late_minutes(day.and_hms_opt(9, 7, 0).unwrap(), nine, Minutes::new(10));
/// assert_eq!(on_time.minutes(), 0);
///
/// let late = late_minutes(day.and_hms_opt(9, 15, 0).unwrap(), nine, Minutes::new(10));
/// assert_eq!(late.minutes(), 5);
/// ```
pub fn late_minutes(entry: NaiveDateTime, scheduled_start: NaiveTime, tolerance: Minutes) -> Minutes {
    let scheduled = entry.date().and_time(scheduled_start);
    (minutes_between(scheduled, entry) - tolerance).floor_zero()
}

/// Minutes the lunch break ran past the expected duration.
pub fn lunch_late_minutes(
    lunch_exit: NaiveDateTime,
    lunch_return: NaiveDateTime,
    expected_lunch: Minutes,
) -> Minutes {
    let actual = minutes_between(lunch_exit, lunch_return).floor_zero();
    (actual - expected_lunch).floor_zero()
}

/// Minutes of lunch the employee gave back by cutting the break short.
///
/// A shortened lunch counts as extra worked time and feeds the overtime
/// total.
pub fn lunch_overtime_minutes(
    lunch_exit: NaiveDateTime,
    lunch_return: NaiveDateTime,
    expected_lunch: Minutes,
) -> Minutes {
    let actual = minutes_between(lunch_exit, lunch_return).floor_zero();
    (expected_lunch - actual).floor_zero()
}

/// Overtime for the day: time past the expected hours, plus any lunch the
/// employee gave back.
pub fn overtime_minutes(worked: Minutes, scheduled: Minutes, lunch_overtime: Minutes) -> Minutes {
    (worked - scheduled).floor_zero() + lunch_overtime
}

/// Shortfall for the day: expected hours not worked.
///
/// Only meaningful when a schedule exists for the day; without one there is
/// nothing to fall short of (callers pass `scheduled = 0` in that case and
/// get zero back).
pub fn negative_minutes(worked: Minutes, scheduled: Minutes) -> Minutes {
    (scheduled - worked).floor_zero()
}

// =============================================================================
// Unit Tests
// =============================================================================
