//! # Minutes Module
//!
//! Provides the `Minutes` type for handling work durations safely.
//!
//! ## Why Integer Minutes?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In floating point hour math:                                           │
//! │    0.1h + 0.2h = 0.30000000000000004h  ❌ WRONG!                        │
//! │                                                                         │
//! │  An hour-bank ledger folded over thousands of fractional-hour           │
//! │  entries drifts, and balances stop matching the punch history.          │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Minutes                                          │
//! │    490 minutes is exactly 490 minutes.                                  │
//! │    Fractional hours (8.17) exist only at the display boundary.          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use tempo_core::minutes::Minutes;
//!
//! let worked = Minutes::new(490);
//! assert_eq!(worked.hours_rounded(), 8.17); // display only
//!
//! let overtime = worked - Minutes::new(480);
//! assert_eq!(overtime.minutes(), 10);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};

// =============================================================================
// Minutes Type
// =============================================================================

/// A duration of work time, in whole minutes.
///
/// ## Design Decisions
/// - **i64 (signed)**: intermediate arithmetic (worked − scheduled) may dip
///   below zero before being clamped
/// - **Single field tuple struct**: zero-cost abstraction over i64
/// - **Hours are derived**: `as_hours()`/`hours_rounded()` are display-only;
///   nothing internal ever stores fractional hours
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Minutes(i64);

impl Minutes {
    /// Creates a duration from whole minutes.
    #[inline]
    pub const fn new(minutes: i64) -> Self {
        Minutes(minutes)
    }

    /// Creates a duration from whole hours.
    ///
    /// ## Example
    /// ```rust
    /// use tempo_core::minutes::Minutes;
    ///
    /// assert_eq!(Minutes::from_whole_hours(8).minutes(), 480);
    /// ```
    #[inline]
    pub const fn from_whole_hours(hours: i64) -> Self {
        Minutes(hours * 60)
    }

    /// Creates a duration from fractional hours, rounded to the nearest
    /// minute. This is the API boundary: clients submit decimal hours,
    /// the ledger stores minutes.
    ///
    /// ## Example
    /// ```rust
    /// use tempo_core::minutes::Minutes;
    ///
    /// assert_eq!(Minutes::from_hours(1.5).minutes(), 90);
    /// assert_eq!(Minutes::from_hours(0.17).minutes(), 10);
    /// ```
    pub fn from_hours(hours: f64) -> Self {
        Minutes((hours * 60.0).round() as i64)
    }

    /// Returns the value in whole minutes.
    #[inline]
    pub const fn minutes(&self) -> i64 {
        self.0
    }

    /// Returns the duration as fractional hours (unrounded).
    #[inline]
    pub fn as_hours(&self) -> f64 {
        self.0 as f64 / 60.0
    }

    /// Returns fractional hours rounded to 2 decimal places, for display
    /// and API responses only.
    ///
    /// ## Example
    /// ```rust
    /// use tempo_core::minutes::Minutes;
    ///
    /// assert_eq!(Minutes::new(490).hours_rounded(), 8.17);
    /// ```
    pub fn hours_rounded(&self) -> f64 {
        (self.as_hours() * 100.0).round() / 100.0
    }

    /// Zero duration.
    #[inline]
    pub const fn zero() -> Self {
        Minutes(0)
    }

    /// Checks if the duration is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the duration is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the duration is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Clamps negative durations to zero.
    ///
    /// Every derived quantity (lateness, overtime, shortfall) is defined as
    /// `max(0, …)`; this is that floor.
    #[inline]
    pub const fn floor_zero(&self) -> Self {
        if self.0 < 0 {
            Minutes(0)
        } else {
            *self
        }
    }

    /// Returns the smaller of two durations.
    #[inline]
    pub const fn min(self, other: Self) -> Self {
        if self.0 <= other.0 {
            self
        } else {
            other
        }
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display shows `H:MM` for debugging. Use `hours_rounded()` for API output.
impl fmt::Display for Minutes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.abs();
        write!(f, "{}{}:{:02}", sign, abs / 60, abs % 60)
    }
}

/// Default duration is zero.
impl Default for Minutes {
    fn default() -> Self {
        Minutes::zero()
    }
}

impl Add for Minutes {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Minutes(self.0 + other.0)
    }
}

impl AddAssign for Minutes {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Minutes {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Minutes(self.0 - other.0)
    }
}

impl SubAssign for Minutes {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl std::iter::Sum for Minutes {
    fn sum<I: Iterator<Item = Minutes>>(iter: I) -> Self {
        iter.fold(Minutes::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
