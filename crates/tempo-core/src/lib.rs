//! # tempo-core: Pure Business Logic for Tempo
//!
//! This crate is the **heart** of Tempo, an hour-bank and time-clock backend.
//! It contains all business rules as pure functions with zero I/O
//! dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Tempo Architecture                              │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    HTTP edge (external)                          │   │
//! │  │   POST /timeclock/clock-in … PATCH /hour-bank/records/:id       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    tempo-service                                 │   │
//! │  │   access scopes, orchestration, audit, notifications            │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ tempo-core (THIS CRATE) ★                        │   │
//! │  │                                                                  │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌───────────┐ ┌──────────────────┐  │   │
//! │  │   │ minutes  │ │ timemath │ │ timeclock │ │ hour_bank        │  │   │
//! │  │   │ Minutes  │ │ worked / │ │ 4-punch   │ │ balance fold,    │  │   │
//! │  │   │ (i64)    │ │ late /   │ │ state     │ │ limit checks     │  │   │
//! │  │   │          │ │ overtime │ │ machine   │ │                  │  │   │
//! │  │   └──────────┘ └──────────┘ └───────────┘ └──────────────────┘  │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌───────────┐                       │   │
//! │  │   │ schedule │ │ overtime │ │ types     │                       │   │
//! │  │   └──────────┘ └──────────┘ └───────────┘                       │   │
//! │  │                                                                  │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS            │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    tempo-db (Database Layer)                     │   │
//! │  │            SQLite queries, migrations, repositories              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`minutes`] - Integer duration type (no floating point in the ledger!)
//! - [`timemath`] - Worked/late/overtime arithmetic
//! - [`schedule`] - Weekly work schedules and date resolution
//! - [`timeclock`] - The four-punch daily state machine
//! - [`hour_bank`] - Ledger balance and limit rules
//! - [`overtime`] - Overtime-request duration and monthly caps
//! - [`types`] - Domain types (Employee, TimeClockRecord, HourBankRecord, ...)
//! - [`error`] - Domain error types
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: every rule is deterministic - same input = same output
//! 2. **No I/O**: database, network, file system access is FORBIDDEN here
//! 3. **Integer Minutes**: durations are whole minutes (i64); fractional
//!    hours exist only at the display boundary
//! 4. **Explicit Errors**: business rejections are typed, never strings or panics

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod hour_bank;
pub mod minutes;
pub mod overtime;
pub mod schedule;
pub mod timeclock;
pub mod timemath;
pub mod types;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use tempo_core::Minutes` instead of
// `use tempo_core::minutes::Minutes`

pub use error::{CoreError, CoreResult, ValidationError};
pub use hour_bank::Balance;
pub use minutes::Minutes;
pub use schedule::{DaySchedule, WorkSchedule};
pub use timeclock::{LedgerProposal, PunchState};
pub use types::*;
