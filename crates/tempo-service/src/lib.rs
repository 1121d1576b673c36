//! # tempo-service: Orchestration Layer
//!
//! Wires the pure rules in `tempo-core` to the repositories in `tempo-db`
//! and exposes the operations an HTTP edge would mount.
//!
//! ## Layer Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          tempo-service                                  │
//! │                                                                         │
//! │  TimeClockService     four-punch workflow, corrections, ledger side     │
//! │                       effects of a finalized day                        │
//! │  HourBankService      balance, proposals, approval with authoritative   │
//! │                       limit re-checks                                   │
//! │  OvertimeService      monthly-cap submissions, idempotent approval      │
//! │                                                                         │
//! │  AccessScope          role → SelfOnly | Department | All                │
//! │  Auditor              best-effort audit sink                            │
//! │  PunchNotifier        fire-and-forget punch fan-out                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod access;
pub mod audit;
pub mod error;
pub mod hour_bank;
pub mod notify;
pub mod overtime;
pub mod timeclock;

pub use access::AccessScope;
pub use audit::Auditor;
pub use error::{ErrorBody, ServiceError, ServiceResult};
pub use hour_bank::HourBankService;
pub use notify::{LogNotifier, PunchEvent, PunchNotifier};
pub use overtime::OvertimeService;
pub use timeclock::{ClockInOutcome, PunchCorrection, TimeClockService};

// =============================================================================
// Workflow Tests
// =============================================================================
