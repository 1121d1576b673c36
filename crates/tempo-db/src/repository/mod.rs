//! # Repository Modules
//!
//! One repository per aggregate, each owning a clone of the shared pool.
//! Repositories execute SQL and map rows to `tempo-core` domain types;
//! business rules stay out of this layer.

pub mod audit;
pub mod employee;
pub mod hour_bank;
pub mod justification;
pub mod overtime;
pub mod settings;
pub mod timeclock;

pub use audit::{AuditEntry, AuditRepository};
pub use employee::EmployeeRepository;
pub use hour_bank::HourBankRepository;
pub use justification::JustificationRepository;
pub use overtime::OvertimeRepository;
pub use settings::SettingsRepository;
pub use timeclock::TimeClockRepository;
