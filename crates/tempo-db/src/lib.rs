//! # tempo-db: Database Layer
//!
//! SQLite persistence for Tempo: connection pooling, embedded migrations,
//! and one repository per aggregate.
//!
//! ## Layer Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  tempo-service ──► tempo-db ──► SQLite                                  │
//! │                       │                                                 │
//! │                       └──► tempo-core (domain types, sqlx feature on)   │
//! │                                                                         │
//! │  The service layer sees domain types in and out; SQL, row structs and   │
//! │  constraint mapping stay behind this crate's boundary.                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust,ignore
//! use tempo_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("./tempo.db")).await?;
//! let today = db.time_clock().find_by_employee_date("emp-1", date).await?;
//! ```

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use repository::{
    AuditEntry, AuditRepository, EmployeeRepository, HourBankRepository,
    JustificationRepository, OvertimeRepository, SettingsRepository, TimeClockRepository,
};
