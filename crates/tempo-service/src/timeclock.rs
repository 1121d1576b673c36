//! # Time Clock Service
//!
//! Orchestrates the four-punch workflow: resolves the employee's schedule,
//! drives the pure state machine in `tempo-core`, persists the record, and
//! applies the ledger side effects a finalized day asks for.
//!
//! ## Clock-Out Side Effects
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  punch_exit ──► LedgerProposal { credit, shortfall }                    │
//! │                      │                                                  │
//! │        credit > 0 ───┼──► pending hour-bank CREDIT (overtime)           │
//! │                      │      idempotent: one live auto credit per day    │
//! │                      │                                                  │
//! │     shortfall > 0 ───┴──► pending hour-bank DEBIT, capped at the        │
//! │                           available approved balance; a zero cap        │
//! │                           means no debit at all                         │
//! │                                                                         │
//! │  record write-back and entry inserts commit in ONE transaction          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every successful punch records an audit entry (best-effort) and fires a
//! spawned punch notification that never delays the response.

use chrono::{NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use tempo_core::{
    hour_bank, DaySchedule, Employee, HourBankRecord, LatenessPolicy, LedgerEntryType,
    LedgerProposal, PunchKind, RecordStatus, TimeClockRecord,
};
use tempo_db::{AuditEntry, Database};

use crate::access::{ensure_privileged, AccessScope};
use crate::audit::Auditor;
use crate::error::{ServiceError, ServiceResult};
use crate::notify::{dispatch, LogNotifier, PunchEvent, PunchNotifier};

/// Result of a clock-in.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClockInOutcome {
    pub record: TimeClockRecord,
    /// True when the punch was late and the justification catalog offers
    /// reasons to attach. Under the `flag` policy this is advisory; under
    /// `require_justification` an unjustified late punch never gets here.
    pub justification_required: bool,
}

/// Wholesale replacement of a record's punch timestamps.
///
/// Corrections overwrite all four columns at once; `None` clears a punch.
#[derive(Debug, Clone, Copy, Default)]
pub struct PunchCorrection {
    pub entry_time: Option<NaiveDateTime>,
    pub lunch_exit_time: Option<NaiveDateTime>,
    pub lunch_return_time: Option<NaiveDateTime>,
    pub exit_time: Option<NaiveDateTime>,
}

/// Service for time-clock operations.
#[derive(Clone)]
pub struct TimeClockService {
    db: Database,
    auditor: Auditor,
    notifier: Arc<dyn PunchNotifier>,
}

impl TimeClockService {
    pub fn new(db: Database, notifier: Arc<dyn PunchNotifier>) -> Self {
        let auditor = Auditor::new(db.audit());
        TimeClockService {
            db,
            auditor,
            notifier,
        }
    }

    /// Convenience constructor with the log-only notifier.
    pub fn with_log_notifier(db: Database) -> Self {
        Self::new(db, Arc::new(LogNotifier))
    }

    // =========================================================================
    // Punches
    // =========================================================================

    /// First punch of the day. Creates the record, computes lateness, and
    /// enforces the company's lateness policy.
    pub async fn clock_in(
        &self,
        employee_id: &str,
        at: NaiveDateTime,
        justification_id: Option<&str>,
    ) -> ServiceResult<ClockInOutcome> {
        let employee = self.load_active_employee(employee_id).await?;
        let date = at.date();
        let day = self.resolve_day(&employee, date)?;

        if self
            .db
            .time_clock()
            .find_by_employee_date(employee_id, date)
            .await?
            .is_some()
        {
            return Err(ServiceError::DuplicateEntry {
                employee_id: employee_id.to_string(),
                date,
            });
        }

        let mut record = TimeClockRecord::open(
            Uuid::new_v4().to_string(),
            employee.id.clone(),
            date,
            at,
            &day,
            employee.late_tolerance,
            Utc::now(),
        );

        if let Some(justification_id) = justification_id {
            let justification = self
                .db
                .justifications()
                .find_by_id(justification_id)
                .await?
                .filter(|j| j.is_active)
                .ok_or_else(|| ServiceError::not_found("Justification", justification_id))?;
            record.justification_id = Some(justification.id);
            record.justification = Some(justification.description);
        }

        let catalog_offers_reasons = !self.db.justifications().list_active().await?.is_empty();
        let justification_required =
            record.late_minutes.is_positive() && catalog_offers_reasons;

        if justification_required && record.justification_id.is_none() {
            let settings = self.db.settings().get_or_create().await?;
            if settings.late_policy == LatenessPolicy::RequireJustification {
                return Err(ServiceError::JustificationRequired {
                    late_minutes: record.late_minutes.minutes(),
                });
            }
        }

        // The application-level existence check above loses races; the
        // (employee_id, date) unique key turns the loser into the same error.
        match self.db.time_clock().insert(&record).await {
            Ok(()) => {}
            Err(err) if err.is_unique_violation_on("time_clock_records.employee_id") => {
                return Err(ServiceError::DuplicateEntry {
                    employee_id: employee_id.to_string(),
                    date,
                });
            }
            Err(err) => return Err(err.into()),
        }

        info!(
            employee_id = %employee.id,
            date = %date,
            late_minutes = record.late_minutes.minutes(),
            "clock-in recorded"
        );

        self.punch_side_effects(&employee, &record, PunchKind::ClockIn, at)
            .await;

        Ok(ClockInOutcome {
            record,
            justification_required,
        })
    }

    /// Second punch: leaving for lunch.
    pub async fn clock_out_lunch(
        &self,
        employee_id: &str,
        at: NaiveDateTime,
    ) -> ServiceResult<TimeClockRecord> {
        let employee = self.load_active_employee(employee_id).await?;
        let mut record = self.require_record(employee_id, at.date()).await?;

        record.punch_lunch_exit(at)?;
        record.updated_at = Utc::now();
        self.db.time_clock().update(&record).await?;

        self.punch_side_effects(&employee, &record, PunchKind::LunchExit, at)
            .await;
        Ok(record)
    }

    /// Third punch: back from lunch. Computes lunch lateness against the
    /// employee's expected lunch duration.
    pub async fn clock_in_lunch(
        &self,
        employee_id: &str,
        at: NaiveDateTime,
    ) -> ServiceResult<TimeClockRecord> {
        let employee = self.load_active_employee(employee_id).await?;
        let mut record = self.require_record(employee_id, at.date()).await?;

        record.punch_lunch_return(at, employee.lunch_break)?;
        record.updated_at = Utc::now();
        self.db.time_clock().update(&record).await?;

        self.punch_side_effects(&employee, &record, PunchKind::LunchReturn, at)
            .await;
        Ok(record)
    }

    /// Final punch. Derives every total and writes the ledger side effects.
    pub async fn clock_out(
        &self,
        employee_id: &str,
        at: NaiveDateTime,
    ) -> ServiceResult<TimeClockRecord> {
        let employee = self.load_active_employee(employee_id).await?;
        let date = at.date();
        let day = self.resolve_day(&employee, date)?;
        let mut record = self.require_record(employee_id, date).await?;

        let proposal = record.punch_exit(at, &day, employee.lunch_break)?;
        let new_entries = self.proposal_entries(&employee, &mut record, proposal).await?;

        record.updated_at = Utc::now();
        match self.db.time_clock().finalize(&record, &new_entries).await {
            Ok(()) => {}
            Err(err) if err.is_unique_violation_on("hour_bank_records.time_clock_record_id") => {
                // A concurrent finalization won and its entries are already
                // committed; ours rolled back. Adopt the winner's.
                self.adopt_auto_entries(&mut record).await?;
                self.db.time_clock().update(&record).await?;
            }
            Err(err) => return Err(err.into()),
        }

        info!(
            employee_id = %employee.id,
            date = %date,
            worked_minutes = record.worked_minutes.map(|m| m.minutes()),
            overtime_minutes = record.overtime_minutes.map(|m| m.minutes()),
            negative_minutes = record.negative_minutes.map(|m| m.minutes()),
            "clock-out recorded"
        );

        self.punch_side_effects(&employee, &record, PunchKind::ClockOut, at)
            .await;
        Ok(record)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// The employee's record for a date, if the day was started.
    pub async fn day_record(
        &self,
        employee_id: &str,
        date: NaiveDate,
    ) -> ServiceResult<Option<TimeClockRecord>> {
        Ok(self
            .db
            .time_clock()
            .find_by_employee_date(employee_id, date)
            .await?)
    }

    /// Records of one employee over an inclusive range, scope-checked.
    pub async fn records_for(
        &self,
        actor_id: &str,
        employee_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> ServiceResult<Vec<TimeClockRecord>> {
        let actor = self.load_employee(actor_id).await?;
        let target = self.load_employee(employee_id).await?;
        AccessScope::for_actor(&actor).ensure(&target)?;

        Ok(self
            .db
            .time_clock()
            .list_for_employee(employee_id, from, to)
            .await?)
    }

    // =========================================================================
    // Correction
    // =========================================================================

    /// Overwrites a record's punches and fully recomputes the day.
    ///
    /// Pending auto-generated ledger entries linked to the record are
    /// rejected as superseded and fresh ones are derived from the corrected
    /// punches; an already-approved entry is left standing and its direction
    /// is not regenerated. Record update, supersessions and inserts commit
    /// in one transaction.
    pub async fn correct_record(
        &self,
        actor_id: &str,
        record_id: &str,
        correction: PunchCorrection,
    ) -> ServiceResult<TimeClockRecord> {
        let actor = self.load_employee(actor_id).await?;
        ensure_privileged(&actor)?;

        let mut record = self
            .db
            .time_clock()
            .find_by_id(record_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("TimeClockRecord", record_id))?;

        let target = self.load_employee(&record.employee_id).await?;
        AccessScope::for_actor(&actor).ensure(&target)?;

        let day = self.resolve_day(&target, record.date)?;

        record.entry_time = correction.entry_time;
        record.lunch_exit_time = correction.lunch_exit_time;
        record.lunch_return_time = correction.lunch_return_time;
        record.exit_time = correction.exit_time;
        record.validate_sequence()?;

        let proposal = record.recompute(&day, target.lunch_break, target.late_tolerance);

        let mut superseded = Vec::new();
        let mut new_entries = Vec::new();

        let keep_credit = self
            .stale_backref(&mut record.hour_bank_credit_id, &mut superseded)
            .await?;
        let keep_debit = self
            .stale_backref(&mut record.hour_bank_debit_id, &mut superseded)
            .await?;

        if let Some(proposal) = proposal {
            if proposal.credit.is_positive() && !keep_credit {
                let credit = self.auto_entry(
                    &target,
                    &record,
                    LedgerEntryType::Credit,
                    proposal.credit,
                );
                record.hour_bank_credit_id = Some(credit.id.clone());
                new_entries.push(credit);
            }
            if proposal.shortfall.is_positive() && !keep_debit {
                if let Some(debit) = self.capped_debit(&target, &record, proposal).await? {
                    record.hour_bank_debit_id = Some(debit.id.clone());
                    new_entries.push(debit);
                }
            }
        }

        record.updated_at = Utc::now();
        self.db
            .time_clock()
            .apply_correction(&record, &superseded, actor_id, &new_entries)
            .await?;

        info!(
            record_id = %record.id,
            actor_id = %actor.id,
            superseded = superseded.len(),
            regenerated = new_entries.len(),
            "time clock record corrected"
        );

        self.auditor
            .record(
                AuditEntry::new(
                    "time_clock.correct",
                    "time_clock_record",
                    record.id.clone(),
                    actor.id.clone(),
                    format!("corrected punches for {}", record.date),
                )
                .target(target.id.clone())
                .metadata(json!({
                    "supersededEntries": superseded,
                    "regeneratedEntries": new_entries.iter().map(|e| e.id.clone()).collect::<Vec<_>>(),
                })),
            )
            .await;

        Ok(record)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    async fn load_employee(&self, id: &str) -> ServiceResult<Employee> {
        self.db
            .employees()
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Employee", id))
    }

    async fn load_active_employee(&self, id: &str) -> ServiceResult<Employee> {
        let employee = self.load_employee(id).await?;
        if !employee.is_active {
            return Err(ServiceError::forbidden(format!(
                "employee {id} is inactive"
            )));
        }
        Ok(employee)
    }

    fn resolve_day(&self, employee: &Employee, date: NaiveDate) -> ServiceResult<DaySchedule> {
        employee
            .schedule
            .for_date(date)
            .copied()
            .ok_or_else(|| ServiceError::NoScheduleConfigured {
                employee_id: employee.id.clone(),
                date,
            })
    }

    async fn require_record(
        &self,
        employee_id: &str,
        date: NaiveDate,
    ) -> ServiceResult<TimeClockRecord> {
        self.db
            .time_clock()
            .find_by_employee_date(employee_id, date)
            .await?
            .ok_or(ServiceError::MissingEntry { date })
    }

    /// Builds the ledger entries a finalization proposal asks for: the
    /// pending credit and the balance-capped pending debit, wiring the
    /// record's back-references.
    async fn proposal_entries(
        &self,
        employee: &Employee,
        record: &mut TimeClockRecord,
        proposal: LedgerProposal,
    ) -> ServiceResult<Vec<HourBankRecord>> {
        let mut entries = Vec::new();

        if proposal.credit.is_positive() {
            let credit = self.auto_entry(employee, record, LedgerEntryType::Credit, proposal.credit);
            record.hour_bank_credit_id = Some(credit.id.clone());
            entries.push(credit);
        }

        if proposal.shortfall.is_positive() {
            if let Some(debit) = self.capped_debit(employee, record, proposal).await? {
                record.hour_bank_debit_id = Some(debit.id.clone());
                entries.push(debit);
            }
        }

        Ok(entries)
    }

    /// After losing a finalization race: the winner's auto entries are in
    /// the ledger, so point the back-references at them.
    async fn adopt_auto_entries(&self, record: &mut TimeClockRecord) -> ServiceResult<()> {
        record.hour_bank_credit_id = self
            .db
            .hour_bank()
            .find_auto_entry(&record.id, LedgerEntryType::Credit)
            .await?
            .map(|e| e.id);
        record.hour_bank_debit_id = self
            .db
            .hour_bank()
            .find_auto_entry(&record.id, LedgerEntryType::Debit)
            .await?
            .map(|e| e.id);
        Ok(())
    }

    /// Builds the capped shortfall debit, or `None` when the available
    /// balance covers nothing.
    async fn capped_debit(
        &self,
        employee: &Employee,
        record: &TimeClockRecord,
        proposal: LedgerProposal,
    ) -> ServiceResult<Option<HourBankRecord>> {
        let entries = self
            .db
            .hour_bank()
            .list_for_employee(&employee.id, None, None)
            .await?;
        let available = hour_bank::balance(&entries).available;

        Ok(hour_bank::cap_shortfall_debit(proposal.shortfall, available)
            .map(|capped| self.auto_entry(employee, record, LedgerEntryType::Debit, capped)))
    }

    fn auto_entry(
        &self,
        employee: &Employee,
        record: &TimeClockRecord,
        entry_type: LedgerEntryType,
        minutes: tempo_core::Minutes,
    ) -> HourBankRecord {
        let reason = match entry_type {
            LedgerEntryType::Credit => format!("overtime worked on {}", record.date),
            LedgerEntryType::Debit => format!("hours short on {}", record.date),
        };

        HourBankRecord {
            id: Uuid::new_v4().to_string(),
            employee_id: employee.id.clone(),
            date: record.date,
            entry_type,
            minutes,
            reason,
            status: RecordStatus::Pending,
            created_by: employee.id.clone(),
            approved_by: None,
            approved_at: None,
            rejected_by: None,
            rejected_at: None,
            overtime_request_id: None,
            time_clock_record_id: Some(record.id.clone()),
            created_at: Utc::now(),
        }
    }

    /// During a correction: decides what happens to an existing backref.
    ///
    /// A pending linked entry is queued for supersession and the backref
    /// cleared (returns `false` — regenerate). An approved one stands and
    /// its direction must not be regenerated (returns `true`). A missing or
    /// rejected one just clears the backref.
    async fn stale_backref(
        &self,
        backref: &mut Option<String>,
        superseded: &mut Vec<String>,
    ) -> ServiceResult<bool> {
        let Some(entry_id) = backref.clone() else {
            return Ok(false);
        };

        match self.db.hour_bank().find_by_id(&entry_id).await? {
            Some(entry) if entry.status == RecordStatus::Approved => Ok(true),
            Some(entry) if entry.status == RecordStatus::Pending => {
                superseded.push(entry.id);
                *backref = None;
                Ok(false)
            }
            _ => {
                *backref = None;
                Ok(false)
            }
        }
    }

    async fn punch_side_effects(
        &self,
        employee: &Employee,
        record: &TimeClockRecord,
        kind: PunchKind,
        at: NaiveDateTime,
    ) {
        self.auditor
            .record(
                AuditEntry::new(
                    format!("time_clock.{}", kind.label().replace([' ', '-'], "_")),
                    "time_clock_record",
                    record.id.clone(),
                    employee.id.clone(),
                    format!("{} at {}", kind.label(), at),
                )
                .metadata(json!({ "lateMinutes": record.late_minutes.minutes() })),
            )
            .await;

        dispatch(
            self.notifier.clone(),
            PunchEvent {
                employee_id: employee.id.clone(),
                employee_name: employee.name.clone(),
                kind,
                at,
                late_minutes: record.late_minutes.minutes(),
            },
        );
    }
}
