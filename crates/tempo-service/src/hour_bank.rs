//! # Hour Bank Service
//!
//! Ledger orchestration: balance reads, manual credit/debit proposals, and
//! the approval flow.
//!
//! Limit checks run twice by design. The proposal-time check is best-effort
//! and gives the caller an early rejection; the approval-time re-check in
//! [`HourBankService::set_status`] is the authoritative gate, because
//! concurrent proposals can both pass the first check against the same
//! balance snapshot.

use chrono::{Datelike, NaiveDate, Utc};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use tempo_core::{
    hour_bank, Balance, Employee, HourBankRecord, LedgerEntryType, Minutes, RecordStatus,
};
use tempo_db::{AuditEntry, Database};

use crate::access::{ensure_privileged, AccessScope};
use crate::audit::Auditor;
use crate::error::{ServiceError, ServiceResult};

/// Service for hour-bank ledger operations.
#[derive(Debug, Clone)]
pub struct HourBankService {
    db: Database,
    auditor: Auditor,
}

impl HourBankService {
    pub fn new(db: Database) -> Self {
        let auditor = Auditor::new(db.audit());
        HourBankService { db, auditor }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Balance snapshot, recomputed as a fold over the full record set.
    pub async fn balance(&self, actor_id: &str, employee_id: &str) -> ServiceResult<Balance> {
        let (_, target) = self.scoped_pair(actor_id, employee_id).await?;
        let entries = self
            .db
            .hour_bank()
            .list_for_employee(&target.id, None, None)
            .await?;
        Ok(hour_bank::balance(&entries))
    }

    /// Ledger entries, newest first, optionally bounded by a date range.
    pub async fn records(
        &self,
        actor_id: &str,
        employee_id: &str,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> ServiceResult<Vec<HourBankRecord>> {
        let (_, target) = self.scoped_pair(actor_id, employee_id).await?;
        Ok(self
            .db
            .hour_bank()
            .list_for_employee(&target.id, from, to)
            .await?)
    }

    // =========================================================================
    // Proposals
    // =========================================================================

    /// Proposes a credit; lands `pending` until a manager approves it.
    ///
    /// Self-service is allowed within scope. When an accumulation limit is
    /// configured, a credit that would push the balance past it is rejected
    /// up front.
    pub async fn propose_credit(
        &self,
        actor_id: &str,
        employee_id: &str,
        date: NaiveDate,
        minutes: Minutes,
        reason: impl Into<String>,
    ) -> ServiceResult<HourBankRecord> {
        let (actor, target) = self.scoped_pair(actor_id, employee_id).await?;
        hour_bank::validate_entry_minutes(minutes)?;

        let settings = self.db.settings().get_or_create().await?;
        let entries = self
            .db
            .hour_bank()
            .list_for_employee(&target.id, None, None)
            .await?;
        let current = hour_bank::balance(&entries).total;
        hour_bank::check_accumulation_limit(
            current,
            settings.default_accumulation_limit,
            minutes,
        )?;

        let entry = manual_entry(
            &target,
            &actor,
            date,
            LedgerEntryType::Credit,
            minutes,
            reason.into(),
            RecordStatus::Pending,
        );
        self.db.hour_bank().insert(&entry).await?;

        info!(
            entry_id = %entry.id,
            employee_id = %target.id,
            minutes = minutes.minutes(),
            "credit proposed"
        );
        self.audit_entry(&actor, &target, &entry, "hour_bank.propose_credit")
            .await;

        Ok(entry)
    }

    /// Writes a debit; manager/admin only, auto-approved on creation.
    ///
    /// Rejected when it overdraws the available balance, or when a monthly
    /// usage limit is configured and the debit would push the month of
    /// `date` over it.
    pub async fn propose_debit(
        &self,
        actor_id: &str,
        employee_id: &str,
        date: NaiveDate,
        minutes: Minutes,
        reason: impl Into<String>,
    ) -> ServiceResult<HourBankRecord> {
        let (actor, target) = self.scoped_pair(actor_id, employee_id).await?;
        ensure_privileged(&actor)?;
        hour_bank::validate_entry_minutes(minutes)?;

        let settings = self.db.settings().get_or_create().await?;
        let entries = self
            .db
            .hour_bank()
            .list_for_employee(&target.id, None, None)
            .await?;
        let available = hour_bank::balance(&entries).available;
        hour_bank::check_sufficient_balance(available, minutes)?;

        let used = hour_bank::month_debit_usage(&entries, date.year(), date.month());
        hour_bank::check_usage_limit(used, settings.default_usage_limit, minutes)?;

        let now = Utc::now();
        let mut entry = manual_entry(
            &target,
            &actor,
            date,
            LedgerEntryType::Debit,
            minutes,
            reason.into(),
            RecordStatus::Approved,
        );
        entry.approved_by = Some(actor.id.clone());
        entry.approved_at = Some(now);
        self.db.hour_bank().insert(&entry).await?;

        info!(
            entry_id = %entry.id,
            employee_id = %target.id,
            minutes = minutes.minutes(),
            "debit written"
        );
        self.audit_entry(&actor, &target, &entry, "hour_bank.debit").await;

        Ok(entry)
    }

    // =========================================================================
    // Approval
    // =========================================================================

    /// Approves or rejects a pending entry.
    ///
    /// Approval re-runs the relevant limit checks against the current
    /// ledger before committing; this re-check is what actually holds the
    /// limits under concurrent proposals. The storage-level `pending` guard
    /// serializes racing decisions on the same entry.
    pub async fn set_status(
        &self,
        actor_id: &str,
        entry_id: &str,
        approve: bool,
    ) -> ServiceResult<HourBankRecord> {
        let actor = self.load_employee(actor_id).await?;
        ensure_privileged(&actor)?;

        let mut entry = self
            .db
            .hour_bank()
            .find_by_id(entry_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("HourBankRecord", entry_id))?;

        let target = self.load_employee(&entry.employee_id).await?;
        AccessScope::for_actor(&actor).ensure(&target)?;

        let now = Utc::now();
        if approve {
            self.revalidate_for_approval(&entry).await?;
            entry.approve(&actor.id, now)?;
        } else {
            entry.reject(&actor.id, now)?;
        }

        if !self.db.hour_bank().set_status(&entry).await? {
            // Lost the race: report whatever state won.
            let current = self
                .db
                .hour_bank()
                .find_by_id(entry_id)
                .await?
                .ok_or_else(|| ServiceError::not_found("HourBankRecord", entry_id))?;
            return Err(ServiceError::NotPending {
                record_id: current.id,
                current_status: current.status.as_str().to_string(),
            });
        }

        info!(
            entry_id = %entry.id,
            status = entry.status.as_str(),
            actor_id = %actor.id,
            "hour bank entry decided"
        );
        self.audit_entry(&actor, &target, &entry, "hour_bank.set_status")
            .await;

        Ok(entry)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// The approval-time limit re-check.
    async fn revalidate_for_approval(&self, entry: &HourBankRecord) -> ServiceResult<()> {
        let settings = self.db.settings().get_or_create().await?;
        let entries = self
            .db
            .hour_bank()
            .list_for_employee(&entry.employee_id, None, None)
            .await?;
        let balance = hour_bank::balance(&entries);

        match entry.entry_type {
            LedgerEntryType::Credit => {
                hour_bank::check_accumulation_limit(
                    balance.total,
                    settings.default_accumulation_limit,
                    entry.minutes,
                )?;
            }
            LedgerEntryType::Debit => {
                hour_bank::check_sufficient_balance(balance.available, entry.minutes)?;
                let used = hour_bank::month_debit_usage(
                    &entries,
                    entry.date.year(),
                    entry.date.month(),
                );
                hour_bank::check_usage_limit(used, settings.default_usage_limit, entry.minutes)?;
            }
        }
        Ok(())
    }

    async fn load_employee(&self, id: &str) -> ServiceResult<Employee> {
        self.db
            .employees()
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Employee", id))
    }

    async fn scoped_pair(
        &self,
        actor_id: &str,
        employee_id: &str,
    ) -> ServiceResult<(Employee, Employee)> {
        let actor = self.load_employee(actor_id).await?;
        let target = if employee_id == actor_id {
            actor.clone()
        } else {
            self.load_employee(employee_id).await?
        };
        AccessScope::for_actor(&actor).ensure(&target)?;
        Ok((actor, target))
    }

    async fn audit_entry(
        &self,
        actor: &Employee,
        target: &Employee,
        entry: &HourBankRecord,
        action: &str,
    ) {
        self.auditor
            .record(
                AuditEntry::new(
                    action,
                    "hour_bank_record",
                    entry.id.clone(),
                    actor.id.clone(),
                    entry.reason.clone(),
                )
                .target(target.id.clone())
                .metadata(json!({
                    "entryType": entry.entry_type,
                    "minutes": entry.minutes.minutes(),
                    "status": entry.status.as_str(),
                })),
            )
            .await;
    }
}

fn manual_entry(
    target: &Employee,
    actor: &Employee,
    date: NaiveDate,
    entry_type: LedgerEntryType,
    minutes: Minutes,
    reason: String,
    status: RecordStatus,
) -> HourBankRecord {
    HourBankRecord {
        id: Uuid::new_v4().to_string(),
        employee_id: target.id.clone(),
        date,
        entry_type,
        minutes,
        reason,
        status,
        created_by: actor.id.clone(),
        approved_by: None,
        approved_at: None,
        rejected_by: None,
        rejected_at: None,
        overtime_request_id: None,
        time_clock_record_id: None,
        created_at: Utc::now(),
    }
}
