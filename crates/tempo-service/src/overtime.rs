//! # Overtime Request Service
//!
//! Submission against the monthly cap, and the approval flow that mints the
//! linked hour-bank credit.
//!
//! Approval is idempotent end to end: the `pending` status guard stops a
//! second decision, the `overtime_request_id` unique key stops a second
//! credit, and a retried approval of an already-approved request returns
//! the credit that exists — or mints it, when an earlier attempt committed
//! the status but died before the credit insert.

use chrono::{Datelike, NaiveDate, NaiveTime, Utc};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use tempo_core::{
    overtime, Employee, HourBankRecord, LedgerEntryType, OvertimeRequest, RecordStatus,
};
use tempo_db::{AuditEntry, Database};

use crate::access::{ensure_privileged, AccessScope};
use crate::audit::Auditor;
use crate::error::{ServiceError, ServiceResult};

/// Service for overtime request operations.
#[derive(Debug, Clone)]
pub struct OvertimeService {
    db: Database,
    auditor: Auditor,
}

impl OvertimeService {
    pub fn new(db: Database) -> Self {
        let auditor = Auditor::new(db.audit());
        OvertimeService { db, auditor }
    }

    /// Submits a request for a start–end span on a date.
    ///
    /// Duration is the span modulo 24 h, so a shift crossing midnight is
    /// legal. The month's approved and pending requests plus this one must
    /// fit under the employee's resolved monthly cap.
    pub async fn submit(
        &self,
        actor_id: &str,
        employee_id: &str,
        date: NaiveDate,
        start_time: NaiveTime,
        end_time: NaiveTime,
        reason: impl Into<String>,
    ) -> ServiceResult<OvertimeRequest> {
        let (actor, target) = self.scoped_pair(actor_id, employee_id).await?;

        let minutes = overtime::validate_span(start_time, end_time)?;

        let settings = self.db.settings().get_or_create().await?;
        let limit = overtime::monthly_limit(&target, &settings, date.month(), date.year());
        let month_requests = self
            .db
            .overtime()
            .list_for_employee_month(&target.id, date.year(), date.month())
            .await?;
        let committed = overtime::committed_minutes(&month_requests);
        overtime::check_monthly_limit(committed, limit, minutes)?;

        let request = OvertimeRequest {
            id: Uuid::new_v4().to_string(),
            employee_id: target.id.clone(),
            date,
            start_time,
            end_time,
            minutes,
            reason: reason.into(),
            status: RecordStatus::Pending,
            created_by: actor.id.clone(),
            approved_by: None,
            approved_at: None,
            rejected_by: None,
            rejected_at: None,
            created_at: Utc::now(),
        };
        self.db.overtime().insert(&request).await?;

        info!(
            request_id = %request.id,
            employee_id = %target.id,
            minutes = minutes.minutes(),
            "overtime request submitted"
        );
        self.audit_request(&actor, &target, &request, "overtime.submit")
            .await;

        Ok(request)
    }

    /// An employee's requests, scope-checked, newest first.
    pub async fn requests_for(
        &self,
        actor_id: &str,
        employee_id: &str,
    ) -> ServiceResult<Vec<OvertimeRequest>> {
        let (_, target) = self.scoped_pair(actor_id, employee_id).await?;
        Ok(self.db.overtime().list_for_employee(&target.id).await?)
    }

    /// Approves a pending request and mints exactly one linked approved
    /// credit in the hour bank.
    pub async fn approve(
        &self,
        actor_id: &str,
        request_id: &str,
    ) -> ServiceResult<(OvertimeRequest, HourBankRecord)> {
        let (actor, mut request, target) = self.decision_context(actor_id, request_id).await?;
        let now = Utc::now();

        if request.status == RecordStatus::Approved {
            // Retried approval: hand back the credit that already exists.
            // A missing credit means an earlier attempt committed the
            // status and then died before the insert, so mint it now.
            let credit = match self
                .db
                .hour_bank()
                .find_by_overtime_request(&request.id)
                .await?
            {
                Some(credit) => credit,
                None => self.mint_credit(&actor, &target, &request, now).await?,
            };
            return Ok((request, credit));
        }

        request.approve(&actor.id, now)?;
        if !self.db.overtime().set_status(&request).await? {
            let current = self.require_request(request_id).await?;
            return Err(ServiceError::NotPending {
                record_id: current.id,
                current_status: current.status.as_str().to_string(),
            });
        }

        let credit = self.mint_credit(&actor, &target, &request, now).await?;

        info!(
            request_id = %request.id,
            credit_id = %credit.id,
            minutes = request.minutes.minutes(),
            "overtime request approved"
        );
        self.audit_request(&actor, &target, &request, "overtime.approve")
            .await;

        Ok((request, credit))
    }

    /// Rejects a pending request. No ledger entry is created.
    pub async fn reject(
        &self,
        actor_id: &str,
        request_id: &str,
    ) -> ServiceResult<OvertimeRequest> {
        let (actor, mut request, target) = self.decision_context(actor_id, request_id).await?;

        request.reject(&actor.id, Utc::now())?;
        if !self.db.overtime().set_status(&request).await? {
            let current = self.require_request(request_id).await?;
            return Err(ServiceError::NotPending {
                record_id: current.id,
                current_status: current.status.as_str().to_string(),
            });
        }

        info!(request_id = %request.id, "overtime request rejected");
        self.audit_request(&actor, &target, &request, "overtime.reject")
            .await;

        Ok(request)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Inserts the approval credit; a unique-key loss on
    /// `overtime_request_id` means a concurrent approval already minted it,
    /// so that one is adopted.
    async fn mint_credit(
        &self,
        actor: &Employee,
        target: &Employee,
        request: &OvertimeRequest,
        now: chrono::DateTime<Utc>,
    ) -> ServiceResult<HourBankRecord> {
        let credit = HourBankRecord {
            id: Uuid::new_v4().to_string(),
            employee_id: target.id.clone(),
            date: request.date,
            entry_type: LedgerEntryType::Credit,
            minutes: request.minutes,
            reason: format!("approved overtime request: {}", request.reason),
            status: RecordStatus::Approved,
            created_by: actor.id.clone(),
            approved_by: Some(actor.id.clone()),
            approved_at: Some(now),
            rejected_by: None,
            rejected_at: None,
            overtime_request_id: Some(request.id.clone()),
            time_clock_record_id: None,
            created_at: now,
        };

        match self.db.hour_bank().insert(&credit).await {
            Ok(()) => Ok(credit),
            Err(err) if err.is_unique_violation_on("overtime_request_id") => {
                self.db
                    .hour_bank()
                    .find_by_overtime_request(&request.id)
                    .await?
                    .ok_or_else(|| ServiceError::not_found("HourBankRecord", &request.id))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn decision_context(
        &self,
        actor_id: &str,
        request_id: &str,
    ) -> ServiceResult<(Employee, OvertimeRequest, Employee)> {
        let actor = self.load_employee(actor_id).await?;
        ensure_privileged(&actor)?;

        let request = self.require_request(request_id).await?;
        let target = self.load_employee(&request.employee_id).await?;
        AccessScope::for_actor(&actor).ensure(&target)?;

        Ok((actor, request, target))
    }

    async fn require_request(&self, request_id: &str) -> ServiceResult<OvertimeRequest> {
        self.db
            .overtime()
            .find_by_id(request_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("OvertimeRequest", request_id))
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

    async fn audit_request(
        &self,
        actor: &Employee,
        target: &Employee,
        request: &OvertimeRequest,
        action: &str,
    ) {
        self.auditor
            .record(
                AuditEntry::new(
                    action,
                    "overtime_request",
                    request.id.clone(),
                    actor.id.clone(),
                    request.reason.clone(),
                )
                .target(target.id.clone())
                .metadata(json!({
                    "minutes": request.minutes.minutes(),
                    "status": request.status.as_str(),
                })),
            )
            .await;
    }
}
