use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use super::domain::{RecordId, RefundRecord, RefundStatus, TransitionError};
use super::error::TrackingError;
use super::intake::{RefundDirective, RefundStatusUpdate, RefundSubmission};
use super::repository::Repository;

impl RefundRecord {
    /// Patch status and settlement links; absent fields keep their stored values.
    pub fn apply(
        &mut self,
        directive: &RefundDirective,
        now: DateTime<Utc>,
    ) -> Result<(), TransitionError> {
        if self.status == RefundStatus::Paid {
            return Err(TransitionError::RefundSettled);
        }
        self.status = directive.status;
        if let Some(staff) = &directive.finance_staff_id {
            self.finance_staff_id = Some(staff.clone());
        }
        if let Some(run) = &directive.paid_in_payroll_run_id {
            self.paid_in_payroll_run_id = Some(run.clone());
        }
        self.updated_at = now;
        Ok(())
    }
}

/// Finance-side refund ledger.
pub struct RefundService<R> {
    repository: Arc<R>,
}

impl<R> RefundService<R>
where
    R: Repository<RefundRecord> + 'static,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    pub fn create(&self, submission: RefundSubmission) -> Result<RefundRecord, TrackingError> {
        let draft = submission.validate()?;
        let now = Utc::now();
        let record = RefundRecord {
            id: RecordId::generate(),
            refund_details: draft.refund_details,
            employee_id: draft.employee_id,
            finance_staff_id: None,
            paid_in_payroll_run_id: None,
            status: RefundStatus::Pending,
            created_at: now,
            updated_at: now,
        };

        let stored = self.repository.insert(record)?;
        info!(refund = %stored.id, employee = %stored.employee_id, "refund recorded");
        Ok(stored)
    }

    pub fn update_status(
        &self,
        id: &RecordId,
        update: RefundStatusUpdate,
    ) -> Result<RefundRecord, TrackingError> {
        let directive = update.validate()?;
        let now = Utc::now();

        let record = self
            .repository
            .modify(id, &mut |record: &mut RefundRecord| {
                record.apply(&directive, now)?;
                Ok(())
            })?
            .ok_or_else(|| TrackingError::not_found("refund", id.0.clone()))?;

        info!(
            refund = %record.id,
            status = record.status.label(),
            payroll_run = record.paid_in_payroll_run_id.as_deref().unwrap_or("none"),
            "refund status updated"
        );
        Ok(record)
    }

    pub fn list(&self) -> Result<Vec<RefundRecord>, TrackingError> {
        Ok(self.repository.find(&|_: &RefundRecord| true)?)
    }

    pub fn get(&self, id: &RecordId) -> Result<RefundRecord, TrackingError> {
        self.repository
            .fetch(id)?
            .ok_or_else(|| TrackingError::not_found("refund", id.0.clone()))
    }
}
