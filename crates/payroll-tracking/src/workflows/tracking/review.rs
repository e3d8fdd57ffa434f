use std::marker::PhantomData;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use super::domain::{
    CaseKind, ClaimRecord, ClaimView, DisputeRecord, DisputeView, EmployeeId, FinalDecision,
    Outcome, Recommendation, RecordId, ReviewPolicy, ReviewTrail, Verdict,
};
use super::error::TrackingError;
use super::intake::{
    bind_owner, optional_text, ClaimDraft, ClaimSubmission, DisputeDraft, DisputeSubmission,
    FinalDecisionRequest, FinalDirective, ReviewRequest, Submission, ValidationErrors,
};
use super::repository::{Repository, RepositoryError, TrackedRecord};
use super::sequence::ReferenceSequence;

/// Upper bound on reference draws for a single submission.
pub const MAX_REFERENCE_ATTEMPTS: usize = 16;

/// A document moving through the specialist/manager review pipeline.
pub trait ReviewCase: TrackedRecord {
    const KIND: CaseKind;

    type Submission: Submission;
    type View: Serialize + Send + 'static;

    fn open(
        id: RecordId,
        reference: String,
        draft: <Self::Submission as Submission>::Draft,
        now: DateTime<Utc>,
    ) -> Self;

    fn owner(&self) -> &EmployeeId;

    fn trail(&self) -> &ReviewTrail;

    fn trail_mut(&mut self) -> &mut ReviewTrail;

    fn touch(&mut self, now: DateTime<Utc>);

    /// Apply the case-specific parts of a final decision.
    fn settle(&mut self, directive: &FinalDirective) -> Result<(), ValidationErrors>;

    fn view(&self) -> Self::View;
}

impl ReviewCase for ClaimRecord {
    const KIND: CaseKind = CaseKind::Claim;

    type Submission = ClaimSubmission;
    type View = ClaimView;

    fn open(id: RecordId, reference: String, draft: ClaimDraft, now: DateTime<Utc>) -> Self {
        ClaimRecord {
            id,
            claim_id: reference,
            description: draft.description,
            claim_type: draft.claim_type,
            amount: draft.amount,
            approved_amount: None,
            evidence: draft.evidence,
            employee_id: draft.employee_id,
            finance_staff_id: None,
            trail: ReviewTrail::opened(),
            created_at: now,
            updated_at: now,
        }
    }

    fn owner(&self) -> &EmployeeId {
        &self.employee_id
    }

    fn trail(&self) -> &ReviewTrail {
        &self.trail
    }

    fn trail_mut(&mut self) -> &mut ReviewTrail {
        &mut self.trail
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    fn settle(&mut self, directive: &FinalDirective) -> Result<(), ValidationErrors> {
        if directive.outcome != Outcome::Approved {
            return Ok(());
        }
        let approved = directive.approved_amount.unwrap_or(self.amount);
        if approved > self.amount {
            return Err(ValidationErrors::single(
                "approvedAmount",
                format!("must not exceed the requested amount of {}", self.amount),
            ));
        }
        self.approved_amount = Some(approved);
        if let Some(handler) = &directive.finance_staff_id {
            self.finance_staff_id = Some(handler.clone());
        }
        Ok(())
    }

    fn view(&self) -> ClaimView {
        ClaimRecord::view(self)
    }
}

impl ReviewCase for DisputeRecord {
    const KIND: CaseKind = CaseKind::Dispute;

    type Submission = DisputeSubmission;
    type View = DisputeView;

    fn open(id: RecordId, reference: String, draft: DisputeDraft, now: DateTime<Utc>) -> Self {
        DisputeRecord {
            id,
            dispute_id: reference,
            description: draft.description,
            payslip_id: draft.payslip_id,
            evidence: draft.evidence,
            employee_id: draft.employee_id,
            trail: ReviewTrail::opened(),
            created_at: now,
            updated_at: now,
        }
    }

    fn owner(&self) -> &EmployeeId {
        &self.employee_id
    }

    fn trail(&self) -> &ReviewTrail {
        &self.trail
    }

    fn trail_mut(&mut self) -> &mut ReviewTrail {
        &mut self.trail
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    fn settle(&mut self, directive: &FinalDirective) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        if directive.approved_amount.is_some() {
            errors.push("approvedAmount", "does not apply to disputes");
        }
        if directive.finance_staff_id.is_some() {
            errors.push("financeStaffId", "does not apply to disputes");
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn view(&self) -> DisputeView {
        DisputeRecord::view(self)
    }
}

/// Service driving claims or disputes from submission to final decision.
pub struct ReviewService<T, R> {
    repository: Arc<R>,
    sequence: ReferenceSequence,
    policy: ReviewPolicy,
    _case: PhantomData<fn() -> T>,
}

pub type ClaimService<R> = ReviewService<ClaimRecord, R>;
pub type DisputeService<R> = ReviewService<DisputeRecord, R>;

impl<T, R> ReviewService<T, R>
where
    T: ReviewCase,
    R: Repository<T> + 'static,
{
    /// Build the service, resuming reference numbering after the documents already stored.
    pub fn new(repository: Arc<R>, policy: ReviewPolicy) -> Result<Self, RepositoryError> {
        let existing = repository.count()?;
        let sequence = ReferenceSequence::resume(T::KIND.reference_prefix(), existing as u64);
        Ok(Self {
            repository,
            sequence,
            policy,
            _case: PhantomData,
        })
    }

    pub fn policy(&self) -> ReviewPolicy {
        self.policy
    }

    /// Open a new case under review on behalf of `submitted_by`.
    pub fn submit(
        &self,
        mut submission: T::Submission,
        submitted_by: &EmployeeId,
    ) -> Result<T, TrackingError> {
        bind_owner(&mut submission, submitted_by)?;
        let draft = submission.validate()?;
        let now = Utc::now();

        for _ in 0..MAX_REFERENCE_ATTEMPTS {
            let reference = self.sequence.next_reference();
            let record = T::open(RecordId::generate(), reference.clone(), draft.clone(), now);
            match self.repository.insert(record) {
                Ok(stored) => {
                    info!(
                        kind = T::KIND.label(),
                        %reference,
                        employee = %stored.owner(),
                        "case submitted for review"
                    );
                    return Ok(stored);
                }
                Err(RepositoryError::Conflict) => {
                    warn!(
                        kind = T::KIND.label(),
                        %reference,
                        "reference already taken, drawing the next one"
                    );
                }
                Err(other) => return Err(other.into()),
            }
        }

        Err(RepositoryError::Conflict.into())
    }

    pub fn get(&self, id: &RecordId) -> Result<T, TrackingError> {
        self.repository
            .fetch(id)?
            .ok_or_else(|| TrackingError::not_found(T::KIND.label(), id.0.clone()))
    }

    pub fn for_employee(&self, employee: &EmployeeId) -> Result<Vec<T>, TrackingError> {
        Ok(self.repository.find(&|record: &T| record.owner() == employee)?)
    }

    /// Fetch a case only when it belongs to `employee`; other owners read as absent.
    pub fn get_for_employee(&self, id: &RecordId, employee: &EmployeeId) -> Result<T, TrackingError> {
        match self.repository.fetch(id)? {
            Some(record) if record.owner() == employee => Ok(record),
            _ => Err(TrackingError::not_found(T::KIND.label(), id.0.clone())),
        }
    }

    /// Undecided cases no specialist has recommended on yet.
    pub fn pending(&self) -> Result<Vec<T>, TrackingError> {
        Ok(self
            .repository
            .find(&|record: &T| record.trail().is_awaiting_recommendation())?)
    }

    /// Recommended cases still waiting for the binding decision.
    pub fn awaiting_final(&self) -> Result<Vec<T>, TrackingError> {
        Ok(self
            .repository
            .find(&|record: &T| record.trail().is_awaiting_final())?)
    }

    pub fn recommend(
        &self,
        id: &RecordId,
        verdict: Verdict,
        request: ReviewRequest,
        reviewer: Option<&EmployeeId>,
    ) -> Result<T, TrackingError> {
        let now = Utc::now();
        let recommendation = Recommendation {
            verdict,
            reviewer: reviewer.cloned(),
            reviewed_at: now,
            comment: optional_text(request.review_comment),
        };

        let record = self.modify(id, |record| {
            record.trail_mut().recommend(recommendation.clone())?;
            record.touch(now);
            Ok(())
        })?;

        info!(
            kind = T::KIND.label(),
            reference = record.reference().unwrap_or_default(),
            review_status = record.trail().review_status().label(),
            reviewer = reviewer.map(EmployeeId::as_str).unwrap_or("unknown"),
            "specialist recommendation recorded"
        );
        Ok(record)
    }

    pub fn finalize(
        &self,
        id: &RecordId,
        request: FinalDecisionRequest,
        manager: Option<&EmployeeId>,
    ) -> Result<T, TrackingError> {
        let directive = request.validate()?;
        let now = Utc::now();
        let decision = FinalDecision {
            outcome: directive.outcome,
            decided_by: manager.cloned(),
            decided_at: now,
            resolution_comment: directive.resolution_comment.clone(),
            rejection_reason: directive.rejection_reason.clone(),
        };
        let policy = self.policy;

        let record = self.modify(id, |record| {
            record.trail_mut().finalize(decision.clone(), policy)?;
            record.settle(&directive)?;
            record.touch(now);
            Ok(())
        })?;

        info!(
            kind = T::KIND.label(),
            reference = record.reference().unwrap_or_default(),
            status = record.trail().status().label(),
            manager = manager.map(EmployeeId::as_str).unwrap_or("unknown"),
            "final decision recorded"
        );
        Ok(record)
    }

    /// Apply `change` to the stored case in one atomic step.
    fn modify(
        &self,
        id: &RecordId,
        mut change: impl FnMut(&mut T) -> Result<(), TrackingError>,
    ) -> Result<T, TrackingError> {
        self.repository
            .modify(id, &mut change)?
            .ok_or_else(|| TrackingError::not_found(T::KIND.label(), id.0.clone()))
    }
}
