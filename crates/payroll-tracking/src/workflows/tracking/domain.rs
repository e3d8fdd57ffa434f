use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::config::WorkflowConfig;

/// Document key assigned by the store, independent of the human-readable reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub String);

impl RecordId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reference to an employee profile owned by the HR system.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmployeeId(pub String);

impl EmployeeId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EmployeeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The two employee-initiated tracks sharing the specialist/manager review pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseKind {
    Claim,
    Dispute,
}

impl CaseKind {
    pub const fn label(self) -> &'static str {
        match self {
            CaseKind::Claim => "claim",
            CaseKind::Dispute => "dispute",
        }
    }

    pub const fn collection(self) -> &'static str {
        match self {
            CaseKind::Claim => "claims",
            CaseKind::Dispute => "disputes",
        }
    }

    pub const fn reference_prefix(self) -> &'static str {
        match self {
            CaseKind::Claim => "CLAIM",
            CaseKind::Dispute => "DISP",
        }
    }
}

/// Binding status of a claim or dispute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    UnderReview,
    Approved,
    Rejected,
}

impl CaseStatus {
    pub const fn label(self) -> &'static str {
        match self {
            CaseStatus::UnderReview => "under_review",
            CaseStatus::Approved => "approved",
            CaseStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Specialist triage state exposed alongside the binding status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    Pending,
    RecommendApprove,
    RecommendReject,
}

impl ReviewStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ReviewStatus::Pending => "pending",
            ReviewStatus::RecommendApprove => "recommend_approve",
            ReviewStatus::RecommendReject => "recommend_reject",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Approve,
    Reject,
}

impl Verdict {
    pub const fn review_status(self) -> ReviewStatus {
        match self {
            Verdict::Approve => ReviewStatus::RecommendApprove,
            Verdict::Reject => ReviewStatus::RecommendReject,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Approved,
    Rejected,
}

impl Outcome {
    pub const fn status(self) -> CaseStatus {
        match self {
            Outcome::Approved => CaseStatus::Approved,
            Outcome::Rejected => CaseStatus::Rejected,
        }
    }
}

/// Non-binding specialist recommendation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub verdict: Verdict,
    pub reviewer: Option<EmployeeId>,
    pub reviewed_at: DateTime<Utc>,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum ReviewStage {
    Pending,
    Recommended(Recommendation),
}

/// Binding manager decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalDecision {
    pub outcome: Outcome,
    pub decided_by: Option<EmployeeId>,
    pub decided_at: DateTime<Utc>,
    pub resolution_comment: Option<String>,
    pub rejection_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "resolution", rename_all = "snake_case")]
pub enum Resolution {
    UnderReview,
    Decided(FinalDecision),
}

/// Policy dial for the manager stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReviewPolicy {
    pub require_recommendation: bool,
}

impl Default for ReviewPolicy {
    fn default() -> Self {
        Self {
            require_recommendation: true,
        }
    }
}

impl From<&WorkflowConfig> for ReviewPolicy {
    fn from(config: &WorkflowConfig) -> Self {
        Self {
            require_recommendation: config.require_recommendation,
        }
    }
}

/// Rejected state changes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("item has already been finalized as {status}")]
    AlreadyFinalized { status: CaseStatus },
    #[error("a specialist recommendation is required before a final decision")]
    RecommendationRequired,
    #[error("refund has already been paid")]
    RefundSettled,
}

/// Two-stage review state shared by claims and disputes.
///
/// The specialist stage and the manager stage are tracked independently: a
/// recommendation never touches the resolution and a final decision never
/// touches the recommendation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewTrail {
    pub stage: ReviewStage,
    pub resolution: Resolution,
}

impl ReviewTrail {
    pub fn opened() -> Self {
        Self {
            stage: ReviewStage::Pending,
            resolution: Resolution::UnderReview,
        }
    }

    pub fn status(&self) -> CaseStatus {
        match &self.resolution {
            Resolution::UnderReview => CaseStatus::UnderReview,
            Resolution::Decided(decision) => decision.outcome.status(),
        }
    }

    pub fn review_status(&self) -> ReviewStatus {
        match &self.stage {
            ReviewStage::Pending => ReviewStatus::Pending,
            ReviewStage::Recommended(recommendation) => recommendation.verdict.review_status(),
        }
    }

    pub fn recommendation(&self) -> Option<&Recommendation> {
        match &self.stage {
            ReviewStage::Pending => None,
            ReviewStage::Recommended(recommendation) => Some(recommendation),
        }
    }

    pub fn decision(&self) -> Option<&FinalDecision> {
        match &self.resolution {
            Resolution::UnderReview => None,
            Resolution::Decided(decision) => Some(decision),
        }
    }

    pub fn is_pending_review(&self) -> bool {
        matches!(self.stage, ReviewStage::Pending)
    }

    /// Open for specialist triage: no recommendation yet and no binding decision.
    pub fn is_awaiting_recommendation(&self) -> bool {
        self.is_pending_review() && matches!(self.resolution, Resolution::UnderReview)
    }

    pub fn is_awaiting_final(&self) -> bool {
        matches!(self.stage, ReviewStage::Recommended(_))
            && matches!(self.resolution, Resolution::UnderReview)
    }

    /// Record (or replace) the specialist recommendation while the item is still open.
    pub fn recommend(&mut self, recommendation: Recommendation) -> Result<(), TransitionError> {
        if let Resolution::Decided(decision) = &self.resolution {
            return Err(TransitionError::AlreadyFinalized {
                status: decision.outcome.status(),
            });
        }
        self.stage = ReviewStage::Recommended(recommendation);
        Ok(())
    }

    /// Record the binding decision. Final fields are written exactly once.
    pub fn finalize(
        &mut self,
        decision: FinalDecision,
        policy: ReviewPolicy,
    ) -> Result<(), TransitionError> {
        if let Resolution::Decided(existing) = &self.resolution {
            return Err(TransitionError::AlreadyFinalized {
                status: existing.outcome.status(),
            });
        }
        if policy.require_recommendation && self.is_pending_review() {
            return Err(TransitionError::RecommendationRequired);
        }
        self.resolution = Resolution::Decided(decision);
        Ok(())
    }

    pub fn view(&self) -> ReviewFields {
        let recommendation = self.recommendation();
        let decision = self.decision();
        ReviewFields {
            status: self.status(),
            rejection_reason: decision.and_then(|d| d.rejection_reason.clone()),
            resolution_comment: decision.and_then(|d| d.resolution_comment.clone()),
            review_status: self.review_status(),
            review_comment: recommendation.and_then(|r| r.comment.clone()),
            review_by: recommendation.and_then(|r| r.reviewer.clone()),
            review_at: recommendation.map(|r| r.reviewed_at),
            final_by: decision.and_then(|d| d.decided_by.clone()),
            final_at: decision.map(|d| d.decided_at),
        }
    }
}

/// Flat review columns exposed to API consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewFields {
    pub status: CaseStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution_comment: Option<String>,
    pub review_status: ReviewStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_by: Option<EmployeeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_by: Option<EmployeeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_at: Option<DateTime<Utc>>,
}

/// Employee reimbursement request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimRecord {
    pub id: RecordId,
    pub claim_id: String,
    pub description: String,
    pub claim_type: String,
    pub amount: Decimal,
    pub approved_amount: Option<Decimal>,
    pub evidence: Option<String>,
    pub employee_id: EmployeeId,
    pub finance_staff_id: Option<EmployeeId>,
    pub trail: ReviewTrail,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ClaimRecord {
    pub fn view(&self) -> ClaimView {
        ClaimView {
            id: self.id.clone(),
            claim_id: self.claim_id.clone(),
            description: self.description.clone(),
            claim_type: self.claim_type.clone(),
            amount: self.amount,
            approved_amount: self.approved_amount,
            evidence: self.evidence.clone(),
            employee_id: self.employee_id.clone(),
            finance_staff_id: self.finance_staff_id.clone(),
            review: self.trail.view(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimView {
    pub id: RecordId,
    pub claim_id: String,
    pub description: String,
    pub claim_type: String,
    pub amount: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_amount: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<String>,
    pub employee_id: EmployeeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finance_staff_id: Option<EmployeeId>,
    #[serde(flatten)]
    pub review: ReviewFields,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Employee disagreement with a payslip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisputeRecord {
    pub id: RecordId,
    pub dispute_id: String,
    pub description: String,
    pub payslip_id: String,
    pub evidence: Option<String>,
    pub employee_id: EmployeeId,
    pub trail: ReviewTrail,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DisputeRecord {
    pub fn view(&self) -> DisputeView {
        DisputeView {
            id: self.id.clone(),
            dispute_id: self.dispute_id.clone(),
            description: self.description.clone(),
            payslip_id: self.payslip_id.clone(),
            evidence: self.evidence.clone(),
            employee_id: self.employee_id.clone(),
            review: self.trail.view(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisputeView {
    pub id: RecordId,
    pub dispute_id: String,
    pub description: String,
    pub payslip_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<String>,
    pub employee_id: EmployeeId,
    #[serde(flatten)]
    pub review: ReviewFields,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefundStatus {
    Pending,
    Paid,
}

impl RefundStatus {
    pub const fn label(self) -> &'static str {
        match self {
            RefundStatus::Pending => "pending",
            RefundStatus::Paid => "paid",
        }
    }
}

/// Finance-managed repayment owed to an employee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefundRecord {
    pub id: RecordId,
    pub refund_details: Map<String, Value>,
    pub employee_id: EmployeeId,
    pub finance_staff_id: Option<EmployeeId>,
    pub paid_in_payroll_run_id: Option<String>,
    pub status: RefundStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RefundRecord {
    pub fn view(&self) -> RefundView {
        RefundView {
            id: self.id.clone(),
            refund_details: self.refund_details.clone(),
            employee_id: self.employee_id.clone(),
            finance_staff_id: self.finance_staff_id.clone(),
            paid_in_payroll_run_id: self.paid_in_payroll_run_id.clone(),
            status: self.status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundView {
    pub id: RecordId,
    pub refund_details: Map<String, Value>,
    pub employee_id: EmployeeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finance_staff_id: Option<EmployeeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_in_payroll_run_id: Option<String>,
    pub status: RefundStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
