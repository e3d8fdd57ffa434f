//! Request payloads and their per-field validation.
//!
//! Payload fields are optional at the serde layer so that a missing value is
//! reported as a field error rather than as an opaque deserialization failure.

use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::access::AccessError;
use super::domain::{EmployeeId, Outcome, RefundStatus};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// Accumulated field errors for a single request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("request failed validation on {} field(s)", .errors.len())]
pub struct ValidationErrors {
    pub errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn single(field: &'static str, message: impl Into<String>) -> Self {
        let mut errors = Self::default();
        errors.push(field, message);
        errors
    }

    pub fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.errors.push(FieldError {
            field,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.errors.iter().any(|error| error.field == field)
    }

    fn finish<T>(self, value: Option<T>) -> Result<T, ValidationErrors> {
        match value {
            Some(value) if self.is_empty() => Ok(value),
            _ => Err(self),
        }
    }
}

fn required_text(
    errors: &mut ValidationErrors,
    field: &'static str,
    value: Option<String>,
) -> Option<String> {
    match value.map(|raw| raw.trim().to_string()) {
        None => {
            errors.push(field, "is required");
            None
        }
        Some(text) if text.is_empty() => {
            errors.push(field, "must not be blank");
            None
        }
        Some(text) => Some(text),
    }
}

pub(crate) fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|raw| raw.trim().to_string())
        .filter(|text| !text.is_empty())
}

fn optional_employee(
    errors: &mut ValidationErrors,
    field: &'static str,
    value: Option<String>,
) -> Option<EmployeeId> {
    match value.map(|raw| raw.trim().to_string()) {
        Some(text) if text.is_empty() => {
            errors.push(field, "must not be blank");
            None
        }
        other => other.map(EmployeeId),
    }
}

/// Behavior shared by employee-submitted payloads.
pub trait Submission: DeserializeOwned + Default + Send + 'static {
    type Draft: Clone + Send;

    fn employee_id_mut(&mut self) -> &mut Option<String>;

    fn validate(self) -> Result<Self::Draft, ValidationErrors>;
}

/// Attach the submitting employee, refusing payloads filed on someone else's behalf.
pub fn bind_owner<S: Submission>(
    submission: &mut S,
    submitted_by: &EmployeeId,
) -> Result<(), AccessError> {
    let slot = submission.employee_id_mut();
    let claimed = slot.as_deref().map(str::trim).unwrap_or_default().to_string();
    if claimed.is_empty() {
        *slot = Some(submitted_by.0.clone());
        return Ok(());
    }
    if claimed == submitted_by.as_str() {
        Ok(())
    } else {
        Err(AccessError::NotOwner)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimSubmission {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub claim_type: Option<String>,
    #[serde(default)]
    pub employee_id: Option<String>,
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub evidence: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClaimDraft {
    pub description: String,
    pub claim_type: String,
    pub employee_id: EmployeeId,
    pub amount: Decimal,
    pub evidence: Option<String>,
}

impl Submission for ClaimSubmission {
    type Draft = ClaimDraft;

    fn employee_id_mut(&mut self) -> &mut Option<String> {
        &mut self.employee_id
    }

    fn validate(self) -> Result<ClaimDraft, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let description = required_text(&mut errors, "description", self.description);
        let claim_type = required_text(&mut errors, "claimType", self.claim_type);
        let employee_id = required_text(&mut errors, "employeeId", self.employee_id);
        let amount = match self.amount {
            None => {
                errors.push("amount", "is required");
                None
            }
            Some(amount) if amount <= Decimal::ZERO => {
                errors.push("amount", "must be greater than zero");
                None
            }
            Some(amount) => Some(amount),
        };

        let draft = match (description, claim_type, employee_id, amount) {
            (Some(description), Some(claim_type), Some(employee_id), Some(amount)) => {
                Some(ClaimDraft {
                    description,
                    claim_type,
                    employee_id: EmployeeId(employee_id),
                    amount,
                    evidence: optional_text(self.evidence),
                })
            }
            _ => None,
        };
        errors.finish(draft)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisputeSubmission {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub employee_id: Option<String>,
    #[serde(default)]
    pub payslip_id: Option<String>,
    #[serde(default)]
    pub evidence: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisputeDraft {
    pub description: String,
    pub employee_id: EmployeeId,
    pub payslip_id: String,
    pub evidence: Option<String>,
}

impl Submission for DisputeSubmission {
    type Draft = DisputeDraft;

    fn employee_id_mut(&mut self) -> &mut Option<String> {
        &mut self.employee_id
    }

    fn validate(self) -> Result<DisputeDraft, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let description = required_text(&mut errors, "description", self.description);
        let employee_id = required_text(&mut errors, "employeeId", self.employee_id);
        let payslip_id = required_text(&mut errors, "payslipId", self.payslip_id);

        let draft = match (description, employee_id, payslip_id) {
            (Some(description), Some(employee_id), Some(payslip_id)) => Some(DisputeDraft {
                description,
                employee_id: EmployeeId(employee_id),
                payslip_id,
                evidence: optional_text(self.evidence),
            }),
            _ => None,
        };
        errors.finish(draft)
    }
}

/// Specialist recommendation body; the verdict comes from the route.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRequest {
    #[serde(default)]
    pub review_comment: Option<String>,
}

/// Manager decision body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalDecisionRequest {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub resolution_comment: Option<String>,
    #[serde(default)]
    pub rejection_reason: Option<String>,
    #[serde(default)]
    pub approved_amount: Option<Decimal>,
    #[serde(default)]
    pub finance_staff_id: Option<String>,
}

/// Validated manager decision, before case-specific settlement checks.
#[derive(Debug, Clone, PartialEq)]
pub struct FinalDirective {
    pub outcome: Outcome,
    pub resolution_comment: Option<String>,
    pub rejection_reason: Option<String>,
    pub approved_amount: Option<Decimal>,
    pub finance_staff_id: Option<EmployeeId>,
}

fn normalize_token(raw: &str) -> String {
    raw.trim().to_ascii_lowercase().replace([' ', '-'], "_")
}

impl FinalDecisionRequest {
    pub fn validate(self) -> Result<FinalDirective, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let outcome = match self.status.as_deref().map(normalize_token).as_deref() {
            None | Some("") => {
                errors.push("status", "is required");
                None
            }
            Some("approved") => Some(Outcome::Approved),
            Some("rejected") => Some(Outcome::Rejected),
            Some(_) => {
                errors.push("status", "must be one of: approved, rejected");
                None
            }
        };

        let rejection_reason = optional_text(self.rejection_reason);
        let finance_staff_id = optional_employee(&mut errors, "financeStaffId", self.finance_staff_id);
        if let Some(amount) = self.approved_amount {
            if amount < Decimal::ZERO {
                errors.push("approvedAmount", "must not be negative");
            }
        }

        if outcome == Some(Outcome::Rejected) {
            if self.approved_amount.is_some() {
                errors.push("approvedAmount", "only applies to approved decisions");
            }
            if finance_staff_id.is_some() {
                errors.push("financeStaffId", "only applies to approved decisions");
            }
        }
        if outcome == Some(Outcome::Approved) && rejection_reason.is_some() {
            errors.push("rejectionReason", "only applies to rejected decisions");
        }

        let directive = outcome.map(|outcome| FinalDirective {
            outcome,
            resolution_comment: optional_text(self.resolution_comment),
            rejection_reason,
            approved_amount: self.approved_amount,
            finance_staff_id,
        });
        errors.finish(directive)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundSubmission {
    #[serde(default)]
    pub refund_details: Option<Value>,
    #[serde(default)]
    pub employee_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RefundDraft {
    pub refund_details: Map<String, Value>,
    pub employee_id: EmployeeId,
}

impl RefundSubmission {
    pub fn validate(self) -> Result<RefundDraft, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let refund_details = match self.refund_details {
            None | Some(Value::Null) => {
                errors.push("refundDetails", "is required");
                None
            }
            Some(Value::Object(details)) => Some(details),
            Some(_) => {
                errors.push("refundDetails", "must be a JSON object");
                None
            }
        };
        let employee_id = required_text(&mut errors, "employeeId", self.employee_id);

        let draft = match (refund_details, employee_id) {
            (Some(refund_details), Some(employee_id)) => Some(RefundDraft {
                refund_details,
                employee_id: EmployeeId(employee_id),
            }),
            _ => None,
        };
        errors.finish(draft)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundStatusUpdate {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub finance_staff_id: Option<String>,
    #[serde(default)]
    pub paid_in_payroll_run_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefundDirective {
    pub status: RefundStatus,
    pub finance_staff_id: Option<EmployeeId>,
    pub paid_in_payroll_run_id: Option<String>,
}

impl RefundStatusUpdate {
    pub fn validate(self) -> Result<RefundDirective, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let status = match self.status.as_deref().map(normalize_token).as_deref() {
            None | Some("") => {
                errors.push("status", "is required");
                None
            }
            Some("pending") => Some(RefundStatus::Pending),
            Some("paid") => Some(RefundStatus::Paid),
            Some(_) => {
                errors.push("status", "must be one of: pending, paid");
                None
            }
        };
        let finance_staff_id = optional_employee(&mut errors, "financeStaffId", self.finance_staff_id);
        let paid_in_payroll_run_id = optional_text(self.paid_in_payroll_run_id);

        let directive = status.map(|status| RefundDirective {
            status,
            finance_staff_id,
            paid_in_payroll_run_id,
        });
        errors.finish(directive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn claim_validation_reports_every_missing_field() {
        let errors = ClaimSubmission::default()
            .validate()
            .expect_err("empty payload rejected");

        for field in ["description", "claimType", "employeeId", "amount"] {
            assert!(errors.has_field(field), "missing error for {field}");
        }
        assert!(!errors.has_field("evidence"));
    }

    #[test]
    fn claim_amount_must_be_positive() {
        let submission: ClaimSubmission = serde_json::from_value(json!({
            "description": "flight",
            "claimType": "travel",
            "employeeId": "E1",
            "amount": 0
        }))
        .expect("payload parses");

        let errors = submission.validate().expect_err("zero amount rejected");
        assert_eq!(errors.errors.len(), 1);
        assert_eq!(errors.errors[0].field, "amount");
    }

    #[test]
    fn blank_evidence_is_dropped() {
        let submission: ClaimSubmission = serde_json::from_value(json!({
            "description": " flight ",
            "claimType": "travel",
            "employeeId": "E1",
            "amount": 200,
            "evidence": "   "
        }))
        .expect("payload parses");

        let draft = submission.validate().expect("valid claim");
        assert_eq!(draft.description, "flight");
        assert_eq!(draft.amount, Decimal::from(200));
        assert!(draft.evidence.is_none());
    }

    #[test]
    fn dispute_requires_payslip_reference() {
        let submission = DisputeSubmission {
            description: Some("overtime missing".to_string()),
            employee_id: Some("E1".to_string()),
            payslip_id: Some("  ".to_string()),
            evidence: None,
        };

        let errors = submission.validate().expect_err("blank payslip rejected");
        assert!(errors.has_field("payslipId"));
        assert_eq!(errors.errors.len(), 1);
    }

    #[test]
    fn bind_owner_defaults_and_guards_employee() {
        let caller = EmployeeId::new("E1");

        let mut unowned = ClaimSubmission::default();
        bind_owner(&mut unowned, &caller).expect("defaults to caller");
        assert_eq!(unowned.employee_id.as_deref(), Some("E1"));

        let mut foreign = ClaimSubmission {
            employee_id: Some("E2".to_string()),
            ..ClaimSubmission::default()
        };
        assert_eq!(
            bind_owner(&mut foreign, &caller),
            Err(AccessError::NotOwner)
        );
    }

    #[test]
    fn final_decision_rejects_under_review_status() {
        let request = FinalDecisionRequest {
            status: Some("under review".to_string()),
            ..FinalDecisionRequest::default()
        };
        let errors = request.validate().expect_err("not a final status");
        assert!(errors.has_field("status"));
    }

    #[test]
    fn final_decision_cross_checks_outcome_fields() {
        let request = FinalDecisionRequest {
            status: Some("rejected".to_string()),
            approved_amount: Some(Decimal::from(10)),
            finance_staff_id: Some("F1".to_string()),
            ..FinalDecisionRequest::default()
        };
        let errors = request.validate().expect_err("approval fields on rejection");
        assert!(errors.has_field("approvedAmount"));
        assert!(errors.has_field("financeStaffId"));

        let approved = FinalDecisionRequest {
            status: Some("Approved".to_string()),
            resolution_comment: Some("paid next cycle".to_string()),
            ..FinalDecisionRequest::default()
        }
        .validate()
        .expect("valid approval");
        assert_eq!(approved.outcome, Outcome::Approved);
        assert_eq!(approved.resolution_comment.as_deref(), Some("paid next cycle"));
    }

    #[test]
    fn refund_details_must_be_an_object() {
        let errors = RefundSubmission {
            refund_details: Some(json!(["not", "an", "object"])),
            employee_id: Some("E1".to_string()),
        }
        .validate()
        .expect_err("array details rejected");
        assert!(errors.has_field("refundDetails"));

        let draft = RefundSubmission {
            refund_details: Some(json!({ "description": "overpaid tax", "amount": 120 })),
            employee_id: Some("E1".to_string()),
        }
        .validate()
        .expect("object details accepted");
        assert_eq!(draft.refund_details["amount"], json!(120));
    }

    #[test]
    fn refund_update_requires_known_status() {
        let errors = RefundStatusUpdate {
            status: Some("refunded".to_string()),
            ..RefundStatusUpdate::default()
        }
        .validate()
        .expect_err("unknown status");
        assert!(errors.has_field("status"));

        let directive = RefundStatusUpdate {
            status: Some("paid".to_string()),
            finance_staff_id: None,
            paid_in_payroll_run_id: Some("RUN-2025-10".to_string()),
        }
        .validate()
        .expect("valid update");
        assert_eq!(directive.status, RefundStatus::Paid);
        assert!(directive.finance_staff_id.is_none());
    }
}
