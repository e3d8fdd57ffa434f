use crate::infra::TrackingServices;
use chrono::Utc;
use clap::Args;
use payroll_tracking::error::AppError;
use payroll_tracking::workflows::tracking::{
    ClaimRecord, ClaimSubmission, DisputeRecord, DisputeSubmission, EmployeeId,
    FinalDecisionRequest, RefundRecord, RefundStatusUpdate, RefundSubmission, ReviewPolicy,
    ReviewRequest, Verdict,
};
use rust_decimal::Decimal;
use serde_json::json;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Employee filing the demo claim and dispute
    #[arg(long, default_value = "E1")]
    pub(crate) employee: String,
    /// Claimed amount for the demo travel claim
    #[arg(long, default_value = "200")]
    pub(crate) amount: Decimal,
    /// Let the manager decide without a specialist recommendation
    #[arg(long)]
    pub(crate) skip_recommendation: bool,
    /// Print full JSON payloads for each record
    #[arg(long)]
    pub(crate) json: bool,
}

pub(crate) struct DemoOutcome {
    pub(crate) claim: ClaimRecord,
    pub(crate) dispute: DisputeRecord,
    pub(crate) refund: RefundRecord,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let print_json = args.json;
    println!("Payroll tracking demo");
    let outcome = run_scenario(&args)?;

    let claim = &outcome.claim;
    println!(
        "- Claim {} ({}) for {} -> {} / review {}",
        claim.claim_id,
        claim.claim_type,
        claim.amount,
        claim.trail.status(),
        claim.trail.review_status().label()
    );
    if let Some(approved) = claim.approved_amount {
        println!("  Approved amount: {approved}");
    }

    let dispute = &outcome.dispute;
    println!(
        "- Dispute {} on payslip {} -> {} / review {}",
        dispute.dispute_id,
        dispute.payslip_id,
        dispute.trail.status(),
        dispute.trail.review_status().label()
    );
    if let Some(reason) = dispute
        .trail
        .decision()
        .and_then(|decision| decision.rejection_reason.as_deref())
    {
        println!("  Rejection reason: {reason}");
    }

    let refund = &outcome.refund;
    println!(
        "- Refund {} for {} -> {} in {}",
        refund.id,
        refund.employee_id,
        refund.status.label(),
        refund.paid_in_payroll_run_id.as_deref().unwrap_or("no payroll run")
    );

    if print_json {
        let payload = json!({
            "claim": claim.view(),
            "dispute": dispute.view(),
            "refund": refund.view(),
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    }

    Ok(())
}

/// Approve a claim, reject a dispute, and pay the resulting refund.
pub(crate) fn run_scenario(args: &DemoArgs) -> Result<DemoOutcome, AppError> {
    let policy = ReviewPolicy {
        require_recommendation: !args.skip_recommendation,
    };
    let services = TrackingServices::in_memory(policy)?;
    let employee = EmployeeId::new(args.employee.trim());
    let specialist = EmployeeId::new("S1");
    let manager = EmployeeId::new("M1");

    let claim = services.claims.submit(
        ClaimSubmission {
            description: Some("client visit flight".to_string()),
            claim_type: Some("travel".to_string()),
            employee_id: None,
            amount: Some(args.amount),
            evidence: Some("receipts/flight.pdf".to_string()),
        },
        &employee,
    )?;
    let dispute = services.disputes.submit(
        DisputeSubmission {
            description: Some("overtime hours missing".to_string()),
            employee_id: None,
            payslip_id: Some(format!("PAYSLIP-{}", Utc::now().format("%Y-%m"))),
            evidence: None,
        },
        &employee,
    )?;

    if !args.skip_recommendation {
        services.claims.recommend(
            &claim.id,
            Verdict::Approve,
            ReviewRequest {
                review_comment: Some("receipt matches itinerary".to_string()),
            },
            Some(&specialist),
        )?;
        services.disputes.recommend(
            &dispute.id,
            Verdict::Reject,
            ReviewRequest {
                review_comment: Some("hours recorded on next payslip".to_string()),
            },
            Some(&specialist),
        )?;
    }

    let claim = services.claims.finalize(
        &claim.id,
        FinalDecisionRequest {
            status: Some("approved".to_string()),
            resolution_comment: Some("reimburse in next payroll run".to_string()),
            finance_staff_id: Some("F1".to_string()),
            ..FinalDecisionRequest::default()
        },
        Some(&manager),
    )?;
    let dispute = services.disputes.finalize(
        &dispute.id,
        FinalDecisionRequest {
            status: Some("rejected".to_string()),
            rejection_reason: Some("overtime was paid in the following run".to_string()),
            ..FinalDecisionRequest::default()
        },
        Some(&manager),
    )?;

    let approved = claim.approved_amount.unwrap_or(claim.amount);
    let refund = services.refunds.create(RefundSubmission {
        refund_details: Some(json!({
            "description": format!("reimbursement for {}", claim.claim_id),
            "amount": approved,
        })),
        employee_id: Some(employee.to_string()),
    })?;
    let refund = services.refunds.update_status(
        &refund.id,
        RefundStatusUpdate {
            status: Some("paid".to_string()),
            finance_staff_id: Some("F1".to_string()),
            paid_in_payroll_run_id: Some(format!("RUN-{}", Utc::now().format("%Y-%m"))),
        },
    )?;

    Ok(DemoOutcome {
        claim,
        dispute,
        refund,
    })
}
