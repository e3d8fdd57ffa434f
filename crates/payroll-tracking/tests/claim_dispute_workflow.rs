//! End-to-end scenarios for the claim and dispute review pipeline, driven
//! through the public router with gateway-style identity headers.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use payroll_tracking::workflows::tracking::{
    tracking_router, ClaimService, DisputeService, InMemoryCollection, RefundService,
    ReviewPolicy, API_PREFIX,
};

fn router(policy: ReviewPolicy) -> Router {
    let claims = ClaimService::new(Arc::new(InMemoryCollection::default()), policy)
        .expect("empty store counts");
    let disputes = DisputeService::new(Arc::new(InMemoryCollection::default()), policy)
        .expect("empty store counts");
    let refunds = RefundService::new(Arc::new(InMemoryCollection::default()));
    tracking_router(Arc::new(claims), Arc::new(disputes), Arc::new(refunds))
}

async fn call(
    router: &Router,
    method: Method,
    path: &str,
    roles: &str,
    employee: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let builder = Request::builder()
        .method(method)
        .uri(format!("{API_PREFIX}{path}"))
        .header("x-user-roles", roles)
        .header("x-employee-id", employee);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request builds"),
        None => builder.body(Body::empty()).expect("request builds"),
    };

    let response = router.clone().oneshot(request).await.expect("router responds");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    let payload = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json payload")
    };
    (status, payload)
}

#[tokio::test]
async fn travel_claim_is_recommended_then_approved() {
    let router = router(ReviewPolicy::default());

    let (status, claim) = call(
        &router,
        Method::POST,
        "/claims",
        "department_employee",
        "E1",
        Some(json!({
            "description": "flight",
            "claimType": "travel",
            "employeeId": "E1",
            "amount": 200
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(claim["claimId"], "CLAIM-0001");
    let id = claim["id"].as_str().expect("id").to_string();

    let (_, pending) = call(
        &router,
        Method::GET,
        "/claims/pending",
        "payroll_specialist",
        "S1",
        None,
    )
    .await;
    assert_eq!(pending.as_array().map(Vec::len), Some(1));

    let (status, reviewed) = call(
        &router,
        Method::PATCH,
        &format!("/claims/{id}/approve"),
        "payroll_specialist",
        "S1",
        Some(json!({ "reviewComment": "receipt attached" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reviewed["status"], "under_review");
    assert_eq!(reviewed["reviewStatus"], "recommend_approve");

    let (_, pending) = call(
        &router,
        Method::GET,
        "/claims/pending",
        "payroll_specialist",
        "S1",
        None,
    )
    .await;
    assert_eq!(pending, json!([]));
    let (_, awaiting) = call(
        &router,
        Method::GET,
        "/claims/awaiting-final",
        "payroll_manager",
        "M1",
        None,
    )
    .await;
    assert_eq!(awaiting[0]["id"], id.as_str());

    let (status, decided) = call(
        &router,
        Method::PATCH,
        &format!("/claims/{id}/final"),
        "payroll_manager",
        "M1",
        Some(json!({ "status": "approved", "approvedAmount": 180, "financeStaffId": "F1" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decided["status"], "approved");
    assert_eq!(decided["reviewStatus"], "recommend_approve");
    assert_eq!(decided["approvedAmount"], 180.0);
    assert_eq!(decided["financeStaffId"], "F1");
    assert_eq!(decided["finalBy"], "M1");

    let (_, awaiting) = call(
        &router,
        Method::GET,
        "/claims/awaiting-final",
        "payroll_manager",
        "M1",
        None,
    )
    .await;
    assert_eq!(awaiting, json!([]));

    let (status, own) = call(
        &router,
        Method::GET,
        &format!("/claims/{id}"),
        "department_employee",
        "E1",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(own["status"], "approved");
}

#[tokio::test]
async fn manager_can_overrule_a_rejection_recommendation_on_disputes() {
    let router = router(ReviewPolicy::default());

    let (status, dispute) = call(
        &router,
        Method::POST,
        "/disputes",
        "department_employee",
        "E1",
        Some(json!({
            "description": "overtime missing",
            "payslipId": "PAYSLIP-2025-09-E1"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(dispute["disputeId"], "DISP-0001");
    assert_eq!(dispute["employeeId"], "E1");
    let id = dispute["id"].as_str().expect("id").to_string();

    let (status, _) = call(
        &router,
        Method::PATCH,
        &format!("/disputes/{id}/reject"),
        "payroll_specialist",
        "S1",
        Some(json!({ "reviewComment": "timesheet not approved" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, decided) = call(
        &router,
        Method::PATCH,
        &format!("/disputes/{id}/final"),
        "payroll_manager",
        "M1",
        Some(json!({ "status": "approved", "resolutionComment": "timesheet approved late" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decided["status"], "approved");
    assert_eq!(decided["reviewStatus"], "recommend_reject");
    assert_eq!(decided["reviewComment"], "timesheet not approved");
}

#[tokio::test]
async fn relaxed_policy_lets_managers_decide_directly() {
    let router = router(ReviewPolicy {
        require_recommendation: false,
    });

    let (_, claim) = call(
        &router,
        Method::POST,
        "/claims",
        "department_employee",
        "E1",
        Some(json!({ "description": "taxi", "claimType": "travel", "amount": 35.5 })),
    )
    .await;
    let id = claim["id"].as_str().expect("id").to_string();

    let (status, decided) = call(
        &router,
        Method::PATCH,
        &format!("/claims/{id}/final"),
        "payroll_manager",
        "M1",
        Some(json!({ "status": "rejected", "rejectionReason": "personal trip" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decided["status"], "rejected");
    assert_eq!(decided["reviewStatus"], "pending");
    assert_eq!(decided["rejectionReason"], "personal trip");
}

#[tokio::test]
async fn employees_cannot_file_for_colleagues() {
    let router = router(ReviewPolicy::default());

    let (status, payload) = call(
        &router,
        Method::POST,
        "/claims",
        "department_employee",
        "E2",
        Some(json!({
            "description": "flight",
            "claimType": "travel",
            "employeeId": "E1",
            "amount": 200
        })),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(payload["error"].is_string());
}

#[tokio::test]
async fn role_lists_may_carry_several_roles() {
    let router = router(ReviewPolicy::default());

    let (status, _) = call(
        &router,
        Method::POST,
        "/claims",
        "payroll manager, department-employee",
        "M1",
        Some(json!({ "description": "course fee", "claimType": "training", "amount": 90 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = call(
        &router,
        Method::GET,
        "/claims/awaiting-final",
        "payroll manager,
        department-employee",
        "M1",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}
