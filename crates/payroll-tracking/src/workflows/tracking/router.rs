use std::sync::Arc;

use axum::{
    extract::{Path, Request, State},
    http::StatusCode,
    middleware::from_fn,
    routing::{get, patch, post},
    Json, Router,
};
use serde::de::DeserializeOwned;

use super::access::{identify_caller, AccessError, CallerIdentity, Role};
use super::domain::{ClaimRecord, DisputeRecord, RecordId, RefundRecord, RefundView, Verdict};
use super::error::TrackingError;
use super::intake::{
    FinalDecisionRequest, RefundStatusUpdate, RefundSubmission, ReviewRequest, ValidationErrors,
};
use super::refunds::RefundService;
use super::repository::Repository;
use super::review::{ClaimService, DisputeService, ReviewCase, ReviewService};

pub const API_PREFIX: &str = "/api/v1/payroll-tracking";

/// Largest request body accepted by the tracking routes.
pub const MAX_PAYLOAD_BYTES: usize = 64 * 1024;

/// Full tracking surface: claims, disputes, and refunds behind the caller-identity middleware.
pub fn tracking_router<C, D, F>(
    claims: Arc<ClaimService<C>>,
    disputes: Arc<DisputeService<D>>,
    refunds: Arc<RefundService<F>>,
) -> Router
where
    C: Repository<ClaimRecord> + 'static,
    D: Repository<DisputeRecord> + 'static,
    F: Repository<RefundRecord> + 'static,
{
    review_router(claims)
        .merge(review_router(disputes))
        .merge(refund_router(refunds))
        .layer(from_fn(identify_caller))
}

/// Employee, specialist, and manager routes for one review collection.
pub fn review_router<T, R>(service: Arc<ReviewService<T, R>>) -> Router
where
    T: ReviewCase,
    R: Repository<T> + 'static,
{
    let base = format!("{API_PREFIX}/{}", T::KIND.collection());
    Router::new()
        .route(&base, post(submit_handler::<T, R>))
        .route(&format!("{base}/me/:employee_id"), get(own_cases_handler::<T, R>))
        .route(&format!("{base}/pending"), get(pending_handler::<T, R>))
        .route(
            &format!("{base}/awaiting-final"),
            get(awaiting_final_handler::<T, R>),
        )
        .route(&format!("{base}/:id"), get(own_case_handler::<T, R>))
        .route(&format!("{base}/:id/approve"), patch(approve_handler::<T, R>))
        .route(&format!("{base}/:id/reject"), patch(reject_handler::<T, R>))
        .route(&format!("{base}/:id/final"), patch(final_handler::<T, R>))
        .with_state(service)
}

pub fn refund_router<R>(service: Arc<RefundService<R>>) -> Router
where
    R: Repository<RefundRecord> + 'static,
{
    let base = format!("{API_PREFIX}/refunds");
    Router::new()
        .route(
            &base,
            post(create_refund_handler::<R>).get(list_refunds_handler::<R>),
        )
        .route(&format!("{base}/:id"), get(refund_handler::<R>))
        .route(&format!("{base}/:id/status"), patch(refund_status_handler::<R>))
        .with_state(service)
}

/// Decode a JSON body once the caller has passed the role guard. A blank
/// body reads as the payload defaults, so field checks still report what is
/// missing.
pub(crate) async fn read_payload<P>(body: Request) -> Result<P, TrackingError>
where
    P: DeserializeOwned + Default,
{
    let bytes = axum::body::to_bytes(body.into_body(), MAX_PAYLOAD_BYTES)
        .await
        .map_err(|err| ValidationErrors::single("body", format!("unreadable body: {err}")))?;
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(P::default());
    }
    serde_json::from_slice(&bytes).map_err(|err| {
        TrackingError::from(ValidationErrors::single(
            "body",
            format!("malformed JSON payload: {err}"),
        ))
    })
}

pub(crate) async fn submit_handler<T, R>(
    State(service): State<Arc<ReviewService<T, R>>>,
    caller: CallerIdentity,
    body: Request,
) -> Result<(StatusCode, Json<T::View>), TrackingError>
where
    T: ReviewCase,
    R: Repository<T> + 'static,
{
    caller.require_any(&[Role::DepartmentEmployee])?;
    let employee = caller.require_employee()?;
    let submission: T::Submission = read_payload(body).await?;
    let record = service.submit(submission, employee)?;
    Ok((StatusCode::CREATED, Json(record.view())))
}

pub(crate) async fn own_cases_handler<T, R>(
    State(service): State<Arc<ReviewService<T, R>>>,
    caller: CallerIdentity,
    Path(employee_id): Path<String>,
) -> Result<Json<Vec<T::View>>, TrackingError>
where
    T: ReviewCase,
    R: Repository<T> + 'static,
{
    caller.require_any(&[Role::DepartmentEmployee])?;
    let employee = caller.require_employee()?;
    if employee.as_str() != employee_id.trim() {
        return Err(AccessError::NotOwner.into());
    }
    let records = service.for_employee(employee)?;
    Ok(Json(records.iter().map(|record| record.view()).collect()))
}

pub(crate) async fn own_case_handler<T, R>(
    State(service): State<Arc<ReviewService<T, R>>>,
    caller: CallerIdentity,
    Path(id): Path<String>,
) -> Result<Json<T::View>, TrackingError>
where
    T: ReviewCase,
    R: Repository<T> + 'static,
{
    caller.require_any(&[Role::DepartmentEmployee])?;
    let employee = caller.require_employee()?;
    let record = service.get_for_employee(&RecordId(id), employee)?;
    Ok(Json(record.view()))
}

pub(crate) async fn pending_handler<T, R>(
    State(service): State<Arc<ReviewService<T, R>>>,
    caller: CallerIdentity,
) -> Result<Json<Vec<T::View>>, TrackingError>
where
    T: ReviewCase,
    R: Repository<T> + 'static,
{
    caller.require_any(&[Role::PayrollSpecialist])?;
    let records = service.pending()?;
    Ok(Json(records.iter().map(|record| record.view()).collect()))
}

pub(crate) async fn awaiting_final_handler<T, R>(
    State(service): State<Arc<ReviewService<T, R>>>,
    caller: CallerIdentity,
) -> Result<Json<Vec<T::View>>, TrackingError>
where
    T: ReviewCase,
    R: Repository<T> + 'static,
{
    caller.require_any(&[Role::PayrollManager])?;
    let records = service.awaiting_final()?;
    Ok(Json(records.iter().map(|record| record.view()).collect()))
}

async fn recommend<T, R>(
    service: &ReviewService<T, R>,
    caller: &CallerIdentity,
    id: String,
    verdict: Verdict,
    body: Request,
) -> Result<Json<T::View>, TrackingError>
where
    T: ReviewCase,
    R: Repository<T> + 'static,
{
    caller.require_any(&[Role::PayrollSpecialist])?;
    let request: ReviewRequest = read_payload(body).await?;
    let record = service.recommend(
        &RecordId(id),
        verdict,
        request,
        caller.employee_id.as_ref(),
    )?;
    Ok(Json(record.view()))
}

pub(crate) async fn approve_handler<T, R>(
    State(service): State<Arc<ReviewService<T, R>>>,
    caller: CallerIdentity,
    Path(id): Path<String>,
    body: Request,
) -> Result<Json<T::View>, TrackingError>
where
    T: ReviewCase,
    R: Repository<T> + 'static,
{
    recommend(&service, &caller, id, Verdict::Approve, body).await
}

pub(crate) async fn reject_handler<T, R>(
    State(service): State<Arc<ReviewService<T, R>>>,
    caller: CallerIdentity,
    Path(id): Path<String>,
    body: Request,
) -> Result<Json<T::View>, TrackingError>
where
    T: ReviewCase,
    R: Repository<T> + 'static,
{
    recommend(&service, &caller, id, Verdict::Reject, body).await
}

pub(crate) async fn final_handler<T, R>(
    State(service): State<Arc<ReviewService<T, R>>>,
    caller: CallerIdentity,
    Path(id): Path<String>,
    body: Request,
) -> Result<Json<T::View>, TrackingError>
where
    T: ReviewCase,
    R: Repository<T> + 'static,
{
    caller.require_any(&[Role::PayrollManager])?;
    let request: FinalDecisionRequest = read_payload(body).await?;
    let record = service.finalize(&RecordId(id), request, caller.employee_id.as_ref())?;
    Ok(Json(record.view()))
}

pub(crate) async fn create_refund_handler<R>(
    State(service): State<Arc<RefundService<R>>>,
    caller: CallerIdentity,
    body: Request,
) -> Result<(StatusCode, Json<RefundView>), TrackingError>
where
    R: Repository<RefundRecord> + 'static,
{
    caller.require_any(&[Role::FinanceStaff])?;
    let submission: RefundSubmission = read_payload(body).await?;
    let record = service.create(submission)?;
    Ok((StatusCode::CREATED, Json(record.view())))
}

pub(crate) async fn refund_status_handler<R>(
    State(service): State<Arc<RefundService<R>>>,
    caller: CallerIdentity,
    Path(id): Path<String>,
    body: Request,
) -> Result<Json<RefundView>, TrackingError>
where
    R: Repository<RefundRecord> + 'static,
{
    caller.require_any(&[Role::FinanceStaff])?;
    let update: RefundStatusUpdate = read_payload(body).await?;
    let record = service.update_status(&RecordId(id), update)?;
    Ok(Json(record.view()))
}

pub(crate) async fn list_refunds_handler<R>(
    State(service): State<Arc<RefundService<R>>>,
    caller: CallerIdentity,
) -> Result<Json<Vec<RefundView>>, TrackingError>
where
    R: Repository<RefundRecord> + 'static,
{
    caller.require_any(&[Role::FinanceStaff])?;
    let records = service.list()?;
    Ok(Json(records.iter().map(RefundRecord::view).collect()))
}

pub(crate) async fn refund_handler<R>(
    State(service): State<Arc<RefundService<R>>>,
    caller: CallerIdentity,
    Path(id): Path<String>,
) -> Result<Json<RefundView>, TrackingError>
where
    R: Repository<RefundRecord> + 'static,
{
    caller.require_any(&[Role::FinanceStaff])?;
    let record = service.get(&RecordId(id))?;
    Ok(Json(record.view()))
}
