use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{header, Method, Request};
use axum::response::Response;
use rust_decimal::Decimal;
use serde_json::{json, Value};

use crate::workflows::tracking::access::{EMPLOYEE_HEADER, ROLES_HEADER};
use crate::workflows::tracking::domain::{
    ClaimRecord, DisputeRecord, EmployeeId, RecordId, RefundRecord, ReviewPolicy,
};
use crate::workflows::tracking::error::TrackingError;
use crate::workflows::tracking::intake::{ClaimSubmission, DisputeSubmission, RefundSubmission};
use crate::workflows::tracking::memory::InMemoryCollection;
use crate::workflows::tracking::refunds::RefundService;
use crate::workflows::tracking::repository::{Repository, RepositoryError, TrackedRecord};
use crate::workflows::tracking::review::{ClaimService, DisputeService};
use crate::workflows::tracking::router::tracking_router;

pub(super) fn employee() -> EmployeeId {
    EmployeeId::new("E1")
}

pub(super) fn specialist() -> EmployeeId {
    EmployeeId::new("S1")
}

pub(super) fn manager() -> EmployeeId {
    EmployeeId::new("M1")
}

pub(super) fn claim_submission() -> ClaimSubmission {
    ClaimSubmission {
        description: Some("flight".to_string()),
        claim_type: Some("travel".to_string()),
        employee_id: Some("E1".to_string()),
        amount: Some(Decimal::from(200)),
        evidence: Some("https://receipts.example/flight.pdf".to_string()),
    }
}

pub(super) fn dispute_submission() -> DisputeSubmission {
    DisputeSubmission {
        description: Some("overtime hours missing from September payslip".to_string()),
        employee_id: Some("E1".to_string()),
        payslip_id: Some("PAYSLIP-2025-09-E1".to_string()),
        evidence: None,
    }
}

pub(super) fn refund_submission() -> RefundSubmission {
    RefundSubmission {
        refund_details: Some(json!({
            "description": "approved travel claim CLAIM-0001",
            "amount": 200
        })),
        employee_id: Some("E1".to_string()),
    }
}

pub(super) fn claim_service(
    policy: ReviewPolicy,
) -> (
    ClaimService<InMemoryCollection<ClaimRecord>>,
    Arc<InMemoryCollection<ClaimRecord>>,
) {
    let repository = Arc::new(InMemoryCollection::default());
    let service = ClaimService::new(repository.clone(), policy).expect("empty store counts");
    (service, repository)
}

pub(super) fn dispute_service(
    policy: ReviewPolicy,
) -> (
    DisputeService<InMemoryCollection<DisputeRecord>>,
    Arc<InMemoryCollection<DisputeRecord>>,
) {
    let repository = Arc::new(InMemoryCollection::default());
    let service = DisputeService::new(repository.clone(), policy).expect("empty store counts");
    (service, repository)
}

pub(super) fn refund_service() -> (
    RefundService<InMemoryCollection<RefundRecord>>,
    Arc<InMemoryCollection<RefundRecord>>,
) {
    let repository = Arc::new(InMemoryCollection::default());
    (RefundService::new(repository.clone()), repository)
}

pub(super) struct Harness {
    pub(super) claims: Arc<ClaimService<InMemoryCollection<ClaimRecord>>>,
    pub(super) disputes: Arc<DisputeService<InMemoryCollection<DisputeRecord>>>,
    pub(super) refunds: Arc<RefundService<InMemoryCollection<RefundRecord>>>,
}

impl Harness {
    pub(super) fn new() -> Self {
        Self {
            claims: Arc::new(claim_service(ReviewPolicy::default()).0),
            disputes: Arc::new(dispute_service(ReviewPolicy::default()).0),
            refunds: Arc::new(refund_service().0),
        }
    }

    pub(super) fn router(&self) -> axum::Router {
        tracking_router(
            self.claims.clone(),
            self.disputes.clone(),
            self.refunds.clone(),
        )
    }
}

/// Repository whose first `remaining` inserts collide on the reference.
pub(super) struct CollidingRepository<T> {
    pub(super) inner: InMemoryCollection<T>,
    pub(super) remaining: AtomicUsize,
}

impl<T> CollidingRepository<T> {
    pub(super) fn new(collisions: usize) -> Self {
        Self {
            inner: InMemoryCollection::default(),
            remaining: AtomicUsize::new(collisions),
        }
    }
}

impl<T: TrackedRecord> Repository<T> for CollidingRepository<T> {
    fn insert(&self, record: T) -> Result<T, RepositoryError> {
        let collide = self
            .remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if collide {
            return Err(RepositoryError::Conflict);
        }
        self.inner.insert(record)
    }

    fn modify(
        &self,
        id: &RecordId,
        change: &mut dyn FnMut(&mut T) -> Result<(), TrackingError>,
    ) -> Result<Option<T>, TrackingError> {
        self.inner.modify(id, change)
    }

    fn fetch(&self, id: &RecordId) -> Result<Option<T>, RepositoryError> {
        self.inner.fetch(id)
    }

    fn find(&self, filter: &dyn Fn(&T) -> bool) -> Result<Vec<T>, RepositoryError> {
        self.inner.find(filter)
    }

    fn count(&self) -> Result<usize, RepositoryError> {
        self.inner.count()
    }
}

type Competitor = Box<dyn FnOnce() + Send>;

/// Shares a store with other services and lets one of them commit a change
/// right before this repository's next write lands.
pub(super) struct InterleavingRepository<T> {
    pub(super) inner: Arc<InMemoryCollection<T>>,
    competitor: Mutex<Option<Competitor>>,
}

impl<T> InterleavingRepository<T> {
    pub(super) fn new(inner: Arc<InMemoryCollection<T>>) -> Self {
        Self {
            inner,
            competitor: Mutex::new(None),
        }
    }

    pub(super) fn before_next_write(&self, competitor: impl FnOnce() + Send + 'static) {
        *self.competitor.lock().expect("competitor slot") = Some(Box::new(competitor));
    }
}

impl<T: TrackedRecord> Repository<T> for InterleavingRepository<T> {
    fn insert(&self, record: T) -> Result<T, RepositoryError> {
        self.inner.insert(record)
    }

    fn modify(
        &self,
        id: &RecordId,
        change: &mut dyn FnMut(&mut T) -> Result<(), TrackingError>,
    ) -> Result<Option<T>, TrackingError> {
        let competitor = self.competitor.lock().expect("competitor slot").take();
        if let Some(competitor) = competitor {
            competitor();
        }
        self.inner.modify(id, change)
    }

    fn fetch(&self, id: &RecordId) -> Result<Option<T>, RepositoryError> {
        self.inner.fetch(id)
    }

    fn find(&self, filter: &dyn Fn(&T) -> bool) -> Result<Vec<T>, RepositoryError> {
        self.inner.find(filter)
    }

    fn count(&self) -> Result<usize, RepositoryError> {
        self.inner.count()
    }
}

pub(super) struct UnavailableRepository;

impl<T: TrackedRecord> Repository<T> for UnavailableRepository {
    fn insert(&self, _record: T) -> Result<T, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn modify(
        &self,
        _id: &RecordId,
        _change: &mut dyn FnMut(&mut T) -> Result<(), TrackingError>,
    ) -> Result<Option<T>, TrackingError> {
        Err(RepositoryError::Unavailable("database offline".to_string()).into())
    }

    fn fetch(&self, _id: &RecordId) -> Result<Option<T>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn find(&self, _filter: &dyn Fn(&T) -> bool) -> Result<Vec<T>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn count(&self) -> Result<usize, RepositoryError> {
        Ok(0)
    }
}

pub(super) fn request(
    method: Method,
    uri: &str,
    roles: &str,
    employee: Option<&str>,
    body: Option<Value>,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(ROLES_HEADER, roles);
    if let Some(employee) = employee {
        builder = builder.header(EMPLOYEE_HEADER, employee);
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&body).expect("json body")))
            .expect("request builds"),
        None => builder.body(Body::empty()).expect("request builds"),
    }
}

pub(super) fn raw_request(
    method: Method,
    uri: &str,
    roles: &str,
    employee: &str,
    body: &str,
) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(ROLES_HEADER, roles)
        .header(EMPLOYEE_HEADER, employee)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request builds")
}

/// Raw request carrying `body` verbatim, for handlers called directly.
pub(super) fn raw_body(body: &str) -> Request<Body> {
    Request::builder()
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request builds")
}

/// Request carrying `payload` as JSON, for handlers called directly.
pub(super) fn json_body<P: serde::Serialize>(payload: &P) -> Request<Body> {
    raw_body(&serde_json::to_string(payload).expect("json payload"))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
