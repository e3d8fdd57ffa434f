use metrics_exporter_prometheus::PrometheusHandle;
use payroll_tracking::workflows::tracking::{
    ClaimRecord, ClaimService, DisputeRecord, DisputeService, InMemoryCollection, RefundRecord,
    RefundService, RepositoryError, ReviewPolicy,
};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) type ClaimStore = InMemoryCollection<ClaimRecord>;
pub(crate) type DisputeStore = InMemoryCollection<DisputeRecord>;
pub(crate) type RefundStore = InMemoryCollection<RefundRecord>;

/// Tracking services wired to process-local collections.
#[derive(Clone)]
pub(crate) struct TrackingServices {
    pub(crate) claims: Arc<ClaimService<ClaimStore>>,
    pub(crate) disputes: Arc<DisputeService<DisputeStore>>,
    pub(crate) refunds: Arc<RefundService<RefundStore>>,
}

impl TrackingServices {
    pub(crate) fn in_memory(policy: ReviewPolicy) -> Result<Self, RepositoryError> {
        let claims = ClaimService::new(Arc::new(ClaimStore::default()), policy)?;
        let disputes = DisputeService::new(Arc::new(DisputeStore::default()), policy)?;
        let refunds = RefundService::new(Arc::new(RefundStore::default()));

        Ok(Self {
            claims: Arc::new(claims),
            disputes: Arc::new(disputes),
            refunds: Arc::new(refunds),
        })
    }
}
