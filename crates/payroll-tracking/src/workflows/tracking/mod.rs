//! Payroll claims, disputes, and refunds tracking.
//!
//! Claims and disputes share one two-stage pipeline: a payroll specialist
//! recommends, then a payroll manager records the binding decision. Refunds
//! are a single-stage finance ledger. Every route is gated by the caller's
//! forwarded roles (see [`access`]).

pub mod access;
pub mod domain;
pub mod error;
pub mod intake;
pub mod memory;
pub mod refunds;
pub mod repository;
pub mod review;
pub mod router;
pub mod sequence;

#[cfg(test)]
mod tests;

pub use access::{identify_caller, AccessError, CallerIdentity, Role};
pub use domain::{
    CaseKind, CaseStatus, ClaimRecord, ClaimView, DisputeRecord, DisputeView, EmployeeId,
    Outcome, RecordId, RefundRecord, RefundStatus, RefundView, ReviewFields, ReviewPolicy,
    ReviewStatus, ReviewTrail, TransitionError, Verdict,
};
pub use error::TrackingError;
pub use intake::{
    ClaimSubmission, DisputeSubmission, FieldError, FinalDecisionRequest, RefundStatusUpdate,
    RefundSubmission, ReviewRequest, ValidationErrors,
};
pub use memory::InMemoryCollection;
pub use refunds::RefundService;
pub use repository::{Repository, RepositoryError, TrackedRecord};
pub use review::{ClaimService, DisputeService, ReviewCase, ReviewService};
pub use router::{refund_router, review_router, tracking_router, API_PREFIX};
pub use sequence::ReferenceSequence;
