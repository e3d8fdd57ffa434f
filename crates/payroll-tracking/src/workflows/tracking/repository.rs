use super::domain::{ClaimRecord, DisputeRecord, RecordId, RefundRecord};
use super::error::TrackingError;

/// Document stored in a tracking collection.
pub trait TrackedRecord: Clone + Send + Sync + 'static {
    fn record_id(&self) -> &RecordId;

    /// Human-readable reference that must stay unique within the collection.
    fn reference(&self) -> Option<&str> {
        None
    }
}

impl TrackedRecord for ClaimRecord {
    fn record_id(&self) -> &RecordId {
        &self.id
    }

    fn reference(&self) -> Option<&str> {
        Some(&self.claim_id)
    }
}

impl TrackedRecord for DisputeRecord {
    fn record_id(&self) -> &RecordId {
        &self.id
    }

    fn reference(&self) -> Option<&str> {
        Some(&self.dispute_id)
    }
}

impl TrackedRecord for RefundRecord {
    fn record_id(&self) -> &RecordId {
        &self.id
    }
}

/// One document collection. Implementations own their query and indexing behavior.
pub trait Repository<T: TrackedRecord>: Send + Sync {
    /// Rejects duplicate ids and duplicate references with [`RepositoryError::Conflict`].
    fn insert(&self, record: T) -> Result<T, RepositoryError>;
    /// Read-modify-write under the collection's own isolation. `change` runs
    /// against the current stored document and nothing is written when it
    /// fails. `Ok(None)` means no document has that id.
    fn modify(
        &self,
        id: &RecordId,
        change: &mut dyn FnMut(&mut T) -> Result<(), TrackingError>,
    ) -> Result<Option<T>, TrackingError>;
    fn fetch(&self, id: &RecordId) -> Result<Option<T>, RepositoryError>;
    /// Matching documents in insertion order.
    fn find(&self, filter: &dyn Fn(&T) -> bool) -> Result<Vec<T>, RepositoryError>;
    fn count(&self) -> Result<usize, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
