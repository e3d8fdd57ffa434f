use std::sync::{Arc, Mutex, MutexGuard};

use super::domain::RecordId;
use super::error::TrackingError;
use super::repository::{Repository, RepositoryError, TrackedRecord};

/// Process-local collection used by the service binary and the test suites.
#[derive(Debug)]
pub struct InMemoryCollection<T> {
    records: Arc<Mutex<Vec<T>>>,
}

impl<T> Default for InMemoryCollection<T> {
    fn default() -> Self {
        Self {
            records: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl<T> Clone for InMemoryCollection<T> {
    fn clone(&self) -> Self {
        Self {
            records: Arc::clone(&self.records),
        }
    }
}

impl<T> InMemoryCollection<T> {
    fn lock(&self) -> Result<MutexGuard<'_, Vec<T>>, RepositoryError> {
        self.records
            .lock()
            .map_err(|_| RepositoryError::Unavailable("collection mutex poisoned".to_string()))
    }
}

impl<T: TrackedRecord> Repository<T> for InMemoryCollection<T> {
    fn insert(&self, record: T) -> Result<T, RepositoryError> {
        let mut guard = self.lock()?;
        let duplicate = guard.iter().any(|existing| {
            existing.record_id() == record.record_id()
                || (record.reference().is_some() && existing.reference() == record.reference())
        });
        if duplicate {
            return Err(RepositoryError::Conflict);
        }
        guard.push(record.clone());
        Ok(record)
    }

    fn modify(
        &self,
        id: &RecordId,
        change: &mut dyn FnMut(&mut T) -> Result<(), TrackingError>,
    ) -> Result<Option<T>, TrackingError> {
        let mut guard = self.lock()?;
        let Some(slot) = guard.iter_mut().find(|record| record.record_id() == id) else {
            return Ok(None);
        };
        let mut candidate = slot.clone();
        change(&mut candidate)?;
        *slot = candidate.clone();
        Ok(Some(candidate))
    }

    fn fetch(&self, id: &RecordId) -> Result<Option<T>, RepositoryError> {
        let guard = self.lock()?;
        Ok(guard.iter().find(|record| record.record_id() == id).cloned())
    }

    fn find(&self, filter: &dyn Fn(&T) -> bool) -> Result<Vec<T>, RepositoryError> {
        let guard = self.lock()?;
        Ok(guard.iter().filter(|&record| filter(record)).cloned().collect())
    }

    fn count(&self) -> Result<usize, RepositoryError> {
        Ok(self.lock()?.len())
    }
}
