use std::sync::atomic::{AtomicU64, Ordering};

/// Minimum digit count for human-readable references (`CLAIM-0001`).
pub const REFERENCE_WIDTH: usize = 4;

pub fn format_reference(prefix: &str, number: u64) -> String {
    format!("{prefix}-{number:0width$}", width = REFERENCE_WIDTH)
}

/// Atomic source of human-readable references for one collection.
///
/// Draws never repeat within a process. Uniqueness against documents written
/// by other processes is enforced by the repository rejecting duplicates.
#[derive(Debug)]
pub struct ReferenceSequence {
    prefix: &'static str,
    next: AtomicU64,
}

impl ReferenceSequence {
    pub const fn new(prefix: &'static str) -> Self {
        Self {
            prefix,
            next: AtomicU64::new(1),
        }
    }

    /// Continue numbering after `existing` documents.
    pub fn resume(prefix: &'static str, existing: u64) -> Self {
        Self {
            prefix,
            next: AtomicU64::new(existing.saturating_add(1)),
        }
    }

    pub fn prefix(&self) -> &'static str {
        self.prefix
    }

    pub fn next_reference(&self) -> String {
        let number = self.next.fetch_add(1, Ordering::Relaxed);
        format_reference(self.prefix, number)
    }
}
