//! Shared, append-only log of sensor hits.
//!
//! One [`HitLog`] is created per process and handed to every controller as
//! an `Arc<HitLog>`. Workers append concurrently; the coordinator clears it at
//! begin-of-run and snapshots it at end-of-run.

use std::sync::{Mutex, MutexGuard, PoisonError};

use fibertrace_types::Hit;

/// Thread-safe hit collection.
///
/// The critical section of [`HitLog::append`] is a single push of an
/// already-built hit. A poisoned lock is recovered: entries are only ever
/// pushed whole, so a panic elsewhere cannot leave a partial record behind.
#[derive(Debug, Default)]
pub struct HitLog {
    /// Hits recorded during the current run.
    hits: Mutex<Vec<Hit>>,
}

impl HitLog {
    /// Create an empty log.
    pub const fn new() -> Self {
        Self {
            hits: Mutex::new(Vec::new()),
        }
    }

    /// Lock the inner vector, recovering from poisoning.
    fn lock(&self) -> MutexGuard<'_, Vec<Hit>> {
        self.hits.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append one hit.
    pub fn append(&self, hit: Hit) {
        self.lock().push(hit);
    }

    /// Remove every hit.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Clone of the current contents, in append order.
    pub fn snapshot(&self) -> Vec<Hit> {
        self.lock().clone()
    }

    /// Number of recorded hits.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no hits are recorded.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
