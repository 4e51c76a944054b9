//! Per-series single-flight tracking shared by the worker and the focus path.

use core_library::models::SeriesId;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::trace;

/// Set of series with a prefetch job currently running.
///
/// Cloning yields another handle to the same set.
#[derive(Debug, Clone, Default)]
pub struct InFlightSet {
    inner: Arc<Mutex<HashSet<SeriesId>>>,
}

impl InFlightSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `series_id` if nobody holds it. The claim lasts until the guard drops.
    pub fn try_claim(&self, series_id: SeriesId) -> Option<InFlightGuard> {
        if self.lock().insert(series_id) {
            trace!(%series_id, "Claimed in-flight slot");
            Some(InFlightGuard {
                set: self.clone(),
                series_id,
            })
        } else {
            None
        }
    }

    pub fn contains(&self, series_id: SeriesId) -> bool {
        self.lock().contains(&series_id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn release(&self, series_id: SeriesId) {
        self.lock().remove(&series_id);
        trace!(%series_id, "Released in-flight slot");
    }

    // The set stays consistent even if a holder panicked mid-operation.
    fn lock(&self) -> MutexGuard<'_, HashSet<SeriesId>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Claim on one series; releases the slot when dropped.
#[derive(Debug)]
pub struct InFlightGuard {
    set: InFlightSet,
    series_id: SeriesId,
}

impl InFlightGuard {
    pub fn series_id(&self) -> SeriesId {
        self.series_id
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.set.release(self.series_id);
    }
}
