//! Bounded FIFO of pending prefetch requests
//!
//! When full, a new request evicts the longest-waiting one. A request for a
//! series that is already queued is merged into the existing entry, which then
//! moves to the back as the most recently requested.

use core_library::models::{SeasonId, SeriesId};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrefetchRequest {
    pub series_id: SeriesId,
    /// Season whose episodes are fetched right after the season list
    pub priority_season_id: Option<SeasonId>,
}

impl PrefetchRequest {
    pub fn new(series_id: SeriesId, priority_season_id: Option<SeasonId>) -> Self {
        Self {
            series_id,
            priority_season_id,
        }
    }
}

/// Result of [`PrefetchQueue::push`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Queued,
    /// The series was already waiting; it moved to the back and its
    /// priority season was updated
    Merged,
    /// Queued after evicting the oldest request
    Evicted(PrefetchRequest),
}

#[derive(Debug)]
pub struct PrefetchQueue {
    requests: Mutex<VecDeque<PrefetchRequest>>,
    notify: Notify,
    capacity: usize,
}

impl PrefetchQueue {
    /// Create a queue holding at most `capacity` requests (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            requests: Mutex::new(VecDeque::with_capacity(capacity)),
            notify: Notify::new(),
            capacity,
        }
    }

    pub fn push(&self, request: PrefetchRequest) -> PushOutcome {
        let outcome = {
            let mut requests = self.lock();

            if let Some(position) = requests
                .iter()
                .position(|queued| queued.series_id == request.series_id)
            {
                if let Some(mut merged) = requests.remove(position) {
                    if request.priority_season_id.is_some() {
                        merged.priority_season_id = request.priority_season_id;
                    }
                    requests.push_back(merged);
                }
                return PushOutcome::Merged;
            }

            let evicted = if requests.len() >= self.capacity {
                requests.pop_front()
            } else {
                None
            };
            requests.push_back(request);

            match evicted {
                Some(evicted) => PushOutcome::Evicted(evicted),
                None => PushOutcome::Queued,
            }
        };

        self.notify.notify_one();
        outcome
    }

    pub fn try_pop(&self) -> Option<PrefetchRequest> {
        self.lock().pop_front()
    }

    /// Wait for the next request.
    ///
    /// Cancel-safe: dropping the future never loses a request.
    pub async fn pop(&self) -> PrefetchRequest {
        loop {
            if let Some(request) = self.try_pop() {
                return request;
            }
            self.notify.notified().await;
        }
    }

    /// Remove and return every pending request, oldest first.
    pub fn drain(&self) -> Vec<PrefetchRequest> {
        self.lock().drain(..).collect()
    }

    /// Pending requests, oldest first.
    pub fn pending(&self) -> Vec<PrefetchRequest> {
        self.lock().iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<PrefetchRequest>> {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
