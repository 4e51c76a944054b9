//! # Prefetch Coordinator
//!
//! Two ways into a prefetch job:
//!
//! - [`PrefetchCoordinator::enqueue`] pushes onto the bounded queue, drained
//!   serially by one background worker with a pause after every job
//! - [`PrefetchCoordinator::prefetch_on_focus`] runs the job at once on its own
//!   task, bypassing the queue
//!
//! Both paths skip series that are already cached or already in flight, and
//! both claim the series in the shared [`InFlightSet`] for the job's duration.
//! The worker checks the cache again after claiming, so a request whose series
//! was warmed while it waited is discarded.
//! Job failures are logged and never reach the caller.
//!
//! ## Lifecycle
//!
//! ```rust,ignore
//! let coordinator = PrefetchCoordinator::new(engine, in_flight, queue, settings);
//! coordinator.start_worker();
//! coordinator.enqueue(series_id, Some(season_id)).await;
//! // ...
//! coordinator.shutdown().await;
//! ```
//!
//! `shutdown` lets a running job finish, discards whatever is still queued and
//! waits for the worker to exit. Focus-path tasks are not tracked.

use crate::prefetch::in_flight::InFlightSet;
use crate::prefetch::job::run_prefetch_job;
use crate::prefetch::queue::{PrefetchQueue, PrefetchRequest, PushOutcome};
use crate::prefetch::{ItemKind, VisibleItem};
use crate::read_through::ReadThroughEngine;
use core_library::models::{SeasonId, SeriesId};
use core_runtime::config::CacheConfig;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Pacing of prefetch traffic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrefetchSettings {
    /// Pause after each queued job
    pub inter_job_delay: Duration,
    /// Pause between seasons inside one job
    pub inter_season_delay: Duration,
}

impl PrefetchSettings {
    pub fn with_inter_job_delay(mut self, delay: Duration) -> Self {
        self.inter_job_delay = delay;
        self
    }

    pub fn with_inter_season_delay(mut self, delay: Duration) -> Self {
        self.inter_season_delay = delay;
        self
    }
}

impl From<&CacheConfig> for PrefetchSettings {
    fn from(config: &CacheConfig) -> Self {
        Self {
            inter_job_delay: config.inter_job_delay,
            inter_season_delay: config.inter_season_delay,
        }
    }
}

impl Default for PrefetchSettings {
    fn default() -> Self {
        Self::from(&CacheConfig::default())
    }
}

/// What [`PrefetchCoordinator::enqueue`] did with a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    SkippedInFlight,
    SkippedCached,
    Pushed(PushOutcome),
}

struct WorkerHandle {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

pub struct PrefetchCoordinator {
    engine: ReadThroughEngine,
    in_flight: InFlightSet,
    queue: Arc<PrefetchQueue>,
    settings: PrefetchSettings,
    worker: Mutex<Option<WorkerHandle>>,
}

impl PrefetchCoordinator {
    pub fn new(
        engine: ReadThroughEngine,
        in_flight: InFlightSet,
        queue: Arc<PrefetchQueue>,
        settings: PrefetchSettings,
    ) -> Self {
        Self {
            engine,
            in_flight,
            queue,
            settings,
            worker: Mutex::new(None),
        }
    }

    pub fn in_flight(&self) -> &InFlightSet {
        &self.in_flight
    }

    pub fn queue(&self) -> &Arc<PrefetchQueue> {
        &self.queue
    }

    /// Spawn the queue worker on the current Tokio runtime.
    ///
    /// Returns `false` without spawning if a worker is already running.
    pub fn start_worker(&self) -> bool {
        let mut worker = self.lock_worker();

        if worker
            .as_ref()
            .is_some_and(|running| !running.handle.is_finished())
        {
            warn!("Prefetch worker already running, ignoring start request");
            return false;
        }

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_worker(
            self.engine.clone(),
            self.in_flight.clone(),
            Arc::clone(&self.queue),
            self.settings,
            cancel.clone(),
        ));
        *worker = Some(WorkerHandle { cancel, handle });

        info!(
            queue_capacity = self.queue.capacity(),
            inter_job_delay_ms = self.settings.inter_job_delay.as_millis() as u64,
            "Prefetch worker started"
        );
        true
    }

    pub fn is_worker_running(&self) -> bool {
        self.lock_worker()
            .as_ref()
            .is_some_and(|running| !running.handle.is_finished())
    }

    /// Stop the worker and wait for it to exit.
    ///
    /// A job already running completes first. Queued requests are discarded.
    pub async fn shutdown(&self) {
        let worker = self.lock_worker().take();
        let Some(worker) = worker else {
            debug!("Prefetch worker not running, nothing to shut down");
            return;
        };

        info!("Shutting down prefetch worker");
        worker.cancel.cancel();

        if let Err(e) = worker.handle.await {
            error!(error = %e, "Prefetch worker terminated abnormally");
        }
    }

    /// Queue a prefetch unless the series is in flight or already cached.
    #[instrument(skip(self))]
    pub async fn enqueue(
        &self,
        series_id: SeriesId,
        priority_season_id: Option<SeasonId>,
    ) -> EnqueueOutcome {
        if self.in_flight.contains(series_id) {
            debug!("Series in flight, skipping enqueue");
            return EnqueueOutcome::SkippedInFlight;
        }

        if self.is_cached(series_id).await {
            debug!("Series cached, skipping enqueue");
            return EnqueueOutcome::SkippedCached;
        }

        let outcome = self
            .queue
            .push(PrefetchRequest::new(series_id, priority_season_id));

        match outcome {
            PushOutcome::Queued => debug!(pending = self.queue.len(), "Prefetch queued"),
            PushOutcome::Merged => debug!("Prefetch already queued, merged"),
            PushOutcome::Evicted(dropped) => info!(
                dropped_series_id = %dropped.series_id,
                "Prefetch queue full, dropped oldest request"
            ),
        }

        EnqueueOutcome::Pushed(outcome)
    }

    /// Prefetch immediately on a dedicated task.
    ///
    /// Returns the task handle, or `None` when the series is in flight or
    /// already cached.
    #[instrument(skip(self))]
    pub async fn prefetch_on_focus(
        &self,
        series_id: SeriesId,
        season_id: Option<SeasonId>,
    ) -> Option<JoinHandle<()>> {
        if self.in_flight.contains(series_id) {
            debug!("Series in flight, skipping focus prefetch");
            return None;
        }

        if self.is_cached(series_id).await {
            debug!("Series cached, skipping focus prefetch");
            return None;
        }

        let Some(guard) = self.in_flight.try_claim(series_id) else {
            debug!("Series claimed concurrently, skipping focus prefetch");
            return None;
        };

        let engine = self.engine.clone();
        let inter_season_delay = self.settings.inter_season_delay;
        let request = PrefetchRequest::new(series_id, season_id);

        Some(tokio::spawn(async move {
            let _guard = guard;
            execute_job(&engine, request, inter_season_delay).await;
        }))
    }

    /// Enqueue one request per series among the visible episodes.
    ///
    /// The first episode seen for a series supplies the priority season.
    /// Returns how many requests reached the queue.
    pub async fn prefetch_for_visible_episodes(&self, items: &[VisibleItem]) -> usize {
        let mut seen = HashSet::new();
        let mut hints = Vec::new();

        for item in items.iter().filter(|item| item.kind == ItemKind::Episode) {
            if let Some(series_id) = item.series_id {
                if seen.insert(series_id) {
                    hints.push((series_id, item.season_id));
                }
            }
        }

        let mut pushed = 0;
        for (series_id, season_id) in hints {
            if let EnqueueOutcome::Pushed(_) = self.enqueue(series_id, season_id).await {
                pushed += 1;
            }
        }

        debug!(visible = items.len(), pushed, "Processed visible episodes");
        pushed
    }

    async fn is_cached(&self, series_id: SeriesId) -> bool {
        is_series_cached(&self.engine, series_id).await
    }

    fn lock_worker(&self) -> MutexGuard<'_, Option<WorkerHandle>> {
        self.worker.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

async fn run_worker(
    engine: ReadThroughEngine,
    in_flight: InFlightSet,
    queue: Arc<PrefetchQueue>,
    settings: PrefetchSettings,
    cancel: CancellationToken,
) {
    loop {
        let request = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            request = queue.pop() => request,
        };

        let Some(guard) = in_flight.try_claim(request.series_id) else {
            debug!(
                series_id = %request.series_id,
                "Series already in flight, discarding queued request"
            );
            continue;
        };

        // Warmed by a focus job while this request waited
        if is_series_cached(&engine, request.series_id).await {
            debug!(
                series_id = %request.series_id,
                "Series cached since enqueue, discarding queued request"
            );
            continue;
        }

        execute_job(&engine, request, settings.inter_season_delay).await;
        drop(guard);

        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(settings.inter_job_delay) => {}
        }
    }

    let discarded = queue.drain().len();
    info!(discarded, "Prefetch worker stopped");
}

async fn is_series_cached(engine: &ReadThroughEngine, series_id: SeriesId) -> bool {
    match engine.is_series_cached(series_id).await {
        Ok(cached) => cached,
        Err(e) => {
            warn!(%series_id, error = %e, "Cache check failed, assuming not cached");
            false
        }
    }
}

async fn execute_job(
    engine: &ReadThroughEngine,
    request: PrefetchRequest,
    inter_season_delay: Duration,
) {
    match run_prefetch_job(engine, request, inter_season_delay).await {
        Ok(summary) => info!(
            series_id = %request.series_id,
            seasons = summary.seasons,
            episodes = summary.episodes,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "Prefetch completed"
        ),
        Err(e) => warn!(
            series_id = %request.series_id,
            error = %e,
            transient = e.is_transient(),
            "Prefetch failed"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_from_config() {
        let config = CacheConfig::default()
            .with_inter_job_delay(Duration::from_millis(10))
            .with_inter_season_delay(Duration::from_millis(2));
        let settings = PrefetchSettings::from(&config);

        assert_eq!(settings.inter_job_delay, Duration::from_millis(10));
        assert_eq!(settings.inter_season_delay, Duration::from_millis(2));
    }

    #[test]
    fn test_settings_defaults() {
        let settings = PrefetchSettings::default();
        assert_eq!(settings.inter_job_delay, Duration::from_millis(300));
        assert_eq!(settings.inter_season_delay, Duration::from_millis(50));

        let tuned = settings.with_inter_job_delay(Duration::ZERO);
        assert_eq!(tuned.inter_job_delay, Duration::ZERO);
    }
}
