//! Core service façade and bootstrap helpers.
//!
//! Wires the host's remote metadata source and clock into the cache core:
//! opens the cache database, builds the read path, prefetch coordinator and
//! maintenance, starts the prefetch worker and runs the startup cleanup sweep.
//!
//! ```rust,ignore
//! let config = CoreConfig::builder()
//!     .database_path(data_dir.join("metadata-cache.db"))
//!     .user_id(session.user_id())
//!     .build()?;
//!
//! let service = MetadataCacheService::bootstrap(config, CoreDependencies::new(source)).await?;
//! let mut seasons = service.read_seasons(series_id, false);
//! while let Some(snapshot) = seasons.next().await { /* render */ }
//!
//! service.shutdown().await;
//! ```
//!
//! Logging is left to the host; see `core_runtime::logging::init_logging`.

pub mod error;

pub use error::{CoreError, Result};

pub use core_library::models::{
    Episode, EpisodeId, Season, SeasonId, SeriesDetails, SeriesId, UserId,
};
pub use core_metadata::{
    CacheStats, CleanupReport, EnqueueOutcome, ItemKind, SeasonPosition, Snapshot,
    SnapshotOrigin, SnapshotStream, VisibleItem,
};
pub use core_runtime::config::{CacheConfig, CoreConfig, CoreConfigBuilder, DatabaseLocation};

use std::sync::Arc;

use bridge_traits::metadata::RemoteMetadataSource;
use bridge_traits::time::{Clock, SystemClock};
use core_library::db::{create_pool, DatabaseConfig};
use core_library::repositories::{CacheStore, SqliteCacheStore};
use core_metadata::{
    CacheMaintenance, InFlightSet, PrefetchCoordinator, PrefetchQueue, PrefetchSettings,
    ReadThroughEngine, TtlPolicy,
};
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};

/// Host-provided collaborators the core requires.
pub struct CoreDependencies {
    pub source: Arc<dyn RemoteMetadataSource>,
    pub clock: Arc<dyn Clock>,
}

impl CoreDependencies {
    /// Bundle a remote source with the system clock.
    pub fn new(source: Arc<dyn RemoteMetadataSource>) -> Self {
        Self {
            source,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

/// Primary façade exposed to host applications.
pub struct MetadataCacheService {
    store: Arc<SqliteCacheStore>,
    engine: ReadThroughEngine,
    coordinator: PrefetchCoordinator,
    maintenance: CacheMaintenance,
}

impl MetadataCacheService {
    /// Open the cache and start background prefetch.
    ///
    /// Must run inside a Tokio runtime. A failing startup sweep is logged and
    /// does not abort bootstrap.
    #[instrument(skip(config, deps), fields(user_id = %config.user_id))]
    pub async fn bootstrap(config: CoreConfig, deps: CoreDependencies) -> Result<Self> {
        config.validate()?;
        tokio::runtime::Handle::try_current().map_err(|e| {
            CoreError::InitializationFailed(format!("No Tokio runtime available: {}", e))
        })?;

        let database = match &config.database {
            DatabaseLocation::File(path) => DatabaseConfig::new(path.clone()),
            DatabaseLocation::InMemory => DatabaseConfig::in_memory(),
        };
        let pool = create_pool(database).await?;
        let store = Arc::new(SqliteCacheStore::new(pool));

        let user_id = UserId::from(config.user_id);
        let policy = TtlPolicy::new(&config.cache);

        let engine = ReadThroughEngine::new(
            store.clone() as Arc<dyn CacheStore>,
            deps.source,
            deps.clock.clone(),
            policy,
            user_id,
        );
        let coordinator = PrefetchCoordinator::new(
            engine.clone(),
            InFlightSet::new(),
            Arc::new(PrefetchQueue::new(config.cache.prefetch_queue_capacity)),
            PrefetchSettings::from(&config.cache),
        );
        let maintenance = CacheMaintenance::new(store.clone(), deps.clock, policy, user_id);

        coordinator.start_worker();

        let service = Self {
            store,
            engine,
            coordinator,
            maintenance,
        };

        if config.cleanup_on_startup {
            service.startup_sweep().await;
        }

        info!("Metadata cache service ready");
        Ok(service)
    }

    async fn startup_sweep(&self) {
        match self.maintenance.cleanup_stale_cache().await {
            Ok(report) => info!(removed = report.total(), "Startup cleanup finished"),
            Err(e) => warn!(error = %e, "Startup cleanup failed, continuing"),
        }

        match self.maintenance.stats().await {
            Ok(stats) => info!(cached_series = stats.cached_series, "Cache statistics"),
            Err(e) => warn!(error = %e, "Failed to read cache statistics"),
        }
    }

    pub fn user_id(&self) -> UserId {
        self.engine.user_id()
    }

    pub fn read_seasons(&self, series_id: SeriesId, force_refresh: bool) -> SnapshotStream<Season> {
        self.engine.read_seasons(series_id, force_refresh)
    }

    pub fn read_episodes(
        &self,
        series_id: SeriesId,
        season_id: SeasonId,
        position: SeasonPosition,
        force_refresh: bool,
    ) -> SnapshotStream<Episode> {
        self.engine
            .read_episodes(series_id, season_id, position, force_refresh)
    }

    pub fn read_series_details(
        &self,
        series_id: SeriesId,
        force_refresh: bool,
    ) -> SnapshotStream<SeriesDetails> {
        self.engine.read_series_details(series_id, force_refresh)
    }

    pub async fn peek_seasons(&self, series_id: SeriesId) -> Result<Option<Vec<Season>>> {
        Ok(self.engine.peek_seasons(series_id).await?)
    }

    pub async fn peek_episodes(
        &self,
        series_id: SeriesId,
        season_id: SeasonId,
        position: SeasonPosition,
    ) -> Result<Option<Vec<Episode>>> {
        Ok(self
            .engine
            .peek_episodes(series_id, season_id, position)
            .await?)
    }

    pub async fn is_series_cached(&self, series_id: SeriesId) -> Result<bool> {
        Ok(self.engine.is_series_cached(series_id).await?)
    }

    pub async fn enqueue_prefetch(
        &self,
        series_id: SeriesId,
        priority_season_id: Option<SeasonId>,
    ) -> EnqueueOutcome {
        self.coordinator.enqueue(series_id, priority_season_id).await
    }

    pub async fn prefetch_on_focus(
        &self,
        series_id: SeriesId,
        season_id: Option<SeasonId>,
    ) -> Option<JoinHandle<()>> {
        self.coordinator.prefetch_on_focus(series_id, season_id).await
    }

    pub async fn prefetch_for_visible_episodes(&self, items: &[VisibleItem]) -> usize {
        self.coordinator.prefetch_for_visible_episodes(items).await
    }

    pub async fn invalidate_series_episodes(&self, series_id: SeriesId) -> Result<u64> {
        Ok(self.maintenance.invalidate_series_episodes(series_id).await?)
    }

    pub async fn update_episode_playback_state(
        &self,
        episode_id: EpisodeId,
        position_ticks: i64,
        played: bool,
    ) -> Result<bool> {
        Ok(self
            .maintenance
            .update_episode_playback_state(episode_id, position_ticks, played)
            .await?)
    }

    pub async fn cleanup_stale_cache(&self) -> Result<CleanupReport> {
        Ok(self.maintenance.cleanup_stale_cache().await?)
    }

    pub async fn stats(&self) -> Result<CacheStats> {
        Ok(self.maintenance.stats().await?)
    }

    pub fn is_prefetch_running(&self) -> bool {
        self.coordinator.is_worker_running()
    }

    /// Stop the prefetch worker and close the database.
    pub async fn shutdown(&self) {
        self.coordinator.shutdown().await;
        self.store.pool().close().await;
        info!("Metadata cache service stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use bridge_traits::metadata::{RemoteEpisode, RemoteSeason, RemoteSeries};
    use futures::StreamExt;
    use uuid::Uuid;

    struct StaticSource {
        series_id: Uuid,
        season_id: Uuid,
    }

    #[async_trait]
    impl RemoteMetadataSource for StaticSource {
        async fn fetch_series_details(&self, series_id: Uuid) -> BridgeResult<RemoteSeries> {
            Err(BridgeError::NotFound(series_id.to_string()))
        }

        async fn fetch_seasons(&self, series_id: Uuid) -> BridgeResult<Vec<RemoteSeason>> {
            if series_id != self.series_id {
                return Ok(Vec::new());
            }
            Ok(vec![RemoteSeason {
                id: self.season_id,
                series_id,
                name: Some("Season 1".to_string()),
                index_number: Some(1),
                episode_count: Some(1),
                image_tag: None,
            }])
        }

        async fn fetch_episodes(
            &self,
            series_id: Uuid,
            season_id: Uuid,
        ) -> BridgeResult<Vec<RemoteEpisode>> {
            Ok(vec![RemoteEpisode {
                id: Uuid::new_v4(),
                series_id,
                season_id,
                name: "Pilot".to_string(),
                overview: None,
                index_number: Some(1),
                run_time_ticks: None,
                premiere_date: None,
                image_tag: None,
                playback_position_ticks: 0,
                played: false,
                is_favorite: false,
            }])
        }
    }

    fn config() -> CoreConfig {
        CoreConfig::builder()
            .in_memory_database()
            .user_id(Uuid::new_v4())
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_bootstrap_starts_worker_and_serves_reads() {
        let series_id = Uuid::new_v4();
        let source = Arc::new(StaticSource {
            series_id,
            season_id: Uuid::new_v4(),
        });

        let service = MetadataCacheService::bootstrap(config(), CoreDependencies::new(source))
            .await
            .unwrap();
        assert!(service.is_prefetch_running());

        let snapshots: Vec<_> = service
            .read_seasons(SeriesId(series_id), false)
            .collect()
            .await;
        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].as_ref().unwrap().origin, SnapshotOrigin::Remote);

        assert!(service.is_series_cached(SeriesId(series_id)).await.unwrap());
        assert_eq!(service.stats().await.unwrap().cached_series, 1);

        service.shutdown().await;
        assert!(!service.is_prefetch_running());
    }

    #[tokio::test]
    async fn test_focus_prefetch_through_facade() {
        let series_id = Uuid::new_v4();
        let season_id = Uuid::new_v4();
        let source = Arc::new(StaticSource {
            series_id,
            season_id,
        });

        let service = MetadataCacheService::bootstrap(config(), CoreDependencies::new(source))
            .await
            .unwrap();

        let handle = service
            .prefetch_on_focus(SeriesId(series_id), Some(SeasonId(season_id)))
            .await
            .expect("prefetch should start");
        handle.await.unwrap();

        let episodes = service
            .peek_episodes(
                SeriesId(series_id),
                SeasonId(season_id),
                SeasonPosition::new(Some(1), Some(1)),
            )
            .await
            .unwrap()
            .expect("episodes cached");
        assert_eq!(episodes.len(), 1);

        service.shutdown().await;
    }

    #[tokio::test]
    async fn test_missing_details_surface_error() {
        let source = Arc::new(StaticSource {
            series_id: Uuid::new_v4(),
            season_id: Uuid::new_v4(),
        });
        let service = MetadataCacheService::bootstrap(config(), CoreDependencies::new(source))
            .await
            .unwrap();

        let results: Vec<_> = service
            .read_series_details(SeriesId::new(), false)
            .collect()
            .await;
        assert_eq!(results.len(), 1);
        assert!(results[0].is_err());

        service.shutdown().await;
    }

    #[tokio::test]
    async fn test_bootstrap_rejects_invalid_config() {
        let mut config = config();
        config.cache.prefetch_queue_capacity = 0;
        let source = Arc::new(StaticSource {
            series_id: Uuid::new_v4(),
            season_id: Uuid::new_v4(),
        });

        let result = MetadataCacheService::bootstrap(config, CoreDependencies::new(source)).await;
        assert!(matches!(result, Err(CoreError::Config(_))));
    }
}
