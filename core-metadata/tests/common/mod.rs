//! Shared fixtures for core-metadata integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::metadata::{RemoteEpisode, RemoteMetadataSource, RemoteSeason, RemoteSeries};
use bridge_traits::time::Clock;
use chrono::{DateTime, Utc};
use core_library::db::create_test_pool;
use core_library::models::{SeasonId, SeriesId, UserId};
use core_library::repositories::{CacheStore, SqliteCacheStore};
use core_metadata::{ReadThroughEngine, TtlPolicy};
use mockall::mock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use uuid::Uuid;

pub const MINUTE_MS: i64 = 60 * 1000;
pub const HOUR_MS: i64 = 60 * MINUTE_MS;
pub const DAY_MS: i64 = 24 * HOUR_MS;

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    millis: AtomicI64,
}

impl ManualClock {
    pub fn new(start_millis: i64) -> Self {
        Self {
            millis: AtomicI64::new(start_millis),
        }
    }

    pub fn now_millis(&self) -> i64 {
        self.millis.load(Ordering::SeqCst)
    }

    pub fn set(&self, millis: i64) {
        self.millis.store(millis, Ordering::SeqCst);
    }

    pub fn advance(&self, millis: i64) {
        self.millis.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.now_millis()).expect("valid timestamp")
    }
}

/// Series layout registered with a [`FakeSource`].
#[derive(Debug, Clone)]
pub struct SeriesFixture {
    pub series_id: SeriesId,
    /// Season ids by index, season 1 first
    pub season_ids: Vec<SeasonId>,
}

impl SeriesFixture {
    pub fn season(&self, index: i32) -> SeasonId {
        self.season_ids[(index - 1) as usize]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    SeriesDetails,
    Seasons,
    Episodes,
}

/// One remote call as seen by [`FakeSource`], stamped when it started.
#[derive(Debug, Clone, Copy)]
pub struct RemoteCall {
    pub series_id: SeriesId,
    pub kind: CallKind,
    pub at: Instant,
}

/// In-memory remote source with call counters, latency and failure toggles.
#[derive(Default)]
pub struct FakeSource {
    series: Mutex<HashMap<Uuid, RemoteSeries>>,
    seasons: Mutex<HashMap<Uuid, Vec<RemoteSeason>>>,
    episodes: Mutex<HashMap<Uuid, Vec<RemoteEpisode>>>,
    episode_fetch_log: Mutex<Vec<Uuid>>,
    call_log: Mutex<Vec<RemoteCall>>,
    latency: Mutex<Duration>,
    failing: AtomicBool,
    failing_season: Mutex<Option<Uuid>>,
    pub series_calls: AtomicUsize,
    pub season_calls: AtomicUsize,
    pub episode_calls: AtomicUsize,
    active_jobs: Mutex<HashMap<Uuid, usize>>,
    max_concurrent_per_series: AtomicUsize,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a series with `season_count` numbered seasons.
    pub fn add_series(&self, season_count: i32, episodes_per_season: i32) -> SeriesFixture {
        let series_id = Uuid::new_v4();
        let mut season_ids = Vec::new();
        let mut seasons = Vec::new();

        for index in 1..=season_count {
            let season_id = Uuid::new_v4();
            season_ids.push(SeasonId(season_id));
            seasons.push(RemoteSeason {
                id: season_id,
                series_id,
                name: Some(format!("Season {}", index)),
                index_number: Some(index),
                episode_count: Some(episodes_per_season),
                image_tag: None,
            });

            let episodes = (1..=episodes_per_season)
                .map(|number| remote_episode(series_id, season_id, number, "v1"))
                .collect();
            self.episodes.lock().unwrap().insert(season_id, episodes);
        }

        self.seasons.lock().unwrap().insert(series_id, seasons);
        self.series.lock().unwrap().insert(
            series_id,
            RemoteSeries {
                id: series_id,
                name: "Example Series".to_string(),
                overview: Some("Overview".to_string()),
                production_year: Some(2020),
                image_tag: None,
            },
        );

        SeriesFixture {
            series_id: SeriesId(series_id),
            season_ids,
        }
    }

    /// Replace the episodes the server reports for a season.
    pub fn rename_episodes(&self, season_id: SeasonId, version: &str) {
        let mut episodes = self.episodes.lock().unwrap();
        if let Some(list) = episodes.get_mut(&season_id.0) {
            for (number, episode) in list.iter_mut().enumerate() {
                episode.name = format!("Episode {} {}", number + 1, version);
            }
        }
    }

    /// Stop reporting the highest-numbered season of a series.
    pub fn drop_last_season(&self, series_id: SeriesId) {
        if let Some(list) = self.seasons.lock().unwrap().get_mut(&series_id.0) {
            list.pop();
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Fail episode fetches for one season only.
    pub fn fail_season(&self, season_id: Option<SeasonId>) {
        *self.failing_season.lock().unwrap() = season_id.map(|id| id.0);
    }

    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock().unwrap() = latency;
    }

    pub fn episode_fetch_order(&self) -> Vec<SeasonId> {
        self.episode_fetch_log
            .lock()
            .unwrap()
            .iter()
            .map(|id| SeasonId(*id))
            .collect()
    }

    /// Every remote call so far, in start order.
    pub fn calls(&self) -> Vec<RemoteCall> {
        self.call_log.lock().unwrap().clone()
    }

    fn record(&self, series_id: Uuid, kind: CallKind) {
        self.call_log.lock().unwrap().push(RemoteCall {
            series_id: SeriesId(series_id),
            kind,
            at: Instant::now(),
        });
    }

    pub fn season_calls(&self) -> usize {
        self.season_calls.load(Ordering::SeqCst)
    }

    pub fn episode_calls(&self) -> usize {
        self.episode_calls.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.series_calls.load(Ordering::SeqCst) + self.season_calls() + self.episode_calls()
    }

    pub fn max_concurrent_per_series(&self) -> usize {
        self.max_concurrent_per_series.load(Ordering::SeqCst)
    }

    async fn simulate(&self) -> BridgeResult<()> {
        let latency = *self.latency.lock().unwrap();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(BridgeError::Network("connection reset".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteMetadataSource for FakeSource {
    async fn fetch_series_details(&self, series_id: Uuid) -> BridgeResult<RemoteSeries> {
        self.series_calls.fetch_add(1, Ordering::SeqCst);
        self.record(series_id, CallKind::SeriesDetails);
        self.simulate().await?;
        self.series
            .lock()
            .unwrap()
            .get(&series_id)
            .cloned()
            .ok_or_else(|| BridgeError::NotFound(series_id.to_string()))
    }

    async fn fetch_seasons(&self, series_id: Uuid) -> BridgeResult<Vec<RemoteSeason>> {
        self.season_calls.fetch_add(1, Ordering::SeqCst);
        self.record(series_id, CallKind::Seasons);

        // Season fetches open every prefetch job; track overlap per series.
        {
            let mut active = self.active_jobs.lock().unwrap();
            let count = active.entry(series_id).or_insert(0);
            *count += 1;
            self.max_concurrent_per_series
                .fetch_max(*count, Ordering::SeqCst);
        }

        let result = self.simulate().await;

        {
            let mut active = self.active_jobs.lock().unwrap();
            if let Some(count) = active.get_mut(&series_id) {
                *count -= 1;
            }
        }

        result?;
        Ok(self
            .seasons
            .lock()
            .unwrap()
            .get(&series_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn fetch_episodes(
        &self,
        series_id: Uuid,
        season_id: Uuid,
    ) -> BridgeResult<Vec<RemoteEpisode>> {
        self.episode_calls.fetch_add(1, Ordering::SeqCst);
        self.record(series_id, CallKind::Episodes);
        self.episode_fetch_log.lock().unwrap().push(season_id);
        self.simulate().await?;

        if *self.failing_season.lock().unwrap() == Some(season_id) {
            return Err(BridgeError::Http {
                status: 502,
                message: "bad gateway".to_string(),
            });
        }

        Ok(self
            .episodes
            .lock()
            .unwrap()
            .get(&season_id)
            .cloned()
            .unwrap_or_default())
    }
}

mock! {
    pub Source {}

    #[async_trait::async_trait]
    impl RemoteMetadataSource for Source {
        async fn fetch_series_details(&self, series_id: Uuid) -> BridgeResult<RemoteSeries>;
        async fn fetch_seasons(&self, series_id: Uuid) -> BridgeResult<Vec<RemoteSeason>>;
        async fn fetch_episodes(&self, series_id: Uuid, season_id: Uuid) -> BridgeResult<Vec<RemoteEpisode>>;
    }
}

pub fn remote_episode(series_id: Uuid, season_id: Uuid, number: i32, version: &str) -> RemoteEpisode {
    RemoteEpisode {
        id: Uuid::new_v4(),
        series_id,
        season_id,
        name: format!("Episode {} {}", number, version),
        overview: None,
        index_number: Some(number),
        run_time_ticks: Some(45 * MINUTE_MS * 10_000),
        premiere_date: None,
        image_tag: None,
        playback_position_ticks: 0,
        played: false,
        is_favorite: false,
    }
}

/// Everything a test needs, wired against an in-memory database.
pub struct Harness {
    pub store: Arc<SqliteCacheStore>,
    pub source: Arc<FakeSource>,
    pub clock: Arc<ManualClock>,
    pub user_id: UserId,
    pub engine: ReadThroughEngine,
}

pub const START_MILLIS: i64 = 1_700_000_000_000;

pub async fn harness() -> Harness {
    let pool = create_test_pool().await.expect("Failed to create test pool");
    let store = Arc::new(SqliteCacheStore::new(pool));
    let source = Arc::new(FakeSource::new());
    let clock = Arc::new(ManualClock::new(START_MILLIS));
    let user_id = UserId::new();

    let engine = engine_with_source(&store, source.clone(), &clock, user_id);

    Harness {
        store,
        source,
        clock,
        user_id,
        engine,
    }
}

pub fn engine_with_source(
    store: &Arc<SqliteCacheStore>,
    source: Arc<dyn RemoteMetadataSource>,
    clock: &Arc<ManualClock>,
    user_id: UserId,
) -> ReadThroughEngine {
    ReadThroughEngine::new(
        store.clone() as Arc<dyn CacheStore>,
        source,
        clock.clone() as Arc<dyn Clock>,
        TtlPolicy::default(),
        user_id,
    )
}
