//! # Stale-While-Revalidate Read Path
//!
//! Every read returns a stream of at most two [`Snapshot`]s:
//!
//! - fresh cache hit: one `Cache` snapshot, no remote call
//! - stale cache: a `Stale` snapshot, then a `Remote` snapshot once the fetch
//!   lands (or nothing more if the fetch fails)
//! - empty cache: a `Remote` snapshot, or `Err(RemoteFetch)` if the fetch fails
//!
//! Storage failures are surfaced as `Err(Storage)` and end the stream.
//!
//! Successful fetches replace the whole cached collection, stamped with the
//! clock's current time.

use crate::error::Result;
use crate::ttl::TtlPolicy;
use async_stream::stream;
use async_trait::async_trait;
use bridge_traits::metadata::RemoteMetadataSource;
use bridge_traits::time::Clock;
use core_library::models::{Episode, Season, SeasonId, SeriesDetails, SeriesId, UserId};
use core_library::repositories::CacheStore;
use futures::stream::BoxStream;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

/// Where a snapshot's items came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotOrigin {
    /// Fresh cache hit; no refresh follows
    Cache,
    /// Expired cache contents; a refresh is in flight
    Stale,
    /// Just fetched from the remote source and stored
    Remote,
}

/// One emission of a read stream.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot<T> {
    pub items: Vec<T>,
    pub origin: SnapshotOrigin,
}

impl<T> Snapshot<T> {
    fn new(items: Vec<T>, origin: SnapshotOrigin) -> Self {
        Self { items, origin }
    }

    /// A refresh is still pending after this snapshot.
    pub fn is_refreshing(&self) -> bool {
        self.origin == SnapshotOrigin::Stale
    }

    pub fn first(&self) -> Option<&T> {
        self.items.first()
    }
}

/// Position of a season within its series, used to pick the episode TTL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SeasonPosition {
    pub index: Option<i32>,
    pub max_index: Option<i32>,
}

impl SeasonPosition {
    pub fn new(index: Option<i32>, max_index: Option<i32>) -> Self {
        Self { index, max_index }
    }

    /// Position of `season` within the season list it belongs to.
    pub fn of(season: &Season, seasons: &[Season]) -> Self {
        Self {
            index: season.index_number,
            max_index: core_library::models::max_season_index(seasons),
        }
    }
}

pub type SnapshotStream<T> = BoxStream<'static, Result<Snapshot<T>>>;

/// Sort key putting `None` indices after every numbered entry.
fn index_order(index: Option<i32>) -> (bool, Option<i32>) {
    (index.is_none(), index)
}

/// One cached collection the read path knows how to load, judge and refresh.
#[async_trait]
trait Collection: Send + Sync + 'static {
    type Item: Clone + Send + Sync + 'static;

    fn label(&self) -> &'static str;

    fn ttl(&self, policy: &TtlPolicy) -> Duration;

    async fn load(&self, engine: &ReadThroughEngine) -> Result<(Vec<Self::Item>, Option<i64>)>;

    async fn refresh(&self, engine: &ReadThroughEngine) -> Result<Vec<Self::Item>>;
}

struct SeasonList {
    series_id: SeriesId,
}

#[async_trait]
impl Collection for SeasonList {
    type Item = Season;

    fn label(&self) -> &'static str {
        "seasons"
    }

    fn ttl(&self, policy: &TtlPolicy) -> Duration {
        policy.season_list_ttl()
    }

    async fn load(&self, engine: &ReadThroughEngine) -> Result<(Vec<Season>, Option<i64>)> {
        let items = engine.store.get_seasons(engine.user_id, self.series_id).await?;
        let last_write = engine
            .store
            .get_seasons_last_write(engine.user_id, self.series_id)
            .await?;
        Ok((items, last_write))
    }

    async fn refresh(&self, engine: &ReadThroughEngine) -> Result<Vec<Season>> {
        engine.refresh_seasons(self.series_id).await
    }
}

struct EpisodeList {
    series_id: SeriesId,
    season_id: SeasonId,
    position: SeasonPosition,
}

#[async_trait]
impl Collection for EpisodeList {
    type Item = Episode;

    fn label(&self) -> &'static str {
        "episodes"
    }

    fn ttl(&self, policy: &TtlPolicy) -> Duration {
        policy.ttl(self.position.index, self.position.max_index)
    }

    async fn load(&self, engine: &ReadThroughEngine) -> Result<(Vec<Episode>, Option<i64>)> {
        let items = engine.store.get_episodes(engine.user_id, self.season_id).await?;
        let last_write = engine
            .store
            .get_episodes_last_write(engine.user_id, self.season_id)
            .await?;
        Ok((items, last_write))
    }

    async fn refresh(&self, engine: &ReadThroughEngine) -> Result<Vec<Episode>> {
        engine.refresh_episodes(self.series_id, self.season_id).await
    }
}

struct SeriesDetailsEntry {
    series_id: SeriesId,
}

#[async_trait]
impl Collection for SeriesDetailsEntry {
    type Item = SeriesDetails;

    fn label(&self) -> &'static str {
        "series_details"
    }

    fn ttl(&self, policy: &TtlPolicy) -> Duration {
        policy.series_details_ttl()
    }

    async fn load(&self, engine: &ReadThroughEngine) -> Result<(Vec<SeriesDetails>, Option<i64>)> {
        let details = engine
            .store
            .get_series_details(engine.user_id, self.series_id)
            .await?;
        let last_write = details.as_ref().map(|d| d.last_write);
        Ok((details.into_iter().collect(), last_write))
    }

    async fn refresh(&self, engine: &ReadThroughEngine) -> Result<Vec<SeriesDetails>> {
        engine
            .refresh_series_details(self.series_id)
            .await
            .map(|details| vec![details])
    }
}

/// Read-through access to the cache for one user.
#[derive(Clone)]
pub struct ReadThroughEngine {
    store: Arc<dyn CacheStore>,
    source: Arc<dyn RemoteMetadataSource>,
    clock: Arc<dyn Clock>,
    policy: TtlPolicy,
    user_id: UserId,
}

impl ReadThroughEngine {
    pub fn new(
        store: Arc<dyn CacheStore>,
        source: Arc<dyn RemoteMetadataSource>,
        clock: Arc<dyn Clock>,
        policy: TtlPolicy,
        user_id: UserId,
    ) -> Self {
        Self {
            store,
            source,
            clock,
            policy,
            user_id,
        }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn policy(&self) -> &TtlPolicy {
        &self.policy
    }

    /// Season list of a series.
    pub fn read_seasons(&self, series_id: SeriesId, force_refresh: bool) -> SnapshotStream<Season> {
        self.read(SeasonList { series_id }, force_refresh)
    }

    /// Episode list of a season, with a TTL chosen from its position.
    pub fn read_episodes(
        &self,
        series_id: SeriesId,
        season_id: SeasonId,
        position: SeasonPosition,
        force_refresh: bool,
    ) -> SnapshotStream<Episode> {
        self.read(
            EpisodeList {
                series_id,
                season_id,
                position,
            },
            force_refresh,
        )
    }

    /// Series details; snapshots carry a single item.
    pub fn read_series_details(
        &self,
        series_id: SeriesId,
        force_refresh: bool,
    ) -> SnapshotStream<SeriesDetails> {
        self.read(SeriesDetailsEntry { series_id }, force_refresh)
    }

    /// Cached seasons, only when present and fresh. Never fetches.
    #[instrument(skip(self))]
    pub async fn peek_seasons(&self, series_id: SeriesId) -> Result<Option<Vec<Season>>> {
        self.peek(&SeasonList { series_id }).await
    }

    /// Cached episodes, only when present and fresh. Never fetches.
    #[instrument(skip(self))]
    pub async fn peek_episodes(
        &self,
        series_id: SeriesId,
        season_id: SeasonId,
        position: SeasonPosition,
    ) -> Result<Option<Vec<Episode>>> {
        self.peek(&EpisodeList {
            series_id,
            season_id,
            position,
        })
        .await
    }

    /// Whether the series' season list is cached and fresh.
    #[instrument(skip(self))]
    pub async fn is_series_cached(&self, series_id: SeriesId) -> Result<bool> {
        let last_write = self
            .store
            .get_seasons_last_write(self.user_id, series_id)
            .await?;

        Ok(last_write.is_some_and(|last_write| {
            self.policy.is_fresh(
                self.clock.unix_timestamp_millis(),
                last_write,
                self.policy.season_list_ttl(),
            )
        }))
    }

    /// Fetch the season list, replace the cached one and return it.
    #[instrument(skip(self))]
    pub async fn refresh_seasons(&self, series_id: SeriesId) -> Result<Vec<Season>> {
        let started = Instant::now();
        let remote = self.source.fetch_seasons(series_id.as_uuid()).await?;
        let now = self.clock.unix_timestamp_millis();

        let mut seasons: Vec<Season> = remote
            .into_iter()
            .map(|season| {
                let mut season = Season::from_remote(season, self.user_id, now);
                season.series_id = series_id;
                season
            })
            .collect();
        seasons.sort_by_key(|season| index_order(season.index_number));

        self.store
            .replace_seasons_of_series(self.user_id, series_id, &seasons)
            .await?;

        debug!(
            count = seasons.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Refreshed season list"
        );
        Ok(seasons)
    }

    /// Fetch a season's episodes, replace the cached ones and return them.
    #[instrument(skip(self))]
    pub async fn refresh_episodes(
        &self,
        series_id: SeriesId,
        season_id: SeasonId,
    ) -> Result<Vec<Episode>> {
        let started = Instant::now();
        let remote = self
            .source
            .fetch_episodes(series_id.as_uuid(), season_id.as_uuid())
            .await?;
        let now = self.clock.unix_timestamp_millis();

        let mut episodes: Vec<Episode> = remote
            .into_iter()
            .map(|episode| {
                let mut episode = Episode::from_remote(episode, self.user_id, now);
                episode.series_id = series_id;
                episode.season_id = season_id;
                episode
            })
            .collect();
        episodes.sort_by_key(|episode| index_order(episode.index_number));

        self.store
            .replace_episodes_of_season(self.user_id, season_id, &episodes)
            .await?;

        debug!(
            count = episodes.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Refreshed episode list"
        );
        Ok(episodes)
    }

    #[instrument(skip(self))]
    pub async fn refresh_series_details(&self, series_id: SeriesId) -> Result<SeriesDetails> {
        let remote = self.source.fetch_series_details(series_id.as_uuid()).await?;
        let now = self.clock.unix_timestamp_millis();

        let mut details = SeriesDetails::from_remote(remote, self.user_id, now);
        details.series_id = series_id;
        self.store.put_series_details(&details).await?;

        debug!("Refreshed series details");
        Ok(details)
    }

    async fn peek<C: Collection>(&self, collection: &C) -> Result<Option<Vec<C::Item>>> {
        let (items, last_write) = collection.load(self).await?;
        let fresh = self.is_fresh(last_write, collection.ttl(&self.policy));
        Ok((fresh && !items.is_empty()).then_some(items))
    }

    fn is_fresh(&self, last_write: Option<i64>, ttl: Duration) -> bool {
        last_write.is_some_and(|last_write| {
            self.policy
                .is_fresh(self.clock.unix_timestamp_millis(), last_write, ttl)
        })
    }

    fn read<C: Collection>(&self, collection: C, force_refresh: bool) -> SnapshotStream<C::Item> {
        let engine = self.clone();

        Box::pin(stream! {
            let kind = collection.label();

            let (cached, last_write) = match collection.load(&engine).await {
                Ok(loaded) => loaded,
                Err(e) => {
                    warn!(kind, error = %e, "Cache read failed");
                    yield Err(e);
                    return;
                }
            };

            let fresh = engine.is_fresh(last_write, collection.ttl(&engine.policy));
            if !cached.is_empty() && fresh && !force_refresh {
                debug!(kind, count = cached.len(), "Serving fresh cache");
                yield Ok(Snapshot::new(cached, SnapshotOrigin::Cache));
                return;
            }

            let served_stale = !cached.is_empty();
            if served_stale {
                debug!(kind, count = cached.len(), force_refresh, "Serving stale cache while refreshing");
                yield Ok(Snapshot::new(cached, SnapshotOrigin::Stale));
            }

            match collection.refresh(&engine).await {
                Ok(items) => {
                    info!(kind, count = items.len(), "Fetched from remote");
                    yield Ok(Snapshot::new(items, SnapshotOrigin::Remote));
                }
                Err(e) if served_stale => {
                    warn!(kind, error = %e, "Refresh failed, keeping stale snapshot");
                }
                Err(e) => {
                    warn!(kind, error = %e, "Refresh failed with nothing cached");
                    yield Err(e);
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_order_puts_none_last() {
        let mut indices = vec![None, Some(2), Some(0), Some(1)];
        indices.sort_by_key(|i| index_order(*i));
        assert_eq!(indices, vec![Some(0), Some(1), Some(2), None]);
    }

    #[test]
    fn test_snapshot_refreshing_flag() {
        let stale = Snapshot::new(vec![1, 2], SnapshotOrigin::Stale);
        assert!(stale.is_refreshing());
        assert_eq!(stale.first(), Some(&1));
        assert!(!Snapshot::<i32>::new(vec![], SnapshotOrigin::Remote).is_refreshing());
    }

    #[test]
    fn test_season_position_of() {
        let user = UserId::new();
        let series = SeriesId::new();
        let season = |index: Option<i32>| Season {
            user_id: user,
            season_id: SeasonId::new(),
            series_id: series,
            name: None,
            index_number: index,
            episode_count: None,
            image_tag: None,
            last_write: 0,
        };
        let seasons = vec![season(Some(1)), season(Some(2)), season(None)];

        assert_eq!(
            SeasonPosition::of(&seasons[0], &seasons),
            SeasonPosition::new(Some(1), Some(2))
        );
        assert_eq!(
            SeasonPosition::of(&seasons[2], &seasons),
            SeasonPosition::new(None, Some(2))
        );
    }
}
