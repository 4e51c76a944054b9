//! # Invalidation & Garbage Collection
//!
//! Targeted invalidation drops one series' episodes for the current user so
//! the next read revalidates. The cleanup sweep deletes every record, for all
//! users, whose last write is older than the staleness threshold.

use crate::error::Result;
use crate::ttl::TtlPolicy;
use bridge_traits::time::Clock;
use core_library::models::{EpisodeId, SeriesId, UserId};
use core_library::repositories::CacheStore;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Rows removed by one cleanup sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub cutoff_millis: i64,
    pub seasons: u64,
    pub episodes: u64,
    pub series_details: u64,
}

impl CleanupReport {
    pub fn total(&self) -> u64 {
        self.seasons + self.episodes + self.series_details
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Series with a cached season list for the current user
    pub cached_series: u64,
}

#[derive(Clone)]
pub struct CacheMaintenance {
    store: Arc<dyn CacheStore>,
    clock: Arc<dyn Clock>,
    policy: TtlPolicy,
    user_id: UserId,
}

impl CacheMaintenance {
    pub fn new(
        store: Arc<dyn CacheStore>,
        clock: Arc<dyn Clock>,
        policy: TtlPolicy,
        user_id: UserId,
    ) -> Self {
        Self {
            store,
            clock,
            policy,
            user_id,
        }
    }

    /// Delete the current user's cached episodes of a series. Seasons stay.
    #[instrument(skip(self))]
    pub async fn invalidate_series_episodes(&self, series_id: SeriesId) -> Result<u64> {
        let removed = self
            .store
            .delete_episodes_of_series(self.user_id, series_id)
            .await?;
        debug!(removed, "Invalidated series episodes");
        Ok(removed)
    }

    /// Update playback fields of one cached episode in place.
    ///
    /// Returns `false` when the episode is not cached. A negative position is
    /// rejected by the store as invalid input.
    #[instrument(skip(self))]
    pub async fn update_episode_playback_state(
        &self,
        episode_id: EpisodeId,
        position_ticks: i64,
        played: bool,
    ) -> Result<bool> {
        let updated = self
            .store
            .update_playback_state(self.user_id, episode_id, position_ticks, played)
            .await?;
        if !updated {
            debug!("Episode not cached, playback state not stored");
        }
        Ok(updated)
    }

    /// Delete seasons, episodes and series details older than the threshold.
    ///
    /// A record written exactly at the cutoff survives.
    #[instrument(skip(self))]
    pub async fn cleanup_stale_cache(&self) -> Result<CleanupReport> {
        let cutoff_millis = self.policy.stale_cutoff(self.clock.unix_timestamp_millis());

        let episodes = self.store.delete_episodes_older_than(cutoff_millis).await?;
        let seasons = self.store.delete_seasons_older_than(cutoff_millis).await?;
        let series_details = self
            .store
            .delete_series_details_older_than(cutoff_millis)
            .await?;

        let report = CleanupReport {
            cutoff_millis,
            seasons,
            episodes,
            series_details,
        };

        info!(
            cutoff_millis,
            seasons,
            episodes,
            series_details,
            "Stale cache cleanup finished"
        );
        Ok(report)
    }

    pub async fn stats(&self) -> Result<CacheStats> {
        let cached_series = self.store.count_distinct_cached_series(self.user_id).await?;
        Ok(CacheStats { cached_series })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_total() {
        let report = CleanupReport {
            cutoff_millis: 0,
            seasons: 2,
            episodes: 5,
            series_details: 1,
        };
        assert_eq!(report.total(), 8);
        assert_eq!(CleanupReport::default().total(), 0);
    }
}
