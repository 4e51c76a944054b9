//! Cache lifetime policy
//!
//! Episode lists of the newest season may still grow, so they expire quickly.
//! Completed seasons are trusted longer. Season lists and series details share
//! one long lifetime.

use core_runtime::config::CacheConfig;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtlPolicy {
    current_season: Duration,
    completed_season: Duration,
    season_list: Duration,
    stale_threshold: Duration,
}

impl TtlPolicy {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            current_season: config.current_season_ttl,
            completed_season: config.completed_season_ttl,
            season_list: config.season_list_ttl,
            stale_threshold: config.stale_threshold,
        }
    }

    /// Lifetime of a season's episode list.
    ///
    /// Unknown positions and the newest season get the short lifetime.
    pub fn ttl(&self, season_index: Option<i32>, max_season_index: Option<i32>) -> Duration {
        match (season_index, max_season_index) {
            (Some(index), Some(max)) if index < max => self.completed_season,
            _ => self.current_season,
        }
    }

    pub fn season_list_ttl(&self) -> Duration {
        self.season_list
    }

    pub fn series_details_ttl(&self) -> Duration {
        self.season_list
    }

    /// Age after which the cleanup sweep deletes a record.
    pub fn stale_threshold(&self) -> Duration {
        self.stale_threshold
    }

    /// `true` while `now - last_write` is strictly below `ttl`.
    pub fn is_fresh(&self, now_millis: i64, last_write_millis: i64, ttl: Duration) -> bool {
        let age = now_millis.saturating_sub(last_write_millis);
        age < duration_millis(ttl)
    }

    /// Epoch-millis cutoff for the cleanup sweep at `now_millis`.
    pub fn stale_cutoff(&self, now_millis: i64) -> i64 {
        now_millis.saturating_sub(duration_millis(self.stale_threshold))
    }
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self::new(&CacheConfig::default())
    }
}

fn duration_millis(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHORT: Duration = Duration::from_secs(15 * 60);
    const LONG: Duration = Duration::from_secs(60 * 60);

    #[test]
    fn test_unknown_position_is_short() {
        let policy = TtlPolicy::default();
        assert_eq!(policy.ttl(None, Some(3)), SHORT);
        assert_eq!(policy.ttl(Some(1), None), SHORT);
        assert_eq!(policy.ttl(None, None), SHORT);
    }

    #[test]
    fn test_current_season_is_short() {
        let policy = TtlPolicy::default();
        assert_eq!(policy.ttl(Some(3), Some(3)), SHORT);
        assert_eq!(policy.ttl(Some(4), Some(3)), SHORT);
    }

    #[test]
    fn test_completed_season_is_long() {
        let policy = TtlPolicy::default();
        assert_eq!(policy.ttl(Some(1), Some(3)), LONG);
        assert_eq!(policy.ttl(Some(0), Some(1)), LONG);
    }

    #[test]
    fn test_fixed_lifetimes() {
        let policy = TtlPolicy::default();
        assert_eq!(policy.season_list_ttl(), Duration::from_secs(24 * 60 * 60));
        assert_eq!(policy.series_details_ttl(), policy.season_list_ttl());
        assert_eq!(policy.stale_threshold(), Duration::from_secs(7 * 24 * 60 * 60));
    }

    #[test]
    fn test_policy_follows_config() {
        let config = CacheConfig::default()
            .with_current_season_ttl(Duration::from_secs(60))
            .with_completed_season_ttl(Duration::from_secs(120));
        let policy = TtlPolicy::new(&config);
        assert_eq!(policy.ttl(Some(1), Some(1)), Duration::from_secs(60));
        assert_eq!(policy.ttl(Some(0), Some(1)), Duration::from_secs(120));
    }

    #[test]
    fn test_freshness_boundary() {
        let policy = TtlPolicy::default();
        let ttl = Duration::from_millis(1_000);
        assert!(policy.is_fresh(10_999, 10_000, ttl));
        assert!(!policy.is_fresh(11_000, 10_000, ttl));
        assert!(policy.is_fresh(9_000, 10_000, ttl), "future writes count as fresh");
    }

    #[test]
    fn test_stale_cutoff() {
        let policy = TtlPolicy::default();
        let week = 7 * 24 * 60 * 60 * 1000;
        assert_eq!(policy.stale_cutoff(week + 5), 5);
    }
}
