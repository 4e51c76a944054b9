//! # Core Configuration Module
//!
//! Provides configuration management for the metadata cache core.
//!
//! ## Overview
//!
//! Two layers of configuration live here:
//!
//! - [`CacheConfig`] - cache lifetimes and prefetch pacing. Every value has a
//!   sensible default so hosts only override what they need.
//! - [`CoreConfig`] - everything needed to bootstrap the service: where the
//!   cache database lives, which user the cache is scoped to, and the
//!   [`CacheConfig`] to apply. Built through [`CoreConfigBuilder`], which fails
//!   fast when required values are missing.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::{CacheConfig, CoreConfig};
//! use std::time::Duration;
//!
//! let config = CoreConfig::builder()
//!     .database_path("/path/to/metadata-cache.db")
//!     .user_id(current_user)
//!     .cache_config(CacheConfig::default().with_queue_capacity(40))
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use uuid::Uuid;

/// Default lifetime of a season that may still receive episodes.
pub const DEFAULT_CURRENT_SEASON_TTL: Duration = Duration::from_secs(15 * 60);

/// Default lifetime of a completed season's episode list.
pub const DEFAULT_COMPLETED_SEASON_TTL: Duration = Duration::from_secs(60 * 60);

/// Default lifetime of a series' season list and series details.
pub const DEFAULT_SEASON_LIST_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Default age after which the GC sweep deletes a record.
pub const DEFAULT_STALE_THRESHOLD: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Default number of queued prefetch requests.
pub const DEFAULT_PREFETCH_QUEUE_CAPACITY: usize = 20;

/// Default pause between two queued prefetch jobs.
pub const DEFAULT_INTER_JOB_DELAY: Duration = Duration::from_millis(300);

/// Default pause between two seasons inside a prefetch job.
pub const DEFAULT_INTER_SEASON_DELAY: Duration = Duration::from_millis(50);

/// Cache lifetimes and prefetch pacing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// TTL for episodes of a current season, or when the position is unknown
    pub current_season_ttl: Duration,

    /// TTL for episodes of a completed season
    pub completed_season_ttl: Duration,

    /// TTL for a series' season list and its series details
    pub season_list_ttl: Duration,

    /// Records older than this are removed by the cleanup sweep
    pub stale_threshold: Duration,

    /// Maximum number of queued prefetch requests before the oldest is dropped
    pub prefetch_queue_capacity: usize,

    /// Pause after each queued prefetch job
    pub inter_job_delay: Duration,

    /// Pause between seasons inside one prefetch job
    pub inter_season_delay: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            current_season_ttl: DEFAULT_CURRENT_SEASON_TTL,
            completed_season_ttl: DEFAULT_COMPLETED_SEASON_TTL,
            season_list_ttl: DEFAULT_SEASON_LIST_TTL,
            stale_threshold: DEFAULT_STALE_THRESHOLD,
            prefetch_queue_capacity: DEFAULT_PREFETCH_QUEUE_CAPACITY,
            inter_job_delay: DEFAULT_INTER_JOB_DELAY,
            inter_season_delay: DEFAULT_INTER_SEASON_DELAY,
        }
    }
}

impl CacheConfig {
    /// Set the current-season TTL
    pub fn with_current_season_ttl(mut self, ttl: Duration) -> Self {
        self.current_season_ttl = ttl;
        self
    }

    /// Set the completed-season TTL
    pub fn with_completed_season_ttl(mut self, ttl: Duration) -> Self {
        self.completed_season_ttl = ttl;
        self
    }

    /// Set the season list TTL
    pub fn with_season_list_ttl(mut self, ttl: Duration) -> Self {
        self.season_list_ttl = ttl;
        self
    }

    /// Set the cleanup staleness threshold
    pub fn with_stale_threshold(mut self, threshold: Duration) -> Self {
        self.stale_threshold = threshold;
        self
    }

    /// Set the prefetch queue capacity
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.prefetch_queue_capacity = capacity;
        self
    }

    /// Set the pause between queued prefetch jobs
    pub fn with_inter_job_delay(mut self, delay: Duration) -> Self {
        self.inter_job_delay = delay;
        self
    }

    /// Set the pause between seasons of one prefetch job
    pub fn with_inter_season_delay(mut self, delay: Duration) -> Self {
        self.inter_season_delay = delay;
        self
    }

    /// Validates the configuration
    ///
    /// This checks:
    /// - TTLs are non-zero
    /// - A completed season never expires sooner than a current one
    /// - The cleanup threshold outlives every TTL
    /// - The prefetch queue can hold at least one request
    pub fn validate(&self) -> Result<()> {
        if self.current_season_ttl.is_zero()
            || self.completed_season_ttl.is_zero()
            || self.season_list_ttl.is_zero()
        {
            return Err(Error::Config("Cache TTLs must be greater than 0".to_string()));
        }

        if self.completed_season_ttl < self.current_season_ttl {
            return Err(Error::Config(format!(
                "Completed season TTL ({:?}) must not be shorter than current season TTL ({:?})",
                self.completed_season_ttl, self.current_season_ttl
            )));
        }

        let longest_ttl = self
            .current_season_ttl
            .max(self.completed_season_ttl)
            .max(self.season_list_ttl);
        if self.stale_threshold <= longest_ttl {
            return Err(Error::Config(format!(
                "Stale threshold ({:?}) must exceed the longest TTL ({:?})",
                self.stale_threshold, longest_ttl
            )));
        }

        if self.prefetch_queue_capacity == 0 {
            return Err(Error::Config(
                "Prefetch queue capacity must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Where the cache database lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseLocation {
    /// SQLite file on disk, created if missing
    File(PathBuf),
    /// Private in-memory database, lost on shutdown
    InMemory,
}

/// Core configuration for the metadata cache service.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// Cache database location
    pub database: DatabaseLocation,

    /// User the cached rows are scoped to
    pub user_id: Uuid,

    /// Lifetimes and prefetch pacing
    pub cache: CacheConfig,

    /// Run the stale-record sweep once during bootstrap
    pub cleanup_on_startup: bool,
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    pub fn validate(&self) -> Result<()> {
        if let DatabaseLocation::File(path) = &self.database {
            if path.as_os_str().is_empty() {
                return Err(Error::Config("Database path cannot be empty".to_string()));
            }
        }

        if self.user_id.is_nil() {
            return Err(Error::Config("User id cannot be nil".to_string()));
        }

        self.cache.validate()
    }
}

/// Builder for constructing [`CoreConfig`] instances.
#[derive(Debug, Default)]
pub struct CoreConfigBuilder {
    database: Option<DatabaseLocation>,
    user_id: Option<Uuid>,
    cache: Option<CacheConfig>,
    cleanup_on_startup: Option<bool>,
}

impl CoreConfigBuilder {
    /// Sets the database file path.
    pub fn database_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.database = Some(DatabaseLocation::File(path.into()));
        self
    }

    /// Uses a private in-memory database.
    pub fn in_memory_database(mut self) -> Self {
        self.database = Some(DatabaseLocation::InMemory);
        self
    }

    /// Sets the user the cache is scoped to.
    pub fn user_id(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Overrides cache lifetimes and prefetch pacing.
    pub fn cache_config(mut self, cache: CacheConfig) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Enables or disables the bootstrap cleanup sweep. Enabled by default.
    pub fn cleanup_on_startup(mut self, enabled: bool) -> Self {
        self.cleanup_on_startup = Some(enabled);
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if:
    /// - No database location was set
    /// - No user id was set
    /// - Validation fails
    pub fn build(self) -> Result<CoreConfig> {
        let database = self.database.ok_or_else(|| {
            Error::Config(
                "Database location is required. Call database_path() or in_memory_database()."
                    .to_string(),
            )
        })?;

        let user_id = self
            .user_id
            .ok_or_else(|| Error::Config("User id is required".to_string()))?;

        let config = CoreConfig {
            database,
            user_id,
            cache: self.cache.unwrap_or_default(),
            cleanup_on_startup: self.cleanup_on_startup.unwrap_or(true),
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_config_defaults() {
        let config = CacheConfig::default();

        assert_eq!(config.current_season_ttl, Duration::from_secs(900));
        assert_eq!(config.completed_season_ttl, Duration::from_secs(3600));
        assert_eq!(config.season_list_ttl, Duration::from_secs(86_400));
        assert_eq!(config.stale_threshold, Duration::from_secs(604_800));
        assert_eq!(config.prefetch_queue_capacity, 20);
        assert_eq!(config.inter_job_delay, Duration::from_millis(300));
        assert_eq!(config.inter_season_delay, Duration::from_millis(50));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_cache_config_builder() {
        let config = CacheConfig::default()
            .with_queue_capacity(5)
            .with_inter_job_delay(Duration::ZERO)
            .with_inter_season_delay(Duration::from_millis(1));

        assert_eq!(config.prefetch_queue_capacity, 5);
        assert_eq!(config.inter_job_delay, Duration::ZERO);
        assert_eq!(config.inter_season_delay, Duration::from_millis(1));
    }

    #[test]
    fn test_zero_queue_capacity_rejected() {
        let result = CacheConfig::default().with_queue_capacity(0).validate();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_completed_shorter_than_current_rejected() {
        let result = CacheConfig::default()
            .with_completed_season_ttl(Duration::from_secs(60))
            .validate();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_stale_threshold_must_exceed_ttls() {
        let result = CacheConfig::default()
            .with_stale_threshold(Duration::from_secs(3600))
            .validate();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_builder_requires_database() {
        let result = CoreConfig::builder().user_id(Uuid::new_v4()).build();
        let err = result.expect_err("missing database should fail");
        assert!(err.to_string().contains("Database location is required"));
    }

    #[test]
    fn test_builder_requires_user() {
        let result = CoreConfig::builder().in_memory_database().build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_builder_rejects_nil_user() {
        let result = CoreConfig::builder()
            .in_memory_database()
            .user_id(Uuid::nil())
            .build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_builder_defaults() {
        let user = Uuid::new_v4();
        let config = CoreConfig::builder()
            .database_path("/tmp/metadata-cache.db")
            .user_id(user)
            .build()
            .expect("valid config");

        assert_eq!(
            config.database,
            DatabaseLocation::File(PathBuf::from("/tmp/metadata-cache.db"))
        );
        assert_eq!(config.user_id, user);
        assert_eq!(config.cache, CacheConfig::default());
        assert!(config.cleanup_on_startup);
    }
}
