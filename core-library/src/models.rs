//! Domain models for the metadata cache
//!
//! Cached records mirror the remote Series → Season → Episode hierarchy and
//! are scoped per user. Every record carries the epoch-millisecond timestamp
//! of the remote fetch that wrote it.

use bridge_traits::metadata::{RemoteEpisode, RemoteSeason, RemoteSeries};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// Remote runtimes and playback positions are expressed in ticks.
pub const TICKS_PER_MILLISECOND: i64 = 10_000;

// =============================================================================
// ID Types
// =============================================================================

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
        #[sqlx(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
                Ok(Self(Uuid::parse_str(s)?))
            }

            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_id!(
    /// Identifier of the user a cached row belongs to
    UserId
);
uuid_id!(
    /// Identifier of a series; also the prefetch dedup key
    SeriesId
);
uuid_id!(
    /// Identifier of a season
    SeasonId
);
uuid_id!(
    /// Identifier of an episode
    EpisodeId
);

// =============================================================================
// Cached Records
// =============================================================================

/// Cached series details
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct SeriesDetails {
    pub user_id: UserId,
    pub series_id: SeriesId,
    pub name: String,
    pub overview: Option<String>,
    pub production_year: Option<i32>,
    pub image_tag: Option<String>,
    /// Epoch millis of the fetch that wrote this row
    pub last_write: i64,
}

impl SeriesDetails {
    pub fn from_remote(remote: RemoteSeries, user_id: UserId, last_write: i64) -> Self {
        Self {
            user_id,
            series_id: SeriesId(remote.id),
            name: remote.name,
            overview: remote.overview,
            production_year: remote.production_year,
            image_tag: remote.image_tag,
            last_write,
        }
    }
}

/// Cached season of a series
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Season {
    pub user_id: UserId,
    pub season_id: SeasonId,
    pub series_id: SeriesId,
    pub name: Option<String>,
    /// `None` marks a specials season, listed after numbered seasons
    pub index_number: Option<i32>,
    pub episode_count: Option<i32>,
    pub image_tag: Option<String>,
    /// Epoch millis of the fetch that wrote this row
    pub last_write: i64,
}

impl Season {
    pub fn from_remote(remote: RemoteSeason, user_id: UserId, last_write: i64) -> Self {
        Self {
            user_id,
            season_id: SeasonId(remote.id),
            series_id: SeriesId(remote.series_id),
            name: remote.name,
            index_number: remote.index_number,
            episode_count: remote.episode_count,
            image_tag: remote.image_tag,
            last_write,
        }
    }

    pub fn is_specials(&self) -> bool {
        self.index_number.is_none()
    }
}

/// Highest season index in a season list, ignoring specials
pub fn max_season_index(seasons: &[Season]) -> Option<i32> {
    seasons.iter().filter_map(|season| season.index_number).max()
}

/// Cached episode with the owning user's playback state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Episode {
    pub user_id: UserId,
    pub episode_id: EpisodeId,
    pub series_id: SeriesId,
    pub season_id: SeasonId,
    pub name: String,
    pub overview: Option<String>,
    pub index_number: Option<i32>,
    pub run_time_ticks: Option<i64>,
    pub premiere_date: Option<String>,
    pub image_tag: Option<String>,
    pub playback_position_ticks: i64,
    pub played: bool,
    pub is_favorite: bool,
    /// Epoch millis of the fetch that wrote this row
    pub last_write: i64,
}

impl Episode {
    pub fn from_remote(remote: RemoteEpisode, user_id: UserId, last_write: i64) -> Self {
        Self {
            user_id,
            episode_id: EpisodeId(remote.id),
            series_id: SeriesId(remote.series_id),
            season_id: SeasonId(remote.season_id),
            name: remote.name,
            overview: remote.overview,
            index_number: remote.index_number,
            run_time_ticks: remote.run_time_ticks,
            premiere_date: remote.premiere_date,
            image_tag: remote.image_tag,
            playback_position_ticks: remote.playback_position_ticks.max(0),
            played: remote.played,
            is_favorite: remote.is_favorite,
            last_write,
        }
    }

    /// Runtime as a duration, if the server reported one
    pub fn run_time(&self) -> Option<Duration> {
        self.run_time_ticks
            .filter(|ticks| *ticks >= 0)
            .map(|ticks| Duration::from_millis((ticks / TICKS_PER_MILLISECOND) as u64))
    }

    /// Fraction of the episode already watched, in `0.0..=1.0`
    pub fn progress(&self) -> Option<f64> {
        match self.run_time_ticks {
            Some(total) if total > 0 => {
                Some((self.playback_position_ticks as f64 / total as f64).clamp(0.0, 1.0))
            }
            _ => None,
        }
    }
}
