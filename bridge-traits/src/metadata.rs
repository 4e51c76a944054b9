//! Remote Metadata Source Abstraction
//!
//! The network boundary that serves authoritative series, season and episode
//! metadata. The host owns transport, authentication and wire decoding; the
//! core only sees the transfer objects below.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;

/// Series-level details as returned by the remote server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteSeries {
    pub id: Uuid,
    pub name: String,
    pub overview: Option<String>,
    pub production_year: Option<i32>,
    pub image_tag: Option<String>,
}

/// A season of a series
///
/// `index_number` is `None` for "specials" style seasons.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteSeason {
    pub id: Uuid,
    pub series_id: Uuid,
    pub name: Option<String>,
    pub index_number: Option<i32>,
    pub episode_count: Option<i32>,
    pub image_tag: Option<String>,
}

/// An episode with the requesting user's playback data attached
///
/// Durations and positions are in ticks (10,000 ticks = 1 ms).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteEpisode {
    pub id: Uuid,
    pub series_id: Uuid,
    pub season_id: Uuid,
    pub name: String,
    pub overview: Option<String>,
    pub index_number: Option<i32>,
    pub run_time_ticks: Option<i64>,
    pub premiere_date: Option<String>,
    pub image_tag: Option<String>,
    #[serde(default)]
    pub playback_position_ticks: i64,
    #[serde(default)]
    pub played: bool,
    #[serde(default)]
    pub is_favorite: bool,
}

/// Remote metadata source trait
///
/// Implementations are expected to be scoped to the signed-in user so that
/// playback fields on [`RemoteEpisode`] reflect that user's state.
///
/// # Errors
///
/// Every method fails with a [`BridgeError`](crate::error::BridgeError) on
/// transport or server failure. Callers decide whether the failure is
/// surfaced or masked by cached data.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::metadata::{RemoteMetadataSource, RemoteSeason};
///
/// struct JellyfinSource { /* http client, session */ }
///
/// #[async_trait::async_trait]
/// impl RemoteMetadataSource for JellyfinSource {
///     async fn fetch_seasons(&self, series_id: Uuid) -> Result<Vec<RemoteSeason>> {
///         // GET /Shows/{series_id}/Seasons
///         todo!()
///     }
///     // ...
/// }
/// ```
#[async_trait]
pub trait RemoteMetadataSource: Send + Sync {
    /// Fetch the series record itself
    async fn fetch_series_details(&self, series_id: Uuid) -> Result<RemoteSeries>;

    /// Fetch every season of a series
    async fn fetch_seasons(&self, series_id: Uuid) -> Result<Vec<RemoteSeason>>;

    /// Fetch every episode of one season
    async fn fetch_episodes(&self, series_id: Uuid, season_id: Uuid) -> Result<Vec<RemoteEpisode>>;
}
