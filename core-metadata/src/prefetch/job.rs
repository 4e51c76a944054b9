//! The prefetch job shared by the queued worker and the focus path.

use crate::error::Result;
use crate::prefetch::queue::PrefetchRequest;
use crate::read_through::ReadThroughEngine;
use std::time::{Duration, Instant};
use tracing::{debug, instrument};

/// What one completed prefetch job fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrefetchSummary {
    pub seasons: usize,
    pub episodes: usize,
    pub elapsed: Duration,
}

/// Refresh the season list, then the priority season's episodes, then every
/// other season in index order with `inter_season_delay` between seasons.
///
/// The first failure aborts the job. A priority season missing from the
/// freshly fetched season list is ignored.
#[instrument(skip(engine, request), fields(series_id = %request.series_id))]
pub async fn run_prefetch_job(
    engine: &ReadThroughEngine,
    request: PrefetchRequest,
    inter_season_delay: Duration,
) -> Result<PrefetchSummary> {
    let started = Instant::now();
    let series_id = request.series_id;

    let seasons = engine.refresh_seasons(series_id).await?;

    let priority = request
        .priority_season_id
        .filter(|id| seasons.iter().any(|season| season.season_id == *id));
    if request.priority_season_id.is_some() && priority.is_none() {
        debug!("Priority season not in season list, ignoring hint");
    }

    let mut episodes = 0;
    let mut fetched = 0;

    if let Some(season_id) = priority {
        episodes += engine.refresh_episodes(series_id, season_id).await?.len();
        fetched += 1;
    }

    for season in seasons
        .iter()
        .filter(|season| Some(season.season_id) != priority)
    {
        if fetched > 0 {
            tokio::time::sleep(inter_season_delay).await;
        }
        episodes += engine
            .refresh_episodes(series_id, season.season_id)
            .await?
            .len();
        fetched += 1;
    }

    Ok(PrefetchSummary {
        seasons: seasons.len(),
        episodes,
        elapsed: started.elapsed(),
    })
}
