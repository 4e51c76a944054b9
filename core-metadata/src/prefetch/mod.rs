//! # Background Prefetch
//!
//! Warms the cache for series the user is likely to open next.
//!
//! - [`PrefetchQueue`] holds pending requests, dropping the oldest on overflow
//! - [`InFlightSet`] keeps at most one job per series running
//! - [`PrefetchCoordinator`] owns the single queue worker and the focus path

pub mod coordinator;
pub mod in_flight;
pub mod job;
pub mod queue;

pub use coordinator::{EnqueueOutcome, PrefetchCoordinator, PrefetchSettings};
pub use in_flight::{InFlightGuard, InFlightSet};
pub use job::{run_prefetch_job, PrefetchSummary};
pub use queue::{PrefetchQueue, PrefetchRequest, PushOutcome};

use core_library::models::{SeasonId, SeriesId};

/// Kind of an item currently shown by the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Series,
    Season,
    Episode,
    Movie,
    Other,
}

/// An item currently visible in the UI, as far as prefetch cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibleItem {
    pub kind: ItemKind,
    pub series_id: Option<SeriesId>,
    pub season_id: Option<SeasonId>,
}

impl VisibleItem {
    pub fn episode(series_id: SeriesId, season_id: Option<SeasonId>) -> Self {
        Self {
            kind: ItemKind::Episode,
            series_id: Some(series_id),
            season_id,
        }
    }

    pub fn series(series_id: SeriesId) -> Self {
        Self {
            kind: ItemKind::Series,
            series_id: Some(series_id),
            season_id: None,
        }
    }

    pub fn other(kind: ItemKind) -> Self {
        Self {
            kind,
            series_id: None,
            season_id: None,
        }
    }
}
