//! # Series Metadata Cache
//!
//! Read-through caching and background prefetch for Series → Season → Episode
//! metadata fetched from a remote media server.
//!
//! ## Overview
//!
//! - [`ttl`] decides how long each cached collection stays trustworthy
//! - [`read_through`] serves reads as stale-while-revalidate snapshot streams
//! - [`prefetch`] warms the cache in the background, one job per series
//! - [`maintenance`] handles targeted invalidation and the cleanup sweep

pub mod error;
pub mod maintenance;
pub mod prefetch;
pub mod read_through;
pub mod ttl;

pub use error::{MetadataError, Result};
pub use maintenance::{CacheMaintenance, CacheStats, CleanupReport};
pub use prefetch::{
    EnqueueOutcome, InFlightSet, ItemKind, PrefetchCoordinator, PrefetchQueue, PrefetchRequest,
    PrefetchSettings, VisibleItem,
};
pub use read_through::{ReadThroughEngine, SeasonPosition, Snapshot, SnapshotOrigin, SnapshotStream};
pub use ttl::TtlPolicy;
