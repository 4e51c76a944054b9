//! # Host Bridge Traits
//!
//! Capabilities the metadata cache core needs from its host.
//!
//! ## Overview
//!
//! This crate defines the contract between the cache core and the
//! host-specific pieces it cannot own: the remote media server and the time
//! source. Each host ships an implementation of [`RemoteMetadataSource`]
//! bound to its own transport and session model.
//!
//! ## Traits
//!
//! - [`RemoteMetadataSource`](metadata::RemoteMetadataSource) - Fetch series, seasons and episodes
//! - [`Clock`](time::Clock) - Time source for freshness checks and deterministic testing
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type. Host
//! implementations should:
//!
//! - Convert transport-specific errors to `BridgeError`
//! - Map HTTP failures to `BridgeError::Http` with the status code preserved
//! - Keep messages free of tokens and credentials
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so implementations can be shared
//! between the prefetch worker and UI-driven reads.

pub mod error;
pub mod metadata;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use metadata::{RemoteEpisode, RemoteMetadataSource, RemoteSeason, RemoteSeries};
pub use time::{Clock, LogLevel, SystemClock};
