//! # Repository Pattern Implementation
//!
//! - `CacheStore` - per-user cached series, seasons and episodes
//! - `SqliteCacheStore` - sqlx-backed implementation

pub mod cache_store;

pub use cache_store::{CacheStore, SqliteCacheStore};
