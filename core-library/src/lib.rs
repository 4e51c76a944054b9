//! # Metadata Cache Storage
//!
//! Owns the SQLite database that backs the series/season/episode cache.
//!
//! ## Overview
//!
//! This crate manages:
//! - SQLite connection pooling, schema and migrations
//! - Domain models for cached records and their id newtypes
//! - The `CacheStore` repository used by the read path and maintenance

pub mod db;
pub mod error;
pub mod models;
pub mod repositories;

pub use error::{LibraryError, Result};
pub use repositories::{CacheStore, SqliteCacheStore};
