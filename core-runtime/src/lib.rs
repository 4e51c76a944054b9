//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the metadata cache core:
//! - Logging and tracing infrastructure
//! - Configuration management (cache lifetimes, prefetch pacing, bootstrap)
//!
//! ## Overview
//!
//! This crate contains the runtime utilities that other modules depend on.
//! It establishes the logging conventions and the configuration surface the
//! host uses to tune the cache.

pub mod config;
pub mod error;
pub mod logging;

pub use config::{CacheConfig, CoreConfig, CoreConfigBuilder, DatabaseLocation};
pub use error::{Error, Result};
