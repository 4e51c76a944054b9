//! Workspace façade crate.
//!
//! Host applications depend on `series-cache-workspace` and get the service
//! façade plus the building blocks it is assembled from, without wiring each
//! workspace crate individually.

pub use core_service::*;
