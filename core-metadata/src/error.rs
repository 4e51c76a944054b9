use bridge_traits::error::BridgeError;
use core_library::LibraryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("Remote fetch failed: {0}")]
    RemoteFetch(#[from] BridgeError),

    #[error("Cache storage failed: {0}")]
    Storage(#[from] LibraryError),
}

impl MetadataError {
    /// Whether retrying the same request later could succeed
    pub fn is_transient(&self) -> bool {
        match self {
            MetadataError::RemoteFetch(e) => e.is_transient(),
            MetadataError::Storage(_) => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, MetadataError>;
