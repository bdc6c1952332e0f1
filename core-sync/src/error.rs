use bridge_traits::error::BridgeError;
use core_library::error::LibraryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    /// Required configuration or input is missing; nothing was changed
    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error("No mapping for {source_a_path}")]
    MappingNotFound { source_a_path: String },

    #[error("A scan or sync is already in progress")]
    SyncInProgress,

    #[error("Library error: {0}")]
    Library(#[from] LibraryError),

    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),
}

pub type Result<T> = std::result::Result<T, SyncError>;
