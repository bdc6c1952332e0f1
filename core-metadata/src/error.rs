use bridge_traits::error::BridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("Failed to read tags: {0}")]
    ReadFailed(String),

    #[error("Failed to write tags: {0}")]
    WriteFailed(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid tag field: {0}")]
    InvalidField(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),
}

pub type Result<T> = std::result::Result<T, MetadataError>;

impl From<MetadataError> for BridgeError {
    fn from(error: MetadataError) -> Self {
        match error {
            MetadataError::Io(e) => BridgeError::Io(e),
            MetadataError::Bridge(e) => e,
            other => BridgeError::OperationFailed(other.to_string()),
        }
    }
}
