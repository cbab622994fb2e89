use thiserror::Error;

/// Custom error type for asset-related operations
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// Result type for asset operations
pub type Result<T> = std::result::Result<T, AssetError>;
