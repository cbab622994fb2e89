use thiserror::Error;

use crate::assets::assets_errors::AssetError;
use crate::markets::markets_errors::MarketError;

// Create a type alias for Result using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Root error type for the marketplace core
#[derive(Error, Debug)]
pub enum Error {
    #[error("Market operation failed: {0}")]
    Market(#[from] MarketError),

    #[error("Asset operation failed: {0}")]
    Asset(#[from] AssetError),
}

impl Error {
    /// True for lookup misses surfaced as errors (trend queries).
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::Market(MarketError::NotFound(_)) | Error::Asset(AssetError::NotFound(_))
        )
    }

    /// True for inputs rejected before any I/O was attempted.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(
            self,
            Error::Market(MarketError::InvalidArgument(_)) | Error::Asset(AssetError::InvalidData(_))
        )
    }
}
