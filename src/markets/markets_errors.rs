use thiserror::Error;

/// Custom error type for market data operations
#[derive(Debug, Error)]
pub enum MarketError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Fetch failed: {0}")]
    FetchFailed(String),

    /// Raw catalog source failure. Translated to `FetchFailed` at the
    /// service layer; never escapes past it.
    #[error("Source error: {0}")]
    Source(String),
}

/// Result type for market operations
pub type Result<T> = std::result::Result<T, MarketError>;
