pub(crate) mod in_memory;

pub use in_memory::InMemoryCatalogSource;

use async_trait::async_trait;

use super::markets_errors::Result;
use super::markets_model::Market;

/// Producer of raw catalog entities. Owns no state across calls and never
/// retries; transient-failure handling belongs to the repository above it.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Full catalog. May be empty or partial, never malformed.
    async fn fetch_all(&self) -> Result<Vec<Market>>;

    /// Exact-symbol lookup; normalization happens upstream.
    async fn fetch_by_symbol(&self, symbol: &str) -> Result<Option<Market>>;
}
