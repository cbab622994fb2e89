use std::sync::Arc;

use crate::errors::Error;
use crate::markets::Market;

/// Dashboard projection plus the load/error state of the catalog read
/// behind it
#[derive(Debug, Clone)]
pub struct FilteredMarkets {
    pub markets: Arc<Vec<Market>>,
    pub is_loading: bool,
    pub error: Option<Arc<Error>>,
    /// Catalog snapshot version the projection was computed from
    pub version: u64,
}
