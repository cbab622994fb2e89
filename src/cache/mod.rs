pub(crate) mod models;
pub(crate) mod query_cache;

// Re-export the public interface
pub use models::{
    QueryCacheConfig, QueryCacheStats, QueryData, QueryKey, QueryOptions, QuerySnapshot,
    QueryStatus,
};
pub use query_cache::{QueryCache, QueryFetcher, QueryObserverGuard};
