use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::assets::Asset;
use crate::errors::Error;
use crate::markets::Market;

/// Cache defaults, mirroring the app-wide query-client configuration
pub const DEFAULT_STALE_TIME: Duration = Duration::from_secs(30);
pub const DEFAULT_GC_TIME: Duration = Duration::from_secs(300);
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_RETRY_LIMIT: u32 = 2;
pub const DEFAULT_RETRY_BASE_DELAY: Duration = Duration::from_secs(1);
pub const DEFAULT_RETRY_MAX_DELAY: Duration = Duration::from_secs(30);

/// Logical identity of a cached read. Typed so that key collisions are a
/// compile error rather than an accident of string equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryKey {
    AllMarkets,
    /// Always holds the normalized symbol so case variants share one entry
    MarketBySymbol(String),
    Assets,
    Trending,
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryKey::AllMarkets => f.write_str("markets"),
            QueryKey::MarketBySymbol(symbol) => write!(f, "market:{}", symbol),
            QueryKey::Assets => f.write_str("assets"),
            QueryKey::Trending => f.write_str("trending"),
        }
    }
}

/// Value union held by cache entries. A symbol miss is `Market(None)`:
/// success-with-nothing, matching the repository's null-on-miss contract.
#[derive(Debug, Clone)]
pub enum QueryData {
    Markets(Arc<Vec<Market>>),
    Market(Option<Arc<Market>>),
    Assets(Arc<Vec<Asset>>),
    Trending(Arc<Vec<Market>>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    Idle,
    Loading,
    Success,
    Error,
}

/// Per-entry tuning supplied by the caller on each read/observe
#[derive(Debug, Clone)]
pub struct QueryOptions {
    /// Freshness window; reads inside it never refetch
    pub stale_time: Duration,
    /// When set, observed entries refresh on this timer
    pub refetch_interval: Option<Duration>,
    /// Overrides the cache-wide retry limit
    pub retry: Option<u32>,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            stale_time: DEFAULT_STALE_TIME,
            refetch_interval: None,
            retry: None,
        }
    }
}

impl QueryOptions {
    pub fn with_stale_time(stale_time: Duration) -> Self {
        Self {
            stale_time,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct QueryCacheConfig {
    pub default_stale_time: Duration,
    /// Idle period after which an unobserved entry is evicted
    pub gc_time: Duration,
    pub sweep_interval: Duration,
    pub retry_limit: u32,
    pub retry_base_delay: Duration,
    pub retry_max_delay: Duration,
}

impl Default for QueryCacheConfig {
    fn default() -> Self {
        Self {
            default_stale_time: DEFAULT_STALE_TIME,
            gc_time: DEFAULT_GC_TIME,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            retry_limit: DEFAULT_RETRY_LIMIT,
            retry_base_delay: DEFAULT_RETRY_BASE_DELAY,
            retry_max_delay: DEFAULT_RETRY_MAX_DELAY,
        }
    }
}

/// Point-in-time view of one cache entry handed to consumers. Data and
/// error travel independently: "loading first time" (neither present) and
/// "stale data plus an error" are distinct, observable states.
#[derive(Debug, Clone)]
pub struct QuerySnapshot {
    pub data: Option<QueryData>,
    pub status: QueryStatus,
    pub error: Option<Arc<Error>>,
    /// A fetch is currently running for this entry
    pub is_fetching: bool,
    pub last_fetched_at: Option<DateTime<Utc>>,
    /// Bumped on every applied fetch result; memoization key for derived views
    pub version: u64,
}

impl QuerySnapshot {
    /// First load: nothing cached yet, no failure recorded, fetch pending
    pub fn is_loading(&self) -> bool {
        self.data.is_none() && self.error.is_none() && self.status == QueryStatus::Loading
    }

    pub fn markets(&self) -> Option<Arc<Vec<Market>>> {
        match &self.data {
            Some(QueryData::Markets(markets)) | Some(QueryData::Trending(markets)) => {
                Some(markets.clone())
            }
            _ => None,
        }
    }

    pub fn market(&self) -> Option<Arc<Market>> {
        match &self.data {
            Some(QueryData::Market(market)) => market.clone(),
            _ => None,
        }
    }

    pub fn assets(&self) -> Option<Arc<Vec<Asset>>> {
        match &self.data {
            Some(QueryData::Assets(assets)) => Some(assets.clone()),
            _ => None,
        }
    }
}

/// Entry-count view for diagnostics
#[derive(Debug, Clone)]
pub struct QueryCacheStats {
    pub entry_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_keys_are_distinct_identities() {
        assert_ne!(QueryKey::AllMarkets, QueryKey::Trending);
        assert_eq!(
            QueryKey::MarketBySymbol("PKU-VMAX-RB".to_string()),
            QueryKey::MarketBySymbol("PKU-VMAX-RB".to_string())
        );
        assert_ne!(
            QueryKey::MarketBySymbol("PKU-VMAX-RB".to_string()),
            QueryKey::MarketBySymbol("GYR-HOLO".to_string())
        );
    }

    #[test]
    fn query_key_display_names_the_entry() {
        assert_eq!(QueryKey::AllMarkets.to_string(), "markets");
        assert_eq!(
            QueryKey::MarketBySymbol("GYR-HOLO".to_string()).to_string(),
            "market:GYR-HOLO"
        );
    }
}
