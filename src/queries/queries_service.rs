use async_trait::async_trait;
use log::debug;
use std::sync::{Arc, Mutex};

use super::queries_constants::{
    ASSETS_STALE_TIME, MARKETS_REFETCH_INTERVAL, MARKETS_STALE_TIME, MARKET_STALE_TIME,
    TRENDING_STALE_TIME,
};
use super::queries_model::FilteredMarkets;
use crate::assets::{Asset, AssetService, AssetUpdate, NewAsset};
use crate::cache::{
    QueryCache, QueryCacheConfig, QueryData, QueryFetcher, QueryKey, QueryObserverGuard,
    QueryOptions, QuerySnapshot,
};
use crate::dashboard::{DashboardView, MarketFilter};
use crate::errors::Result;
use crate::markets::{MarketService, MarketSubscription, MarketUpdateHandler};

/// Presentation-facing read/mutation surface. Wires the market and asset
/// services through the query cache and the memoized dashboard projection.
pub struct QueryService {
    cache: QueryCache,
    markets: Arc<MarketService>,
    assets: Arc<AssetService>,
    dashboard: Mutex<DashboardView>,
}

/// Resolves each query key against the owning service
struct CoreQueryFetcher {
    markets: Arc<MarketService>,
    assets: Arc<AssetService>,
}

#[async_trait]
impl QueryFetcher for CoreQueryFetcher {
    async fn fetch(&self, key: &QueryKey) -> Result<QueryData> {
        match key {
            QueryKey::AllMarkets => {
                let markets = self.markets.get_markets().await?;
                Ok(QueryData::Markets(Arc::new(markets)))
            }
            QueryKey::MarketBySymbol(symbol) => {
                let market = self.markets.get_market_by_symbol(symbol).await?;
                Ok(QueryData::Market(market.map(Arc::new)))
            }
            QueryKey::Assets => {
                let assets = self.assets.get_assets()?;
                Ok(QueryData::Assets(Arc::new(assets)))
            }
            QueryKey::Trending => {
                let trending = self.markets.get_trending().await?;
                Ok(QueryData::Trending(Arc::new(trending)))
            }
        }
    }
}

impl QueryService {
    pub fn new(
        markets: Arc<MarketService>,
        assets: Arc<AssetService>,
        config: QueryCacheConfig,
    ) -> Self {
        let fetcher = Arc::new(CoreQueryFetcher {
            markets: markets.clone(),
            assets: assets.clone(),
        });
        Self {
            cache: QueryCache::new(fetcher, config),
            markets,
            assets,
            dashboard: Mutex::new(DashboardView::new()),
        }
    }

    /// Cached catalog read, market-cap descending
    pub async fn markets(&self) -> QuerySnapshot {
        self.cache
            .query(&QueryKey::AllMarkets, Self::markets_options())
            .await
    }

    /// Cached single-market read. The symbol is validated and normalized
    /// before it becomes part of the cache key, so case variants share one
    /// entry and invalid input never reaches the cache.
    pub async fn market(&self, symbol: &str) -> Result<QuerySnapshot> {
        let normalized = self.markets.normalize_symbol(symbol)?;
        Ok(self
            .cache
            .query(
                &QueryKey::MarketBySymbol(normalized),
                QueryOptions::with_stale_time(MARKET_STALE_TIME),
            )
            .await)
    }

    pub async fn assets(&self) -> QuerySnapshot {
        self.cache
            .query(
                &QueryKey::Assets,
                QueryOptions::with_stale_time(ASSETS_STALE_TIME),
            )
            .await
    }

    pub async fn trending(&self) -> QuerySnapshot {
        self.cache
            .query(
                &QueryKey::Trending,
                QueryOptions::with_stale_time(TRENDING_STALE_TIME),
            )
            .await
    }

    /// Catalog read projected through the memoized dashboard pipeline
    pub async fn markets_filtered(&self, filter: &MarketFilter) -> FilteredMarkets {
        let snapshot = self.markets().await;
        let markets = snapshot.markets().unwrap_or_default();
        let projected = {
            let mut view = self.dashboard.lock().unwrap();
            view.project(snapshot.version, &markets, filter)
        };
        FilteredMarkets {
            markets: projected,
            is_loading: snapshot.is_loading(),
            error: snapshot.error.clone(),
            version: snapshot.version,
        }
    }

    /// Forced refresh of one entry; the `refetch` member of the hook shape
    pub async fn refetch(&self, key: &QueryKey) -> QuerySnapshot {
        self.cache
            .refetch(key, Self::options_for(key), true)
            .await
    }

    /// Stores a new asset and invalidates the assets entry on success
    pub async fn add_asset(&self, new_asset: NewAsset) -> Result<Asset> {
        let asset = self.assets.add_asset(new_asset)?;
        debug!("asset {} added, invalidating assets cache", asset.symbol);
        self.cache.invalidate(&QueryKey::Assets);
        Ok(asset)
    }

    /// Applies a partial update and invalidates the assets entry on success
    pub async fn update_asset(&self, symbol: &str, update: AssetUpdate) -> Result<Asset> {
        let asset = self.assets.update_asset(symbol, update)?;
        debug!("asset {} updated, invalidating assets cache", asset.symbol);
        self.cache.invalidate(&QueryKey::Assets);
        Ok(asset)
    }

    /// Keeps the catalog entry polling for the dashboard's lifetime
    pub fn watch_markets(&self) -> QueryObserverGuard {
        self.cache
            .observe(&QueryKey::AllMarkets, Self::markets_options())
    }

    /// Per-symbol live updates, passed through to the repository seam
    pub fn subscribe_to_market(
        &self,
        symbol: &str,
        handler: MarketUpdateHandler,
    ) -> Result<MarketSubscription> {
        Ok(self.markets.subscribe_to_market(symbol, handler)?)
    }

    fn markets_options() -> QueryOptions {
        QueryOptions {
            stale_time: MARKETS_STALE_TIME,
            refetch_interval: Some(MARKETS_REFETCH_INTERVAL),
            retry: None,
        }
    }

    fn options_for(key: &QueryKey) -> QueryOptions {
        match key {
            QueryKey::AllMarkets => Self::markets_options(),
            QueryKey::MarketBySymbol(_) => QueryOptions::with_stale_time(MARKET_STALE_TIME),
            QueryKey::Assets => QueryOptions::with_stale_time(ASSETS_STALE_TIME),
            QueryKey::Trending => QueryOptions::with_stale_time(TRENDING_STALE_TIME),
        }
    }
}
