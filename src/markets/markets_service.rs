use lazy_static::lazy_static;
use log::{debug, error};
use regex::Regex;
use std::sync::Arc;

use super::markets_errors::{MarketError, Result};
use super::markets_model::{Market, MarketTrend, TrendPeriod};
use super::markets_repository::MarketSubscription;
use super::markets_traits::{MarketRepositoryTrait, MarketUpdateHandler};

lazy_static! {
    static ref SYMBOL_PATTERN: Regex =
        Regex::new(r"^[A-Z0-9][A-Z0-9-]*$").expect("symbol pattern");
}

/// Business rules over the repository. This layer is the translation
/// boundary: repository and source error shapes never leak past it, only
/// `NotFound`, `InvalidArgument` and `FetchFailed`.
pub struct MarketService {
    repository: Arc<dyn MarketRepositoryTrait>,
}

impl MarketService {
    pub fn new(repository: Arc<dyn MarketRepositoryTrait>) -> Self {
        Self { repository }
    }

    /// Full catalog sorted by market cap, highest first. The sort is stable,
    /// so ties keep their repository order.
    pub async fn get_markets(&self) -> Result<Vec<Market>> {
        let mut markets = self.repository.get_markets().await.map_err(|e| {
            error!("failed to fetch markets: {}", e);
            MarketError::FetchFailed(e.to_string())
        })?;
        markets.sort_by(|a, b| b.market_cap.cmp(&a.market_cap));
        Ok(markets)
    }

    /// Lookup by symbol. Input is validated and normalized before any
    /// repository call; a miss is `Ok(None)`.
    pub async fn get_market_by_symbol(&self, symbol: &str) -> Result<Option<Market>> {
        let normalized = self.normalize_symbol(symbol)?;
        self.repository
            .get_market_by_symbol(&normalized)
            .await
            .map_err(|e| {
                error!("failed to fetch market {}: {}", normalized, e);
                MarketError::FetchFailed(e.to_string())
            })
    }

    /// Trend aggregate for one symbol. `NotFound` passes through; other
    /// repository failures become `FetchFailed`.
    pub async fn get_market_trend(
        &self,
        symbol: &str,
        period: TrendPeriod,
    ) -> Result<MarketTrend> {
        let normalized = self.normalize_symbol(symbol)?;
        self.repository
            .get_market_trend(&normalized, period)
            .await
            .map_err(|e| match e {
                MarketError::NotFound(_) => e,
                other => {
                    error!("failed to fetch trend for {}: {}", normalized, other);
                    MarketError::FetchFailed(other.to_string())
                }
            })
    }

    /// Markets carrying the trending flag, market-cap order preserved.
    pub async fn get_trending(&self) -> Result<Vec<Market>> {
        let markets = self.get_markets().await?;
        Ok(markets.into_iter().filter(|m| m.is_trending).collect())
    }

    pub fn subscribe_to_market(
        &self,
        symbol: &str,
        handler: MarketUpdateHandler,
    ) -> Result<MarketSubscription> {
        let normalized = self.normalize_symbol(symbol)?;
        debug!("subscribing to market {}", normalized);
        Ok(self.repository.subscribe_to_market(&normalized, handler))
    }

    /// Trim + uppercase; rejects empty and malformed input before any I/O.
    /// The query layer also keys cache entries by this normal form so case
    /// variants collapse onto one entry.
    pub fn normalize_symbol(&self, raw: &str) -> Result<String> {
        let normalized = raw.trim().to_uppercase();
        if normalized.is_empty() {
            return Err(MarketError::InvalidArgument("symbol is required".to_string()));
        }
        if !SYMBOL_PATTERN.is_match(&normalized) {
            return Err(MarketError::InvalidArgument(format!(
                "malformed symbol: {}",
                raw.trim()
            )));
        }
        Ok(normalized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use crate::markets::markets_model::Rarity;

    fn test_market(id: &str, symbol: &str, market_cap: Decimal) -> Market {
        Market {
            id: id.to_string(),
            symbol: symbol.to_string(),
            name: format!("Card {}", id),
            current_price: dec!(1_000),
            tcg_player_price: None,
            card_market_price: None,
            price_change_24h: dec!(0),
            market_cap,
            volume_24h: dec!(0),
            supply: 1,
            rarity: Rarity::Common,
            rarity_label: None,
            listings: Vec::new(),
            price_history: Vec::new(),
            recent_sales: Vec::new(),
            valuation: None,
            listed_at: None,
            is_trending: false,
        }
    }

    // --- Mock repository ---
    struct MockMarketRepository {
        markets: Vec<Market>,
        fail: bool,
        get_markets_calls: AtomicUsize,
        get_by_symbol_calls: AtomicUsize,
        last_symbol: Mutex<Option<String>>,
    }

    impl MockMarketRepository {
        fn with_markets(markets: Vec<Market>) -> Self {
            Self {
                markets,
                fail: false,
                get_markets_calls: AtomicUsize::new(0),
                get_by_symbol_calls: AtomicUsize::new(0),
                last_symbol: Mutex::new(None),
            }
        }

        fn failing() -> Self {
            Self {
                markets: Vec::new(),
                fail: true,
                get_markets_calls: AtomicUsize::new(0),
                get_by_symbol_calls: AtomicUsize::new(0),
                last_symbol: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl MarketRepositoryTrait for MockMarketRepository {
        async fn get_markets(&self) -> Result<Vec<Market>> {
            self.get_markets_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(MarketError::Source("connection reset".to_string()));
            }
            Ok(self.markets.clone())
        }

        async fn get_market_by_symbol(&self, symbol: &str) -> Result<Option<Market>> {
            self.get_by_symbol_calls.fetch_add(1, Ordering::SeqCst);
            *self.last_symbol.lock().unwrap() = Some(symbol.to_string());
            if self.fail {
                return Err(MarketError::Source("connection reset".to_string()));
            }
            Ok(self.markets.iter().find(|m| m.symbol == symbol).cloned())
        }

        async fn get_market_trend(
            &self,
            _symbol: &str,
            _period: TrendPeriod,
        ) -> Result<MarketTrend> {
            Err(MarketError::NotFound("no trend".to_string()))
        }

        fn subscribe_to_market(
            &self,
            _symbol: &str,
            _handler: MarketUpdateHandler,
        ) -> MarketSubscription {
            unimplemented!("not exercised by these tests")
        }
    }

    #[tokio::test]
    async fn markets_sorted_by_cap_descending_with_stable_ties() {
        let repo = Arc::new(MockMarketRepository::with_markets(vec![
            test_market("a", "AAA", dec!(100)),
            test_market("b", "BBB", dec!(500)),
            test_market("c", "CCC", dec!(500)),
            test_market("d", "DDD", dec!(200)),
        ]));
        let service = MarketService::new(repo);

        let sorted = service.get_markets().await.unwrap();
        let ids: Vec<_> = sorted.iter().map(|m| m.id.as_str()).collect();
        // b and c tie on cap and keep their repository order
        assert_eq!(ids, vec!["b", "c", "d", "a"]);
    }

    #[tokio::test]
    async fn empty_symbol_fails_before_any_repository_call() {
        let repo = Arc::new(MockMarketRepository::with_markets(Vec::new()));
        let service = MarketService::new(repo.clone());

        for raw in ["", "   ", "\t\n"] {
            let err = service.get_market_by_symbol(raw).await.unwrap_err();
            assert!(matches!(err, MarketError::InvalidArgument(_)), "{:?}", raw);
        }
        assert_eq!(repo.get_by_symbol_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn malformed_symbol_is_rejected_pre_io() {
        let repo = Arc::new(MockMarketRepository::with_markets(Vec::new()));
        let service = MarketService::new(repo.clone());

        let err = service.get_market_by_symbol("PKU VMAX!").await.unwrap_err();
        assert!(matches!(err, MarketError::InvalidArgument(_)));
        assert_eq!(repo.get_by_symbol_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn symbol_is_normalized_before_lookup() {
        let repo = Arc::new(MockMarketRepository::with_markets(vec![test_market(
            "a",
            "PKU-VMAX-RB",
            dec!(1),
        )]));
        let service = MarketService::new(repo.clone());

        let market = service
            .get_market_by_symbol("  pku-vmax-rb ")
            .await
            .unwrap();
        assert!(market.is_some());
        assert_eq!(
            repo.last_symbol.lock().unwrap().as_deref(),
            Some("PKU-VMAX-RB")
        );
    }

    #[tokio::test]
    async fn unknown_symbol_is_none() {
        let repo = Arc::new(MockMarketRepository::with_markets(Vec::new()));
        let service = MarketService::new(repo);

        let market = service.get_market_by_symbol("ZZZ-404").await.unwrap();
        assert!(market.is_none());
    }

    #[tokio::test]
    async fn repository_failures_surface_as_fetch_failed() {
        let service = MarketService::new(Arc::new(MockMarketRepository::failing()));

        let err = service.get_markets().await.unwrap_err();
        assert!(matches!(err, MarketError::FetchFailed(_)));

        let err = service.get_market_by_symbol("AAA").await.unwrap_err();
        assert!(matches!(err, MarketError::FetchFailed(_)));
    }

    #[tokio::test]
    async fn trending_filter_preserves_cap_order() {
        let mut hot_small = test_market("a", "AAA", dec!(100));
        hot_small.is_trending = true;
        let mut hot_big = test_market("b", "BBB", dec!(900));
        hot_big.is_trending = true;
        let cold = test_market("c", "CCC", dec!(500));

        let repo = Arc::new(MockMarketRepository::with_markets(vec![
            hot_small, hot_big, cold,
        ]));
        let service = MarketService::new(repo);

        let trending = service.get_trending().await.unwrap();
        let ids: Vec<_> = trending.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }
}
