use async_trait::async_trait;
use std::sync::Arc;

use super::markets_errors::Result;
use super::markets_model::{Market, MarketTrend, TrendPeriod};
use super::markets_repository::MarketSubscription;

/// Callback invoked with a fresh snapshot on every subscription tick
pub type MarketUpdateHandler = Arc<dyn Fn(Market) + Send + Sync>;

/// The transport seam. A real streaming backend replaces the in-memory
/// implementation behind this trait without touching anything downstream:
/// signatures, `None`-on-miss semantics and the cancellation guarantees of
/// [`MarketSubscription`] are the contract.
#[async_trait]
pub trait MarketRepositoryTrait: Send + Sync {
    /// Full catalog, unfiltered, in source order.
    async fn get_markets(&self) -> Result<Vec<Market>>;

    /// Exact-symbol lookup. `Ok(None)` on a miss, never an error.
    async fn get_market_by_symbol(&self, symbol: &str) -> Result<Option<Market>>;

    /// Aggregate over the market's price history for the trailing period.
    /// Fails with `NotFound` when the symbol is unknown.
    async fn get_market_trend(&self, symbol: &str, period: TrendPeriod) -> Result<MarketTrend>;

    /// Recurring observation of one symbol. The handler fires at most once
    /// per tick and never after the subscription is cancelled.
    fn subscribe_to_market(&self, symbol: &str, handler: MarketUpdateHandler)
        -> MarketSubscription;
}
