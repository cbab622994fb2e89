use async_trait::async_trait;
use log::{debug, warn};
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

use super::markets_constants::DEFAULT_SUBSCRIPTION_INTERVAL;
use super::markets_errors::{MarketError, Result};
use super::markets_model::{Market, MarketTrend, TrendPeriod};
use super::markets_traits::{MarketRepositoryTrait, MarketUpdateHandler};
use super::sources::CatalogSource;

/// Repository over a catalog source. The only component that talks to the
/// source directly.
pub struct MarketRepository {
    source: Arc<dyn CatalogSource>,
    subscription_interval: Duration,
}

impl MarketRepository {
    pub fn new(source: Arc<dyn CatalogSource>) -> Self {
        Self {
            source,
            subscription_interval: DEFAULT_SUBSCRIPTION_INTERVAL,
        }
    }

    pub fn with_subscription_interval(source: Arc<dyn CatalogSource>, interval: Duration) -> Self {
        Self {
            source,
            subscription_interval: interval,
        }
    }
}

#[async_trait]
impl MarketRepositoryTrait for MarketRepository {
    async fn get_markets(&self) -> Result<Vec<Market>> {
        self.source.fetch_all().await
    }

    async fn get_market_by_symbol(&self, symbol: &str) -> Result<Option<Market>> {
        self.source.fetch_by_symbol(symbol).await
    }

    async fn get_market_trend(&self, symbol: &str, period: TrendPeriod) -> Result<MarketTrend> {
        let market = self
            .source
            .fetch_by_symbol(symbol)
            .await?
            .ok_or_else(|| MarketError::NotFound(format!("market {}", symbol)))?;

        Ok(trend_over_history(&market, period))
    }

    fn subscribe_to_market(
        &self,
        symbol: &str,
        handler: MarketUpdateHandler,
    ) -> MarketSubscription {
        let live = Arc::new(AtomicBool::new(true));
        let flag = live.clone();
        let source = self.source.clone();
        let symbol = symbol.to_string();
        let tick = self.subscription_interval;

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(tick);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // interval fires immediately; consume that tick so the first
            // dispatch lands one full period in, like the original timer
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if !flag.load(Ordering::SeqCst) {
                    break;
                }
                let update = source.fetch_by_symbol(&symbol).await;
                // the fetch may have been in flight when unsubscribe ran;
                // re-check before dispatching
                if !flag.load(Ordering::SeqCst) {
                    break;
                }
                match update {
                    Ok(Some(market)) => handler(market),
                    Ok(None) => {}
                    Err(e) => warn!("market poll for {} failed: {}", symbol, e),
                }
            }
            debug!("market subscription for {} stopped", symbol);
        });

        MarketSubscription {
            live,
            task: Mutex::new(Some(task)),
        }
    }
}

/// Handle to a recurring market observation. Cancellation is a liveness
/// flag checked after every await inside the polling task, so no handler
/// invocation can happen once `unsubscribe` returns.
pub struct MarketSubscription {
    live: Arc<AtomicBool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl MarketSubscription {
    /// Idempotent; safe to call any number of times from any point in the
    /// subscription's lifetime, including before the first tick.
    pub fn unsubscribe(&self) {
        self.live.store(false, Ordering::SeqCst);
        if let Ok(mut guard) = self.task.lock() {
            if let Some(handle) = guard.take() {
                handle.abort();
            }
        }
    }

    pub fn is_active(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }
}

impl Drop for MarketSubscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

/// Aggregate over the trailing window anchored at the most recent history
/// point. Empty history degrades to the current price.
fn trend_over_history(market: &Market, period: TrendPeriod) -> MarketTrend {
    let latest = market.price_history.iter().map(|p| p.timestamp).max();

    let window: Vec<Decimal> = match latest {
        Some(latest) => {
            let cutoff = latest - period.window();
            market
                .price_history
                .iter()
                .filter(|p| p.timestamp >= cutoff)
                .map(|p| p.price)
                .collect()
        }
        None => Vec::new(),
    };

    if window.is_empty() {
        return MarketTrend {
            period,
            high: market.current_price,
            low: market.current_price,
            average: market.current_price,
        };
    }

    let high = window.iter().copied().max().unwrap_or(market.current_price);
    let low = window.iter().copied().min().unwrap_or(market.current_price);
    let sum: Decimal = window.iter().copied().sum();
    let average = sum / Decimal::from(window.len() as u64);

    MarketTrend {
        period,
        high,
        low,
        average,
    }
}
