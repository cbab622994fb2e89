pub(crate) mod markets_constants;
pub(crate) mod markets_errors;
pub(crate) mod markets_model;
pub(crate) mod markets_repository;
pub(crate) mod markets_service;
pub(crate) mod markets_traits;
pub(crate) mod sources;

// Re-export the public interface
pub use markets_constants::*;
pub use markets_model::{
    CardCondition, LiquidityRating, Listing, Market, MarketTrend, PricePoint, Rarity, RecentSale,
    TrendPeriod, Valuation, ValuationRating,
};
pub use markets_repository::{MarketRepository, MarketSubscription};
pub use markets_service::MarketService;
pub use markets_traits::{MarketRepositoryTrait, MarketUpdateHandler};
pub use sources::{CatalogSource, InMemoryCatalogSource};

// Re-export error types for convenience
pub use markets_errors::MarketError;
