pub(crate) mod dashboard_model;
pub(crate) mod dashboard_service;

// Re-export the public interface
pub use dashboard_model::{MarketFilter, MarketTab, SortOption};
pub use dashboard_service::{filter_markets, sort_markets, DashboardView};
