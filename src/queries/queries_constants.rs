use std::time::Duration;

/// Per-key cache tuning, mirroring the dashboard's query hooks

pub const MARKETS_STALE_TIME: Duration = Duration::from_secs(30);
pub const MARKETS_REFETCH_INTERVAL: Duration = Duration::from_secs(60);

pub const MARKET_STALE_TIME: Duration = Duration::from_secs(30);

pub const ASSETS_STALE_TIME: Duration = Duration::from_secs(60);

pub const TRENDING_STALE_TIME: Duration = Duration::from_secs(300);
