use std::time::Duration;

/// Simulated catalog round-trip latency
pub const DEFAULT_CATALOG_LATENCY: Duration = Duration::from_millis(800);

/// Tick interval for per-market subscriptions
pub const DEFAULT_SUBSCRIPTION_INTERVAL: Duration = Duration::from_secs(5);

/// Number of seeded catalog entries
pub const SEED_CATALOG_SIZE: usize = 20;
