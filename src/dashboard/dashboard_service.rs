use log::debug;
use std::sync::Arc;

use super::dashboard_model::{MarketFilter, MarketTab, SortOption};
use crate::markets::Market;

/// Pure projection pipeline. Stage order matters: search, then rarity, then
/// tab partition, then the stable sort.
pub fn filter_markets(markets: &[Market], filter: &MarketFilter) -> Vec<Market> {
    let needle = filter.search.trim().to_lowercase();

    let mut result: Vec<Market> = markets
        .iter()
        .filter(|m| {
            needle.is_empty()
                || m.name.to_lowercase().contains(&needle)
                || m.symbol.to_lowercase().contains(&needle)
        })
        .filter(|m| filter.rarities.is_empty() || filter.rarities.contains(&m.rarity))
        .filter(|m| match filter.tab {
            MarketTab::Hot => m.is_trending,
            MarketTab::Normal => true,
        })
        .cloned()
        .collect();

    sort_markets(&mut result, filter.sort);
    result
}

/// Stable sort under every ordering: equal keys keep their incoming order.
pub fn sort_markets(markets: &mut [Market], sort: SortOption) {
    match sort {
        SortOption::PriceAsc => {
            markets.sort_by(|a, b| a.current_price.cmp(&b.current_price));
        }
        SortOption::PriceDesc => {
            markets.sort_by(|a, b| b.current_price.cmp(&a.current_price));
        }
        SortOption::RarityAsc => {
            markets.sort_by(|a, b| a.rarity.rank().cmp(&b.rarity.rank()));
        }
        SortOption::RarityDesc => {
            markets.sort_by(|a, b| b.rarity.rank().cmp(&a.rarity.rank()));
        }
        SortOption::DateNewest => {
            markets.sort_by(|a, b| b.listed_timestamp().cmp(&a.listed_timestamp()));
        }
        SortOption::DateOldest => {
            markets.sort_by(|a, b| a.listed_timestamp().cmp(&b.listed_timestamp()));
        }
    }
}

/// Memoized projection over the cached catalog. Recomputes only when the
/// catalog snapshot version or the filter changes; a repeated call returns
/// the same `Arc`.
#[derive(Default)]
pub struct DashboardView {
    memo: Option<ViewMemo>,
}

struct ViewMemo {
    version: u64,
    filter: MarketFilter,
    result: Arc<Vec<Market>>,
}

impl DashboardView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn project(
        &mut self,
        version: u64,
        markets: &[Market],
        filter: &MarketFilter,
    ) -> Arc<Vec<Market>> {
        if let Some(memo) = &self.memo {
            if memo.version == version && memo.filter == *filter {
                return memo.result.clone();
            }
        }
        debug!(
            "recomputing dashboard projection for catalog version {}",
            version
        );
        let result = Arc::new(filter_markets(markets, filter));
        self.memo = Some(ViewMemo {
            version,
            filter: filter.clone(),
            result: result.clone(),
        });
        result
    }
}
