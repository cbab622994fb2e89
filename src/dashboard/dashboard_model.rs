use serde::{Deserialize, Serialize};

use crate::markets::Rarity;

/// The six dashboard orderings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOption {
    PriceAsc,
    PriceDesc,
    RarityAsc,
    RarityDesc,
    #[default]
    DateNewest,
    DateOldest,
}

/// Dashboard tab partition. `Hot` keeps trending entries only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarketTab {
    #[default]
    Hot,
    Normal,
}

/// Complete input of the derived view: the projection is a pure function of
/// the catalog snapshot and this filter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketFilter {
    /// Case-insensitive substring matched against name or symbol
    pub search: String,
    /// Empty selection filters nothing
    pub rarities: Vec<Rarity>,
    pub tab: MarketTab,
    pub sort: SortOption,
}
