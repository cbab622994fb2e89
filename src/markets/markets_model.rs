use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::markets_errors::MarketError;

/// Card rarity tags. The set is closed; anything else deserializes to
/// `Unknown`, which ranks lowest under rarity orderings instead of failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rarity {
    Common,
    Uncommon,
    Rare,
    DoubleRare,
    UltraRare,
    IllustrationRare,
    SpecialIllustrationRare,
    SecretRare,
    Promo,
    #[serde(other)]
    Unknown,
}

impl Rarity {
    /// Total order used by rarity sorts. Unranked tags sort as 0.
    pub fn rank(&self) -> u8 {
        match self {
            Rarity::Common => 1,
            Rarity::Uncommon => 2,
            Rarity::Rare => 3,
            Rarity::DoubleRare => 4,
            Rarity::UltraRare => 5,
            Rarity::IllustrationRare => 6,
            Rarity::SpecialIllustrationRare => 7,
            Rarity::SecretRare => 8,
            Rarity::Promo => 9,
            Rarity::Unknown => 0,
        }
    }
}

/// Physical card condition used on listings and sales
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CardCondition {
    M,
    NM,
    LP,
    MP,
    HP,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub id: String,
    pub seller_id: String,
    pub seller_name: String,
    pub price: Decimal,
    pub condition: CardCondition,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricePoint {
    pub timestamp: DateTime<Utc>,
    pub price: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentSale {
    pub price: Decimal,
    pub condition: CardCondition,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValuationRating {
    Undervalued,
    Fair,
    Overvalued,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LiquidityRating {
    Low,
    Medium,
    High,
}

/// Analyst-style score attached to some catalog entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Valuation {
    /// 0-100
    pub score: u8,
    pub rating: ValuationRating,
    pub liquidity: LiquidityRating,
}

/// Domain model representing one tradable card market
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Market {
    pub id: String,
    pub symbol: String,
    pub name: String,
    /// Value in integer VND
    pub current_price: Decimal,
    pub tcg_player_price: Option<Decimal>,
    pub card_market_price: Option<Decimal>,
    /// Signed percentage
    pub price_change_24h: Decimal,
    pub market_cap: Decimal,
    pub volume_24h: Decimal,
    pub supply: u64,
    pub rarity: Rarity,
    pub rarity_label: Option<String>,
    #[serde(default)]
    pub listings: Vec<Listing>,
    #[serde(default)]
    pub price_history: Vec<PricePoint>,
    #[serde(default)]
    pub recent_sales: Vec<RecentSale>,
    pub valuation: Option<Valuation>,
    pub listed_at: Option<DateTime<Utc>>,
    /// Externally supplied partition flag; never computed here
    #[serde(default)]
    pub is_trending: bool,
}

impl Market {
    /// Millisecond timestamp for date-based orderings. Entries without a
    /// listing date sort as epoch zero (oldest), never get dropped.
    pub fn listed_timestamp(&self) -> i64 {
        self.listed_at.map(|t| t.timestamp_millis()).unwrap_or(0)
    }
}

/// Aggregate over a market's price history for one trailing window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketTrend {
    pub period: TrendPeriod,
    pub high: Decimal,
    pub low: Decimal,
    pub average: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrendPeriod {
    #[serde(rename = "1h")]
    Hour1,
    #[serde(rename = "24h")]
    Hour24,
    #[serde(rename = "7d")]
    Day7,
}

impl TrendPeriod {
    pub fn window(&self) -> chrono::Duration {
        match self {
            TrendPeriod::Hour1 => chrono::Duration::hours(1),
            TrendPeriod::Hour24 => chrono::Duration::hours(24),
            TrendPeriod::Day7 => chrono::Duration::days(7),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TrendPeriod::Hour1 => "1h",
            TrendPeriod::Hour24 => "24h",
            TrendPeriod::Day7 => "7d",
        }
    }
}

impl fmt::Display for TrendPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrendPeriod {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1h" => Ok(TrendPeriod::Hour1),
            "24h" => Ok(TrendPeriod::Hour24),
            "7d" => Ok(TrendPeriod::Day7),
            other => Err(MarketError::InvalidArgument(format!(
                "unsupported trend period: {}",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn rarity_rank_table_is_total() {
        assert_eq!(Rarity::Common.rank(), 1);
        assert_eq!(Rarity::SecretRare.rank(), 8);
        assert_eq!(Rarity::Promo.rank(), 9);
        assert_eq!(Rarity::Unknown.rank(), 0);
        assert!(Rarity::SpecialIllustrationRare.rank() > Rarity::IllustrationRare.rank());
    }

    #[test]
    fn unrecognized_rarity_deserializes_to_unknown() {
        let rarity: Rarity = serde_json::from_str("\"secret_rare\"").unwrap();
        assert_eq!(rarity, Rarity::SecretRare);

        let rarity: Rarity = serde_json::from_str("\"holo_foil_ultra\"").unwrap();
        assert_eq!(rarity, Rarity::Unknown);
        assert_eq!(rarity.rank(), 0);
    }

    #[test]
    fn market_serializes_camel_case() {
        let market = Market {
            id: "1".to_string(),
            symbol: "PKU-VMAX-RB".to_string(),
            name: "Pikachu VMAX (Rainbow)".to_string(),
            current_price: dec!(5_500_000),
            tcg_player_price: None,
            card_market_price: None,
            price_change_24h: dec!(12.5),
            market_cap: dec!(550_000_000),
            volume_24h: dec!(12_000_000),
            supply: 100,
            rarity: Rarity::SecretRare,
            rarity_label: Some("Secret Rare".to_string()),
            listings: Vec::new(),
            price_history: Vec::new(),
            recent_sales: Vec::new(),
            valuation: None,
            listed_at: None,
            is_trending: false,
        };
        let json = serde_json::to_string(&market).unwrap();
        assert!(json.contains("\"currentPrice\""));
        assert!(json.contains("\"priceChange24h\""));
        assert!(json.contains("\"rarity\":\"secret_rare\""));
    }

    #[test]
    fn missing_listed_at_sorts_as_epoch_zero() {
        let market = Market {
            id: "x".to_string(),
            symbol: "X".to_string(),
            name: "X".to_string(),
            current_price: dec!(1),
            tcg_player_price: None,
            card_market_price: None,
            price_change_24h: dec!(0),
            market_cap: dec!(1),
            volume_24h: dec!(1),
            supply: 1,
            rarity: Rarity::Common,
            rarity_label: None,
            listings: Vec::new(),
            price_history: Vec::new(),
            recent_sales: Vec::new(),
            valuation: None,
            listed_at: None,
            is_trending: false,
        };
        assert_eq!(market.listed_timestamp(), 0);
    }

    #[test]
    fn trend_period_parses_known_values_only() {
        assert_eq!("1h".parse::<TrendPeriod>().unwrap(), TrendPeriod::Hour1);
        assert_eq!("24h".parse::<TrendPeriod>().unwrap(), TrendPeriod::Hour24);
        assert_eq!("7d".parse::<TrendPeriod>().unwrap(), TrendPeriod::Day7);
        assert!(matches!(
            "3m".parse::<TrendPeriod>(),
            Err(MarketError::InvalidArgument(_))
        ));
    }
}
