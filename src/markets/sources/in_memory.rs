use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::time::Duration;

use super::CatalogSource;
use crate::markets::markets_constants::DEFAULT_CATALOG_LATENCY;
use crate::markets::markets_errors::Result;
use crate::markets::markets_model::{
    CardCondition, LiquidityRating, Listing, Market, PricePoint, Rarity, RecentSale, Valuation,
    ValuationRating,
};

/// Deterministic in-memory catalog standing in for a real market feed.
/// Content is fixed per process; only the simulated latency is tunable.
pub struct InMemoryCatalogSource {
    latency: Duration,
}

impl InMemoryCatalogSource {
    pub fn new() -> Self {
        Self {
            latency: DEFAULT_CATALOG_LATENCY,
        }
    }

    /// Zero or near-zero latency variant for tests.
    pub fn with_latency(latency: Duration) -> Self {
        Self { latency }
    }
}

impl Default for InMemoryCatalogSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CatalogSource for InMemoryCatalogSource {
    async fn fetch_all(&self) -> Result<Vec<Market>> {
        tokio::time::sleep(self.latency).await;
        Ok(SEED_CATALOG.clone())
    }

    async fn fetch_by_symbol(&self, symbol: &str) -> Result<Option<Market>> {
        tokio::time::sleep(self.latency).await;
        Ok(SEED_CATALOG.iter().find(|m| m.symbol == symbol).cloned())
    }
}

fn ts(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .expect("seed timestamp")
        .with_timezone(&Utc)
}

struct SeedCard {
    id: &'static str,
    symbol: &'static str,
    name: &'static str,
    current_price: Decimal,
    price_change_24h: Decimal,
    tcg_player_price: Decimal,
    card_market_price: Decimal,
    rarity: Rarity,
    rarity_label: &'static str,
    market_cap: Decimal,
    volume_24h: Decimal,
    supply: u64,
    listed_at: Option<&'static str>,
    is_trending: bool,
}

impl SeedCard {
    fn build(self) -> Market {
        Market {
            id: self.id.to_string(),
            symbol: self.symbol.to_string(),
            name: self.name.to_string(),
            current_price: self.current_price,
            tcg_player_price: Some(self.tcg_player_price),
            card_market_price: Some(self.card_market_price),
            price_change_24h: self.price_change_24h,
            market_cap: self.market_cap,
            volume_24h: self.volume_24h,
            supply: self.supply,
            rarity: self.rarity,
            rarity_label: Some(self.rarity_label.to_string()),
            listings: Vec::new(),
            price_history: Vec::new(),
            recent_sales: Vec::new(),
            valuation: None,
            listed_at: self.listed_at.map(ts),
            is_trending: self.is_trending,
        }
    }
}

fn seed_listings() -> Vec<Listing> {
    vec![
        Listing {
            id: "l1".to_string(),
            seller_id: "s1".to_string(),
            seller_name: "Satoshi".to_string(),
            price: dec!(2_500_000),
            condition: CardCondition::M,
            timestamp: ts("2024-02-09T10:00:00Z"),
        },
        Listing {
            id: "l2".to_string(),
            seller_id: "s2".to_string(),
            seller_name: "Kasumi".to_string(),
            price: dec!(2_450_000),
            condition: CardCondition::NM,
            timestamp: ts("2024-02-09T11:00:00Z"),
        },
    ]
}

fn seed_history(points: &[(&'static str, Decimal)]) -> Vec<PricePoint> {
    points
        .iter()
        .map(|(when, price)| PricePoint {
            timestamp: ts(when),
            price: *price,
        })
        .collect()
}

fn build_catalog() -> Vec<Market> {
    let cards = vec![
        SeedCard {
            id: "1",
            symbol: "PKU-VMAX-RB",
            name: "Pikachu VMAX (Rainbow)",
            current_price: dec!(5_500_000),
            price_change_24h: dec!(12.5),
            tcg_player_price: dec!(5_600_000),
            card_market_price: dec!(5_400_000),
            rarity: Rarity::SecretRare,
            rarity_label: "Secret Rare",
            market_cap: dec!(550_000_000),
            volume_24h: dec!(12_000_000),
            supply: 100,
            listed_at: Some("2024-02-10T09:00:00Z"),
            is_trending: false,
        },
        SeedCard {
            id: "2",
            symbol: "CRZ-GX-SH",
            name: "Charizard GX (Shiny)",
            current_price: dec!(8_500_000),
            price_change_24h: dec!(5.2),
            tcg_player_price: dec!(8_800_000),
            card_market_price: dec!(8_200_000),
            rarity: Rarity::SecretRare,
            rarity_label: "Shiny Rare",
            market_cap: dec!(850_000_000),
            volume_24h: dec!(15_000_000),
            supply: 80,
            listed_at: Some("2024-02-09T15:30:00Z"),
            is_trending: false,
        },
        SeedCard {
            id: "3",
            symbol: "LU-V-ALT",
            name: "Lugia V (Alt Art)",
            current_price: dec!(4_200_000),
            price_change_24h: dec!(8.4),
            tcg_player_price: dec!(4_350_000),
            card_market_price: dec!(4_100_000),
            rarity: Rarity::SpecialIllustrationRare,
            rarity_label: "Alt Art",
            market_cap: dec!(420_000_000),
            volume_24h: dec!(9_000_000),
            supply: 150,
            listed_at: Some("2024-02-08T10:15:00Z"),
            is_trending: false,
        },
        SeedCard {
            id: "4",
            symbol: "UMB-VMAX-ALT",
            name: "Moonbreon (Umbreon VMAX)",
            current_price: dec!(12_500_000),
            price_change_24h: dec!(15.3),
            tcg_player_price: dec!(13_000_000),
            card_market_price: dec!(12_000_000),
            rarity: Rarity::SpecialIllustrationRare,
            rarity_label: "Secret Rare",
            market_cap: dec!(1_250_000_000),
            volume_24h: dec!(25_000_000),
            supply: 50,
            listed_at: Some("2024-02-10T08:00:00Z"),
            is_trending: true,
        },
        SeedCard {
            id: "5",
            symbol: "GIR-V-ALT",
            name: "Giratina V (Lost Origin)",
            current_price: dec!(6_800_000),
            price_change_24h: dec!(-2.1),
            tcg_player_price: dec!(7_000_000),
            card_market_price: dec!(6_600_000),
            rarity: Rarity::SpecialIllustrationRare,
            rarity_label: "Alt Art",
            market_cap: dec!(680_000_000),
            volume_24h: dec!(11_000_000),
            supply: 90,
            listed_at: Some("2024-02-05T14:20:00Z"),
            is_trending: false,
        },
        SeedCard {
            id: "6",
            symbol: "MEW-VSTAR-RB",
            name: "Mewtwo VSTAR (Rainbow)",
            current_price: dec!(2_800_000),
            price_change_24h: dec!(3.2),
            tcg_player_price: dec!(2_900_000),
            card_market_price: dec!(2_750_000),
            rarity: Rarity::SecretRare,
            rarity_label: "Hyper Rare",
            market_cap: dec!(280_000_000),
            volume_24h: dec!(5_000_000),
            supply: 300,
            listed_at: Some("2024-02-07T11:45:00Z"),
            is_trending: false,
        },
        SeedCard {
            id: "7",
            symbol: "KOR-EX-ART",
            name: "Koraidon ex (Art)",
            current_price: dec!(1_200_000),
            price_change_24h: dec!(4.5),
            tcg_player_price: dec!(1_300_000),
            card_market_price: dec!(1_100_000),
            rarity: Rarity::IllustrationRare,
            rarity_label: "Illustration Rare",
            market_cap: dec!(120_000_000),
            volume_24h: dec!(6_000_000),
            supply: 250,
            listed_at: Some("2024-02-06T09:30:00Z"),
            is_trending: false,
        },
        SeedCard {
            id: "8",
            symbol: "ION-SIR",
            name: "Iono (Trainer)",
            current_price: dec!(3_500_000),
            price_change_24h: dec!(15.5),
            tcg_player_price: dec!(3_600_000),
            card_market_price: dec!(3_450_000),
            rarity: Rarity::SpecialIllustrationRare,
            rarity_label: "Special Illustration Rare",
            market_cap: dec!(350_000_000),
            volume_24h: dec!(8_000_000),
            supply: 150,
            listed_at: Some("2024-02-10T08:30:00Z"),
            is_trending: true,
        },
        SeedCard {
            id: "9",
            symbol: "CRZ-CLS",
            name: "Charizard (Classic)",
            current_price: dec!(4_500_000),
            price_change_24h: dec!(1.8),
            tcg_player_price: dec!(4_600_000),
            card_market_price: dec!(4_400_000),
            rarity: Rarity::IllustrationRare,
            rarity_label: "Classic Collection",
            market_cap: dec!(450_000_000),
            volume_24h: dec!(4_500_000),
            supply: 200,
            listed_at: Some("2024-01-20T16:00:00Z"),
            is_trending: false,
        },
        SeedCard {
            id: "10",
            symbol: "LUC-VSTAR",
            name: "Lucario VSTAR",
            current_price: dec!(1_200_000),
            price_change_24h: dec!(6.7),
            tcg_player_price: dec!(1_300_000),
            card_market_price: dec!(1_150_000),
            rarity: Rarity::UltraRare,
            rarity_label: "VSTAR Rare",
            market_cap: dec!(120_000_000),
            volume_24h: dec!(3_500_000),
            supply: 500,
            listed_at: None,
            is_trending: false,
        },
        SeedCard {
            id: "11",
            symbol: "GYR-HOLO",
            name: "Gyarados (Holo)",
            current_price: dec!(850_000),
            price_change_24h: dec!(2.1),
            tcg_player_price: dec!(900_000),
            card_market_price: dec!(820_000),
            rarity: Rarity::Rare,
            rarity_label: "Holo Rare",
            market_cap: dec!(85_000_000),
            volume_24h: dec!(2_000_000),
            supply: 1000,
            listed_at: None,
            is_trending: false,
        },
        SeedCard {
            id: "12",
            symbol: "DRA-HOLO",
            name: "Dragonite (Holo)",
            current_price: dec!(920_000),
            price_change_24h: dec!(1.5),
            tcg_player_price: dec!(950_000),
            card_market_price: dec!(900_000),
            rarity: Rarity::Rare,
            rarity_label: "Holo Rare",
            market_cap: dec!(92_000_000),
            volume_24h: dec!(2_200_000),
            supply: 900,
            listed_at: None,
            is_trending: false,
        },
        SeedCard {
            id: "13",
            symbol: "SNO-REV",
            name: "Snorlax (Reverse Holo)",
            current_price: dec!(450_000),
            price_change_24h: dec!(-0.5),
            tcg_player_price: dec!(480_000),
            card_market_price: dec!(430_000),
            rarity: Rarity::Rare,
            rarity_label: "Reverse Holo",
            market_cap: dec!(45_000_000),
            volume_24h: dec!(1_500_000),
            supply: 2000,
            listed_at: None,
            is_trending: false,
        },
        SeedCard {
            id: "14",
            symbol: "EEV-PRO",
            name: "Eevee (Promo)",
            current_price: dec!(650_000),
            price_change_24h: dec!(4.2),
            tcg_player_price: dec!(700_000),
            card_market_price: dec!(620_000),
            rarity: Rarity::Promo,
            rarity_label: "Black Star Promo",
            market_cap: dec!(65_000_000),
            volume_24h: dec!(1_800_000),
            supply: 1500,
            listed_at: None,
            is_trending: false,
        },
        SeedCard {
            id: "15",
            symbol: "MIM-RARE",
            name: "Mimikyu (Rare)",
            current_price: dec!(550_000),
            price_change_24h: dec!(3.1),
            tcg_player_price: dec!(580_000),
            card_market_price: dec!(530_000),
            rarity: Rarity::Rare,
            rarity_label: "Rare",
            market_cap: dec!(55_000_000),
            volume_24h: dec!(1_600_000),
            supply: 1800,
            listed_at: None,
            is_trending: false,
        },
        SeedCard {
            id: "16",
            symbol: "PIK-COM",
            name: "Pikachu (Common)",
            current_price: dec!(150_000),
            price_change_24h: dec!(1.1),
            tcg_player_price: dec!(160_000),
            card_market_price: dec!(145_000),
            rarity: Rarity::Common,
            rarity_label: "Common",
            market_cap: dec!(15_000_000),
            volume_24h: dec!(800_000),
            supply: 5000,
            listed_at: None,
            is_trending: false,
        },
        SeedCard {
            id: "17",
            symbol: "CHA-COM",
            name: "Charmander",
            current_price: dec!(120_000),
            price_change_24h: dec!(0.5),
            tcg_player_price: dec!(130_000),
            card_market_price: dec!(115_000),
            rarity: Rarity::Common,
            rarity_label: "Common",
            market_cap: dec!(12_000_000),
            volume_24h: dec!(750_000),
            supply: 5500,
            listed_at: None,
            is_trending: false,
        },
        SeedCard {
            id: "18",
            symbol: "SQU-COM",
            name: "Squirtle",
            current_price: dec!(115_000),
            price_change_24h: dec!(0.8),
            tcg_player_price: dec!(125_000),
            card_market_price: dec!(110_000),
            rarity: Rarity::Common,
            rarity_label: "Common",
            market_cap: dec!(11_500_000),
            volume_24h: dec!(700_000),
            supply: 5600,
            listed_at: None,
            is_trending: false,
        },
        SeedCard {
            id: "19",
            symbol: "BUL-COM",
            name: "Bulbasaur",
            current_price: dec!(110_000),
            price_change_24h: dec!(0.6),
            tcg_player_price: dec!(120_000),
            card_market_price: dec!(105_000),
            rarity: Rarity::Common,
            rarity_label: "Common",
            market_cap: dec!(11_000_000),
            volume_24h: dec!(680_000),
            supply: 5700,
            listed_at: None,
            is_trending: false,
        },
        SeedCard {
            id: "20",
            symbol: "MAG-COM",
            name: "Magikarp",
            current_price: dec!(50_000),
            price_change_24h: dec!(10.5),
            tcg_player_price: dec!(55_000),
            card_market_price: dec!(48_000),
            rarity: Rarity::Common,
            rarity_label: "Common",
            market_cap: dec!(5_000_000),
            volume_24h: dec!(1_000_000),
            supply: 10000,
            listed_at: None,
            is_trending: true,
        },
    ];

    let mut catalog: Vec<Market> = cards.into_iter().map(SeedCard::build).collect();

    // Order book, trade tape and valuations only exist for the headline cards
    catalog[0].listings = seed_listings();
    catalog[0].price_history = seed_history(&[
        ("2024-02-04T09:00:00Z", dec!(4_900_000)),
        ("2024-02-06T09:00:00Z", dec!(5_050_000)),
        ("2024-02-08T09:00:00Z", dec!(5_200_000)),
        ("2024-02-09T21:00:00Z", dec!(5_350_000)),
        ("2024-02-10T09:00:00Z", dec!(5_500_000)),
    ]);
    catalog[0].recent_sales = vec![
        RecentSale {
            price: dec!(5_400_000),
            condition: CardCondition::NM,
            timestamp: ts("2024-02-09T18:00:00Z"),
        },
        RecentSale {
            price: dec!(5_500_000),
            condition: CardCondition::M,
            timestamp: ts("2024-02-10T08:45:00Z"),
        },
    ];
    catalog[0].valuation = Some(Valuation {
        score: 82,
        rating: ValuationRating::Fair,
        liquidity: LiquidityRating::High,
    });

    catalog[1].price_history = seed_history(&[
        ("2024-02-03T12:00:00Z", dec!(8_900_000)),
        ("2024-02-06T12:00:00Z", dec!(8_700_000)),
        ("2024-02-09T12:00:00Z", dec!(8_500_000)),
    ]);
    catalog[1].valuation = Some(Valuation {
        score: 64,
        rating: ValuationRating::Overvalued,
        liquidity: LiquidityRating::Medium,
    });

    catalog[3].price_history = seed_history(&[
        ("2024-02-03T08:00:00Z", dec!(10_800_000)),
        ("2024-02-07T08:00:00Z", dec!(11_600_000)),
        ("2024-02-10T08:00:00Z", dec!(12_500_000)),
    ]);
    catalog[3].recent_sales = vec![RecentSale {
        price: dec!(12_200_000),
        condition: CardCondition::M,
        timestamp: ts("2024-02-09T20:30:00Z"),
    }];
    catalog[3].valuation = Some(Valuation {
        score: 91,
        rating: ValuationRating::Undervalued,
        liquidity: LiquidityRating::High,
    });

    catalog
}

lazy_static! {
    static ref SEED_CATALOG: Vec<Market> = build_catalog();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markets::markets_constants::SEED_CATALOG_SIZE;

    fn source() -> InMemoryCatalogSource {
        InMemoryCatalogSource::with_latency(Duration::ZERO)
    }

    #[tokio::test]
    async fn fetch_all_returns_full_catalog() {
        let markets = source().fetch_all().await.unwrap();
        assert_eq!(markets.len(), SEED_CATALOG_SIZE);

        let trending: Vec<_> = markets.iter().filter(|m| m.is_trending).collect();
        assert_eq!(trending.len(), 3);
    }

    #[tokio::test]
    async fn catalog_is_deterministic_across_fetches() {
        let src = source();
        let first = src.fetch_all().await.unwrap();
        let second = src.fetch_all().await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn fetch_by_symbol_is_exact_match() {
        let src = source();
        let market = src.fetch_by_symbol("UMB-VMAX-ALT").await.unwrap();
        assert_eq!(market.unwrap().name, "Moonbreon (Umbreon VMAX)");

        // lowercase is not normalized here; that is the service's job
        assert!(src.fetch_by_symbol("umb-vmax-alt").await.unwrap().is_none());
        assert!(src.fetch_by_symbol("NOPE-404").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn seed_invariants_hold() {
        let markets = source().fetch_all().await.unwrap();
        let mut ids: Vec<_> = markets.iter().map(|m| m.id.clone()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), SEED_CATALOG_SIZE);

        let mut symbols: Vec<_> = markets.iter().map(|m| m.symbol.clone()).collect();
        symbols.sort();
        symbols.dedup();
        assert_eq!(symbols.len(), SEED_CATALOG_SIZE);

        assert!(markets.iter().all(|m| m.current_price >= Decimal::ZERO));
        let dated = markets.iter().filter(|m| m.listed_at.is_some()).count();
        assert_eq!(dated, 9);
    }
}
