use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::markets::Rarity;

/// A card position held by the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub id: String,
    pub symbol: String,
    pub name: String,
    pub amount: u32,
    pub value: Decimal,
    pub rarity: Rarity,
    pub rarity_label: Option<String>,
}

/// Input model for creating an asset; the id is assigned by the service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAsset {
    pub symbol: String,
    pub name: String,
    pub amount: u32,
    pub value: Decimal,
    pub rarity: Rarity,
    pub rarity_label: Option<String>,
}

/// Partial update applied by symbol; `None` fields are left untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetUpdate {
    pub name: Option<String>,
    pub amount: Option<u32>,
    pub value: Option<Decimal>,
}
