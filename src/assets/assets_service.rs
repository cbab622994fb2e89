use log::debug;
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

use super::assets_errors::{AssetError, Result};
use super::assets_model::{Asset, AssetUpdate, NewAsset};
use super::assets_traits::AssetRepositoryTrait;

/// Service for managing held assets. This is the mutation side of the core:
/// the query layer invalidates its `Assets` entry after each success here.
pub struct AssetService {
    repository: Arc<dyn AssetRepositoryTrait>,
}

impl AssetService {
    pub fn new(repository: Arc<dyn AssetRepositoryTrait>) -> Self {
        Self { repository }
    }

    /// Lists all held assets
    pub fn get_assets(&self) -> Result<Vec<Asset>> {
        self.repository.list()
    }

    pub fn get_asset_by_symbol(&self, symbol: &str) -> Result<Option<Asset>> {
        self.repository.get_by_symbol(&normalize(symbol))
    }

    /// Validates and stores a new asset, assigning its id
    pub fn add_asset(&self, new_asset: NewAsset) -> Result<Asset> {
        let symbol = normalize(&new_asset.symbol);
        if symbol.is_empty() {
            return Err(AssetError::InvalidData("symbol is required".to_string()));
        }
        if new_asset.name.trim().is_empty() {
            return Err(AssetError::InvalidData("name is required".to_string()));
        }
        if new_asset.amount == 0 {
            return Err(AssetError::InvalidData(
                "amount must be positive".to_string(),
            ));
        }
        if new_asset.value < Decimal::ZERO {
            return Err(AssetError::InvalidData(
                "value must be non-negative".to_string(),
            ));
        }

        let asset = Asset {
            id: Uuid::new_v4().to_string(),
            symbol,
            name: new_asset.name.trim().to_string(),
            amount: new_asset.amount,
            value: new_asset.value,
            rarity: new_asset.rarity,
            rarity_label: new_asset.rarity_label,
        };
        debug!("adding asset {} ({})", asset.symbol, asset.id);
        self.repository.insert(asset)
    }

    /// Applies a partial update by symbol
    pub fn update_asset(&self, symbol: &str, update: AssetUpdate) -> Result<Asset> {
        if let Some(amount) = update.amount {
            if amount == 0 {
                return Err(AssetError::InvalidData(
                    "amount must be positive".to_string(),
                ));
            }
        }
        if let Some(value) = update.value {
            if value < Decimal::ZERO {
                return Err(AssetError::InvalidData(
                    "value must be non-negative".to_string(),
                ));
            }
        }
        self.repository.update(&normalize(symbol), update)
    }
}

fn normalize(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}
