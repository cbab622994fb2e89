use dashmap::DashMap;
use rust_decimal_macros::dec;

use super::assets_errors::{AssetError, Result};
use super::assets_model::{Asset, AssetUpdate};
use super::assets_traits::AssetRepositoryTrait;
use crate::markets::Rarity;

/// In-memory holdings store keyed by symbol
pub struct AssetRepository {
    store: DashMap<String, Asset>,
}

impl AssetRepository {
    pub fn new() -> Self {
        Self {
            store: DashMap::new(),
        }
    }

    /// Store preloaded with the demo holdings
    pub fn with_seed_holdings() -> Self {
        let repository = Self::new();
        for asset in seed_holdings() {
            repository.store.insert(asset.symbol.clone(), asset);
        }
        repository
    }
}

impl Default for AssetRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl AssetRepositoryTrait for AssetRepository {
    fn list(&self) -> Result<Vec<Asset>> {
        let mut assets: Vec<Asset> = self.store.iter().map(|e| e.value().clone()).collect();
        // stable listing order regardless of map iteration
        assets.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        Ok(assets)
    }

    fn get_by_symbol(&self, symbol: &str) -> Result<Option<Asset>> {
        Ok(self.store.get(symbol).map(|e| e.value().clone()))
    }

    fn insert(&self, asset: Asset) -> Result<Asset> {
        if self.store.contains_key(&asset.symbol) {
            return Err(AssetError::InvalidData(format!(
                "asset already exists: {}",
                asset.symbol
            )));
        }
        self.store.insert(asset.symbol.clone(), asset.clone());
        Ok(asset)
    }

    fn update(&self, symbol: &str, update: AssetUpdate) -> Result<Asset> {
        let mut entry = self
            .store
            .get_mut(symbol)
            .ok_or_else(|| AssetError::NotFound(format!("asset {}", symbol)))?;

        let asset = entry.value_mut();
        if let Some(name) = update.name {
            asset.name = name;
        }
        if let Some(amount) = update.amount {
            asset.amount = amount;
        }
        if let Some(value) = update.value {
            asset.value = value;
        }
        Ok(asset.clone())
    }
}

fn seed_holdings() -> Vec<Asset> {
    vec![
        Asset {
            id: "1".to_string(),
            symbol: "PKU-VMAX-RB".to_string(),
            name: "Pikachu VMAX (Rainbow)".to_string(),
            amount: 1,
            value: dec!(5_500_000),
            rarity: Rarity::SecretRare,
            rarity_label: Some("Secret Rare".to_string()),
        },
        Asset {
            id: "11".to_string(),
            symbol: "GYR-HOLO".to_string(),
            name: "Gyarados (Holo)".to_string(),
            amount: 2,
            value: dec!(1_700_000),
            rarity: Rarity::Rare,
            rarity_label: Some("Holo Rare".to_string()),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_store_lists_in_symbol_order() {
        let repository = AssetRepository::with_seed_holdings();
        let assets = repository.list().unwrap();
        let symbols: Vec<_> = assets.iter().map(|a| a.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["GYR-HOLO", "PKU-VMAX-RB"]);
    }

    #[test]
    fn duplicate_insert_is_rejected() {
        let repository = AssetRepository::with_seed_holdings();
        let duplicate = repository.get_by_symbol("GYR-HOLO").unwrap().unwrap();
        let err = repository.insert(duplicate).unwrap_err();
        assert!(matches!(err, AssetError::InvalidData(_)));
    }

    #[test]
    fn partial_update_touches_only_given_fields() {
        let repository = AssetRepository::with_seed_holdings();
        let updated = repository
            .update(
                "GYR-HOLO",
                AssetUpdate {
                    amount: Some(3),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.amount, 3);
        assert_eq!(updated.name, "Gyarados (Holo)");
        assert_eq!(updated.value, dec!(1_700_000));
    }

    #[test]
    fn update_unknown_symbol_is_not_found() {
        let repository = AssetRepository::new();
        let err = repository
            .update("ZZZ-404", AssetUpdate::default())
            .unwrap_err();
        assert!(matches!(err, AssetError::NotFound(_)));
    }
}
