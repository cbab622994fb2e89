use super::assets_errors::Result;
use super::assets_model::{Asset, AssetUpdate};

/// Storage seam for holdings. The in-memory implementation is the only one
/// for now; the contract keeps the service testable with counting mocks.
pub trait AssetRepositoryTrait: Send + Sync {
    fn list(&self) -> Result<Vec<Asset>>;
    fn get_by_symbol(&self, symbol: &str) -> Result<Option<Asset>>;
    fn insert(&self, asset: Asset) -> Result<Asset>;
    fn update(&self, symbol: &str, update: AssetUpdate) -> Result<Asset>;
}
