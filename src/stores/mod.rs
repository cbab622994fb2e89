pub(crate) mod shared_store;

// Re-export the public interface
pub use shared_store::{SharedStore, StoreHandle};
