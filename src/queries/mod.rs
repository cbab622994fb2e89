pub(crate) mod queries_constants;
pub(crate) mod queries_model;
pub(crate) mod queries_service;

// Re-export the public interface
pub use queries_constants::*;
pub use queries_model::FilteredMarkets;
pub use queries_service::QueryService;
