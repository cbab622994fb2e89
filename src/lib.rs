pub mod assets;
pub mod cache;
pub mod dashboard;
pub mod errors;
pub mod markets;
pub mod queries;
pub mod stores;

pub use errors::{Error, Result};
pub use queries::QueryService;
