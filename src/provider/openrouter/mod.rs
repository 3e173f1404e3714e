//! OpenRouter adapter and its alias catalog.

pub mod models;
mod provider;

pub use models::ModelCatalog;
pub use provider::OpenRouterAdapter;
