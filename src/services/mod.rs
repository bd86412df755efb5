//! Application services sitting between the HTTP layer and the store

pub mod catalog;
pub mod favorites;
pub mod reviews;

pub use catalog::{CatalogService, CuisineTypes, ImportSummary, DEFAULT_FEATURED_LIMIT};
pub use favorites::FavoriteService;
pub use reviews::ReviewService;
