pub mod auth;
pub mod handlers;
pub mod routes;

pub use auth::caller_from_headers;
pub use routes::*;

use crate::aggregation::AggregationQueue;
use crate::config::SearchConfig;
use crate::embedding::Embedder;
use crate::search::{SearchMergeEngine, SemanticSearch};
use crate::services::{CatalogService, FavoriteService, ReviewService};
use crate::state::EntityStore;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<CatalogService>,
    pub reviews: Arc<ReviewService>,
    pub favorites: Arc<FavoriteService>,
    pub search: Arc<SearchMergeEngine>,
    pub semantic: Arc<SemanticSearch>,
}

impl AppState {
    /// Wire every service onto one store
    pub fn new(
        store: Arc<dyn EntityStore>,
        search: SearchConfig,
        aggregation: AggregationQueue,
        embedder: Option<Arc<dyn Embedder>>,
    ) -> Self {
        Self {
            catalog: Arc::new(CatalogService::new(store.clone())),
            reviews: Arc::new(ReviewService::new(store.clone(), aggregation)),
            favorites: Arc::new(FavoriteService::new(store.clone())),
            search: Arc::new(SearchMergeEngine::new(store.clone(), search)),
            semantic: Arc::new(SemanticSearch::new(store, embedder)),
        }
    }
}
