use crate::embedding::Embedder;
use crate::error::{AppError, Result};
use crate::metrics::{SEARCH_DURATION_SECONDS, SEARCH_REQUESTS_TOTAL};
use crate::models::ScoredRestaurant;
use crate::state::EntityStore;
use std::sync::Arc;
use std::time::Instant;

pub const DEFAULT_SEMANTIC_LIMIT: usize = 10;

/// Upper bound of the nearest-neighbor result count
pub const MAX_SEMANTIC_LIMIT: usize = 256;

/// Natural-language search over restaurant embeddings
pub struct SemanticSearch {
    store: Arc<dyn EntityStore>,
    embedder: Option<Arc<dyn Embedder>>,
}

impl SemanticSearch {
    /// `embedder` is `None` when semantic search is disabled
    pub fn new(store: Arc<dyn EntityStore>, embedder: Option<Arc<dyn Embedder>>) -> Self {
        Self { store, embedder }
    }

    pub fn is_enabled(&self) -> bool {
        self.embedder.is_some()
    }

    /// Embed `query` and return the nearest restaurants with their similarity.
    ///
    /// Provider failures surface as `Upstream`; there is no keyword fallback.
    pub async fn natural_language_search(
        &self,
        query: &str,
        limit: Option<usize>,
    ) -> Result<Vec<ScoredRestaurant>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let embedder = self
            .embedder
            .as_ref()
            .ok_or_else(|| AppError::Configuration("Semantic search is disabled".to_string()))?;
        let limit = limit
            .unwrap_or(DEFAULT_SEMANTIC_LIMIT)
            .clamp(1, MAX_SEMANTIC_LIMIT);

        let start = Instant::now();
        SEARCH_REQUESTS_TOTAL.with_label_values(&["semantic"]).inc();

        let vector = embedder.embed(query).await?;
        embedder.validate_vector(&vector)?;

        let hits = self.store.nearest_neighbors(&vector, limit).await?;

        let mut results = Vec::with_capacity(hits.len());
        for hit in hits {
            match self.store.get_restaurant(&hit.id).await? {
                Some(restaurant) => results.push(ScoredRestaurant {
                    restaurant: restaurant.to_card(),
                    similarity: hit.score,
                }),
                None => {
                    tracing::debug!(restaurant_id = %hit.id, "Vector hit without restaurant, skipping");
                }
            }
        }

        SEARCH_DURATION_SECONDS
            .with_label_values(&["semantic"])
            .observe(start.elapsed().as_secs_f64());
        tracing::debug!(limit, results = results.len(), "Semantic search completed");

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SearchConfig;
    use crate::embedding::EmbeddingError;
    use crate::models::{NewRestaurant, Restaurant};
    use crate::state::{InMemoryStore, RestaurantStore};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Returns a fixed vector and counts calls
    struct FixedEmbedder {
        vector: Vec<f32>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Embedder for FixedEmbedder {
        async fn embed(&self, _text: &str) -> std::result::Result<Vec<f32>, EmbeddingError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.vector.clone())
        }

        fn dimensions(&self) -> usize {
            self.vector.len()
        }
    }

    struct DownEmbedder;

    #[async_trait]
    impl Embedder for DownEmbedder {
        async fn embed(&self, _text: &str) -> std::result::Result<Vec<f32>, EmbeddingError> {
            Err(EmbeddingError::Request("connection refused".to_string()))
        }

        fn dimensions(&self) -> usize {
            2
        }
    }

    async fn store_with(vectors: &[(&str, Vec<f32>)]) -> (Arc<InMemoryStore>, Vec<Restaurant>) {
        let store = Arc::new(InMemoryStore::new(&SearchConfig::default()).unwrap());
        let mut restaurants = Vec::new();
        for (name, vector) in vectors {
            let r = Restaurant::from_import(NewRestaurant {
                name: name.to_string(),
                ..Default::default()
            });
            store.insert_restaurant(&r).await.unwrap();
            store.set_embedding(&r.id, vector.clone()).await.unwrap();
            restaurants.push(r);
        }
        (store, restaurants)
    }

    fn fixed(vector: Vec<f32>) -> Arc<FixedEmbedder> {
        Arc::new(FixedEmbedder {
            vector,
            calls: AtomicUsize::new(0),
        })
    }

    #[tokio::test]
    async fn test_ranked_hits_with_similarity() {
        let (store, rs) = store_with(&[("far", vec![0.0, 1.0]), ("near", vec![1.0, 0.0])]).await;
        let search = SemanticSearch::new(store, Some(fixed(vec![1.0, 0.0])));

        let results = search.natural_language_search("cozy", None).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].restaurant.id, rs[1].id);
        assert!((results[0].similarity - 1.0).abs() < 1e-6);
        assert_eq!(results[1].restaurant.id, rs[0].id);
    }

    #[tokio::test]
    async fn test_limit_clamped_to_at_least_one() {
        let (store, _) = store_with(&[("a", vec![1.0, 0.0]), ("b", vec![0.5, 0.5])]).await;
        let search = SemanticSearch::new(store, Some(fixed(vec![1.0, 0.0])));

        let results = search.natural_language_search("x", Some(0)).await.unwrap();
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn test_blank_query_skips_provider() {
        let (store, _) = store_with(&[]).await;
        let embedder = fixed(vec![1.0]);
        let search = SemanticSearch::new(store, Some(embedder.clone()));

        assert!(search.natural_language_search("   ", None).await.unwrap().is_empty());
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_deleted_restaurant_skipped() {
        let (store, rs) = store_with(&[("a", vec![1.0, 0.0]), ("b", vec![0.9, 0.1])]).await;
        store.delete_restaurant(&rs[0].id).await.unwrap();
        let search = SemanticSearch::new(store, Some(fixed(vec![1.0, 0.0])));

        let results = search.natural_language_search("x", None).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].restaurant.id, rs[1].id);
    }

    #[tokio::test]
    async fn test_provider_failures_are_upstream() {
        let (store, _) = store_with(&[]).await;
        let down = SemanticSearch::new(store.clone(), Some(Arc::new(DownEmbedder)));
        assert!(matches!(
            down.natural_language_search("x", None).await,
            Err(AppError::Upstream(_))
        ));

        // Embedder claims 3 dimensions but returns 2
        struct LyingEmbedder;
        #[async_trait]
        impl Embedder for LyingEmbedder {
            async fn embed(&self, _text: &str) -> std::result::Result<Vec<f32>, EmbeddingError> {
                Ok(vec![1.0, 0.0])
            }
            fn dimensions(&self) -> usize {
                3
            }
        }
        let lying = SemanticSearch::new(store, Some(Arc::new(LyingEmbedder)));
        assert!(matches!(
            lying.natural_language_search("x", None).await,
            Err(AppError::Upstream(_))
        ));
    }

    #[tokio::test]
    async fn test_disabled() {
        let (store, _) = store_with(&[]).await;
        let search = SemanticSearch::new(store, None);
        assert!(!search.is_enabled());
        assert!(matches!(
            search.natural_language_search("x", None).await,
            Err(AppError::Configuration(_))
        ));
    }
}
