use crate::error::Result;
use crate::state::{EntityStore, RestaurantFilter};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Denormalized review aggregate written onto a restaurant
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserScore {
    pub score: f64,
    pub count: u32,
}

/// Outcome of a full repair pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecalculationSummary {
    pub updated: usize,
    pub failed: usize,
    pub total: usize,
}

/// Mean of `scores` rounded half away from zero to one decimal; 0 when empty
pub fn average_score(scores: &[f64]) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }
    let mean = scores.iter().sum::<f64>() / scores.len() as f64;
    (mean * 10.0).round() / 10.0
}

/// Recomputes `(userScore, userReviewCount)` from a full scan of reviews
pub struct ScoreAggregator {
    store: Arc<dyn EntityStore>,
}

impl ScoreAggregator {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    /// Recompute one restaurant's aggregate and patch it.
    ///
    /// Returns `NotFound` if the restaurant no longer exists.
    pub async fn recalculate(&self, restaurant_id: &Uuid) -> Result<UserScore> {
        let reviews = self.store.reviews_for_restaurant(restaurant_id).await?;
        let scores: Vec<f64> = reviews.iter().map(|r| r.score).collect();

        let aggregate = UserScore {
            score: average_score(&scores),
            count: scores.len() as u32,
        };

        self.store
            .patch_user_score(restaurant_id, aggregate.score, aggregate.count)
            .await?;

        tracing::debug!(
            restaurant_id = %restaurant_id,
            score = aggregate.score,
            count = aggregate.count,
            "User score recalculated"
        );
        Ok(aggregate)
    }

    /// Recompute every restaurant, logging and counting individual failures
    pub async fn recalculate_all(&self) -> Result<RecalculationSummary> {
        let restaurants = self
            .store
            .list_restaurants(&RestaurantFilter::default())
            .await?;

        let mut summary = RecalculationSummary {
            total: restaurants.len(),
            ..Default::default()
        };

        for restaurant in &restaurants {
            match self.recalculate(&restaurant.id).await {
                Ok(_) => summary.updated += 1,
                Err(e) => {
                    summary.failed += 1;
                    warn!(restaurant_id = %restaurant.id, error = %e, "Recalculation failed");
                }
            }
        }

        info!(
            updated = summary.updated,
            failed = summary.failed,
            total = summary.total,
            "User scores recalculated"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SearchConfig;
    use crate::models::{NewRestaurant, Restaurant, Review};
    use crate::state::{InMemoryStore, RestaurantStore, ReviewStore};

    #[test]
    fn test_average_score_rounding() {
        assert_eq!(average_score(&[]), 0.0);
        assert_eq!(average_score(&[8.0]), 8.0);
        assert_eq!(average_score(&[7.0, 8.0]), 7.5);
        assert_eq!(average_score(&[7.0, 8.0, 8.0]), 7.7);
        assert_eq!(average_score(&[9.0, 9.5, 10.0]), 9.5);
        assert_eq!(average_score(&[1.0, 2.0, 2.0]), 1.7);
    }

    async fn setup() -> (Arc<InMemoryStore>, ScoreAggregator, Restaurant) {
        let store = Arc::new(InMemoryStore::new(&SearchConfig::default()).unwrap());
        let restaurant = Restaurant::from_import(NewRestaurant {
            name: "Shmulik Cohen".to_string(),
            ..Default::default()
        });
        store.insert_restaurant(&restaurant).await.unwrap();
        let aggregator = ScoreAggregator::new(store.clone());
        (store, aggregator, restaurant)
    }

    #[tokio::test]
    async fn test_recalculate_patches_restaurant() {
        let (store, aggregator, restaurant) = setup().await;
        for (user, score) in [("a", 6.0), ("b", 7.5), ("c", 9.0)] {
            let review = Review::new(
                restaurant.id,
                user.to_string(),
                "User".to_string(),
                score,
                "ok".to_string(),
            );
            store.insert_review(&review).await.unwrap();
        }

        let aggregate = aggregator.recalculate(&restaurant.id).await.unwrap();
        assert_eq!(aggregate, UserScore { score: 7.5, count: 3 });

        let stored = store.get_restaurant(&restaurant.id).await.unwrap().unwrap();
        assert_eq!(stored.user_score, Some(7.5));
        assert_eq!(stored.user_review_count, Some(3));
    }

    #[tokio::test]
    async fn test_recalculate_without_reviews_writes_zero() {
        let (store, aggregator, restaurant) = setup().await;
        aggregator.recalculate(&restaurant.id).await.unwrap();

        let stored = store.get_restaurant(&restaurant.id).await.unwrap().unwrap();
        assert_eq!(stored.user_score, Some(0.0));
        assert_eq!(stored.user_review_count, Some(0));
    }

    #[tokio::test]
    async fn test_recalculate_missing_restaurant() {
        let (_store, aggregator, _) = setup().await;
        let err = aggregator.recalculate(&Uuid::new_v4()).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_recalculate_all() {
        let (_store, aggregator, _) = setup().await;
        let summary = aggregator.recalculate_all().await.unwrap();
        assert_eq!(summary, RecalculationSummary { updated: 1, failed: 0, total: 1 });
    }
}
