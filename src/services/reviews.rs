use crate::aggregation::AggregationQueue;
use crate::error::{AppError, Result};
use crate::metrics::REVIEW_MUTATIONS_TOTAL;
use crate::models::{require_caller, validate_score, validate_text, AuthUser, Review};
use crate::state::EntityStore;
use std::sync::Arc;
use uuid::Uuid;

/// Review create/update/delete with ownership rules.
///
/// Every successful mutation schedules a score recalculation for the
/// affected restaurant; the mutation does not wait for it.
pub struct ReviewService {
    store: Arc<dyn EntityStore>,
    aggregation: AggregationQueue,
}

impl ReviewService {
    pub fn new(store: Arc<dyn EntityStore>, aggregation: AggregationQueue) -> Self {
        Self { store, aggregation }
    }

    /// Create a review authored by `user_id`
    pub async fn create(
        &self,
        restaurant_id: Uuid,
        user_id: &str,
        user_name: &str,
        score: f64,
        text: &str,
    ) -> Result<Review> {
        let result = self
            .create_inner(restaurant_id, user_id, user_name, score, text)
            .await;
        record("create", &result);
        result
    }

    async fn create_inner(
        &self,
        restaurant_id: Uuid,
        user_id: &str,
        user_name: &str,
        score: f64,
        text: &str,
    ) -> Result<Review> {
        validate_score(score)?;
        let text = validate_text(text)?;

        if self.store.get_restaurant(&restaurant_id).await?.is_none() {
            return Err(AppError::NotFound(format!(
                "Restaurant {} not found",
                restaurant_id
            )));
        }

        // Fast path; the store's pair constraint is the authoritative check
        if self
            .store
            .find_user_review(user_id, &restaurant_id)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(
                "You have already reviewed this restaurant".to_string(),
            ));
        }

        let review = Review::new(
            restaurant_id,
            user_id.to_string(),
            user_name.to_string(),
            score,
            text,
        );
        self.store.insert_review(&review).await?;
        self.aggregation.schedule(restaurant_id);

        tracing::info!(
            review_id = %review.id,
            restaurant_id = %restaurant_id,
            user_id,
            score,
            "Review created"
        );
        Ok(review)
    }

    /// Change score and text of the caller's own review
    pub async fn update(
        &self,
        caller: Option<&AuthUser>,
        review_id: Uuid,
        score: f64,
        text: &str,
    ) -> Result<Review> {
        let result = self.update_inner(caller, review_id, score, text).await;
        record("update", &result);
        result
    }

    async fn update_inner(
        &self,
        caller: Option<&AuthUser>,
        review_id: Uuid,
        score: f64,
        text: &str,
    ) -> Result<Review> {
        let caller = require_caller(caller)?;
        let mut review = self.owned_review(caller, review_id).await?;

        validate_score(score)?;
        review.text = validate_text(text)?;
        review.score = score;

        self.store.update_review(&review).await?;
        self.aggregation.schedule(review.restaurant_id);

        tracing::info!(review_id = %review.id, restaurant_id = %review.restaurant_id, score, "Review updated");
        Ok(review)
    }

    /// Delete the caller's own review
    pub async fn remove(&self, caller: Option<&AuthUser>, review_id: Uuid) -> Result<()> {
        let result = self.remove_inner(caller, review_id).await;
        record("delete", &result);
        result
    }

    async fn remove_inner(&self, caller: Option<&AuthUser>, review_id: Uuid) -> Result<()> {
        let caller = require_caller(caller)?;
        let review = self.owned_review(caller, review_id).await?;

        self.store.delete_review(&review.id).await?;
        self.aggregation.schedule(review.restaurant_id);

        tracing::info!(review_id = %review.id, restaurant_id = %review.restaurant_id, "Review deleted");
        Ok(())
    }

    /// Newest reviews of a restaurant
    pub async fn list_for_restaurant(&self, restaurant_id: Uuid) -> Result<Vec<Review>> {
        self.store.recent_reviews(&restaurant_id).await
    }

    async fn owned_review(&self, caller: &AuthUser, review_id: Uuid) -> Result<Review> {
        let review = self
            .store
            .get_review(&review_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Review {} not found", review_id)))?;

        if !review.is_owned_by(&caller.id) {
            return Err(AppError::Authorization("Not authorized".to_string()));
        }
        Ok(review)
    }
}

fn record<T>(operation: &str, result: &Result<T>) {
    let status = match result {
        Ok(_) => "success",
        Err(e) => e.error_code(),
    };
    REVIEW_MUTATIONS_TOTAL
        .with_label_values(&[operation, status])
        .inc();
}
