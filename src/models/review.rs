use crate::error::{AppError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lowest accepted review score
pub const MIN_SCORE: f64 = 1.0;

/// Highest accepted review score
pub const MAX_SCORE: f64 = 10.0;

/// A user's review of one restaurant
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    /// Unique identifier
    pub id: Uuid,

    pub restaurant_id: Uuid,

    /// Author identity, as issued by the auth provider
    pub user_id: String,

    /// Author display name at submission time
    pub user_name: String,

    /// Score between 1 and 10
    pub score: f64,

    pub text: String,

    pub created_at: DateTime<Utc>,
}

impl Review {
    pub fn new(
        restaurant_id: Uuid,
        user_id: String,
        user_name: String,
        score: f64,
        text: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            restaurant_id,
            user_id,
            user_name,
            score,
            text,
            created_at: Utc::now(),
        }
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }
}

/// Reject scores outside `[1, 10]` (and NaN)
pub fn validate_score(score: f64) -> Result<()> {
    if !score.is_finite() || !(MIN_SCORE..=MAX_SCORE).contains(&score) {
        return Err(AppError::Validation(format!(
            "Score must be between {} and {}",
            MIN_SCORE, MAX_SCORE
        )));
    }
    Ok(())
}

/// Reject blank review text, returning the trimmed text
pub fn validate_text(text: &str) -> Result<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation(
            "A written review is required to submit a score".to_string(),
        ));
    }
    Ok(trimmed.to_string())
}
