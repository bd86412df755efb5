use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Membership of a restaurant in a user's favorites set
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Favorite {
    pub user_id: String,
    pub restaurant_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Favorite {
    pub fn new(user_id: String, restaurant_id: Uuid) -> Self {
        Self {
            user_id,
            restaurant_id,
            created_at: Utc::now(),
        }
    }
}
