pub mod store;
pub mod sled_store;
pub mod factory;

pub use store::InMemoryStore;
pub use sled_store::SledStore;
pub use factory::{create_store, create_in_memory_store};

use crate::error::Result;
use crate::models::{Favorite, Restaurant, Review, SearchField, SortBy};
use crate::search::VectorHit;
use async_trait::async_trait;
use std::cmp::Ordering;
use uuid::Uuid;

/// Maximum number of reviews returned by `recent_reviews`
pub const RECENT_REVIEWS_LIMIT: usize = 50;

/// Storage for restaurants, including their text and vector indexes
#[async_trait]
pub trait RestaurantStore: Send + Sync {
    /// Insert a new restaurant; `Conflict` if its slug is taken
    async fn insert_restaurant(&self, restaurant: &Restaurant) -> Result<()>;

    /// Get a restaurant by ID
    async fn get_restaurant(&self, id: &Uuid) -> Result<Option<Restaurant>>;

    /// Get a restaurant by its unique slug
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Restaurant>>;

    /// List restaurants with filtering, ordering and limit applied
    async fn list_restaurants(&self, filter: &RestaurantFilter) -> Result<Vec<Restaurant>>;

    /// Remove a restaurant and its index entries; `NotFound` if absent
    async fn delete_restaurant(&self, id: &Uuid) -> Result<()>;

    /// Count stored restaurants
    async fn count_restaurants(&self) -> Result<usize>;

    /// Overwrite the denormalized review aggregate; `NotFound` if the restaurant is gone
    async fn patch_user_score(&self, id: &Uuid, score: f64, count: u32) -> Result<()>;

    /// Attach an embedding vector; `NotFound` if the restaurant is gone
    async fn set_embedding(&self, id: &Uuid, embedding: Vec<f32>) -> Result<()>;

    /// Text query over a single field, hits ordered by relevance
    async fn search_field(
        &self,
        field: SearchField,
        query: &str,
        limit: usize,
    ) -> Result<Vec<Restaurant>>;

    /// Cosine nearest neighbors among restaurants that carry an embedding
    async fn nearest_neighbors(&self, vector: &[f32], limit: usize) -> Result<Vec<VectorHit>>;
}

/// Storage for reviews with a per-(user, restaurant) uniqueness constraint
#[async_trait]
pub trait ReviewStore: Send + Sync {
    /// Insert a review; `Conflict` if the author already reviewed the restaurant
    async fn insert_review(&self, review: &Review) -> Result<()>;

    async fn get_review(&self, id: &Uuid) -> Result<Option<Review>>;

    /// Replace score and text of an existing review
    async fn update_review(&self, review: &Review) -> Result<()>;

    async fn delete_review(&self, id: &Uuid) -> Result<()>;

    /// The review `user_id` wrote for `restaurant_id`, if any
    async fn find_user_review(&self, user_id: &str, restaurant_id: &Uuid) -> Result<Option<Review>>;

    /// Every review of a restaurant, unbounded
    async fn reviews_for_restaurant(&self, restaurant_id: &Uuid) -> Result<Vec<Review>>;

    /// Newest reviews of a restaurant, at most `RECENT_REVIEWS_LIMIT`
    async fn recent_reviews(&self, restaurant_id: &Uuid) -> Result<Vec<Review>> {
        let mut reviews = self.reviews_for_restaurant(restaurant_id).await?;
        reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        reviews.truncate(RECENT_REVIEWS_LIMIT);
        Ok(reviews)
    }
}

/// Storage for favorites, a set of (user, restaurant) pairs
#[async_trait]
pub trait FavoriteStore: Send + Sync {
    async fn find_favorite(&self, user_id: &str, restaurant_id: &Uuid) -> Result<Option<Favorite>>;

    /// Atomically remove the pair if present, otherwise insert it.
    ///
    /// Returns whether the restaurant is now a favorite.
    async fn toggle_favorite(&self, user_id: &str, restaurant_id: &Uuid) -> Result<bool>;

    /// All favorites of a user, newest first
    async fn favorites_for_user(&self, user_id: &str) -> Result<Vec<Favorite>>;
}

/// A backend holding every entity kind
pub trait EntityStore: RestaurantStore + ReviewStore + FavoriteStore {}

impl<T: RestaurantStore + ReviewStore + FavoriteStore> EntityStore for T {}

/// Filter for listing restaurants
#[derive(Debug, Clone, Default)]
pub struct RestaurantFilter {
    /// Exact English cuisine type
    pub cuisine: Option<String>,
    pub sort_by: SortBy,
    pub limit: Option<usize>,
}

impl RestaurantFilter {
    pub fn matches(&self, restaurant: &Restaurant) -> bool {
        self.cuisine
            .as_ref()
            .map_or(true, |cuisine| &restaurant.cuisine == cuisine)
    }

    /// Sort descending by the requested key, then cut to the limit
    pub fn apply(&self, mut restaurants: Vec<Restaurant>) -> Vec<Restaurant> {
        restaurants.retain(|r| self.matches(r));
        match self.sort_by {
            SortBy::Madad => restaurants.sort_by(|a, b| cmp_f64(b.madad_number, a.madad_number)),
            SortBy::UserScore => restaurants.sort_by(|a, b| {
                cmp_f64(b.user_score.unwrap_or(0.0), a.user_score.unwrap_or(0.0))
            }),
            SortBy::Date => restaurants.sort_by(|a, b| b.date.cmp(&a.date)),
        }
        if let Some(limit) = self.limit {
            restaurants.truncate(limit);
        }
        restaurants
    }
}

fn cmp_f64(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewRestaurant;

    fn restaurant(name: &str, cuisine: &str, madad: f64, date: &str, score: Option<f64>) -> Restaurant {
        let mut r = Restaurant::from_import(NewRestaurant {
            name: name.to_string(),
            cuisine: cuisine.to_string(),
            madad_number: madad,
            date: date.to_string(),
            ..Default::default()
        });
        r.user_score = score;
        r
    }

    fn names(restaurants: &[Restaurant]) -> Vec<&str> {
        restaurants.iter().map(|r| r.name.as_str()).collect()
    }

    #[test]
    fn test_filter_sorts_descending() {
        let all = vec![
            restaurant("a", "Italian", 7.0, "2024-01-01", Some(9.0)),
            restaurant("b", "Asian", 9.0, "2023-05-01", None),
            restaurant("c", "Italian", 8.0, "2024-06-01", Some(4.5)),
        ];

        let by_madad = RestaurantFilter::default().apply(all.clone());
        assert_eq!(names(&by_madad), vec!["b", "c", "a"]);

        let by_score = RestaurantFilter {
            sort_by: SortBy::UserScore,
            ..Default::default()
        }
        .apply(all.clone());
        assert_eq!(names(&by_score), vec!["a", "c", "b"]);

        let by_date = RestaurantFilter {
            sort_by: SortBy::Date,
            limit: Some(2),
            ..Default::default()
        }
        .apply(all);
        assert_eq!(names(&by_date), vec!["c", "a"]);
    }

    #[test]
    fn test_filter_by_cuisine() {
        let all = vec![
            restaurant("a", "Italian", 7.0, "", None),
            restaurant("b", "Asian", 9.0, "", None),
        ];
        let filter = RestaurantFilter {
            cuisine: Some("Italian".to_string()),
            ..Default::default()
        };
        assert_eq!(names(&filter.apply(all)), vec!["a"]);
    }
}
