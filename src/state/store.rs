use crate::config::SearchConfig;
use crate::error::{AppError, Result};
use crate::models::{Favorite, Restaurant, Review, SearchField};
use crate::search::{nearest_neighbors, TextIndex, VectorHit};
use crate::state::{FavoriteStore, RestaurantFilter, RestaurantStore, ReviewStore};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use uuid::Uuid;

type PairKey = (String, Uuid);

/// In-memory entity store (for development and testing)
#[derive(Clone)]
pub struct InMemoryStore {
    restaurants: Arc<DashMap<Uuid, Restaurant>>,
    slug_index: Arc<DashMap<String, Uuid>>,
    reviews: Arc<DashMap<Uuid, Review>>,
    review_pairs: Arc<DashMap<PairKey, Uuid>>,
    favorites: Arc<DashMap<PairKey, Favorite>>,
    text_index: Arc<TextIndex>,
}

impl InMemoryStore {
    pub fn new(search: &SearchConfig) -> Result<Self> {
        Ok(Self {
            restaurants: Arc::new(DashMap::new()),
            slug_index: Arc::new(DashMap::new()),
            reviews: Arc::new(DashMap::new()),
            review_pairs: Arc::new(DashMap::new()),
            favorites: Arc::new(DashMap::new()),
            text_index: Arc::new(TextIndex::new(search.writer_heap_size)?),
        })
    }
}

#[async_trait]
impl RestaurantStore for InMemoryStore {
    async fn insert_restaurant(&self, restaurant: &Restaurant) -> Result<()> {
        match self.slug_index.entry(restaurant.slug.clone()) {
            Entry::Occupied(_) => {
                return Err(AppError::Conflict(format!(
                    "Restaurant with slug '{}' already exists",
                    restaurant.slug
                )))
            }
            Entry::Vacant(_) if self.restaurants.contains_key(&restaurant.id) => {
                return Err(AppError::Conflict(format!(
                    "Restaurant {} already exists",
                    restaurant.id
                )))
            }
            Entry::Vacant(entry) => {
                self.restaurants.insert(restaurant.id, restaurant.clone());
                entry.insert(restaurant.id);
            }
        }

        self.text_index.index_restaurant(restaurant)?;

        tracing::debug!(restaurant_id = %restaurant.id, slug = %restaurant.slug, "Restaurant saved");
        Ok(())
    }

    async fn get_restaurant(&self, id: &Uuid) -> Result<Option<Restaurant>> {
        Ok(self.restaurants.get(id).map(|entry| entry.clone()))
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Restaurant>> {
        let id = match self.slug_index.get(slug) {
            Some(entry) => *entry,
            None => return Ok(None),
        };
        self.get_restaurant(&id).await
    }

    async fn list_restaurants(&self, filter: &RestaurantFilter) -> Result<Vec<Restaurant>> {
        let restaurants: Vec<Restaurant> = self
            .restaurants
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();

        Ok(filter.apply(restaurants))
    }

    async fn delete_restaurant(&self, id: &Uuid) -> Result<()> {
        let (_, restaurant) = self
            .restaurants
            .remove(id)
            .ok_or_else(|| AppError::NotFound(format!("Restaurant {} not found", id)))?;
        self.slug_index.remove(&restaurant.slug);
        self.text_index.remove(id)?;

        tracing::debug!(restaurant_id = %id, "Restaurant deleted");
        Ok(())
    }

    async fn count_restaurants(&self) -> Result<usize> {
        Ok(self.restaurants.len())
    }

    async fn patch_user_score(&self, id: &Uuid, score: f64, count: u32) -> Result<()> {
        let mut restaurant = self
            .restaurants
            .get_mut(id)
            .ok_or_else(|| AppError::NotFound(format!("Restaurant {} not found", id)))?;
        restaurant.user_score = Some(score);
        restaurant.user_review_count = Some(count);

        tracing::debug!(restaurant_id = %id, score, count, "User score patched");
        Ok(())
    }

    async fn set_embedding(&self, id: &Uuid, embedding: Vec<f32>) -> Result<()> {
        let mut restaurant = self
            .restaurants
            .get_mut(id)
            .ok_or_else(|| AppError::NotFound(format!("Restaurant {} not found", id)))?;
        restaurant.embedding = Some(embedding);
        Ok(())
    }

    async fn search_field(
        &self,
        field: SearchField,
        query: &str,
        limit: usize,
    ) -> Result<Vec<Restaurant>> {
        let ids = self.text_index.search(field, query, limit)?;
        Ok(ids
            .iter()
            .filter_map(|id| self.restaurants.get(id).map(|entry| entry.clone()))
            .collect())
    }

    async fn nearest_neighbors(&self, vector: &[f32], limit: usize) -> Result<Vec<VectorHit>> {
        let candidates: Vec<(Uuid, Vec<f32>)> = self
            .restaurants
            .iter()
            .filter_map(|entry| entry.embedding.clone().map(|e| (entry.id, e)))
            .collect();

        Ok(nearest_neighbors(
            vector,
            candidates.iter().map(|(id, e)| (*id, e.as_slice())),
            limit,
        ))
    }
}

#[async_trait]
impl ReviewStore for InMemoryStore {
    async fn insert_review(&self, review: &Review) -> Result<()> {
        // The pair entry stays locked until the review row is written
        match self
            .review_pairs
            .entry((review.user_id.clone(), review.restaurant_id))
        {
            Entry::Occupied(_) => Err(AppError::Conflict(
                "You have already reviewed this restaurant".to_string(),
            )),
            Entry::Vacant(_) if self.reviews.contains_key(&review.id) => Err(AppError::Conflict(
                format!("Review {} already exists", review.id),
            )),
            Entry::Vacant(entry) => {
                self.reviews.insert(review.id, review.clone());
                entry.insert(review.id);
                tracing::debug!(review_id = %review.id, restaurant_id = %review.restaurant_id, "Review saved");
                Ok(())
            }
        }
    }

    async fn get_review(&self, id: &Uuid) -> Result<Option<Review>> {
        Ok(self.reviews.get(id).map(|entry| entry.clone()))
    }

    async fn update_review(&self, review: &Review) -> Result<()> {
        let mut existing = self
            .reviews
            .get_mut(&review.id)
            .ok_or_else(|| AppError::NotFound(format!("Review {} not found", review.id)))?;
        existing.score = review.score;
        existing.text = review.text.clone();

        tracing::debug!(review_id = %review.id, "Review updated");
        Ok(())
    }

    async fn delete_review(&self, id: &Uuid) -> Result<()> {
        let (_, review) = self
            .reviews
            .remove(id)
            .ok_or_else(|| AppError::NotFound(format!("Review {} not found", id)))?;
        self.review_pairs
            .remove_if(&(review.user_id.clone(), review.restaurant_id), |_, v| v == id);

        tracing::debug!(review_id = %id, "Review deleted");
        Ok(())
    }

    async fn find_user_review(&self, user_id: &str, restaurant_id: &Uuid) -> Result<Option<Review>> {
        let id = match self.review_pairs.get(&(user_id.to_string(), *restaurant_id)) {
            Some(entry) => *entry,
            None => return Ok(None),
        };
        self.get_review(&id).await
    }

    async fn reviews_for_restaurant(&self, restaurant_id: &Uuid) -> Result<Vec<Review>> {
        Ok(self
            .reviews
            .iter()
            .filter(|entry| entry.restaurant_id == *restaurant_id)
            .map(|entry| entry.value().clone())
            .collect())
    }
}

#[async_trait]
impl FavoriteStore for InMemoryStore {
    async fn find_favorite(&self, user_id: &str, restaurant_id: &Uuid) -> Result<Option<Favorite>> {
        Ok(self
            .favorites
            .get(&(user_id.to_string(), *restaurant_id))
            .map(|entry| entry.clone()))
    }

    async fn toggle_favorite(&self, user_id: &str, restaurant_id: &Uuid) -> Result<bool> {
        match self.favorites.entry((user_id.to_string(), *restaurant_id)) {
            Entry::Occupied(entry) => {
                entry.remove();
                Ok(false)
            }
            Entry::Vacant(entry) => {
                entry.insert(Favorite::new(user_id.to_string(), *restaurant_id));
                Ok(true)
            }
        }
    }

    async fn favorites_for_user(&self, user_id: &str) -> Result<Vec<Favorite>> {
        let mut favorites: Vec<Favorite> = self
            .favorites
            .iter()
            .filter(|entry| entry.user_id == user_id)
            .map(|entry| entry.value().clone())
            .collect();
        favorites.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(favorites)
    }
}
