use crate::config::SearchConfig;
use crate::error::{AppError, Result};
use crate::models::{Favorite, Restaurant, Review, SearchField};
use crate::search::{nearest_neighbors, TextIndex, VectorHit};
use crate::state::{FavoriteStore, RestaurantFilter, RestaurantStore, ReviewStore};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::transaction::{abort, ConflictableTransactionError, TransactionError};
use sled::{Db, Transactional};
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

/// Persistent entity store using Sled embedded database.
///
/// Pair uniqueness (one review and at most one favorite per user and
/// restaurant) is enforced on keyed trees. Writes spanning several trees run
/// in one sled transaction. The text index is rebuilt from the restaurants
/// tree on open.
#[derive(Clone)]
pub struct SledStore {
    db: Arc<Db>,
    restaurants_tree: sled::Tree,
    slugs_tree: sled::Tree,
    reviews_tree: sled::Tree,
    review_pairs_tree: sled::Tree,
    restaurant_reviews_tree: sled::Tree,
    favorites_tree: sled::Tree,
    text_index: Arc<TextIndex>,
}

impl SledStore {
    /// Open (or create) a store at the specified path
    pub fn new<P: AsRef<Path>>(path: P, search: &SearchConfig) -> Result<Self> {
        let path_str = path.as_ref();
        let db = sled::open(&path)
            .map_err(|e| AppError::Database(format!("Failed to open Sled database: {}", e)))?;

        let open_tree = |name: &str| {
            db.open_tree(name)
                .map_err(|e| AppError::Database(format!("Failed to open {} tree: {}", name, e)))
        };

        let store = Self {
            restaurants_tree: open_tree("restaurants")?,
            slugs_tree: open_tree("slugs")?,
            reviews_tree: open_tree("reviews")?,
            review_pairs_tree: open_tree("review_pairs")?,
            restaurant_reviews_tree: open_tree("restaurant_reviews")?,
            favorites_tree: open_tree("favorites")?,
            text_index: Arc::new(TextIndex::new(search.writer_heap_size)?),
            db: Arc::new(db),
        };

        let restaurants = store.load_restaurants()?;
        let indexed = store.text_index.index_restaurants(&restaurants)?;

        tracing::info!(path = ?path_str, indexed, "Initialized Sled store");
        Ok(store)
    }

    fn serialize<T: Serialize>(value: &T) -> Result<Vec<u8>> {
        bincode::serialize(value)
            .map_err(|e| AppError::Serialization(format!("Failed to serialize record: {}", e)))
    }

    fn deserialize<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
        bincode::deserialize(bytes)
            .map_err(|e| AppError::Serialization(format!("Failed to deserialize record: {}", e)))
    }

    /// `user_id \0 restaurant_id`, so a user's pairs share a prefix
    fn pair_key(user_id: &str, restaurant_id: &Uuid) -> Vec<u8> {
        let mut key = Self::user_prefix(user_id);
        key.extend_from_slice(restaurant_id.as_bytes());
        key
    }

    fn user_prefix(user_id: &str) -> Vec<u8> {
        let mut key = Vec::with_capacity(user_id.len() + 17);
        key.extend_from_slice(user_id.as_bytes());
        key.push(0);
        key
    }

    /// `restaurant_id review_id`, so a restaurant's reviews share a prefix
    fn restaurant_review_key(restaurant_id: &Uuid, review_id: &Uuid) -> Vec<u8> {
        let mut key = restaurant_id.as_bytes().to_vec();
        key.extend_from_slice(review_id.as_bytes());
        key
    }

    fn load_restaurants(&self) -> Result<Vec<Restaurant>> {
        let mut restaurants = Vec::new();
        for result in self.restaurants_tree.iter() {
            let (_, value) = result
                .map_err(|e| AppError::Database(format!("Failed to iterate restaurants: {}", e)))?;
            restaurants.push(Self::deserialize(&value)?);
        }
        Ok(restaurants)
    }

    /// Atomic read-modify-write of one record.
    ///
    /// `f` may run more than once under contention.
    fn modify<T, F>(tree: &sled::Tree, key: &[u8], what: &str, mut f: F) -> Result<()>
    where
        T: Serialize + DeserializeOwned,
        F: FnMut(&mut T),
    {
        let mut outcome: Result<()> = Ok(());
        tree.update_and_fetch(key, |old| {
            let Some(bytes) = old else {
                outcome = Err(AppError::NotFound(format!("{} not found", what)));
                return None;
            };
            let updated = Self::deserialize::<T>(bytes).and_then(|mut record| {
                f(&mut record);
                Self::serialize(&record)
            });
            match updated {
                Ok(value) => {
                    outcome = Ok(());
                    Some(value)
                }
                Err(e) => {
                    outcome = Err(e);
                    Some(bytes.to_vec())
                }
            }
        })?;
        outcome
    }

    fn transaction_error(err: TransactionError<AppError>) -> AppError {
        match err {
            TransactionError::Abort(e) => e,
            TransactionError::Storage(e) => {
                AppError::Database(format!("Transaction failed: {}", e))
            }
        }
    }

    /// Flush pending writes to disk.
    ///
    /// Every mutating store operation calls this before returning.
    pub async fn flush(&self) -> Result<()> {
        self.db
            .flush_async()
            .await
            .map_err(|e| AppError::Database(format!("Failed to flush database: {}", e)))?;
        Ok(())
    }

    /// Get database size in bytes
    pub fn size_on_disk(&self) -> Result<u64> {
        self.db
            .size_on_disk()
            .map_err(|e| AppError::Database(format!("Failed to get database size: {}", e)))
    }
}

#[async_trait]
impl RestaurantStore for SledStore {
    async fn insert_restaurant(&self, restaurant: &Restaurant) -> Result<()> {
        let value = Self::serialize(restaurant)?;
        let slug = restaurant.slug.as_bytes().to_vec();
        let id = restaurant.id.as_bytes().to_vec();

        // Slug claim and row commit together or not at all
        (&self.slugs_tree, &self.restaurants_tree)
            .transaction(|(slugs, restaurants)| {
                if slugs.get(&slug)?.is_some() {
                    return abort(AppError::Conflict(format!(
                        "Restaurant with slug '{}' already exists",
                        restaurant.slug
                    )));
                }
                if restaurants.get(&id)?.is_some() {
                    return abort(AppError::Conflict(format!(
                        "Restaurant {} already exists",
                        restaurant.id
                    )));
                }
                slugs.insert(slug.clone(), id.clone())?;
                restaurants.insert(id.clone(), value.clone())?;
                Ok(())
            })
            .map_err(Self::transaction_error)?;

        self.flush().await?;
        self.text_index.index_restaurant(restaurant)?;

        tracing::debug!(restaurant_id = %restaurant.id, slug = %restaurant.slug, "Restaurant saved to Sled");
        Ok(())
    }

    async fn get_restaurant(&self, id: &Uuid) -> Result<Option<Restaurant>> {
        match self.restaurants_tree.get(id.as_bytes()) {
            Ok(Some(bytes)) => Ok(Some(Self::deserialize(&bytes)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(AppError::Database(format!("Failed to get restaurant: {}", e))),
        }
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Restaurant>> {
        let Some(bytes) = self.slugs_tree.get(slug.as_bytes())? else {
            return Ok(None);
        };
        let id = Uuid::from_slice(&bytes)
            .map_err(|e| AppError::Serialization(format!("Corrupt slug index entry: {}", e)))?;
        self.get_restaurant(&id).await
    }

    async fn list_restaurants(&self, filter: &RestaurantFilter) -> Result<Vec<Restaurant>> {
        let restaurants = self
            .load_restaurants()?
            .into_iter()
            .filter(|r| filter.matches(r))
            .collect();
        Ok(filter.apply(restaurants))
    }

    async fn delete_restaurant(&self, id: &Uuid) -> Result<()> {
        let key = id.as_bytes().to_vec();
        (&self.restaurants_tree, &self.slugs_tree)
            .transaction(|(restaurants, slugs)| {
                let Some(bytes) = restaurants.remove(key.clone())? else {
                    return abort(AppError::NotFound(format!("Restaurant {} not found", id)));
                };
                let restaurant: Restaurant =
                    Self::deserialize(&bytes).map_err(ConflictableTransactionError::Abort)?;
                let slug = restaurant.slug.as_bytes().to_vec();
                if slugs.get(&slug)?.as_deref() == Some(&key[..]) {
                    slugs.remove(slug)?;
                }
                Ok(())
            })
            .map_err(Self::transaction_error)?;

        self.flush().await?;
        self.text_index.remove(id)?;

        tracing::debug!(restaurant_id = %id, "Restaurant deleted from Sled");
        Ok(())
    }

    async fn count_restaurants(&self) -> Result<usize> {
        Ok(self.restaurants_tree.len())
    }

    async fn patch_user_score(&self, id: &Uuid, score: f64, count: u32) -> Result<()> {
        Self::modify(
            &self.restaurants_tree,
            id.as_bytes(),
            &format!("Restaurant {}", id),
            |restaurant: &mut Restaurant| {
                restaurant.user_score = Some(score);
                restaurant.user_review_count = Some(count);
            },
        )?;
        self.flush().await?;

        tracing::debug!(restaurant_id = %id, score, count, "User score patched in Sled");
        Ok(())
    }

    async fn set_embedding(&self, id: &Uuid, embedding: Vec<f32>) -> Result<()> {
        Self::modify(
            &self.restaurants_tree,
            id.as_bytes(),
            &format!("Restaurant {}", id),
            |restaurant: &mut Restaurant| restaurant.embedding = Some(embedding.clone()),
        )?;
        self.flush().await
    }

    async fn search_field(
        &self,
        field: SearchField,
        query: &str,
        limit: usize,
    ) -> Result<Vec<Restaurant>> {
        let mut restaurants = Vec::new();
        for id in self.text_index.search(field, query, limit)? {
            if let Some(restaurant) = self.get_restaurant(&id).await? {
                restaurants.push(restaurant);
            }
        }
        Ok(restaurants)
    }

    async fn nearest_neighbors(&self, vector: &[f32], limit: usize) -> Result<Vec<VectorHit>> {
        let candidates: Vec<(Uuid, Vec<f32>)> = self
            .load_restaurants()?
            .into_iter()
            .filter_map(|r| r.embedding.map(|e| (r.id, e)))
            .collect();

        Ok(nearest_neighbors(
            vector,
            candidates.iter().map(|(id, e)| (*id, e.as_slice())),
            limit,
        ))
    }
}

#[async_trait]
impl ReviewStore for SledStore {
    async fn insert_review(&self, review: &Review) -> Result<()> {
        let value = Self::serialize(review)?;
        let pair = Self::pair_key(&review.user_id, &review.restaurant_id);
        let id = review.id.as_bytes().to_vec();
        let index_key = Self::restaurant_review_key(&review.restaurant_id, &review.id);

        // The pair is only claimed if the review row and its index entry land too
        (
            &self.review_pairs_tree,
            &self.reviews_tree,
            &self.restaurant_reviews_tree,
        )
            .transaction(|(pairs, reviews, index)| {
                if pairs.get(&pair)?.is_some() {
                    return abort(AppError::Conflict(
                        "You have already reviewed this restaurant".to_string(),
                    ));
                }
                if reviews.get(&id)?.is_some() {
                    return abort(AppError::Conflict(format!(
                        "Review {} already exists",
                        review.id
                    )));
                }
                pairs.insert(pair.clone(), id.clone())?;
                reviews.insert(id.clone(), value.clone())?;
                index.insert(index_key.clone(), Vec::<u8>::new())?;
                Ok(())
            })
            .map_err(Self::transaction_error)?;

        self.flush().await?;

        tracing::debug!(review_id = %review.id, restaurant_id = %review.restaurant_id, "Review saved to Sled");
        Ok(())
    }

    async fn get_review(&self, id: &Uuid) -> Result<Option<Review>> {
        match self.reviews_tree.get(id.as_bytes()) {
            Ok(Some(bytes)) => Ok(Some(Self::deserialize(&bytes)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(AppError::Database(format!("Failed to get review: {}", e))),
        }
    }

    async fn update_review(&self, review: &Review) -> Result<()> {
        Self::modify(
            &self.reviews_tree,
            review.id.as_bytes(),
            &format!("Review {}", review.id),
            |existing: &mut Review| {
                existing.score = review.score;
                existing.text = review.text.clone();
            },
        )?;
        self.flush().await?;

        tracing::debug!(review_id = %review.id, "Review updated in Sled");
        Ok(())
    }

    async fn delete_review(&self, id: &Uuid) -> Result<()> {
        let key = id.as_bytes().to_vec();
        (
            &self.reviews_tree,
            &self.review_pairs_tree,
            &self.restaurant_reviews_tree,
        )
            .transaction(|(reviews, pairs, index)| {
                let Some(bytes) = reviews.remove(key.clone())? else {
                    return abort(AppError::NotFound(format!("Review {} not found", id)));
                };
                let review: Review =
                    Self::deserialize(&bytes).map_err(ConflictableTransactionError::Abort)?;

                // Release the pair only if it still points at this review
                let pair = Self::pair_key(&review.user_id, &review.restaurant_id);
                if pairs.get(&pair)?.as_deref() == Some(&key[..]) {
                    pairs.remove(pair)?;
                }
                index.remove(Self::restaurant_review_key(&review.restaurant_id, id))?;
                Ok(())
            })
            .map_err(Self::transaction_error)?;

        self.flush().await?;

        tracing::debug!(review_id = %id, "Review deleted from Sled");
        Ok(())
    }

    async fn find_user_review(&self, user_id: &str, restaurant_id: &Uuid) -> Result<Option<Review>> {
        let Some(bytes) = self
            .review_pairs_tree
            .get(Self::pair_key(user_id, restaurant_id))?
        else {
            return Ok(None);
        };
        let id = Uuid::from_slice(&bytes)
            .map_err(|e| AppError::Serialization(format!("Corrupt review pair entry: {}", e)))?;
        self.get_review(&id).await
    }

    async fn reviews_for_restaurant(&self, restaurant_id: &Uuid) -> Result<Vec<Review>> {
        let mut reviews = Vec::new();
        for result in self.restaurant_reviews_tree.scan_prefix(restaurant_id.as_bytes()) {
            let (key, _) = result
                .map_err(|e| AppError::Database(format!("Failed to scan reviews: {}", e)))?;
            let review_id = Uuid::from_slice(&key[16..])
                .map_err(|e| AppError::Serialization(format!("Corrupt review index key: {}", e)))?;
            if let Some(review) = self.get_review(&review_id).await? {
                reviews.push(review);
            }
        }
        Ok(reviews)
    }
}

#[async_trait]
impl FavoriteStore for SledStore {
    async fn find_favorite(&self, user_id: &str, restaurant_id: &Uuid) -> Result<Option<Favorite>> {
        match self.favorites_tree.get(Self::pair_key(user_id, restaurant_id))? {
            Some(bytes) => Ok(Some(Self::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn toggle_favorite(&self, user_id: &str, restaurant_id: &Uuid) -> Result<bool> {
        let key = Self::pair_key(user_id, restaurant_id);
        loop {
            let current = self.favorites_tree.get(&key)?;
            let now_favorite = current.is_none();
            let next = if now_favorite {
                Some(Self::serialize(&Favorite::new(
                    user_id.to_string(),
                    *restaurant_id,
                ))?)
            } else {
                None
            };

            // Retry if another toggle on the same pair won the race
            if self
                .favorites_tree
                .compare_and_swap(&key, current, next)?
                .is_ok()
            {
                self.flush().await?;
                return Ok(now_favorite);
            }
        }
    }

    async fn favorites_for_user(&self, user_id: &str) -> Result<Vec<Favorite>> {
        let mut favorites = Vec::new();
        for result in self.favorites_tree.scan_prefix(Self::user_prefix(user_id)) {
            let (_, value) = result
                .map_err(|e| AppError::Database(format!("Failed to scan favorites: {}", e)))?;
            favorites.push(Self::deserialize::<Favorite>(&value)?);
        }
        favorites.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(favorites)
    }
}
