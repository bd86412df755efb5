use crate::error::Result;
use crate::metrics::FAVORITE_TOGGLES_TOTAL;
use crate::models::{require_caller, AuthUser, RestaurantCard};
use crate::state::EntityStore;
use std::sync::Arc;
use uuid::Uuid;

/// Per-user favorite restaurants
pub struct FavoriteService {
    store: Arc<dyn EntityStore>,
}

impl FavoriteService {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    /// Flip membership of `restaurant_id` in the caller's favorites.
    ///
    /// Returns `true` when the restaurant was added, `false` when removed.
    pub async fn toggle(&self, caller: Option<&AuthUser>, restaurant_id: Uuid) -> Result<bool> {
        let caller = require_caller(caller)?;
        let added = self.store.toggle_favorite(&caller.id, &restaurant_id).await?;

        FAVORITE_TOGGLES_TOTAL
            .with_label_values(&[if added { "added" } else { "removed" }])
            .inc();
        tracing::debug!(user_id = %caller.id, restaurant_id = %restaurant_id, added, "Favorite toggled");
        Ok(added)
    }

    /// Ids of the caller's favorites; empty for anonymous callers
    pub async fn favorite_ids(&self, caller: Option<&AuthUser>) -> Result<Vec<Uuid>> {
        let Some(caller) = caller else {
            return Ok(Vec::new());
        };
        Ok(self
            .store
            .favorites_for_user(&caller.id)
            .await?
            .into_iter()
            .map(|f| f.restaurant_id)
            .collect())
    }

    /// The caller's favorite restaurants, newest favorite first.
    ///
    /// Restaurants that no longer exist are skipped.
    pub async fn favorites(&self, caller: Option<&AuthUser>) -> Result<Vec<RestaurantCard>> {
        let Some(caller) = caller else {
            return Ok(Vec::new());
        };

        let mut cards = Vec::new();
        for favorite in self.store.favorites_for_user(&caller.id).await? {
            if let Some(restaurant) = self.store.get_restaurant(&favorite.restaurant_id).await? {
                cards.push(restaurant.to_card());
            }
        }
        Ok(cards)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SearchConfig;
    use crate::error::AppError;
    use crate::models::{NewRestaurant, Restaurant};
    use crate::state::{InMemoryStore, RestaurantStore};

    async fn setup() -> (Arc<InMemoryStore>, FavoriteService, Restaurant) {
        let store = Arc::new(InMemoryStore::new(&SearchConfig::default()).unwrap());
        let restaurant = Restaurant::from_import(NewRestaurant {
            name: "Mashya".to_string(),
            ..Default::default()
        });
        store.insert_restaurant(&restaurant).await.unwrap();
        let service = FavoriteService::new(store.clone());
        (store, service, restaurant)
    }

    #[tokio::test]
    async fn test_toggle_requires_caller() {
        let (_store, service, restaurant) = setup().await;
        assert!(matches!(
            service.toggle(None, restaurant.id).await,
            Err(AppError::Authentication(_))
        ));
    }

    #[tokio::test]
    async fn test_toggle_round_trip() {
        let (_store, service, restaurant) = setup().await;
        let user = AuthUser::new("u1", "Dana");

        assert!(service.toggle(Some(&user), restaurant.id).await.unwrap());
        assert_eq!(service.favorite_ids(Some(&user)).await.unwrap(), vec![restaurant.id]);
        assert!(!service.toggle(Some(&user), restaurant.id).await.unwrap());
        assert!(service.favorite_ids(Some(&user)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_anonymous_reads_are_empty() {
        let (_store, service, _) = setup().await;
        assert!(service.favorite_ids(None).await.unwrap().is_empty());
        assert!(service.favorites(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_favorites_skip_deleted_restaurants() {
        let (store, service, restaurant) = setup().await;
        let user = AuthUser::new("u1", "Dana");
        let ghost = Uuid::new_v4();

        service.toggle(Some(&user), restaurant.id).await.unwrap();
        service.toggle(Some(&user), ghost).await.unwrap();

        let cards = service.favorites(Some(&user)).await.unwrap();
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].id, restaurant.id);
        assert_eq!(store.count_restaurants().await.unwrap(), 1);
    }
}
