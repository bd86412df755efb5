use crate::error::{AppError, Result};
use crate::metrics::RESTAURANTS_IMPORTED_TOTAL;
use crate::models::{NewRestaurant, Restaurant, RestaurantCard, SortBy};
use crate::state::{EntityStore, RestaurantFilter};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Default size of the featured list
pub const DEFAULT_FEATURED_LIMIT: usize = 8;

/// Distinct cuisine types in both languages, sorted
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CuisineTypes {
    pub en: Vec<String>,
    pub he: Vec<String>,
}

/// Outcome of a bulk import
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImportSummary {
    pub inserted: usize,
    pub skipped: usize,
    pub total: usize,
}

/// Read-side catalog queries and bulk import
pub struct CatalogService {
    store: Arc<dyn EntityStore>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    /// Restaurants as cards, optionally filtered by English cuisine type
    pub async fn list(&self, filter: &RestaurantFilter) -> Result<Vec<RestaurantCard>> {
        let restaurants = self.store.list_restaurants(filter).await?;
        Ok(restaurants.iter().map(Restaurant::to_card).collect())
    }

    /// Full record, including descriptions and embedding
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Restaurant>> {
        self.store.find_by_slug(slug).await
    }

    pub async fn get_types(&self) -> Result<CuisineTypes> {
        let restaurants = self.store.list_restaurants(&RestaurantFilter::default()).await?;

        let mut en = BTreeSet::new();
        let mut he = BTreeSet::new();
        for r in restaurants {
            if !r.cuisine.is_empty() {
                en.insert(r.cuisine);
            }
            if !r.type_he.is_empty() {
                he.insert(r.type_he);
            }
        }

        Ok(CuisineTypes {
            en: en.into_iter().collect(),
            he: he.into_iter().collect(),
        })
    }

    /// Highest madad scores first
    pub async fn featured(&self, limit: Option<usize>) -> Result<Vec<RestaurantCard>> {
        let filter = RestaurantFilter {
            cuisine: None,
            sort_by: SortBy::Madad,
            limit: Some(limit.unwrap_or(DEFAULT_FEATURED_LIMIT)),
        };
        self.list(&filter).await
    }

    /// Insert every record whose slug is not yet taken.
    ///
    /// Re-running an import with the same records inserts nothing.
    pub async fn import(&self, records: Vec<NewRestaurant>) -> Result<ImportSummary> {
        let mut summary = ImportSummary {
            total: records.len(),
            ..Default::default()
        };

        for record in records {
            let restaurant = Restaurant::from_import(record);
            if restaurant.slug.is_empty() {
                tracing::warn!(name = %restaurant.name, "Import record without usable slug, skipping");
                summary.skipped += 1;
                continue;
            }

            if self.store.find_by_slug(&restaurant.slug).await?.is_some() {
                summary.skipped += 1;
                continue;
            }

            match self.store.insert_restaurant(&restaurant).await {
                Ok(()) => {
                    summary.inserted += 1;
                    RESTAURANTS_IMPORTED_TOTAL.inc();
                }
                // Lost a race with a concurrent import of the same slug
                Err(AppError::Conflict(_)) => summary.skipped += 1,
                Err(e) => return Err(e),
            }
        }

        tracing::info!(
            inserted = summary.inserted,
            skipped = summary.skipped,
            total = summary.total,
            "Import completed"
        );
        Ok(summary)
    }
}
