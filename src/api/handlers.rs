use crate::api::{caller_from_headers, AppState};
use crate::error::{AppError, Result};
use crate::models::*;
use crate::services::CuisineTypes;
use crate::state::RestaurantFilter;
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Health check endpoint
pub async fn health_check() -> Result<Json<HealthResponse>> {
    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Prometheus metrics endpoint
///
/// Returns metrics in Prometheus text exposition format
pub async fn metrics() -> (StatusCode, String) {
    (StatusCode::OK, crate::metrics::gather_metrics())
}

// ---- Catalog ----

/// List restaurants
pub async fn list_restaurants(
    State(state): State<AppState>,
    Query(params): Query<ListRestaurantsQuery>,
) -> Result<Json<Vec<RestaurantCard>>> {
    let filter = RestaurantFilter {
        cuisine: params.cuisine.filter(|c| !c.is_empty()),
        sort_by: params.sort_by.unwrap_or_default(),
        limit: params.limit,
    };
    Ok(Json(state.catalog.list(&filter).await?))
}

#[derive(Debug, Deserialize)]
pub struct ListRestaurantsQuery {
    #[serde(rename = "type")]
    pub cuisine: Option<String>,
    pub sort_by: Option<SortBy>,
    pub limit: Option<usize>,
}

pub async fn featured(
    State(state): State<AppState>,
    Query(params): Query<LimitQuery>,
) -> Result<Json<Vec<RestaurantCard>>> {
    Ok(Json(state.catalog.featured(params.limit).await?))
}

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

pub async fn get_types(State(state): State<AppState>) -> Result<Json<CuisineTypes>> {
    Ok(Json(state.catalog.get_types().await?))
}

/// Full restaurant record by slug
pub async fn get_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Restaurant>> {
    let restaurant = state
        .catalog
        .get_by_slug(&slug)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Restaurant {} not found", slug)))?;
    Ok(Json(restaurant))
}

// ---- Search ----

/// Keyword search across names, types, address and descriptions
pub async fn search_by_name(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> Result<Json<Vec<RestaurantCard>>> {
    let lang = params.lang.unwrap_or_default();
    Ok(Json(state.search.search_by_name(&params.q, lang).await?))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
    pub lang: Option<Language>,
}

/// Natural-language search over embeddings
pub async fn semantic_search(
    State(state): State<AppState>,
    Query(params): Query<SemanticQuery>,
) -> Result<Json<Vec<ScoredRestaurant>>> {
    Ok(Json(
        state
            .semantic
            .natural_language_search(&params.q, params.limit)
            .await?,
    ))
}

#[derive(Debug, Deserialize)]
pub struct SemanticQuery {
    #[serde(default)]
    pub q: String,
    pub limit: Option<usize>,
}

// ---- Reviews ----

pub async fn list_reviews(
    State(state): State<AppState>,
    Path(restaurant_id): Path<Uuid>,
) -> Result<Json<Vec<Review>>> {
    Ok(Json(state.reviews.list_for_restaurant(restaurant_id).await?))
}

/// Create a review authored by the caller
pub async fn create_review(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CreateReviewRequest>,
) -> Result<(StatusCode, Json<Review>)> {
    let caller = caller_from_headers(&headers);
    let caller = require_caller(caller.as_ref())?;
    request.validate()?;

    let review = state
        .reviews
        .create(
            request.restaurant_id,
            &caller.id,
            &caller.name,
            request.score,
            &request.text,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(review)))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateReviewRequest {
    pub restaurant_id: Uuid,
    #[validate(range(min = 1.0, max = 10.0))]
    pub score: f64,
    #[serde(default)]
    pub text: String,
}

pub async fn update_review(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateReviewRequest>,
) -> Result<Json<Review>> {
    let caller = caller_from_headers(&headers);
    let review = state
        .reviews
        .update(caller.as_ref(), id, request.score, &request.text)
        .await?;
    Ok(Json(review))
}

#[derive(Debug, Deserialize)]
pub struct UpdateReviewRequest {
    pub score: f64,
    #[serde(default)]
    pub text: String,
}

pub async fn remove_review(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    let caller = caller_from_headers(&headers);
    state.reviews.remove(caller.as_ref(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---- Favorites ----

pub async fn toggle_favorite(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(restaurant_id): Path<Uuid>,
) -> Result<Json<ToggleResponse>> {
    let caller = caller_from_headers(&headers);
    let favorite = state.favorites.toggle(caller.as_ref(), restaurant_id).await?;
    Ok(Json(ToggleResponse { favorite }))
}

#[derive(Debug, Serialize)]
pub struct ToggleResponse {
    /// Whether the restaurant is a favorite after the toggle
    pub favorite: bool,
}

pub async fn list_favorites(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<RestaurantCard>>> {
    let caller = caller_from_headers(&headers);
    Ok(Json(state.favorites.favorites(caller.as_ref()).await?))
}

pub async fn favorite_ids(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<Uuid>>> {
    let caller = caller_from_headers(&headers);
    Ok(Json(state.favorites.favorite_ids(caller.as_ref()).await?))
}
