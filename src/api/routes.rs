use crate::api::{handlers, AppState};
use crate::metrics::track_metrics;
use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use std::time::Duration;
use tower_http::{
    cors::CorsLayer,
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};

/// Build the main API router
pub fn build_router(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        // Health and metrics
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics))
        // Catalog
        .route("/v1/restaurants", get(handlers::list_restaurants))
        .route("/v1/restaurants/featured", get(handlers::featured))
        .route("/v1/restaurants/types", get(handlers::get_types))
        .route("/v1/restaurants/search", get(handlers::search_by_name))
        .route("/v1/restaurants/semantic", get(handlers::semantic_search))
        .route("/v1/restaurants/by-slug/:slug", get(handlers::get_by_slug))
        .route("/v1/restaurants/:id/reviews", get(handlers::list_reviews))
        // Reviews
        .route("/v1/reviews", post(handlers::create_review))
        .route(
            "/v1/reviews/:id",
            put(handlers::update_review).delete(handlers::remove_review),
        )
        // Favorites
        .route("/v1/favorites", get(handlers::list_favorites))
        .route("/v1/favorites/ids", get(handlers::favorite_ids))
        .route(
            "/v1/favorites/:restaurant_id/toggle",
            post(handlers::toggle_favorite),
        )
        // Route-level so the matched path is known to the metrics layer
        .route_layer(middleware::from_fn(track_metrics))
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(true))
                .on_response(DefaultOnResponse::new().include_headers(true)),
        )
        .layer(TimeoutLayer::new(request_timeout))
        .layer(CorsLayer::permissive())
}
