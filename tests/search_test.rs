//! Keyword merge ordering and semantic search against real stores

use mockito::Matcher;
use restaurant_catalog::config::{EmbeddingConfig, SearchConfig};
use restaurant_catalog::embedding::{backfill_embeddings, Embedder, GeminiEmbedder};
use restaurant_catalog::error::AppError;
use restaurant_catalog::models::{Language, NewRestaurant};
use restaurant_catalog::search::{SearchMergeEngine, SemanticSearch};
use restaurant_catalog::services::CatalogService;
use restaurant_catalog::state::{create_in_memory_store, EntityStore};
use std::sync::Arc;
use uuid::Uuid;

/// Helper to create an import record
fn record(name: &str, name_he: &str, address: &str, description: &str) -> NewRestaurant {
    NewRestaurant {
        name: name.to_string(),
        name_he: name_he.to_string(),
        address: address.to_string(),
        description: description.to_string(),
        slug: Uuid::new_v4().to_string(),
        ..Default::default()
    }
}

async fn seeded_store(
    config: &SearchConfig,
    records: Vec<NewRestaurant>,
) -> Arc<dyn EntityStore> {
    let store = create_in_memory_store(config).unwrap();
    CatalogService::new(store.clone())
        .import(records)
        .await
        .unwrap();
    store
}

fn names(cards: &[restaurant_catalog::models::RestaurantCard]) -> Vec<&str> {
    cards.iter().map(|c| c.name.as_str()).collect()
}

#[tokio::test]
async fn test_preferred_language_ranks_first() {
    let config = SearchConfig::default();
    let store = seeded_store(
        &config,
        vec![
            record("Hof", "Pasta Hof", "", ""),
            record("Trattoria", "", "", "Best pasta in town"),
            record("Pasta Basta", "", "", ""),
        ],
    )
    .await;
    let engine = SearchMergeEngine::new(store, config);

    let en = engine.search_by_name("Pasta", Language::En).await.unwrap();
    // nameHe-only match is an other-language fallback, after the English description
    assert_eq!(names(&en), vec!["Pasta Basta", "Trattoria", "Hof"]);

    let he = engine.search_by_name("Pasta", Language::He).await.unwrap();
    assert_eq!(names(&he), vec!["Hof", "Pasta Basta", "Trattoria"]);
}

#[tokio::test]
async fn test_hebrew_query() {
    let config = SearchConfig::default();
    let store = seeded_store(
        &config,
        vec![
            record("Miznon", "מזנון", "", ""),
            record("Port Said", "פורט סעיד", "", ""),
        ],
    )
    .await;
    let engine = SearchMergeEngine::new(store, config);

    let results = engine.search_by_name("מזנון", Language::He).await.unwrap();
    assert_eq!(names(&results), vec!["Miznon"]);
}

#[tokio::test]
async fn test_multi_field_match_appears_once() {
    let config = SearchConfig::default();
    let store = seeded_store(
        &config,
        vec![
            record("Dizengoff Grill", "", "Dizengoff 100, Tel Aviv", "Grill on Dizengoff"),
            record("Beach Bar", "", "Dizengoff 1, Tel Aviv", ""),
        ],
    )
    .await;
    let engine = SearchMergeEngine::new(store, config);

    let results = engine.search_by_name("dizengoff", Language::En).await.unwrap();
    assert_eq!(names(&results), vec!["Dizengoff Grill", "Beach Bar"]);
}

#[tokio::test]
async fn test_prefix_of_last_term_matches() {
    let config = SearchConfig::default();
    let store = seeded_store(&config, vec![record("Shakshukia", "", "", "")]).await;
    let engine = SearchMergeEngine::new(store, config);

    let results = engine.search_by_name("shak", Language::En).await.unwrap();
    assert_eq!(results.len(), 1);
}

#[tokio::test]
async fn test_blank_query_returns_nothing() {
    let config = SearchConfig::default();
    let store = seeded_store(&config, vec![record("Pasta Basta", "", "", "")]).await;
    let engine = SearchMergeEngine::new(store, config);

    assert!(engine.search_by_name("", Language::En).await.unwrap().is_empty());
    assert!(engine.search_by_name("   ", Language::He).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_result_budget_caps_merged_list() {
    let config = SearchConfig {
        field_cap: 50,
        result_budget: 30,
        ..Default::default()
    };
    let records = (0..40)
        .map(|i| record(&format!("Falafel {i}"), "", "", ""))
        .collect();
    let store = seeded_store(&config, records).await;
    let engine = SearchMergeEngine::new(store, config);

    let results = engine.search_by_name("falafel", Language::En).await.unwrap();
    assert_eq!(results.len(), 30);
}

#[tokio::test]
async fn test_field_cap_limits_single_field() {
    let config = SearchConfig::default();
    let records = (0..20)
        .map(|i| record(&format!("Sabich {i}"), "", "", ""))
        .collect();
    let store = seeded_store(&config, records).await;
    let engine = SearchMergeEngine::new(store, config);

    let results = engine.search_by_name("sabich", Language::En).await.unwrap();
    assert_eq!(results.len(), 15);
}

fn embedding_config(base_url: String) -> EmbeddingConfig {
    EmbeddingConfig {
        enabled: true,
        base_url,
        dimensions: 3,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_semantic_search_through_provider() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/models/text-embedding-004:embedContent")
        .match_query(Matcher::UrlEncoded("key".into(), "k".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"embedding":{"values":[1.0,0.0,0.0]}}"#)
        .create_async()
        .await;

    let config = SearchConfig::default();
    let store = seeded_store(
        &config,
        vec![record("Cozy Corner", "", "", ""), record("Loud Place", "", "", "")],
    )
    .await;

    let embedder: Arc<dyn Embedder> =
        Arc::new(GeminiEmbedder::new(&embedding_config(server.url()), "k".to_string()).unwrap());
    let summary = backfill_embeddings(store.as_ref(), embedder.as_ref())
        .await
        .unwrap();
    assert_eq!(summary.updated, 2);

    let search = SemanticSearch::new(store, Some(embedder));
    let results = search
        .natural_language_search("a quiet place", Some(1))
        .await
        .unwrap();
    assert_eq!(results.len(), 1);
    assert!((results[0].similarity - 1.0).abs() < 1e-6);
}

#[tokio::test]
async fn test_semantic_search_provider_down_is_upstream() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", Matcher::Any)
        .with_status(500)
        .with_body("boom")
        .create_async()
        .await;

    let store = create_in_memory_store(&SearchConfig::default()).unwrap();
    let embedder = GeminiEmbedder::new(&embedding_config(server.url()), "k".to_string()).unwrap();
    let search = SemanticSearch::new(store, Some(Arc::new(embedder)));

    let err = search.natural_language_search("anything", None).await.unwrap_err();
    assert!(matches!(err, AppError::Upstream(_)));
    assert_eq!(err.status_code(), axum::http::StatusCode::BAD_GATEWAY);
}
