use restaurant_catalog::{
    aggregation::{AggregationQueue, ScoreAggregator},
    api::{build_router, AppState},
    config::Config,
    embedding::{Embedder, GeminiEmbedder},
    state::create_store,
};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Upper bound on draining pending score recalculations at shutdown
const SHUTDOWN_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("Failed to load configuration: {}", e);
        eprintln!("Using default configuration");
        Config::default()
    });

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| {
            let level = &config.observability.log_level;
            format!("restaurant_catalog={level},tower_http={level}").into()
        });
    let registry = tracing_subscriber::registry().with(filter);
    if config.observability.json_logs {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!("Starting restaurant catalog v{}", env!("CARGO_PKG_VERSION"));

    // Initialize Prometheus metrics
    if config.observability.prometheus_enabled {
        if let Err(e) = restaurant_catalog::metrics::init_metrics() {
            tracing::warn!("Failed to initialize metrics: {}", e);
            tracing::warn!("Continuing without metrics");
        } else {
            tracing::info!("Prometheus metrics initialized");
        }
    } else {
        tracing::info!("Prometheus metrics disabled in configuration");
    }

    // Initialize storage backend
    tracing::info!("Storage backend: {:?}", config.state.backend);
    let store = create_store(&config.state, &config.search)?;
    tracing::info!(
        restaurants = store.count_restaurants().await?,
        "Storage backend initialized"
    );

    // Embedding provider is optional; semantic search is disabled without it
    let embedder: Option<Arc<dyn Embedder>> = if config.embedding.enabled {
        match GeminiEmbedder::from_env(&config.embedding) {
            Ok(embedder) => {
                tracing::info!(model = %config.embedding.model, "Embedding provider initialized");
                Some(Arc::new(embedder))
            }
            Err(e) => {
                tracing::warn!("Embedding provider initialization failed: {}", e);
                tracing::warn!("Continuing without semantic search");
                None
            }
        }
    } else {
        tracing::info!("Semantic search disabled in configuration");
        None
    };

    // Background score aggregation
    let aggregator = Arc::new(ScoreAggregator::new(store.clone()));
    let aggregation = AggregationQueue::start(aggregator, config.aggregation.clone());
    tracing::info!("Score aggregation worker started");

    let app_state = AppState::new(
        store,
        config.search.clone(),
        aggregation.clone(),
        embedder,
    );
    let app = build_router(
        app_state,
        Duration::from_secs(config.server.request_timeout_secs),
    );

    // Start HTTP server
    let http_addr = format!("{}:{}", config.server.host, config.server.http_port);
    let http_listener = tokio::net::TcpListener::bind(&http_addr).await?;

    tracing::info!("HTTP API server listening on http://{}", http_addr);
    tracing::info!("   Health check: http://{}/health", http_addr);
    tracing::info!("   REST API: http://{}/v1/restaurants", http_addr);

    axum::serve(http_listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
            }
            tracing::info!("Shutdown signal received");
        })
        .await?;

    tracing::info!(pending = aggregation.pending(), "Draining score aggregation queue");
    if tokio::time::timeout(SHUTDOWN_DRAIN_TIMEOUT, aggregation.wait_idle())
        .await
        .is_err()
    {
        tracing::warn!(
            pending = aggregation.pending(),
            "Shutdown with score recalculations still pending"
        );
    }

    tracing::info!("Shutting down gracefully...");
    Ok(())
}
