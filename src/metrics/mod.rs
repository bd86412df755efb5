//! Prometheus metrics for the restaurant catalog.
//!
//! All metrics live in a process-wide registry and are exported in text
//! format at `/metrics`.
//!
//! # Example
//! ```no_run
//! use restaurant_catalog::metrics::SEARCH_REQUESTS_TOTAL;
//!
//! SEARCH_REQUESTS_TOTAL.with_label_values(&["keyword"]).inc();
//! ```

pub mod middleware;

pub use middleware::track_metrics;

use lazy_static::lazy_static;
use prometheus::{
    Counter, CounterVec, Gauge, HistogramOpts, HistogramVec, Opts, Registry,
};
use std::sync::Once;

const NAMESPACE: &str = "restaurant_catalog";

lazy_static! {
    /// Global Prometheus registry for all metrics
    pub static ref PROMETHEUS_REGISTRY: Registry = Registry::new();

    // ============================================================================
    // HTTP Metrics
    // ============================================================================

    /// Total number of HTTP requests received
    ///
    /// Labels: method, path, status_code
    pub static ref HTTP_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("http_requests_total", "Total number of HTTP requests")
            .namespace(NAMESPACE),
        &["method", "path", "status_code"]
    ).expect("Failed to create HTTP_REQUESTS_TOTAL metric");

    /// HTTP request duration in seconds
    ///
    /// Labels: method, path
    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "http_request_duration_seconds",
            "HTTP request duration in seconds"
        )
        .namespace(NAMESPACE)
        .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        &["method", "path"]
    ).expect("Failed to create HTTP_REQUEST_DURATION_SECONDS metric");

    // ============================================================================
    // Search Metrics
    // ============================================================================

    /// Total number of search requests
    ///
    /// Labels: kind (keyword, semantic)
    pub static ref SEARCH_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("search_requests_total", "Total number of search requests")
            .namespace(NAMESPACE),
        &["kind"]
    ).expect("Failed to create SEARCH_REQUESTS_TOTAL metric");

    /// Search latency in seconds
    ///
    /// Labels: kind
    pub static ref SEARCH_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new("search_duration_seconds", "Search latency in seconds")
            .namespace(NAMESPACE)
            .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]),
        &["kind"]
    ).expect("Failed to create SEARCH_DURATION_SECONDS metric");

    // ============================================================================
    // Review & Favorite Metrics
    // ============================================================================

    /// Review mutations
    ///
    /// Labels: operation (create, update, delete), status (success, error code)
    pub static ref REVIEW_MUTATIONS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("review_mutations_total", "Total number of review mutations")
            .namespace(NAMESPACE),
        &["operation", "status"]
    ).expect("Failed to create REVIEW_MUTATIONS_TOTAL metric");

    /// Favorite toggles
    ///
    /// Labels: result (added, removed)
    pub static ref FAVORITE_TOGGLES_TOTAL: CounterVec = CounterVec::new(
        Opts::new("favorite_toggles_total", "Total number of favorite toggles")
            .namespace(NAMESPACE),
        &["result"]
    ).expect("Failed to create FAVORITE_TOGGLES_TOTAL metric");

    // ============================================================================
    // Aggregation Metrics
    // ============================================================================

    /// Score recalculation runs
    ///
    /// Labels: outcome (success, missing, retry, failed)
    pub static ref AGGREGATION_RUNS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("aggregation_runs_total", "Total number of score recalculation runs")
            .namespace(NAMESPACE),
        &["outcome"]
    ).expect("Failed to create AGGREGATION_RUNS_TOTAL metric");

    /// Recalculations scheduled but not yet finished
    pub static ref AGGREGATION_QUEUE_PENDING: Gauge = Gauge::with_opts(
        Opts::new("aggregation_queue_pending", "Score recalculations waiting or running")
            .namespace(NAMESPACE)
    ).expect("Failed to create AGGREGATION_QUEUE_PENDING metric");

    // ============================================================================
    // Catalog Metrics
    // ============================================================================

    /// Embedding provider calls
    ///
    /// Labels: outcome (success, error)
    pub static ref EMBEDDING_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("embedding_requests_total", "Total number of embedding provider calls")
            .namespace(NAMESPACE),
        &["outcome"]
    ).expect("Failed to create EMBEDDING_REQUESTS_TOTAL metric");

    /// Restaurants inserted by bulk import
    pub static ref RESTAURANTS_IMPORTED_TOTAL: Counter = Counter::with_opts(
        Opts::new("restaurants_imported_total", "Total number of imported restaurants")
            .namespace(NAMESPACE)
    ).expect("Failed to create RESTAURANTS_IMPORTED_TOTAL metric");
}

static INIT: Once = Once::new();

/// Register every metric with the global registry.
///
/// Safe to call more than once; only the first call registers.
pub fn init_metrics() -> Result<(), prometheus::Error> {
    let mut result = Ok(());
    INIT.call_once(|| result = register_metrics());
    result
}

fn register_metrics() -> Result<(), prometheus::Error> {
    PROMETHEUS_REGISTRY.register(Box::new(HTTP_REQUESTS_TOTAL.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()))?;

    PROMETHEUS_REGISTRY.register(Box::new(SEARCH_REQUESTS_TOTAL.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(SEARCH_DURATION_SECONDS.clone()))?;

    PROMETHEUS_REGISTRY.register(Box::new(REVIEW_MUTATIONS_TOTAL.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(FAVORITE_TOGGLES_TOTAL.clone()))?;

    PROMETHEUS_REGISTRY.register(Box::new(AGGREGATION_RUNS_TOTAL.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(AGGREGATION_QUEUE_PENDING.clone()))?;

    PROMETHEUS_REGISTRY.register(Box::new(EMBEDDING_REQUESTS_TOTAL.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(RESTAURANTS_IMPORTED_TOTAL.clone()))?;

    tracing::info!("Prometheus metrics registered");
    Ok(())
}

/// Gather all metrics in Prometheus text format
pub fn gather_metrics() -> String {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();
    let metric_families = PROMETHEUS_REGISTRY.gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::from("# Error encoding metrics\n");
    }

    String::from_utf8(buffer).unwrap_or_else(|e| {
        tracing::error!("Failed to convert metrics to string: {}", e);
        String::from("# Error converting metrics\n")
    })
}
