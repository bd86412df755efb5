//! Restaurant search powered by Tantivy and embedding vectors
//!
//! Two independent paths share this module:
//!
//! - **Keyword search**: one Tantivy text field per bilingual attribute. The
//!   [`SearchMergeEngine`] queries every field concurrently and merges the
//!   batches by caller-language priority with first-seen-wins deduplication.
//! - **Semantic search**: the query is embedded by the configured provider and
//!   matched against restaurant vectors by cosine similarity
//!   ([`SemanticSearch`]).
//!
//! ```text
//! query ──► SearchMergeEngine ──► 7 × EntityStore::search_field ──► TextIndex
//!       └─► SemanticSearch ──► Embedder ──► EntityStore::nearest_neighbors
//! ```
//!
//! # Example
//!
//! ```no_run
//! use restaurant_catalog::config::SearchConfig;
//! use restaurant_catalog::models::Language;
//! use restaurant_catalog::search::SearchMergeEngine;
//! use restaurant_catalog::state::create_in_memory_store;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SearchConfig::default();
//!     let store = create_in_memory_store(&config)?;
//!     let engine = SearchMergeEngine::new(store, config);
//!
//!     let cards = engine.search_by_name("hummus", Language::En).await?;
//!     println!("Found {} restaurants", cards.len());
//!     Ok(())
//! }
//! ```

mod document;
mod error;
mod index;
mod merge;
mod semantic;
mod vector;

pub use document::{build_restaurant_schema, SearchDocument, ID_FIELD};
pub use error::{SearchError, SearchResult};
pub use index::TextIndex;
pub use merge::{merge_plan, SearchMergeEngine};
pub use semantic::{SemanticSearch, DEFAULT_SEMANTIC_LIMIT, MAX_SEMANTIC_LIMIT};
pub use vector::{cosine_similarity, nearest_neighbors, VectorHit};
