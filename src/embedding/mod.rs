//! Text embedding providers for semantic search

mod backfill;
mod gemini;

pub use backfill::{backfill_embeddings, BackfillSummary};
pub use gemini::GeminiEmbedder;

use crate::error::AppError;
use async_trait::async_trait;

/// Errors raised while producing an embedding
#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    /// The provider could not be reached
    #[error("embedding request failed: {0}")]
    Request(String),

    /// The provider answered with a non-2xx status
    #[error("embedding provider returned {status}: {message}")]
    Status { status: u16, message: String },

    /// The response body did not contain a vector
    #[error("malformed embedding response: {0}")]
    MalformedResponse(String),

    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// No API key in the configured environment variable
    #[error("embedding API key not set: {0}")]
    MissingApiKey(String),
}

impl From<EmbeddingError> for AppError {
    fn from(err: EmbeddingError) -> Self {
        match err {
            EmbeddingError::MissingApiKey(_) => AppError::Configuration(err.to_string()),
            other => AppError::Upstream(other.to_string()),
        }
    }
}

/// Converts text into a fixed-length vector
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Length of every vector this embedder returns
    fn dimensions(&self) -> usize;

    fn validate_vector(&self, vector: &[f32]) -> Result<(), EmbeddingError> {
        if vector.len() != self.dimensions() {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.dimensions(),
                actual: vector.len(),
            });
        }
        Ok(())
    }
}
