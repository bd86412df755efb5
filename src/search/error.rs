//! Text index failures

use crate::error::AppError;

pub type SearchResult<T> = std::result::Result<T, SearchError>;

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// The in-RAM index, its writer or its reader could not be created
    #[error("failed to open text index: {0}")]
    Open(String),

    /// A field the schema should define is missing
    #[error("text index schema mismatch: {0}")]
    Schema(String),

    /// Adding, replacing or removing documents failed
    #[error("text index write failed: {0}")]
    Write(String),

    #[error("text query failed: {0}")]
    Query(String),

    #[error(transparent)]
    Tantivy(#[from] tantivy::TantivyError),
}

impl From<SearchError> for AppError {
    fn from(err: SearchError) -> Self {
        AppError::Search(err.to_string())
    }
}
