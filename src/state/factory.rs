use crate::config::{SearchConfig, StateBackend, StateConfig};
use crate::error::{AppError, Result};
use crate::state::{EntityStore, InMemoryStore, SledStore};
use std::sync::Arc;

/// Create an entity store based on configuration
pub fn create_store(config: &StateConfig, search: &SearchConfig) -> Result<Arc<dyn EntityStore>> {
    match config.backend {
        StateBackend::Sled => {
            let path = config.path.as_ref().ok_or_else(|| {
                AppError::Configuration("Sled backend requires 'path' configuration".to_string())
            })?;

            tracing::info!(path = ?path, "Initializing Sled storage backend");

            let store = SledStore::new(path, search)?;
            Ok(Arc::new(store))
        }

        StateBackend::Memory => create_in_memory_store(search),
    }
}

/// Create an in-memory store (for testing and development)
pub fn create_in_memory_store(search: &SearchConfig) -> Result<Arc<dyn EntityStore>> {
    tracing::info!("Initializing in-memory storage backend");
    Ok(Arc::new(InMemoryStore::new(search)?))
}
