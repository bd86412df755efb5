use super::Embedder;
use crate::error::Result;
use crate::state::{EntityStore, RestaurantFilter};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info};

/// Successful embeddings between provider cool-downs
const BATCH_SIZE: usize = 10;

const BATCH_PAUSE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackfillSummary {
    /// Restaurants that received an embedding
    pub updated: usize,
    /// Restaurants that were missing an embedding
    pub total: usize,
}

/// Embed every restaurant that has no vector yet.
///
/// A failure for one restaurant is logged and skipped.
pub async fn backfill_embeddings(
    store: &dyn EntityStore,
    embedder: &dyn Embedder,
) -> Result<BackfillSummary> {
    let pending: Vec<_> = store
        .list_restaurants(&RestaurantFilter::default())
        .await?
        .into_iter()
        .filter(|r| !r.has_embedding())
        .collect();

    let mut summary = BackfillSummary {
        updated: 0,
        total: pending.len(),
    };
    info!(total = summary.total, "Starting embedding backfill");

    for restaurant in &pending {
        let embedding = match embedder.embed(&restaurant.embedding_text()).await {
            Ok(embedding) => embedding,
            Err(e) => {
                error!(restaurant_id = %restaurant.id, name = %restaurant.name, error = %e, "Failed to generate embedding");
                continue;
            }
        };

        if let Err(e) = store.set_embedding(&restaurant.id, embedding).await {
            error!(restaurant_id = %restaurant.id, error = %e, "Failed to store embedding");
            continue;
        }

        summary.updated += 1;
        if summary.updated % BATCH_SIZE == 0 {
            sleep(BATCH_PAUSE).await;
        }
    }

    info!(updated = summary.updated, total = summary.total, "Embedding backfill finished");
    Ok(summary)
}
