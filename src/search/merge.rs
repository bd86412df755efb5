use crate::config::SearchConfig;
use crate::error::Result;
use crate::metrics::{SEARCH_DURATION_SECONDS, SEARCH_REQUESTS_TOTAL};
use crate::models::{Language, Restaurant, RestaurantCard, SearchField};
use crate::state::EntityStore;
use futures::future::join_all;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// Hits of one per-field query, labeled with the field they came from
#[derive(Debug)]
struct FieldBatch {
    field: SearchField,
    hits: Vec<Restaurant>,
}

/// Field queries in merge priority order for a caller language.
///
/// Preferred-language name, type, then address and preferred-language
/// description; the other language's name, type and description last.
pub fn merge_plan(lang: Language) -> [SearchField; 7] {
    let other = lang.other();
    [
        SearchField::name_in(lang),
        SearchField::type_in(lang),
        SearchField::Address,
        SearchField::description_in(lang),
        SearchField::name_in(other),
        SearchField::type_in(other),
        SearchField::description_in(other),
    ]
}

/// Keyword search across every bilingual field, merged by language priority
pub struct SearchMergeEngine {
    store: Arc<dyn EntityStore>,
    config: SearchConfig,
}

impl SearchMergeEngine {
    pub fn new(store: Arc<dyn EntityStore>, config: SearchConfig) -> Self {
        Self { store, config }
    }

    fn cap_for(&self, field: SearchField) -> usize {
        if field.is_description() {
            self.config.description_cap
        } else {
            self.config.field_cap
        }
    }

    /// Search restaurants by name, type, address and description.
    ///
    /// A blank query returns no results without touching the store.
    pub async fn search_by_name(&self, query: &str, lang: Language) -> Result<Vec<RestaurantCard>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let start = Instant::now();
        SEARCH_REQUESTS_TOTAL.with_label_values(&["keyword"]).inc();

        let plan = merge_plan(lang);
        let batches = join_all(plan.iter().map(|&field| async move {
            let hits = self
                .store
                .search_field(field, query, self.cap_for(field))
                .await?;
            Ok::<_, crate::error::AppError>(FieldBatch { field, hits })
        }))
        .await
        .into_iter()
        .collect::<Result<Vec<_>>>()?;

        let cards = merge_batches(&plan, batches, self.config.result_budget);

        SEARCH_DURATION_SECONDS
            .with_label_values(&["keyword"])
            .observe(start.elapsed().as_secs_f64());
        tracing::debug!(query, lang = %lang, results = cards.len(), "Keyword search completed");

        Ok(cards)
    }
}

/// Concatenate batches in `plan` order, keeping the first occurrence of each
/// restaurant, and cut to `budget`.
fn merge_batches(
    plan: &[SearchField],
    batches: Vec<FieldBatch>,
    budget: usize,
) -> Vec<RestaurantCard> {
    let mut by_field: HashMap<SearchField, Vec<Restaurant>> = batches
        .into_iter()
        .map(|batch| (batch.field, batch.hits))
        .collect();

    let mut seen: HashSet<Uuid> = HashSet::new();
    let mut merged = Vec::new();

    for field in plan {
        for restaurant in by_field.remove(field).unwrap_or_default() {
            if merged.len() == budget {
                return merged;
            }
            if seen.insert(restaurant.id) {
                merged.push(restaurant.to_card());
            }
        }
    }

    merged
}
