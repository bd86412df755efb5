//! Exact nearest-neighbor scan over restaurant embeddings

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use uuid::Uuid;

/// A vector index hit, higher score = more similar
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VectorHit {
    pub id: Uuid,
    pub score: f32,
}

/// Cosine similarity: dot(a,b) / (||a|| * ||b||)
///
/// Range: [-1, 1]. Returns 0.0 if either vector has zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a = l2_norm(a);
    let norm_b = l2_norm(b);

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Rank every candidate by cosine similarity to `query` and keep the best `limit`.
///
/// Candidates whose dimension differs from the query are skipped. Equal scores
/// are ordered by id so results are deterministic.
pub fn nearest_neighbors<'a, I>(query: &[f32], candidates: I, limit: usize) -> Vec<VectorHit>
where
    I: IntoIterator<Item = (Uuid, &'a [f32])>,
{
    if limit == 0 || query.is_empty() {
        return Vec::new();
    }

    let mut hits: Vec<VectorHit> = candidates
        .into_iter()
        .filter(|(_, vector)| vector.len() == query.len())
        .map(|(id, vector)| VectorHit {
            id,
            score: cosine_similarity(query, vector),
        })
        .collect();

    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });
    hits.truncate(limit);
    hits
}
