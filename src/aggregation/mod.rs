//! Review score aggregation.
//!
//! `ScoreAggregator` recomputes a restaurant's `(userScore, userReviewCount)`
//! from every one of its reviews. `AggregationQueue` runs those recomputations
//! in the background after each review mutation.

mod aggregator;
mod queue;

pub use aggregator::{average_score, RecalculationSummary, ScoreAggregator, UserScore};
pub use queue::AggregationQueue;
