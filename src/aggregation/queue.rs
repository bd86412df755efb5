use crate::aggregation::ScoreAggregator;
use crate::config::AggregationConfig;
use crate::metrics::{AGGREGATION_QUEUE_PENDING, AGGREGATION_RUNS_TOTAL};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Background queue of score recalculations.
///
/// `schedule` returns immediately; a single worker drains the queue and
/// retries store failures with exponential backoff. A restaurant that no
/// longer exists is dropped without retry.
#[derive(Clone)]
pub struct AggregationQueue {
    task_tx: mpsc::UnboundedSender<Uuid>,
    pending: Arc<watch::Sender<usize>>,
}

impl AggregationQueue {
    /// Spawn the worker on the current tokio runtime
    pub fn start(aggregator: Arc<ScoreAggregator>, config: AggregationConfig) -> Self {
        let (task_tx, task_rx) = mpsc::unbounded_channel();
        let (pending, _) = watch::channel(0usize);
        let pending = Arc::new(pending);

        Self::spawn_worker(aggregator, config, task_rx, pending.clone());

        Self { task_tx, pending }
    }

    /// Enqueue a recalculation for `restaurant_id`
    pub fn schedule(&self, restaurant_id: Uuid) {
        self.pending.send_modify(|n| *n += 1);
        AGGREGATION_QUEUE_PENDING.inc();

        if self.task_tx.send(restaurant_id).is_err() {
            self.finish_one();
            error!(restaurant_id = %restaurant_id, "Aggregation worker is gone, recalculation dropped");
        }
    }

    /// Number of scheduled recalculations not yet finished
    pub fn pending(&self) -> usize {
        *self.pending.borrow()
    }

    /// Resolve once every scheduled recalculation has finished
    pub async fn wait_idle(&self) {
        let mut rx = self.pending.subscribe();
        // The sender lives in `self`, so the channel cannot close here
        let _ = rx.wait_for(|n| *n == 0).await;
    }

    fn finish_one(&self) {
        Self::decrement(&self.pending);
    }

    fn decrement(pending: &watch::Sender<usize>) {
        pending.send_modify(|n| *n = n.saturating_sub(1));
        AGGREGATION_QUEUE_PENDING.dec();
    }

    fn spawn_worker(
        aggregator: Arc<ScoreAggregator>,
        config: AggregationConfig,
        mut task_rx: mpsc::UnboundedReceiver<Uuid>,
        pending: Arc<watch::Sender<usize>>,
    ) {
        let max_attempts = config.max_attempts.max(1);
        let retry_backoff = config.retry_backoff_ms;

        tokio::spawn(async move {
            info!(max_attempts, "Aggregation worker started");

            while let Some(restaurant_id) = task_rx.recv().await {
                let mut attempts = 0;

                loop {
                    attempts += 1;

                    match aggregator.recalculate(&restaurant_id).await {
                        Ok(aggregate) => {
                            AGGREGATION_RUNS_TOTAL.with_label_values(&["success"]).inc();
                            debug!(
                                restaurant_id = %restaurant_id,
                                score = aggregate.score,
                                count = aggregate.count,
                                attempts,
                                "Aggregation completed"
                            );
                            break;
                        }
                        Err(e) if e.is_not_found() => {
                            AGGREGATION_RUNS_TOTAL.with_label_values(&["missing"]).inc();
                            warn!(
                                restaurant_id = %restaurant_id,
                                "Restaurant not found, skipping aggregation"
                            );
                            break;
                        }
                        Err(e) if attempts < max_attempts => {
                            AGGREGATION_RUNS_TOTAL.with_label_values(&["retry"]).inc();
                            let delay = backoff_delay(retry_backoff, attempts);
                            warn!(
                                restaurant_id = %restaurant_id,
                                attempt = attempts,
                                delay_ms = delay,
                                error = %e,
                                "Aggregation failed, retrying"
                            );
                            sleep(Duration::from_millis(delay)).await;
                        }
                        Err(e) => {
                            AGGREGATION_RUNS_TOTAL.with_label_values(&["failed"]).inc();
                            error!(
                                restaurant_id = %restaurant_id,
                                total_attempts = attempts,
                                error = %e,
                                "Aggregation failed after all retries"
                            );
                            break;
                        }
                    }
                }

                Self::decrement(&pending);
            }

            info!("Aggregation worker stopped");
        });
    }
}

/// Longest pause between two attempts of one recalculation
const MAX_RETRY_DELAY_MS: u64 = 60_000;

/// Exponential backoff before retry number `attempt` (1-based)
fn backoff_delay(base_ms: u64, attempt: u32) -> u64 {
    base_ms
        .saturating_mul(2_u64.saturating_pow(attempt.saturating_sub(1)))
        .min(MAX_RETRY_DELAY_MS)
}
