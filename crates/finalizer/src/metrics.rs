use metrics::{Counter, Histogram};
use metrics_derive::Metrics;

/// The metrics for the [`super::Finalizer`].
#[derive(Metrics, Clone)]
#[metrics(scope = "finalizer")]
pub struct FinalizerMetrics {
    /// The number of forced batches processed.
    pub forced_batches_processed: Counter,
    /// The number of forced batches fetched from state to fill buffer gaps.
    pub forced_batch_gaps_filled: Counter,
    /// The number of transactions skipped because their sender could not be recovered.
    pub skipped_transactions: Counter,
    /// The processing duration for a single forced batch.
    pub forced_batch_processing_duration: Histogram,
}
