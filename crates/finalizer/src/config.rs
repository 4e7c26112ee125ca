use alloy_primitives::Address;
use std::time::Duration;

/// Configuration for the finalizer's forced-batch reconciliation.
#[derive(Debug, Clone)]
pub struct FinalizerConfig {
    /// The coinbase address for batches opened by the sequencer.
    pub coinbase: Address,
    /// How long buffered forced batches may wait before a drain is due.
    pub forced_batch_deadline: Duration,
}

impl FinalizerConfig {
    /// Returns a new instance of [`FinalizerConfig`].
    pub const fn new(coinbase: Address, forced_batch_deadline: Duration) -> Self {
        Self { coinbase, forced_batch_deadline }
    }
}
