use sequencer_executor::ExecutorError;
use sequencer_state::StateError;

/// The error type for the finalizer's forced-batch reconciliation.
#[derive(Debug, thiserror::Error)]
pub enum FinalizerError {
    /// Encountered an error interacting with state.
    #[error("encountered an error interacting with state: {0}")]
    State(#[from] StateError),
    /// A state operation failed while processing a forced batch.
    #[error("state error while processing forced batch {forced_batch_number}: {source}")]
    ForcedBatchState {
        /// The forced batch being processed.
        forced_batch_number: u64,
        /// The underlying state error.
        source: StateError,
    },
    /// The execution engine failed while processing a forced batch.
    #[error("failed to execute forced batch {forced_batch_number}: {source}")]
    ForcedBatchExecution {
        /// The forced batch being processed.
        forced_batch_number: u64,
        /// The underlying executor error.
        source: ExecutorError,
    },
    /// Rolling back a failed batch transition itself failed; both causes are reported.
    #[error("rollback failed with {rollback}, while handling: {original}")]
    Rollback {
        /// The error that triggered the rollback.
        original: Box<FinalizerError>,
        /// The error returned by the rollback itself.
        rollback: StateError,
    },
}
