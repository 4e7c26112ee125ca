/// The error type for state operations.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    /// The forced batch was not found in state.
    #[error("forced batch {0} not found in state")]
    ForcedBatchNotFound(u64),
    /// The L1 block was not found in state.
    #[error("L1 block {0} not found in state")]
    L1BlockNotFound(u64),
    /// A batch with the same number is already open.
    #[error("batch {0} is already open")]
    BatchAlreadyOpen(u64),
    /// The batch to close was never opened.
    #[error("batch {0} is not open")]
    BatchNotOpen(u64),
    /// The backend reported an error.
    #[error("state backend error: {0}")]
    Backend(String),
}
