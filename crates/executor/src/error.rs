/// The error type for execution-engine interactions.
#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    /// The engine failed to execute the batch.
    #[error("batch execution failed: {0}")]
    Execution(String),
    /// The engine could not be reached.
    #[error("executor transport error: {0}")]
    Transport(String),
}
