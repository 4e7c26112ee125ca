use crate::ExecutorError;

use sequencer_primitives::{ExecutionRequest, ExecutionResponse};

/// The request/response contract of the execution engine.
///
/// The engine computes state transitions and reports the durability checkpoint (`flush_id`) each
/// response depends on; how it computes state roots is outside this workspace.
#[async_trait::async_trait]
#[auto_impl::auto_impl(&, Arc)]
pub trait BatchExecutor {
    /// Submits a batch for execution and returns the engine's response.
    async fn process_batch(
        &self,
        request: ExecutionRequest,
    ) -> Result<ExecutionResponse, ExecutorError>;
}
