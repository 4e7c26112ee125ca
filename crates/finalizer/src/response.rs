use crate::{Finalizer, FinalizerError, ForcedTxWorker, L2BlockSink};

use sequencer_executor::BatchExecutor;
use sequencer_primitives::{recover_sender, ExecutionResponse};
use sequencer_state::{StateOperations, StateProvider};

impl<S, E, W, D> Finalizer<S, E, W, D>
where
    S: StateProvider + Send + Sync,
    E: BatchExecutor + Send + Sync,
    W: ForcedTxWorker + Send + Sync,
    D: L2BlockSink + Send + Sync,
{
    /// Propagates the downstream effects of a committed forced batch.
    ///
    /// The worker pool learns about the forced transactions up front; everything else waits
    /// behind the durability gate, so no L2 block is persisted or streamed before the engine
    /// confirms the batch's flush id durable.
    pub(crate) async fn handle_forced_batch_response(
        &self,
        response: &ExecutionResponse,
    ) -> Result<(), FinalizerError> {
        self.add_forced_txs_to_worker(response);

        self.flush_tracker.record_pending(response.flush_id);
        if !self.flush_tracker.wait_until_stored(response.flush_id, &self.cancel).await {
            // Cancelled mid-wait. The batch itself is committed; a later pass will observe the
            // satisfied flush id and apply the remaining effects.
            tracing::debug!(
                target: "sequencer::finalizer",
                flush_id = response.flush_id,
                "cancelled while waiting for stored flush id"
            );
            return Ok(());
        }

        for block in &response.block_responses {
            self.state.store_l2_block(response.new_batch_number, block).await?;

            for tx_response in &block.transaction_responses {
                match recover_sender(&tx_response.tx) {
                    Ok(from) => {
                        self.worker.tx_processed(tx_response.tx_hash, from, true, response)
                    }
                    Err(err) => {
                        self.metrics.skipped_transactions.increment(1);
                        tracing::warn!(
                            target: "sequencer::finalizer",
                            tx_hash = %tx_response.tx_hash,
                            %err,
                            "failed to get sender for tx"
                        );
                    }
                }
            }

            // Best-effort: a sink failure must not fail the batch or roll back state.
            if let Err(err) = self.stream.send_l2_block(response.new_batch_number, block).await {
                tracing::error!(
                    target: "sequencer::finalizer",
                    block_number = block.block_number,
                    %err,
                    "error sending L2 block to data stream"
                );
            }
        }

        Ok(())
    }

    /// Registers every recoverable forced transaction with the worker pool.
    fn add_forced_txs_to_worker(&self, response: &ExecutionResponse) {
        for block in &response.block_responses {
            for tx_response in &block.transaction_responses {
                match recover_sender(&tx_response.tx) {
                    Ok(from) => self.worker.add_forced_tx(tx_response.tx_hash, from),
                    Err(err) => {
                        tracing::warn!(
                            target: "sequencer::finalizer",
                            tx_hash = %tx_response.tx_hash,
                            %err,
                            "failed to add forced tx to worker"
                        );
                    }
                }
            }
        }
    }
}
