//! The finality-reconciliation core of the sequencer.
//!
//! The finalizer ingests forced batches committed by the L1 contract independently of the
//! sequencer's own ordering and folds them into the local state chain (batch number, state root,
//! accumulated input hash) in strict, gap-free order. Each batch's open/execute/close sequence
//! runs inside one state transaction with rollback on failure, and downstream effects are only
//! exposed once the execution engine confirms the batch durable.

use std::{
    sync::Arc,
    time::{Instant, SystemTime, UNIX_EPOCH},
};

use sequencer_executor::{BatchExecutor, FlushTracker};
use sequencer_primitives::{
    BatchResources, Caller, Checkpoint, ClosingReason, ExecutionRequest, ForcedBatch,
    ProcessingContext, ProcessingReceipt,
};
use sequencer_state::{StateOperations, StateProvider, StateTransaction};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

pub use config::FinalizerConfig;
mod config;

pub use error::FinalizerError;
mod error;

use metrics::FinalizerMetrics;
mod metrics;

pub use pending::PendingForcedBatches;
mod pending;

mod response;

pub use sink::L2BlockSink;
mod sink;

pub use worker::ForcedTxWorker;
mod worker;

/// The forced-batch reconciliation core.
///
/// Generic over the state provider `S`, the execution engine `E`, the worker pool `W` and the
/// data-stream sink `D`, all consumed through their contracts.
pub struct Finalizer<S, E, W, D> {
    /// The state provider.
    state: S,
    /// The execution engine client.
    executor: E,
    /// The worker pool notified of forced transactions.
    worker: W,
    /// The data-stream sink produced blocks are forwarded to.
    stream: D,
    /// The durability tracker shared with the execution-response consumer.
    flush_tracker: Arc<FlushTracker>,
    /// The cancellation signal of the surrounding operation.
    cancel: CancellationToken,
    /// The finalizer configuration.
    config: FinalizerConfig,
    /// The buffered forced batches awaiting processing.
    pending: Mutex<PendingForcedBatches>,
    /// The finalizer metrics.
    metrics: FinalizerMetrics,
}

impl<S, E, W, D> Finalizer<S, E, W, D>
where
    S: StateProvider + Send + Sync,
    E: BatchExecutor + Send + Sync,
    W: ForcedTxWorker + Send + Sync,
    D: L2BlockSink + Send + Sync,
{
    /// Creates a new [`Finalizer`].
    pub fn new(
        state: S,
        executor: E,
        worker: W,
        stream: D,
        flush_tracker: Arc<FlushTracker>,
        cancel: CancellationToken,
        config: FinalizerConfig,
    ) -> Self {
        Self {
            state,
            executor,
            worker,
            stream,
            flush_tracker,
            cancel,
            config,
            pending: Mutex::new(PendingForcedBatches::default()),
            metrics: FinalizerMetrics::default(),
        }
    }

    /// Buffers a forced batch observed on L1. Buffering the first batch arms the processing
    /// deadline.
    pub async fn add_forced_batch(&self, batch: ForcedBatch) {
        tracing::trace!(target: "sequencer::finalizer", forced_batch_number = batch.number, "buffering forced batch");
        self.pending.lock().await.push(batch, self.config.forced_batch_deadline);
    }

    /// Returns `true` if forced batches are buffered.
    pub async fn has_pending_forced_batches(&self) -> bool {
        !self.pending.lock().await.is_empty()
    }

    /// Returns `true` if buffered forced batches have passed their processing deadline.
    pub async fn forced_batch_deadline_expired(&self, now: Instant) -> bool {
        self.pending.lock().await.deadline_expired(now)
    }

    /// Processes all buffered forced batches in strictly increasing, gap-free order.
    ///
    /// Returns the checkpoint after the last fully committed batch. A failing batch aborts the
    /// drain; the next drain recomputes its starting point from the durable last-trusted marker,
    /// so no progress is lost.
    pub async fn process_forced_batches(&self, checkpoint: Checkpoint) -> Checkpoint {
        // The lock spans the whole drain, keeping gap resolution atomic against concurrent
        // enqueues. Taking the buffer up front clears it on success and abort alike: aborted
        // batches are re-sourced from state on the next drain, never replayed from a stale
        // buffer.
        let mut pending = self.pending.lock().await;
        let batches = pending.take();

        let last_forced_batch_number = match self.state.last_trusted_forced_batch_number().await {
            Ok(number) => number,
            Err(err) => {
                tracing::error!(target: "sequencer::finalizer", %err, "failed to get last trusted forced batch number");
                return checkpoint;
            }
        };
        let mut next_forced_batch_number = last_forced_batch_number + 1;
        let mut checkpoint = checkpoint;

        for buffered in batches {
            // Skip already processed forced batches.
            if buffered.number < next_forced_batch_number {
                continue;
            }

            // A gap in the buffer: recover the missing numbers from state before the buffered
            // batch itself.
            while buffered.number > next_forced_batch_number {
                let missing =
                    match self.state.forced_batch_by_number(next_forced_batch_number).await {
                        Ok(batch) => batch,
                        Err(err) => {
                            tracing::error!(
                                target: "sequencer::finalizer",
                                forced_batch_number = next_forced_batch_number,
                                %err,
                                "failed to get missing forced batch"
                            );
                            return checkpoint;
                        }
                    };
                self.metrics.forced_batch_gaps_filled.increment(1);
                checkpoint = match self.process_forced_batch(&missing, checkpoint).await {
                    Ok(new_checkpoint) => new_checkpoint,
                    Err(err) => {
                        tracing::error!(
                            target: "sequencer::finalizer",
                            forced_batch_number = missing.number,
                            %err,
                            "error processing forced batch"
                        );
                        return checkpoint;
                    }
                };
                next_forced_batch_number += 1;
            }

            tracing::info!(
                target: "sequencer::finalizer",
                forced_batch_number = buffered.number,
                batch_number = checkpoint.batch_number,
                state_root = %checkpoint.state_root,
                acc_input_hash = %checkpoint.acc_input_hash,
                "processing forced batch"
            );
            checkpoint = match self.process_forced_batch(&buffered, checkpoint).await {
                Ok(new_checkpoint) => new_checkpoint,
                Err(err) => {
                    tracing::error!(
                        target: "sequencer::finalizer",
                        forced_batch_number = buffered.number,
                        %err,
                        "error processing forced batch"
                    );
                    return checkpoint;
                }
            };
            tracing::info!(
                target: "sequencer::finalizer",
                forced_batch_number = buffered.number,
                batch_number = checkpoint.batch_number,
                state_root = %checkpoint.state_root,
                acc_input_hash = %checkpoint.acc_input_hash,
                "processed forced batch"
            );
            next_forced_batch_number += 1;
        }

        checkpoint
    }

    /// Applies one forced batch to the checkpoint chain.
    ///
    /// The open/execute/close sequence runs inside a single state transaction; every failure
    /// path rolls back and returns with the caller's checkpoint unchanged.
    async fn process_forced_batch(
        &self,
        forced_batch: &ForcedBatch,
        checkpoint: Checkpoint,
    ) -> Result<Checkpoint, FinalizerError> {
        let started = Instant::now();

        // The L1 block hash feeds the execution request; resolve it before any transaction is
        // opened.
        let l1_block =
            self.state.l1_block_by_number(forced_batch.number).await.map_err(|source| {
                FinalizerError::ForcedBatchState {
                    forced_batch_number: forced_batch.number,
                    source,
                }
            })?;
        let fork_id =
            self.state.fork_id_by_batch_number(checkpoint.batch_number).await.map_err(
                |source| FinalizerError::ForcedBatchState {
                    forced_batch_number: forced_batch.number,
                    source,
                },
            )?;

        let tx = self.state.tx_mut().await.map_err(|source| FinalizerError::ForcedBatchState {
            forced_batch_number: forced_batch.number,
            source,
        })?;

        let new_batch_number = checkpoint.batch_number + 1;
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("Time can't go backwards")
            .as_secs();

        let processing_ctx = ProcessingContext {
            batch_number: new_batch_number,
            coinbase: self.config.coinbase,
            timestamp,
            global_exit_root: forced_batch.global_exit_root,
            forced_batch_number: Some(forced_batch.number),
        };
        if let Err(source) = tx.open_batch(processing_ctx).await {
            return Err(self
                .rollback_on_error(
                    tx,
                    FinalizerError::ForcedBatchState {
                        forced_batch_number: forced_batch.number,
                        source,
                    },
                )
                .await);
        }

        let request = ExecutionRequest {
            batch_number: new_batch_number,
            // The forced-batch path supplies its own root, so verification is skipped.
            l1_info_root: forced_batch.global_exit_root,
            forced_block_hash: l1_block.parent_hash,
            old_state_root: checkpoint.state_root,
            old_acc_input_hash: checkpoint.acc_input_hash,
            transactions: forced_batch.raw_txs_data.clone(),
            coinbase: self.config.coinbase,
            timestamp_limit: forced_batch.forced_at,
            fork_id,
            skip_verify_l1_info_root: true,
            caller: Caller::Sequencer,
        };
        let response = match self.executor.process_batch(request).await {
            Ok(response) => response,
            Err(source) => {
                return Err(self
                    .rollback_on_error(
                        tx,
                        FinalizerError::ForcedBatchExecution {
                            forced_batch_number: forced_batch.number,
                            source,
                        },
                    )
                    .await)
            }
        };

        let receipt = ProcessingReceipt {
            batch_number: new_batch_number,
            state_root: response.new_state_root,
            local_exit_root: response.new_local_exit_root,
            acc_input_hash: response.new_acc_input_hash,
            batch_l2_data: forced_batch.raw_txs_data.clone(),
            resources: BatchResources {
                counters: response.used_counters,
                bytes: forced_batch.raw_txs_data.len() as u64,
            },
            closing_reason: ClosingReason::ForcedBatch,
        };
        if let Err(source) = tx.close_batch(receipt).await {
            return Err(self
                .rollback_on_error(
                    tx,
                    FinalizerError::ForcedBatchState {
                        forced_batch_number: forced_batch.number,
                        source,
                    },
                )
                .await);
        }

        tx.commit().await.map_err(|source| FinalizerError::ForcedBatchState {
            forced_batch_number: forced_batch.number,
            source,
        })?;

        let new_checkpoint = Checkpoint::new(
            new_batch_number,
            response.new_state_root,
            response.new_acc_input_hash,
        );

        // The hand-off runs strictly after commit; a failure here must not roll back committed
        // work.
        if !response.block_responses.is_empty() && !response.out_of_counters {
            if let Err(err) = self.handle_forced_batch_response(&response).await {
                tracing::error!(
                    target: "sequencer::finalizer",
                    forced_batch_number = forced_batch.number,
                    %err,
                    "failed to propagate effects of committed forced batch"
                );
            }
        }

        self.metrics.forced_batches_processed.increment(1);
        self.metrics.forced_batch_processing_duration.record(started.elapsed().as_secs_f64());

        Ok(new_checkpoint)
    }

    /// Rolls back a failed batch transition, combining a rollback failure with the original
    /// error.
    async fn rollback_on_error(&self, tx: S::Tx, original: FinalizerError) -> FinalizerError {
        match tx.rollback().await {
            Ok(()) => original,
            Err(rollback) => {
                FinalizerError::Rollback { original: Box::new(original), rollback }
            }
        }
    }
}

impl<S, E, W, D> std::fmt::Debug for Finalizer<S, E, W, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Finalizer")
            .field("state", &"StateProvider")
            .field("executor", &"BatchExecutor")
            .field("worker", &"ForcedTxWorker")
            .field("stream", &"L2BlockSink")
            .field("config", &self.config)
            .finish()
    }
}
