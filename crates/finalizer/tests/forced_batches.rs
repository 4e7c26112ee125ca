//! Scenario tests for the forced-batch reconciliation core, driving the finalizer against an
//! in-memory state, a deterministic execution engine and recording downstream collaborators.

use alloy_consensus::{SignableTransaction, TxEnvelope, TxLegacy};
use alloy_eips::eip2718::Encodable2718;
use alloy_network::TxSignerSync;
use alloy_primitives::{keccak256, Address, Bytes, TxKind, B256, U256};
use alloy_signer_local::PrivateKeySigner;
use sequencer_executor::{BatchExecutor, ExecutorError, FlushTracker};
use sequencer_finalizer::{Finalizer, FinalizerConfig, ForcedTxWorker, L2BlockSink};
use sequencer_primitives::{
    BlockResponse, Checkpoint, ClosingReason, ExecutionCounters, ExecutionRequest,
    ExecutionResponse, ForcedBatch, L1BlockInfo, TransactionResponse,
};
use sequencer_state::test_utils::{FailurePoint, MemoryState};
use sequencer_state::StateOperations;
use std::{
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};
use tokio_util::sync::CancellationToken;

/// A deterministic execution engine: post-state roots are derived from the request's pre-state,
/// so checkpoint chaining is observable from the outside.
#[derive(Debug, Default)]
struct MockExecutor {
    requests: Mutex<Vec<ExecutionRequest>>,
    blocks: Mutex<HashMap<u64, Vec<BlockResponse>>>,
    fail_on: Mutex<HashSet<u64>>,
    out_of_counters: AtomicBool,
    next_flush_id: AtomicU64,
}

impl MockExecutor {
    fn fail_on_batch(&self, batch_number: u64) {
        self.fail_on.lock().unwrap().insert(batch_number);
    }

    fn blocks_for_batch(&self, batch_number: u64, blocks: Vec<BlockResponse>) {
        self.blocks.lock().unwrap().insert(batch_number, blocks);
    }

    fn set_out_of_counters(&self, out_of_counters: bool) {
        self.out_of_counters.store(out_of_counters, Ordering::SeqCst);
    }

    fn requests(&self) -> Vec<ExecutionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

fn derived_root(tag: u8, parent: B256, batch_number: u64) -> B256 {
    let mut data = Vec::with_capacity(41);
    data.push(tag);
    data.extend_from_slice(parent.as_slice());
    data.extend_from_slice(&batch_number.to_be_bytes());
    keccak256(&data)
}

#[async_trait::async_trait]
impl BatchExecutor for MockExecutor {
    async fn process_batch(
        &self,
        request: ExecutionRequest,
    ) -> Result<ExecutionResponse, ExecutorError> {
        if self.fail_on.lock().unwrap().contains(&request.batch_number) {
            return Err(ExecutorError::Execution(format!(
                "injected failure for batch {}",
                request.batch_number
            )));
        }
        let response = ExecutionResponse {
            new_batch_number: request.batch_number,
            new_state_root: derived_root(0xa1, request.old_state_root, request.batch_number),
            new_local_exit_root: derived_root(0xa2, request.old_state_root, request.batch_number),
            new_acc_input_hash: derived_root(
                0xa3,
                request.old_acc_input_hash,
                request.batch_number,
            ),
            block_responses: self
                .blocks
                .lock()
                .unwrap()
                .get(&request.batch_number)
                .cloned()
                .unwrap_or_default(),
            used_counters: ExecutionCounters { gas_used: 21_000, steps: 64, ..Default::default() },
            flush_id: self.next_flush_id.fetch_add(1, Ordering::SeqCst) + 1,
            out_of_counters: self.out_of_counters.load(Ordering::SeqCst),
        };
        self.requests.lock().unwrap().push(request);
        Ok(response)
    }
}

#[derive(Debug, Default)]
struct RecordingWorker {
    forced: Mutex<Vec<(B256, Address)>>,
    processed: Mutex<Vec<(B256, Address, bool)>>,
}

impl RecordingWorker {
    fn forced(&self) -> Vec<(B256, Address)> {
        self.forced.lock().unwrap().clone()
    }

    fn processed(&self) -> Vec<(B256, Address, bool)> {
        self.processed.lock().unwrap().clone()
    }
}

impl ForcedTxWorker for RecordingWorker {
    fn add_forced_tx(&self, tx_hash: B256, from: Address) {
        self.forced.lock().unwrap().push((tx_hash, from));
    }

    fn tx_processed(
        &self,
        tx_hash: B256,
        from: Address,
        success: bool,
        _response: &ExecutionResponse,
    ) {
        self.processed.lock().unwrap().push((tx_hash, from, success));
    }
}

#[derive(Debug, Default)]
struct RecordingSink {
    sent: Mutex<Vec<(u64, u64)>>,
    fail: AtomicBool,
}

impl RecordingSink {
    fn sent(&self) -> Vec<(u64, u64)> {
        self.sent.lock().unwrap().clone()
    }

    fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl L2BlockSink for RecordingSink {
    type Error = String;

    async fn send_l2_block(
        &self,
        batch_number: u64,
        block: &BlockResponse,
    ) -> Result<(), Self::Error> {
        if self.fail.load(Ordering::SeqCst) {
            return Err("stream unavailable".to_string());
        }
        self.sent.lock().unwrap().push((batch_number, block.block_number));
        Ok(())
    }
}

type TestFinalizer =
    Finalizer<MemoryState, Arc<MockExecutor>, Arc<RecordingWorker>, Arc<RecordingSink>>;

struct Harness {
    state: MemoryState,
    executor: Arc<MockExecutor>,
    worker: Arc<RecordingWorker>,
    sink: Arc<RecordingSink>,
    flush_tracker: Arc<FlushTracker>,
    cancel: CancellationToken,
    finalizer: Arc<TestFinalizer>,
}

fn harness() -> Harness {
    let state = MemoryState::new();
    let executor = Arc::new(MockExecutor::default());
    let worker = Arc::new(RecordingWorker::default());
    let sink = Arc::new(RecordingSink::default());
    let flush_tracker = Arc::new(FlushTracker::new());
    let cancel = CancellationToken::new();
    let finalizer = Arc::new(Finalizer::new(
        state.clone(),
        executor.clone(),
        worker.clone(),
        sink.clone(),
        flush_tracker.clone(),
        cancel.clone(),
        FinalizerConfig::new(Address::repeat_byte(0xfe), Duration::from_secs(60)),
    ));
    Harness { state, executor, worker, sink, flush_tracker, cancel, finalizer }
}

fn forced_batch(number: u64) -> ForcedBatch {
    ForcedBatch {
        number,
        global_exit_root: B256::repeat_byte(number as u8),
        forced_at: 1_700_000_000 + number,
        raw_txs_data: Bytes::from(number.to_be_bytes().to_vec()),
    }
}

fn l1_block(number: u64) -> L1BlockInfo {
    L1BlockInfo::new(
        number,
        derived_root(0x01, B256::ZERO, number),
        derived_root(0x02, B256::ZERO, number),
    )
}

fn block_response(block_number: u64, txs: Vec<TransactionResponse>) -> BlockResponse {
    BlockResponse {
        block_number,
        block_hash: derived_root(0x0b, B256::ZERO, block_number),
        timestamp: 1_700_000_100,
        transaction_responses: txs,
    }
}

fn signed_tx_response() -> (TransactionResponse, Address) {
    let signer = PrivateKeySigner::random();
    let mut tx = TxLegacy {
        chain_id: Some(1),
        nonce: 0,
        gas_price: 1_000_000_000,
        gas_limit: 21_000,
        to: TxKind::Call(Address::repeat_byte(0x11)),
        value: U256::from(1),
        input: Bytes::new(),
    };
    let signature = signer.sign_transaction_sync(&mut tx).unwrap();
    let envelope: TxEnvelope = tx.into_signed(signature).into();
    let response = TransactionResponse {
        tx_hash: *envelope.tx_hash(),
        tx: envelope.encoded_2718().into(),
        gas_used: 21_000,
    };
    (response, signer.address())
}

fn garbage_tx_response() -> TransactionResponse {
    TransactionResponse {
        tx_hash: B256::repeat_byte(0xbb),
        tx: Bytes::from_static(&[0x03, 0x14, 0x15]),
        gas_used: 0,
    }
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not met in time");
}

#[tokio::test]
async fn test_gap_recovered_from_state() {
    let h = harness();
    let checkpoint = Checkpoint::new(100, B256::repeat_byte(1), B256::repeat_byte(2));

    h.state.set_last_trusted_forced_batch_number(3);
    h.state.insert_forced_batch(forced_batch(4));
    h.state.insert_l1_block(l1_block(4));
    h.state.insert_l1_block(l1_block(5));
    h.state.set_fork_id(0, 9);
    h.finalizer.add_forced_batch(forced_batch(5)).await;

    let new_checkpoint = h.finalizer.process_forced_batches(checkpoint).await;

    assert_eq!(new_checkpoint.batch_number, 102);

    // Forced batches 4 and 5 were processed in order, exactly once.
    let requests = h.executor.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].batch_number, 101);
    assert_eq!(requests[1].batch_number, 102);

    // The request for the recovered batch carries the forced inputs.
    assert_eq!(requests[0].l1_info_root, forced_batch(4).global_exit_root);
    assert_eq!(requests[0].forced_block_hash, l1_block(4).parent_hash);
    assert_eq!(requests[0].timestamp_limit, forced_batch(4).forced_at);
    assert_eq!(requests[0].fork_id, 9);
    assert!(requests[0].skip_verify_l1_info_root);

    // Chain continuity: each request's pre-state equals the previous post-state.
    assert_eq!(requests[0].old_state_root, checkpoint.state_root);
    assert_eq!(requests[0].old_acc_input_hash, checkpoint.acc_input_hash);
    assert_eq!(requests[1].old_state_root, derived_root(0xa1, checkpoint.state_root, 101));
    assert_eq!(
        requests[1].old_acc_input_hash,
        derived_root(0xa3, checkpoint.acc_input_hash, 101)
    );
    assert_eq!(new_checkpoint.state_root, derived_root(0xa1, requests[1].old_state_root, 102));

    // Both batches were closed as forced closures and the trusted marker advanced.
    let receipt = h.state.closed_batch(101).unwrap();
    assert_eq!(receipt.closing_reason, ClosingReason::ForcedBatch);
    assert_eq!(receipt.batch_l2_data, forced_batch(4).raw_txs_data);
    assert!(h.state.closed_batch(102).is_some());
    assert_eq!(h.state.last_trusted_forced_batch_number().await.unwrap(), 5);
    assert!(!h.finalizer.has_pending_forced_batches().await);
}

#[tokio::test]
async fn test_already_processed_batches_are_skipped() {
    let h = harness();
    let checkpoint = Checkpoint::new(200, B256::repeat_byte(7), B256::repeat_byte(8));

    h.state.set_last_trusted_forced_batch_number(7);
    for number in [5, 6, 7] {
        h.finalizer.add_forced_batch(forced_batch(number)).await;
    }

    let new_checkpoint = h.finalizer.process_forced_batches(checkpoint).await;

    assert_eq!(new_checkpoint, checkpoint);
    assert!(h.executor.requests().is_empty());
    assert_eq!(h.state.write_count(), 0);
    assert!(!h.finalizer.has_pending_forced_batches().await);
}

#[tokio::test]
async fn test_execution_failure_rolls_back() {
    let h = harness();
    let checkpoint = Checkpoint::new(100, B256::repeat_byte(3), B256::repeat_byte(4));

    h.state.set_last_trusted_forced_batch_number(5);
    h.state.insert_l1_block(l1_block(6));
    h.executor.fail_on_batch(101);
    h.finalizer.add_forced_batch(forced_batch(6)).await;

    let new_checkpoint = h.finalizer.process_forced_batches(checkpoint).await;

    assert_eq!(new_checkpoint, checkpoint);
    assert!(h.state.open_batch_ctx(101).is_none());
    assert!(h.state.closed_batch(101).is_none());
    assert_eq!(h.state.write_count(), 0);
    assert!(h.state.l2_blocks().is_empty());
    assert_eq!(h.state.last_trusted_forced_batch_number().await.unwrap(), 5);
    // The buffer is cleared on abort; the batch is re-sourced from state on the next drain.
    assert!(!h.finalizer.has_pending_forced_batches().await);
}

#[tokio::test]
async fn test_missing_forced_batch_aborts_drain() {
    let h = harness();
    let checkpoint = Checkpoint::new(100, B256::repeat_byte(1), B256::repeat_byte(2));

    h.state.set_last_trusted_forced_batch_number(3);
    // Forced batch 4 is absent from state, so the gap cannot be resolved.
    h.finalizer.add_forced_batch(forced_batch(5)).await;

    let new_checkpoint = h.finalizer.process_forced_batches(checkpoint).await;

    assert_eq!(new_checkpoint, checkpoint);
    assert!(h.executor.requests().is_empty());
    assert_eq!(h.state.write_count(), 0);
}

#[tokio::test]
async fn test_last_trusted_read_failure_aborts_drain() {
    let h = harness();
    let checkpoint = Checkpoint::new(100, B256::repeat_byte(1), B256::repeat_byte(2));

    h.state.fail_on(FailurePoint::LastTrustedForcedBatchNumber);
    h.finalizer.add_forced_batch(forced_batch(4)).await;

    let new_checkpoint = h.finalizer.process_forced_batches(checkpoint).await;

    assert_eq!(new_checkpoint, checkpoint);
    assert!(h.executor.requests().is_empty());
    assert_eq!(h.state.write_count(), 0);
}

#[tokio::test]
async fn test_rollback_failure_aborts_drain() {
    let h = harness();
    let checkpoint = Checkpoint::new(100, B256::repeat_byte(1), B256::repeat_byte(2));

    h.state.set_last_trusted_forced_batch_number(3);
    h.state.insert_l1_block(l1_block(4));
    h.state.fail_on(FailurePoint::CloseBatch);
    h.state.fail_on(FailurePoint::Rollback);
    h.finalizer.add_forced_batch(forced_batch(4)).await;

    let new_checkpoint = h.finalizer.process_forced_batches(checkpoint).await;

    assert_eq!(new_checkpoint, checkpoint);
    assert_eq!(h.state.write_count(), 0);
}

#[tokio::test]
async fn test_effects_wait_for_durability() {
    let h = harness();
    let checkpoint = Checkpoint::new(100, B256::repeat_byte(5), B256::repeat_byte(6));

    h.state.set_last_trusted_forced_batch_number(3);
    h.state.insert_l1_block(l1_block(4));
    let (tx, sender) = signed_tx_response();
    h.executor.blocks_for_batch(101, vec![block_response(900, vec![tx.clone()])]);
    h.finalizer.add_forced_batch(forced_batch(4)).await;

    let drain = tokio::spawn({
        let finalizer = h.finalizer.clone();
        async move { finalizer.process_forced_batches(checkpoint).await }
    });

    // The forced tx reaches the worker ahead of the durability wait...
    wait_until(|| !h.worker.forced().is_empty()).await;
    // ...but no block is persisted or streamed before the flush id is confirmed.
    assert!(h.state.l2_blocks().is_empty());
    assert!(h.sink.sent().is_empty());
    assert_eq!(h.flush_tracker.last_pending(), 1);

    h.flush_tracker.record_stored(1);
    let new_checkpoint =
        tokio::time::timeout(Duration::from_secs(5), drain).await.unwrap().unwrap();

    assert_eq!(new_checkpoint.batch_number, 101);
    assert_eq!(h.state.l2_blocks(), vec![(101, block_response(900, vec![tx.clone()]))]);
    assert_eq!(h.sink.sent(), vec![(101, 900)]);
    assert_eq!(h.worker.forced(), vec![(tx.tx_hash, sender)]);
    assert_eq!(h.worker.processed(), vec![(tx.tx_hash, sender, true)]);
}

#[tokio::test]
async fn test_unparsable_sender_is_skipped() {
    let h = harness();
    let checkpoint = Checkpoint::new(100, B256::repeat_byte(5), B256::repeat_byte(6));

    h.flush_tracker.record_stored(u64::MAX);
    h.state.set_last_trusted_forced_batch_number(3);
    h.state.insert_l1_block(l1_block(4));
    let (good, sender) = signed_tx_response();
    let bad = garbage_tx_response();
    h.executor.blocks_for_batch(101, vec![block_response(901, vec![bad, good.clone()])]);
    h.finalizer.add_forced_batch(forced_batch(4)).await;

    let new_checkpoint = h.finalizer.process_forced_batches(checkpoint).await;

    assert_eq!(new_checkpoint.batch_number, 101);
    // The unparsable tx is neither admitted nor marked processed...
    assert_eq!(h.worker.forced(), vec![(good.tx_hash, sender)]);
    assert_eq!(h.worker.processed(), vec![(good.tx_hash, sender, true)]);
    // ...while its block is still persisted and streamed.
    assert_eq!(h.state.l2_blocks().len(), 1);
    assert_eq!(h.sink.sent(), vec![(101, 901)]);
}

#[tokio::test]
async fn test_cancellation_during_durability_wait() {
    let h = harness();
    let checkpoint = Checkpoint::new(100, B256::repeat_byte(5), B256::repeat_byte(6));

    h.cancel.cancel();
    h.state.set_last_trusted_forced_batch_number(3);
    h.state.insert_l1_block(l1_block(4));
    let (tx, _) = signed_tx_response();
    h.executor.blocks_for_batch(101, vec![block_response(902, vec![tx])]);
    h.finalizer.add_forced_batch(forced_batch(4)).await;

    let new_checkpoint = h.finalizer.process_forced_batches(checkpoint).await;

    // The batch itself is committed; only the downstream effects stay un-applied.
    assert_eq!(new_checkpoint.batch_number, 101);
    assert!(h.state.closed_batch(101).is_some());
    assert_eq!(h.worker.forced().len(), 1);
    assert!(h.worker.processed().is_empty());
    assert!(h.state.l2_blocks().is_empty());
    assert!(h.sink.sent().is_empty());
}

#[tokio::test]
async fn test_stream_failure_is_best_effort() {
    let h = harness();
    let checkpoint = Checkpoint::new(100, B256::repeat_byte(5), B256::repeat_byte(6));

    h.flush_tracker.record_stored(u64::MAX);
    h.sink.set_fail(true);
    h.state.set_last_trusted_forced_batch_number(3);
    h.state.insert_l1_block(l1_block(4));
    let (tx, sender) = signed_tx_response();
    h.executor.blocks_for_batch(101, vec![block_response(903, vec![tx.clone()])]);
    h.finalizer.add_forced_batch(forced_batch(4)).await;

    let new_checkpoint = h.finalizer.process_forced_batches(checkpoint).await;

    // The sink failure neither fails the batch nor rolls anything back.
    assert_eq!(new_checkpoint.batch_number, 101);
    assert!(h.state.closed_batch(101).is_some());
    assert_eq!(h.state.l2_blocks().len(), 1);
    assert_eq!(h.worker.processed(), vec![(tx.tx_hash, sender, true)]);
    assert!(h.sink.sent().is_empty());
}

#[tokio::test]
async fn test_out_of_counters_skips_effects() {
    let h = harness();
    let checkpoint = Checkpoint::new(100, B256::repeat_byte(5), B256::repeat_byte(6));

    h.flush_tracker.record_stored(u64::MAX);
    h.executor.set_out_of_counters(true);
    h.state.set_last_trusted_forced_batch_number(3);
    h.state.insert_l1_block(l1_block(4));
    let (tx, _) = signed_tx_response();
    h.executor.blocks_for_batch(101, vec![block_response(904, vec![tx])]);
    h.finalizer.add_forced_batch(forced_batch(4)).await;

    let new_checkpoint = h.finalizer.process_forced_batches(checkpoint).await;

    // The batch commits and the checkpoint advances, but no effects are propagated.
    assert_eq!(new_checkpoint.batch_number, 101);
    assert!(h.state.closed_batch(101).is_some());
    assert!(h.worker.forced().is_empty());
    assert!(h.state.l2_blocks().is_empty());
    assert!(h.sink.sent().is_empty());
}
