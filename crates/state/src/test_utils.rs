//! Test utilities for the state contract.

use crate::{StateError, StateOperations, StateProvider, StateTransaction};

use sequencer_primitives::{
    BlockResponse, ForcedBatch, L1BlockInfo, ProcessingContext, ProcessingReceipt,
};
use std::{
    collections::{BTreeMap, HashSet},
    sync::{Arc, Mutex},
};

/// A state operation that can be made to fail through [`MemoryState::fail_on`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum FailurePoint {
    /// Fail [`StateProvider::tx_mut`].
    Begin,
    /// Fail [`StateOperations::last_trusted_forced_batch_number`].
    LastTrustedForcedBatchNumber,
    /// Fail [`StateOperations::forced_batch_by_number`].
    ForcedBatchByNumber,
    /// Fail [`StateOperations::l1_block_by_number`].
    L1BlockByNumber,
    /// Fail [`StateOperations::fork_id_by_batch_number`].
    ForkIdByBatchNumber,
    /// Fail [`StateOperations::open_batch`].
    OpenBatch,
    /// Fail [`StateOperations::close_batch`].
    CloseBatch,
    /// Fail [`StateOperations::store_l2_block`].
    StoreL2Block,
    /// Fail [`StateTransaction::commit`].
    Commit,
    /// Fail [`StateTransaction::rollback`].
    Rollback,
}

#[derive(Debug)]
enum StagedWrite {
    OpenBatch(ProcessingContext),
    CloseBatch(ProcessingReceipt),
    StoreL2Block(u64, BlockResponse),
}

#[derive(Debug, Default)]
struct Inner {
    last_trusted_forced_batch: u64,
    forced_batches: BTreeMap<u64, ForcedBatch>,
    l1_blocks: BTreeMap<u64, L1BlockInfo>,
    forks: BTreeMap<u64, u64>,
    open_batches: BTreeMap<u64, ProcessingContext>,
    closed_batches: BTreeMap<u64, ProcessingReceipt>,
    l2_blocks: Vec<(u64, BlockResponse)>,
    writes: u64,
}

impl Inner {
    fn apply(&mut self, write: StagedWrite) {
        match write {
            StagedWrite::OpenBatch(ctx) => {
                // The forced-batch back-reference is what advances the last trusted marker.
                if let Some(forced) = ctx.forced_batch_number {
                    self.last_trusted_forced_batch = self.last_trusted_forced_batch.max(forced);
                }
                self.open_batches.insert(ctx.batch_number, ctx);
            }
            StagedWrite::CloseBatch(receipt) => {
                self.open_batches.remove(&receipt.batch_number);
                self.closed_batches.insert(receipt.batch_number, receipt);
            }
            StagedWrite::StoreL2Block(batch_number, block) => {
                self.l2_blocks.push((batch_number, block));
            }
        }
        self.writes += 1;
    }
}

/// An in-memory implementation of the state contract.
///
/// Writes performed through a [`MemoryStateTx`] are staged and only become visible on commit.
/// Individual operations can be made to fail with [`MemoryState::fail_on`].
#[derive(Debug, Default, Clone)]
pub struct MemoryState {
    inner: Arc<Mutex<Inner>>,
    failures: Arc<Mutex<HashSet<FailurePoint>>>,
}

impl MemoryState {
    /// Creates an empty [`MemoryState`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the provided operation fail until [`MemoryState::clear_failure`] is called.
    pub fn fail_on(&self, point: FailurePoint) {
        self.failures.lock().unwrap().insert(point);
    }

    /// Clears an injected failure.
    pub fn clear_failure(&self, point: FailurePoint) {
        self.failures.lock().unwrap().remove(&point);
    }

    /// Seeds a forced batch.
    pub fn insert_forced_batch(&self, batch: ForcedBatch) {
        self.inner.lock().unwrap().forced_batches.insert(batch.number, batch);
    }

    /// Seeds an L1 block.
    pub fn insert_l1_block(&self, block: L1BlockInfo) {
        self.inner.lock().unwrap().l1_blocks.insert(block.number, block);
    }

    /// Sets the last trusted forced batch number.
    pub fn set_last_trusted_forced_batch_number(&self, number: u64) {
        self.inner.lock().unwrap().last_trusted_forced_batch = number;
    }

    /// Sets the fork id in effect from the provided batch number onwards.
    pub fn set_fork_id(&self, from_batch_number: u64, fork_id: u64) {
        self.inner.lock().unwrap().forks.insert(from_batch_number, fork_id);
    }

    /// Returns the receipt of a closed batch.
    pub fn closed_batch(&self, batch_number: u64) -> Option<ProcessingReceipt> {
        self.inner.lock().unwrap().closed_batches.get(&batch_number).cloned()
    }

    /// Returns the context of a batch that is open but not yet closed.
    pub fn open_batch_ctx(&self, batch_number: u64) -> Option<ProcessingContext> {
        self.inner.lock().unwrap().open_batches.get(&batch_number).cloned()
    }

    /// Returns all persisted L2 blocks with their batch numbers, in insertion order.
    pub fn l2_blocks(&self) -> Vec<(u64, BlockResponse)> {
        self.inner.lock().unwrap().l2_blocks.clone()
    }

    /// Returns the number of committed writes.
    pub fn write_count(&self) -> u64 {
        self.inner.lock().unwrap().writes
    }

    fn check(&self, point: FailurePoint) -> Result<(), StateError> {
        if self.failures.lock().unwrap().contains(&point) {
            return Err(StateError::Backend(format!("injected {point:?} failure")));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl StateOperations for MemoryState {
    async fn last_trusted_forced_batch_number(&self) -> Result<u64, StateError> {
        self.check(FailurePoint::LastTrustedForcedBatchNumber)?;
        Ok(self.inner.lock().unwrap().last_trusted_forced_batch)
    }

    async fn forced_batch_by_number(&self, number: u64) -> Result<ForcedBatch, StateError> {
        self.check(FailurePoint::ForcedBatchByNumber)?;
        self.inner
            .lock()
            .unwrap()
            .forced_batches
            .get(&number)
            .cloned()
            .ok_or(StateError::ForcedBatchNotFound(number))
    }

    async fn l1_block_by_number(&self, number: u64) -> Result<L1BlockInfo, StateError> {
        self.check(FailurePoint::L1BlockByNumber)?;
        self.inner
            .lock()
            .unwrap()
            .l1_blocks
            .get(&number)
            .copied()
            .ok_or(StateError::L1BlockNotFound(number))
    }

    async fn fork_id_by_batch_number(&self, batch_number: u64) -> Result<u64, StateError> {
        self.check(FailurePoint::ForkIdByBatchNumber)?;
        let inner = self.inner.lock().unwrap();
        Ok(inner.forks.range(..=batch_number).next_back().map(|(_, id)| *id).unwrap_or_default())
    }

    async fn open_batch(&self, ctx: ProcessingContext) -> Result<(), StateError> {
        self.check(FailurePoint::OpenBatch)?;
        tracing::trace!(target: "sequencer::state", batch_number = ctx.batch_number, "Opening batch.");
        let mut inner = self.inner.lock().unwrap();
        if inner.open_batches.contains_key(&ctx.batch_number) ||
            inner.closed_batches.contains_key(&ctx.batch_number)
        {
            return Err(StateError::BatchAlreadyOpen(ctx.batch_number));
        }
        inner.apply(StagedWrite::OpenBatch(ctx));
        Ok(())
    }

    async fn close_batch(&self, receipt: ProcessingReceipt) -> Result<(), StateError> {
        self.check(FailurePoint::CloseBatch)?;
        tracing::trace!(target: "sequencer::state", batch_number = receipt.batch_number, "Closing batch.");
        let mut inner = self.inner.lock().unwrap();
        if !inner.open_batches.contains_key(&receipt.batch_number) {
            return Err(StateError::BatchNotOpen(receipt.batch_number));
        }
        inner.apply(StagedWrite::CloseBatch(receipt));
        Ok(())
    }

    async fn store_l2_block(
        &self,
        batch_number: u64,
        block: &BlockResponse,
    ) -> Result<(), StateError> {
        self.check(FailurePoint::StoreL2Block)?;
        tracing::trace!(target: "sequencer::state", batch_number, block_number = block.block_number, "Storing L2 block.");
        self.inner.lock().unwrap().apply(StagedWrite::StoreL2Block(batch_number, block.clone()));
        Ok(())
    }
}

#[async_trait::async_trait]
impl StateProvider for MemoryState {
    type Tx = MemoryStateTx;

    async fn tx_mut(&self) -> Result<Self::Tx, StateError> {
        self.check(FailurePoint::Begin)?;
        Ok(MemoryStateTx { state: self.clone(), staged: Mutex::new(Vec::new()) })
    }
}

/// A staged-write transaction over a [`MemoryState`].
#[derive(Debug)]
pub struct MemoryStateTx {
    state: MemoryState,
    staged: Mutex<Vec<StagedWrite>>,
}

impl MemoryStateTx {
    fn staged_open(&self, batch_number: u64) -> bool {
        self.staged
            .lock()
            .unwrap()
            .iter()
            .any(|write| matches!(write, StagedWrite::OpenBatch(ctx) if ctx.batch_number == batch_number))
    }
}

#[async_trait::async_trait]
impl StateOperations for MemoryStateTx {
    async fn last_trusted_forced_batch_number(&self) -> Result<u64, StateError> {
        self.state.last_trusted_forced_batch_number().await
    }

    async fn forced_batch_by_number(&self, number: u64) -> Result<ForcedBatch, StateError> {
        self.state.forced_batch_by_number(number).await
    }

    async fn l1_block_by_number(&self, number: u64) -> Result<L1BlockInfo, StateError> {
        self.state.l1_block_by_number(number).await
    }

    async fn fork_id_by_batch_number(&self, batch_number: u64) -> Result<u64, StateError> {
        self.state.fork_id_by_batch_number(batch_number).await
    }

    async fn open_batch(&self, ctx: ProcessingContext) -> Result<(), StateError> {
        self.state.check(FailurePoint::OpenBatch)?;
        {
            let inner = self.state.inner.lock().unwrap();
            if inner.open_batches.contains_key(&ctx.batch_number) ||
                inner.closed_batches.contains_key(&ctx.batch_number)
            {
                return Err(StateError::BatchAlreadyOpen(ctx.batch_number));
            }
        }
        if self.staged_open(ctx.batch_number) {
            return Err(StateError::BatchAlreadyOpen(ctx.batch_number));
        }
        self.staged.lock().unwrap().push(StagedWrite::OpenBatch(ctx));
        Ok(())
    }

    async fn close_batch(&self, receipt: ProcessingReceipt) -> Result<(), StateError> {
        self.state.check(FailurePoint::CloseBatch)?;
        if !self.staged_open(receipt.batch_number) &&
            !self.state.inner.lock().unwrap().open_batches.contains_key(&receipt.batch_number)
        {
            return Err(StateError::BatchNotOpen(receipt.batch_number));
        }
        self.staged.lock().unwrap().push(StagedWrite::CloseBatch(receipt));
        Ok(())
    }

    async fn store_l2_block(
        &self,
        batch_number: u64,
        block: &BlockResponse,
    ) -> Result<(), StateError> {
        self.state.check(FailurePoint::StoreL2Block)?;
        self.staged.lock().unwrap().push(StagedWrite::StoreL2Block(batch_number, block.clone()));
        Ok(())
    }
}

#[async_trait::async_trait]
impl StateTransaction for MemoryStateTx {
    async fn commit(self) -> Result<(), StateError> {
        self.state.check(FailurePoint::Commit)?;
        tracing::trace!(target: "sequencer::state", "Committing transaction.");
        let mut inner = self.state.inner.lock().unwrap();
        for write in self.staged.into_inner().unwrap() {
            inner.apply(write);
        }
        Ok(())
    }

    async fn rollback(self) -> Result<(), StateError> {
        self.state.check(FailurePoint::Rollback)?;
        tracing::trace!(target: "sequencer::state", "Rolling back transaction.");
        Ok(())
    }
}
