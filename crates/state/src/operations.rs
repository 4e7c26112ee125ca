use crate::StateError;

use sequencer_primitives::{
    BlockResponse, ForcedBatch, L1BlockInfo, ProcessingContext, ProcessingReceipt,
};

/// The read and write operations the reconciliation core performs against state.
///
/// The trait is implemented both by the plain state handle and by its transactions, so the same
/// operations can run inside or outside an atomic scope.
#[async_trait::async_trait]
#[auto_impl::auto_impl(&, Arc)]
pub trait StateOperations {
    /// Returns the number of the last forced batch known to be finalized in state.
    async fn last_trusted_forced_batch_number(&self) -> Result<u64, StateError>;

    /// Returns the forced batch with the provided number.
    async fn forced_batch_by_number(&self, number: u64) -> Result<ForcedBatch, StateError>;

    /// Returns the L1 block with the provided number.
    async fn l1_block_by_number(&self, number: u64) -> Result<L1BlockInfo, StateError>;

    /// Returns the fork id in effect at the provided batch number.
    async fn fork_id_by_batch_number(&self, batch_number: u64) -> Result<u64, StateError>;

    /// Opens a new batch with the provided [`ProcessingContext`].
    async fn open_batch(&self, ctx: ProcessingContext) -> Result<(), StateError>;

    /// Closes a batch, recording the provided [`ProcessingReceipt`].
    async fn close_batch(&self, receipt: ProcessingReceipt) -> Result<(), StateError>;

    /// Persists an L2 block produced for the provided batch number.
    async fn store_l2_block(
        &self,
        batch_number: u64,
        block: &BlockResponse,
    ) -> Result<(), StateError>;
}
