use alloy_primitives::{Address, B256};
use sequencer_primitives::ExecutionResponse;

/// The transaction-pool bookkeeping surface the reconciliation core drives.
#[auto_impl::auto_impl(&, Arc)]
pub trait ForcedTxWorker {
    /// Admits a forced transaction out-of-band. Forced transactions bypass normal admission
    /// ordering because their inclusion was already finalized on L1.
    fn add_forced_tx(&self, tx_hash: B256, from: Address);

    /// Records the outcome of a processed transaction so pool-side accounting reflects it.
    fn tx_processed(
        &self,
        tx_hash: B256,
        from: Address,
        success: bool,
        response: &ExecutionResponse,
    );
}
