use crate::ExecutionCounters;

use alloy_primitives::{Address, Bytes, B256};

/// A transaction batch whose inclusion is mandated by the L1 contract, independently of the
/// sequencer's own ordering.
///
/// Created by the L1 watcher when the forced-batch event is observed; read-only for the
/// reconciliation core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForcedBatch {
    /// The strictly increasing forced-batch number assigned by the L1 contract.
    pub number: u64,
    /// The global exit root the batch was forced against.
    pub global_exit_root: B256,
    /// The L1 timestamp at which the batch was forced, used as the execution time limit.
    pub forced_at: u64,
    /// The raw encoded transaction payload committed on L1.
    pub raw_txs_data: Bytes,
}

/// The finalized chain state after the most recently committed batch.
///
/// Every subsequent batch's pre-state equals this post-state; the chain never branches. Only a
/// fully committed batch produces a new checkpoint.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct Checkpoint {
    /// The number of the last committed batch.
    pub batch_number: u64,
    /// The state root after the last committed batch.
    pub state_root: B256,
    /// The accumulated input hash after the last committed batch.
    pub acc_input_hash: B256,
}

impl Checkpoint {
    /// Returns a new instance of [`Checkpoint`].
    pub const fn new(batch_number: u64, state_root: B256, acc_input_hash: B256) -> Self {
        Self { batch_number, state_root, acc_input_hash }
    }
}

/// The reason a batch was closed.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ClosingReason {
    /// The batch ran out of room for further transactions.
    BatchFull,
    /// The batch hit its maximum open deadline.
    MaxDeadline,
    /// The batch was produced by the forced-batch path.
    ForcedBatch,
}

/// The parameters for opening a new batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessingContext {
    /// The number of the batch to open.
    pub batch_number: u64,
    /// The coinbase address for the batch.
    pub coinbase: Address,
    /// The wall-clock timestamp at which the batch was opened.
    pub timestamp: u64,
    /// The global exit root for the batch.
    pub global_exit_root: B256,
    /// The forced batch this batch was opened for, if any.
    pub forced_batch_number: Option<u64>,
}

/// The receipt recorded when closing a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessingReceipt {
    /// The number of the batch to close.
    pub batch_number: u64,
    /// The state root after executing the batch.
    pub state_root: B256,
    /// The local exit root after executing the batch.
    pub local_exit_root: B256,
    /// The accumulated input hash after executing the batch.
    pub acc_input_hash: B256,
    /// The raw L2 transaction payload of the batch.
    pub batch_l2_data: Bytes,
    /// The resources consumed by the batch.
    pub resources: BatchResources,
    /// The reason the batch was closed.
    pub closing_reason: ClosingReason,
}

/// The resources consumed by a batch.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchResources {
    /// The counters reported by the execution engine.
    pub counters: ExecutionCounters,
    /// The byte length of the batch payload.
    pub bytes: u64,
}

#[cfg(feature = "arbitrary")]
mod arbitrary_impl {
    use super::*;

    impl arbitrary::Arbitrary<'_> for ForcedBatch {
        fn arbitrary(u: &mut arbitrary::Unstructured<'_>) -> arbitrary::Result<Self> {
            Ok(Self {
                number: u.arbitrary::<u32>()? as u64,
                global_exit_root: u.arbitrary()?,
                forced_at: u.arbitrary::<u32>()? as u64,
                raw_txs_data: u.arbitrary()?,
            })
        }
    }

    impl arbitrary::Arbitrary<'_> for Checkpoint {
        fn arbitrary(u: &mut arbitrary::Unstructured<'_>) -> arbitrary::Result<Self> {
            Ok(Self {
                batch_number: u.arbitrary::<u32>()? as u64,
                state_root: u.arbitrary()?,
                acc_input_hash: u.arbitrary()?,
            })
        }
    }
}
