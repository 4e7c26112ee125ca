use crate::BlockResponse;

use alloy_primitives::{Address, Bytes, B256};
use std::fmt;

/// The component on whose behalf an execution request is submitted.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum Caller {
    /// The sequencer pipeline.
    #[default]
    Sequencer,
    /// The L1 synchronizer.
    Synchronizer,
}

impl fmt::Display for Caller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sequencer => write!(f, "sequencer"),
            Self::Synchronizer => write!(f, "synchronizer"),
        }
    }
}

/// The resource counters reported by the execution engine for a batch.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct ExecutionCounters {
    /// The cumulative gas used.
    pub gas_used: u64,
    /// The number of keccak hashes used.
    pub keccak_hashes: u64,
    /// The number of poseidon hashes used.
    pub poseidon_hashes: u64,
    /// The number of memory alignments used.
    pub mem_aligns: u64,
    /// The number of arithmetic operations used.
    pub arithmetics: u64,
    /// The number of binary operations used.
    pub binaries: u64,
    /// The number of execution steps used.
    pub steps: u64,
}

/// A request to execute a batch against the execution engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionRequest {
    /// The number of the batch to execute.
    pub batch_number: u64,
    /// The L1 info root for the batch. The forced-batch path supplies the forced global exit
    /// root here and skips root verification.
    pub l1_info_root: B256,
    /// The parent hash of the L1 block associated with the forced batch.
    pub forced_block_hash: B256,
    /// The state root before the batch.
    pub old_state_root: B256,
    /// The accumulated input hash before the batch.
    pub old_acc_input_hash: B256,
    /// The raw encoded transactions to execute.
    pub transactions: Bytes,
    /// The coinbase address for the batch.
    pub coinbase: Address,
    /// The upper bound on block timestamps during execution.
    pub timestamp_limit: u64,
    /// The fork in effect for the batch.
    pub fork_id: u64,
    /// Whether the engine should skip verifying the L1 info root.
    pub skip_verify_l1_info_root: bool,
    /// The component submitting the request.
    pub caller: Caller,
}

/// The result of executing a batch on the execution engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResponse {
    /// The number of the executed batch.
    pub new_batch_number: u64,
    /// The state root after the batch.
    pub new_state_root: B256,
    /// The local exit root after the batch.
    pub new_local_exit_root: B256,
    /// The accumulated input hash after the batch.
    pub new_acc_input_hash: B256,
    /// The L2 blocks produced by the batch.
    pub block_responses: Vec<BlockResponse>,
    /// The resource counters consumed by the batch.
    pub used_counters: ExecutionCounters,
    /// The durability checkpoint of the engine's backing store this batch depends on.
    pub flush_id: u64,
    /// Whether execution aborted with an out-of-counters error.
    pub out_of_counters: bool,
}
