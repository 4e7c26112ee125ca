use crate::TransactionResponse;

use alloy_primitives::B256;

/// Information about an L1 block.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct L1BlockInfo {
    /// The block number.
    pub number: u64,
    /// The block hash.
    pub hash: B256,
    /// The parent block hash.
    pub parent_hash: B256,
}

impl L1BlockInfo {
    /// Returns a new instance of [`L1BlockInfo`].
    pub const fn new(number: u64, hash: B256, parent_hash: B256) -> Self {
        Self { number, hash, parent_hash }
    }
}

/// An L2 block produced by the execution engine for a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockResponse {
    /// The L2 block number.
    pub block_number: u64,
    /// The L2 block hash.
    pub block_hash: B256,
    /// The L2 block timestamp.
    pub timestamp: u64,
    /// The responses for the transactions included in the block.
    pub transaction_responses: Vec<TransactionResponse>,
}
