//! Primitive types for the forced-batch reconciliation core of the sequencer.

pub use batch::{
    BatchResources, Checkpoint, ClosingReason, ForcedBatch, ProcessingContext, ProcessingReceipt,
};
mod batch;

pub use block::{BlockResponse, L1BlockInfo};
mod block;

pub use execution::{Caller, ExecutionCounters, ExecutionRequest, ExecutionResponse};
mod execution;

pub use transaction::{recover_sender, SenderRecoveryError, TransactionResponse};
mod transaction;
