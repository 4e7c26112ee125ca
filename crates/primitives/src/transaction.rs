use alloy_consensus::{crypto::RecoveryError, transaction::SignerRecoverable, TxEnvelope};
use alloy_eips::eip2718::{Decodable2718, Eip2718Error};
use alloy_primitives::{Address, Bytes, B256};

/// The response for a single transaction executed inside a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionResponse {
    /// The transaction hash.
    pub tx_hash: B256,
    /// The raw EIP-2718 encoding of the transaction.
    pub tx: Bytes,
    /// The gas used by the transaction.
    pub gas_used: u64,
}

/// An error occurring while extracting the sender of a raw transaction.
#[derive(Debug, thiserror::Error)]
pub enum SenderRecoveryError {
    /// The raw payload is not a valid EIP-2718 transaction.
    #[error("failed to decode transaction: {0}")]
    Decode(#[from] Eip2718Error),
    /// The signature does not recover to a valid sender.
    #[error("failed to recover signer: {0}")]
    Recovery(#[from] RecoveryError),
}

/// Extracts the sender of a raw EIP-2718 encoded transaction by recovering its signer.
pub fn recover_sender(raw: &[u8]) -> Result<Address, SenderRecoveryError> {
    let tx = TxEnvelope::decode_2718(&mut &raw[..])?;
    Ok(tx.recover_signer()?)
}
