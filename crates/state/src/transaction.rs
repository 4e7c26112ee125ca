use crate::{StateError, StateOperations};

/// A state handle that can begin atomic read-write transactions.
#[async_trait::async_trait]
pub trait StateProvider: StateOperations {
    /// The transaction type produced by this provider.
    type Tx: StateTransaction + Send + Sync;

    /// Begins a new read-write transaction.
    async fn tx_mut(&self) -> Result<Self::Tx, StateError>;
}

/// An atomic read-write state transaction.
///
/// Writes staged through the [`StateOperations`] methods become visible only on [`commit`];
/// [`rollback`] discards them. Both consume the transaction.
///
/// [`commit`]: StateTransaction::commit
/// [`rollback`]: StateTransaction::rollback
#[async_trait::async_trait]
pub trait StateTransaction: StateOperations {
    /// Commits the transaction.
    async fn commit(self) -> Result<(), StateError>;

    /// Rolls back the transaction.
    async fn rollback(self) -> Result<(), StateError>;
}
