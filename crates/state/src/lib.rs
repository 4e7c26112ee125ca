//! The storage contract consumed by the forced-batch reconciliation core.
//!
//! The persistent backend itself lives outside this workspace; the core only depends on the
//! operations defined in [`StateOperations`] and the transaction lifecycle defined in
//! [`StateProvider`] / [`StateTransaction`]. Atomic batch transitions run every write inside one
//! [`StateTransaction`], while post-commit effects go through the plain state handle.

pub use error::StateError;
mod error;

pub use operations::StateOperations;
mod operations;

pub use transaction::{StateProvider, StateTransaction};
mod transaction;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
