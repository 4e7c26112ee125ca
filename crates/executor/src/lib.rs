//! The execution-engine contract consumed by the reconciliation core, and the durability gate
//! that orders externally visible effects after the engine's persistence checkpoint.

pub use engine::BatchExecutor;
mod engine;

pub use error::ExecutorError;
mod error;

pub use flush::FlushTracker;
mod flush;
