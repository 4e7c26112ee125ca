use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Tracks the execution engine's durability checkpoint.
///
/// The tracker maintains two monotonic counters: the highest flush id any in-flight batch depends
/// on, and the highest flush id the engine has confirmed durable. A batch's downstream effects
/// must not be exposed while its required flush id exceeds the confirmed one;
/// [`FlushTracker::wait_until_stored`] is the gate enforcing that ordering.
#[derive(Debug)]
pub struct FlushTracker {
    /// The highest flush id any in-flight batch depends on.
    pending: AtomicU64,
    /// The highest flush id confirmed durable. Updates wake all waiters.
    stored: watch::Sender<u64>,
}

impl Default for FlushTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl FlushTracker {
    /// Returns a new instance of [`FlushTracker`] with both counters at zero.
    pub fn new() -> Self {
        Self { pending: AtomicU64::new(0), stored: watch::Sender::new(0) }
    }

    /// Records that an in-flight batch depends on the provided flush id.
    pub fn record_pending(&self, flush_id: u64) {
        self.pending.fetch_max(flush_id, Ordering::SeqCst);
    }

    /// Returns the highest flush id any in-flight batch depends on.
    pub fn last_pending(&self) -> u64 {
        self.pending.load(Ordering::SeqCst)
    }

    /// Records a durability confirmation from the engine and wakes waiters.
    ///
    /// Confirmations may arrive out of order; the counter never goes backwards.
    pub fn record_stored(&self, flush_id: u64) {
        self.stored.send_if_modified(|stored| {
            if flush_id > *stored {
                tracing::trace!(target: "sequencer::executor", flush_id, "New stored flush id.");
                *stored = flush_id;
                true
            } else {
                false
            }
        });
    }

    /// Returns the highest flush id confirmed durable.
    pub fn last_stored(&self) -> u64 {
        *self.stored.borrow()
    }

    /// Waits until the confirmed-durable flush id reaches `required`.
    ///
    /// Returns `true` once the requirement is met, `false` if `cancel` fires first. Cancellation
    /// is an early exit, not a failure: the caller's batch is already committed and a later pass
    /// will observe the satisfied flush id.
    pub async fn wait_until_stored(&self, required: u64, cancel: &CancellationToken) -> bool {
        let mut stored = self.stored.subscribe();
        loop {
            if cancel.is_cancelled() {
                return false;
            }
            if *stored.borrow_and_update() >= required {
                return true;
            }
            tokio::select! {
                _ = cancel.cancelled() => return false,
                changed = stored.changed() => {
                    // The tracker owns the sender, so the channel only closes if the tracker
                    // itself is dropped mid-wait.
                    if changed.is_err() {
                        return false;
                    }
                }
            }
        }
    }
}
