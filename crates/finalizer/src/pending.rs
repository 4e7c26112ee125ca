use sequencer_primitives::ForcedBatch;
use std::time::{Duration, Instant};

/// The locally buffered forced batches awaiting processing, plus the deadline by which they must
/// be force-processed.
///
/// The finalizer guards this buffer with one exclusive lock held for the full drain, so "decide
/// next number, process, clear" is atomic against concurrent enqueues.
#[derive(Debug, Default)]
pub struct PendingForcedBatches {
    batches: Vec<ForcedBatch>,
    deadline: Option<Instant>,
}

impl PendingForcedBatches {
    /// Buffers a forced batch. Buffering the first batch arms the processing deadline.
    pub fn push(&mut self, batch: ForcedBatch, deadline_after: Duration) {
        if self.deadline.is_none() {
            self.deadline = Some(Instant::now() + deadline_after);
        }
        self.batches.push(batch);
    }

    /// Takes all buffered batches, leaving the buffer empty, and disarms the deadline.
    pub fn take(&mut self) -> Vec<ForcedBatch> {
        self.deadline = None;
        std::mem::take(&mut self.batches)
    }

    /// Returns `true` if no batches are buffered.
    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    /// Returns the number of buffered batches.
    pub fn len(&self) -> usize {
        self.batches.len()
    }

    /// Returns `true` if batches are buffered and their processing deadline has passed.
    pub fn deadline_expired(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|deadline| deadline <= now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::Bytes;

    fn forced_batch(number: u64) -> ForcedBatch {
        ForcedBatch {
            number,
            global_exit_root: Default::default(),
            forced_at: 0,
            raw_txs_data: Bytes::new(),
        }
    }

    #[test]
    fn test_push_arms_deadline_once() {
        let mut pending = PendingForcedBatches::default();
        let deadline_after = Duration::from_secs(60);

        assert!(!pending.deadline_expired(Instant::now() + Duration::from_secs(3600)));

        pending.push(forced_batch(1), deadline_after);
        let armed_at = Instant::now();
        pending.push(forced_batch(2), Duration::from_secs(7200));

        // The second push must not extend the deadline armed by the first.
        assert!(pending.deadline_expired(armed_at + Duration::from_secs(61)));
        assert!(!pending.deadline_expired(armed_at));
        assert_eq!(pending.len(), 2);
    }

    #[test]
    fn test_take_clears_buffer_and_disarms_deadline() {
        let mut pending = PendingForcedBatches::default();
        pending.push(forced_batch(1), Duration::ZERO);

        let batches = pending.take();
        assert_eq!(batches.len(), 1);
        assert!(pending.is_empty());
        assert!(!pending.deadline_expired(Instant::now() + Duration::from_secs(3600)));
    }
}
