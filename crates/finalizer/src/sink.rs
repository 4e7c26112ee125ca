use sequencer_primitives::BlockResponse;

/// The external data-stream sink produced L2 blocks are forwarded to.
///
/// Forwarding is best-effort from the core's perspective: a failure is logged but never fails
/// the batch and never rolls back state.
#[async_trait::async_trait]
#[auto_impl::auto_impl(&, Arc)]
pub trait L2BlockSink {
    /// The error type for the sink.
    type Error: std::fmt::Display + Send;

    /// Forwards an L2 block produced for the provided batch number.
    async fn send_l2_block(
        &self,
        batch_number: u64,
        block: &BlockResponse,
    ) -> Result<(), Self::Error>;
}
