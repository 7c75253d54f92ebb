use helperd_protocol::HelperDescriptor;
use helperd_protocol::HelperEndpoint;
use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("failed to reach helper: {cause}")]
    Unreachable { cause: String },
    #[error("helper connection was invalidated")]
    Invalidated,
}

/// Observable lifecycle of one [`crate::HelperConnectionHandle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleState {
    /// Establishment has not finished yet.
    Connecting,
    /// The helper answered and the endpoint is usable.
    Established,
    /// The handle must be discarded; the next broker lookup starts fresh.
    Invalidated,
}

/// Transport layer that reaches the installed helper.
#[async_trait::async_trait]
pub trait HelperTransport: Send + Sync {
    /// Establishes a channel to the helper named by `descriptor`.
    ///
    /// On success the transport must arrange for `generation` to be sent on
    /// `invalidations` exactly once when the channel later dies (remote
    /// disconnect, helper exit, teardown). A failed establishment must not
    /// signal invalidation.
    async fn connect(
        &self,
        descriptor: &HelperDescriptor,
        generation: u64,
        invalidations: mpsc::UnboundedSender<u64>,
    ) -> Result<HelperEndpoint, TransportError>;
}
