//! Lazily established, self-healing connection brokering to the privileged
//! helper.
//!
//! [`HelperConnectionBroker`] caches at most one live
//! [`HelperConnectionHandle`] and replaces it only after the transport
//! reports invalidation, so repeated lookups reuse one underlying channel.

mod broker;
mod transport;
mod uds;

pub use broker::HelperConnectionBroker;
pub use broker::HelperConnectionHandle;
pub use transport::HandleState;
pub use transport::HelperTransport;
pub use transport::TransportError;
pub use uds::UdsHelperTransport;
