//! Client-facing front of the broker daemon: socket acceptance, request
//! dispatch, and normalization of failures into the wire error taxonomy.

mod front;
mod listen;
mod listener;

pub use front::ServiceFront;
pub use listen::ListenEndpoint;
pub use listen::ListenEndpointParseError;
pub use listener::AcceptPolicy;
pub use listener::SameUserPolicy;
pub use listener::serve;
