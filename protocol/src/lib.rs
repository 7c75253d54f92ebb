//! Wire types shared between the broker daemon, its clients, and the
//! privileged helper machinery.
//!
//! Everything that crosses the client transport boundary lives here so that
//! the daemon crates can normalize platform failures into one fixed error
//! taxonomy before they are serialized.

mod descriptor;
mod error;
mod wire;

pub use descriptor::HelperDescriptor;
pub use descriptor::HelperEndpoint;
pub use error::BrokerError;
pub use wire::ClientRequest;
pub use wire::ClientResponse;

/// Well-known name of the broker's own listening endpoint.
pub const SERVICE_NAME: &str = "dev.helperd.broker";

/// Identifier of the privileged helper this broker installs and talks to.
/// Fixed at build time; the helper lives at an OS-determined system
/// location outside this workspace's control.
pub const HELPER_IDENTIFIER: &str = "dev.helperd.helper";

/// Minimum helper version the broker requires. Version comparison and
/// upgrade policy are owned by the OS installation primitive.
pub const HELPER_MIN_VERSION: &str = "1.0.0";

/// Named right that must be granted before the installation primitive may
/// be invoked.
pub const INSTALL_HELPER_RIGHT: &str = "dev.helperd.install-privileged-helper";
