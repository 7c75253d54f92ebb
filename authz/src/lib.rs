//! Acquisition of OS authorization contexts and escalation of named rights.
//!
//! [`AuthorizationSession`] wraps one base authorization context obtained
//! from the operating environment and escalates it on demand. The
//! environment itself sits behind the [`Authority`] trait so tests and
//! other platforms can substitute their own subsystem.

mod authority;
mod session;
#[cfg(unix)]
mod unix;

pub use authority::Authority;
pub use authority::AuthorizationCredential;
pub use authority::RightsRequest;
pub use session::AuthError;
pub use session::AuthorizationSession;
pub use session::DEFAULT_PROMPT_TIMEOUT;
#[cfg(unix)]
pub use unix::UnixAuthority;
