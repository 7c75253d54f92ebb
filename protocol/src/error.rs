use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

/// Fixed error taxonomy exposed to clients.
///
/// Raw platform errors never cross the client transport boundary; the
/// service front normalizes every failure into one of these variants before
/// serializing a response.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BrokerError {
    /// The authorization subsystem could not be initialized. Near-fatal:
    /// surfaced to the caller, never silently retried.
    #[error("authorization subsystem is unavailable")]
    AuthUnavailable,
    /// The operator or policy refused the requested right. Recoverable; the
    /// caller may re-prompt later.
    #[error("authorization was denied")]
    AuthDenied,
    /// The privileged installation primitive reported an error. The cause is
    /// opaque and carried for diagnostics only.
    #[error("helper installation failed: {cause}")]
    InstallFailed { cause: String },
    /// An established helper connection died. The broker recovers lazily;
    /// the caller should request a fresh connection.
    #[error("helper connection was invalidated")]
    TransportInvalidated,
    /// An interactive authorization prompt was never answered within the
    /// bounded wait.
    #[error("interactive authorization prompt timed out")]
    PromptTimedOut,
}
