use serde::Deserialize;
use serde::Serialize;

use crate::HELPER_IDENTIFIER;
use crate::HELPER_MIN_VERSION;

/// Identity of the privileged helper: a stable service identifier plus the
/// minimum version the broker requires.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HelperDescriptor {
    pub identifier: String,
    pub min_version: String,
}

impl HelperDescriptor {
    /// The build-time descriptor for the one helper this broker manages.
    pub fn builtin() -> Self {
        Self {
            identifier: HELPER_IDENTIFIER.to_string(),
            min_version: HELPER_MIN_VERSION.to_string(),
        }
    }
}

/// Address handed back to clients so they can speak to the helper directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelperEndpoint {
    /// Identifier of the helper the endpoint reaches.
    pub identifier: String,
    /// Path of the helper's listening socket.
    pub socket_path: String,
}
