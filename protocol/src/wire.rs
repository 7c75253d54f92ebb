use serde::Deserialize;
use serde::Serialize;

use crate::BrokerError;
use crate::HelperEndpoint;

/// One request from a client, framed as a single line of JSON on the
/// connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ClientRequest {
    /// Stateless, non-privileged request: reply with the uppercased text.
    Echo { id: u64, text: String },
    /// Ensure the privileged helper is installed (or upgraded) on this host.
    InstallHelper { id: u64 },
    /// Obtain an endpoint for talking to the installed helper directly.
    GetHelperConnection { id: u64 },
}

impl ClientRequest {
    pub fn id(&self) -> u64 {
        match self {
            ClientRequest::Echo { id, .. }
            | ClientRequest::InstallHelper { id }
            | ClientRequest::GetHelperConnection { id } => *id,
        }
    }
}

/// Reply to a [`ClientRequest`], correlated by `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ClientResponse {
    Echo {
        id: u64,
        text: String,
    },
    InstallHelper {
        id: u64,
        result: Result<(), BrokerError>,
    },
    HelperConnection {
        id: u64,
        result: Result<HelperEndpoint, BrokerError>,
    },
    /// The request line could not be parsed; `id` is absent because none was
    /// recoverable.
    Malformed {
        error: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn client_request_serializes_with_op_tag() {
        let request = ClientRequest::Echo {
            id: 7,
            text: "hello".to_string(),
        };
        let json = serde_json::to_value(&request).expect("serialize request");
        assert_eq!(
            json,
            serde_json::json!({"op": "echo", "id": 7, "text": "hello"})
        );
    }

    #[test]
    fn broker_error_serializes_with_kind_tag() {
        let response = ClientResponse::InstallHelper {
            id: 3,
            result: Err(BrokerError::InstallFailed {
                cause: "primitive exited with status 1".to_string(),
            }),
        };
        let json = serde_json::to_value(&response).expect("serialize response");
        assert_eq!(
            json,
            serde_json::json!({
                "op": "install_helper",
                "id": 3,
                "result": {
                    "Err": {
                        "kind": "install_failed",
                        "cause": "primitive exited with status 1",
                    }
                }
            })
        );
    }
}
