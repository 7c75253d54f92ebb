use std::sync::Arc;

use helperd_broker::HelperConnectionBroker;
use helperd_broker::TransportError;
use helperd_installer::HelperInstaller;
use helperd_installer::InstallError;
use helperd_protocol::BrokerError;
use helperd_protocol::ClientRequest;
use helperd_protocol::ClientResponse;
use helperd_protocol::HelperDescriptor;
use tracing::debug;
use tracing::warn;

/// Dispatches validated client requests to the installer and the connection
/// broker.
///
/// Holds the two privileged-path capabilities by reference; client sessions
/// themselves carry no authorization state.
pub struct ServiceFront {
    descriptor: HelperDescriptor,
    installer: Arc<HelperInstaller>,
    broker: Arc<HelperConnectionBroker>,
}

impl ServiceFront {
    pub fn new(
        descriptor: HelperDescriptor,
        installer: Arc<HelperInstaller>,
        broker: Arc<HelperConnectionBroker>,
    ) -> Self {
        Self {
            descriptor,
            installer,
            broker,
        }
    }

    pub async fn handle(&self, request: ClientRequest) -> ClientResponse {
        match request {
            ClientRequest::Echo { id, text } => {
                debug!("echo request {id}");
                ClientResponse::Echo {
                    id,
                    text: text.to_uppercase(),
                }
            }
            ClientRequest::InstallHelper { id } => {
                let result = self
                    .installer
                    .ensure_installed(&self.descriptor)
                    .await
                    .map_err(normalize_install_error);
                ClientResponse::InstallHelper { id, result }
            }
            ClientRequest::GetHelperConnection { id } => {
                let handle = self.broker.get_connection();
                let result = handle.endpoint().await.map_err(normalize_transport_error);
                ClientResponse::HelperConnection { id, result }
            }
        }
    }
}

fn normalize_install_error(err: InstallError) -> BrokerError {
    match err {
        InstallError::AuthUnavailable => BrokerError::AuthUnavailable,
        InstallError::AuthDenied { .. } => BrokerError::AuthDenied,
        InstallError::PromptTimedOut => BrokerError::PromptTimedOut,
        InstallError::Failed { cause } => BrokerError::InstallFailed { cause },
    }
}

fn normalize_transport_error(err: TransportError) -> BrokerError {
    if let TransportError::Unreachable { cause } = &err {
        // The cause stays in the daemon log; clients only see the taxonomy.
        warn!("helper connection failed: {cause}");
    }
    BrokerError::TransportInvalidated
}
