use std::path::Path;
use std::path::PathBuf;

use helperd_protocol::HelperDescriptor;
use helperd_protocol::HelperEndpoint;
use tokio::io::AsyncReadExt;
use tokio::net::UnixStream;
use tokio::sync::mpsc;
use tracing::debug;

use crate::transport::HelperTransport;
use crate::transport::TransportError;

/// [`crate::HelperTransport`] over the helper's well-known Unix socket at
/// `<dir>/<identifier>.sock`.
pub struct UdsHelperTransport {
    socket_dir: PathBuf,
}

impl UdsHelperTransport {
    pub fn new(socket_dir: PathBuf) -> Self {
        Self { socket_dir }
    }

    fn socket_path(&self, descriptor: &HelperDescriptor) -> PathBuf {
        self.socket_dir
            .join(format!("{}.sock", descriptor.identifier))
    }
}

#[async_trait::async_trait]
impl HelperTransport for UdsHelperTransport {
    async fn connect(
        &self,
        descriptor: &HelperDescriptor,
        generation: u64,
        invalidations: mpsc::UnboundedSender<u64>,
    ) -> Result<HelperEndpoint, TransportError> {
        let path = self.socket_path(descriptor);
        let stream = UnixStream::connect(&path)
            .await
            .map_err(|err| TransportError::Unreachable {
                cause: format!("connect to {}: {err}", path.display()),
            })?;
        debug!("connected to helper at {}", path.display());
        tokio::spawn(watch_for_disconnect(stream, generation, invalidations));
        Ok(HelperEndpoint {
            identifier: descriptor.identifier.clone(),
            socket_path: path.display().to_string(),
        })
    }
}

/// Drains the stream until EOF or error, then reports invalidation for
/// `generation`.
async fn watch_for_disconnect(
    mut stream: UnixStream,
    generation: u64,
    invalidations: mpsc::UnboundedSender<u64>,
) {
    let mut buf = [0u8; 256];
    loop {
        match stream.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
    }
    debug!("helper stream closed, generation {generation}");
    let _ = invalidations.send(generation);
}

/// Returns the socket path a helper with `identifier` listens on under
/// `socket_dir`.
pub fn helper_socket_path(socket_dir: &Path, identifier: &str) -> PathBuf {
    socket_dir.join(format!("{identifier}.sock"))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use tokio::net::UnixListener;

    use super::*;
    use crate::HelperConnectionBroker;

    #[tokio::test]
    async fn connects_to_listening_helper_and_reports_disconnect() {
        let dir = tempfile::tempdir().expect("tempdir");
        let descriptor = HelperDescriptor::builtin();
        let path = helper_socket_path(dir.path(), &descriptor.identifier);
        let listener = UnixListener::bind(&path).expect("bind helper socket");

        let transport = Arc::new(UdsHelperTransport::new(dir.path().to_path_buf()));
        let broker = HelperConnectionBroker::new(descriptor.clone(), transport);

        let handle = broker.get_connection();
        let accept = tokio::spawn(async move { listener.accept().await });
        let endpoint = handle.endpoint().await.expect("endpoint should establish");
        assert_eq!(descriptor.identifier, endpoint.identifier);

        // Dropping the helper side of the stream invalidates the handle.
        let (helper_side, _addr) = accept
            .await
            .expect("accept task")
            .expect("accept should succeed");
        drop(helper_side);
        handle.invalidated().await;
        assert_matches!(handle.endpoint().await, Err(TransportError::Invalidated));
    }

    #[tokio::test]
    async fn missing_helper_socket_is_unreachable() {
        let dir = tempfile::tempdir().expect("tempdir");
        let transport = Arc::new(UdsHelperTransport::new(dir.path().to_path_buf()));
        let broker = HelperConnectionBroker::new(HelperDescriptor::builtin(), transport);

        let handle = broker.get_connection();
        assert_matches!(
            handle.endpoint().await,
            Err(TransportError::Unreachable { .. })
        );
    }
}
