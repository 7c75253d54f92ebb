use std::sync::Arc;

use helperd_protocol::ClientRequest;
use helperd_protocol::ClientResponse;
use tokio::io::AsyncBufReadExt;
use tokio::io::AsyncWriteExt;
use tokio::io::BufReader;
use tokio::net::UnixListener;
use tokio::net::UnixStream;
use tokio::net::unix::UCred;
use tracing::debug;
use tracing::warn;

use crate::front::ServiceFront;

/// Policy decision point for inbound connections.
pub trait AcceptPolicy: Send + Sync {
    fn should_accept(&self, peer: &UCred) -> bool;
}

/// Accepts peers running as the daemon's own user, or root.
pub struct SameUserPolicy;

impl AcceptPolicy for SameUserPolicy {
    fn should_accept(&self, peer: &UCred) -> bool {
        // SAFETY: geteuid has no preconditions and cannot fail.
        let own_uid = unsafe { libc::geteuid() };
        peer.uid() == own_uid || peer.uid() == 0
    }
}

/// Accept loop: validates each inbound connection against `policy` and runs
/// accepted ones on their own task.
pub async fn serve(
    listener: UnixListener,
    front: Arc<ServiceFront>,
    policy: Arc<dyn AcceptPolicy>,
) -> anyhow::Result<()> {
    loop {
        let (stream, _addr) = listener.accept().await?;
        match stream.peer_cred() {
            Ok(peer) if policy.should_accept(&peer) => {
                debug!("accepted client connection from uid {}", peer.uid());
                let front = Arc::clone(&front);
                tokio::spawn(async move {
                    if let Err(err) = run_client_session(stream, front).await {
                        debug!("client session ended: {err:#}");
                    }
                });
            }
            Ok(peer) => {
                warn!("rejecting client connection from uid {}", peer.uid());
            }
            Err(err) => {
                warn!("failed to read peer credentials: {err}");
            }
        }
    }
}

/// One accepted inbound connection: newline-delimited JSON requests in,
/// responses out, for the lifetime of the stream.
async fn run_client_session(stream: UnixStream, front: Arc<ServiceFront>) -> anyhow::Result<()> {
    let (read_half, mut write_half) = stream.into_split();
    let mut lines = BufReader::new(read_half).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let response = match serde_json::from_str::<ClientRequest>(&line) {
            Ok(request) => front.handle(request).await,
            Err(err) => {
                debug!("malformed request line: {err}");
                ClientResponse::Malformed {
                    error: err.to_string(),
                }
            }
        };
        let mut json = serde_json::to_string(&response)?;
        json.push('\n');
        write_half.write_all(json.as_bytes()).await?;
    }
    debug!("client disconnected");
    Ok(())
}
