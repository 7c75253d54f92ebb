use std::sync::Arc;
use std::sync::Mutex;
use std::sync::Weak;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use futures::FutureExt;
use futures::future::BoxFuture;
use futures::future::Shared;
use helperd_protocol::HelperDescriptor;
use helperd_protocol::HelperEndpoint;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::transport::HandleState;
use crate::transport::HelperTransport;
use crate::transport::TransportError;

type ReadyFuture = Shared<BoxFuture<'static, Result<HelperEndpoint, TransportError>>>;

/// A (possibly not-yet-established) channel to the privileged helper.
///
/// Once invalidated a handle stays invalidated; callers go back to the
/// broker for a fresh one.
pub struct HelperConnectionHandle {
    generation: u64,
    ready: ReadyFuture,
    invalidated: CancellationToken,
}

impl HelperConnectionHandle {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Waits for establishment and returns the helper endpoint.
    ///
    /// An invalidation that lands after establishment still wins: the
    /// endpoint of an invalidated handle is never handed out.
    pub async fn endpoint(&self) -> Result<HelperEndpoint, TransportError> {
        if self.invalidated.is_cancelled() {
            return Err(TransportError::Invalidated);
        }
        let endpoint = self.ready.clone().await?;
        if self.invalidated.is_cancelled() {
            return Err(TransportError::Invalidated);
        }
        Ok(endpoint)
    }

    /// Completes when the handle becomes invalidated.
    pub async fn invalidated(&self) {
        self.invalidated.cancelled().await;
    }

    pub fn state(&self) -> HandleState {
        if self.invalidated.is_cancelled() {
            return HandleState::Invalidated;
        }
        match self.ready.peek() {
            None => HandleState::Connecting,
            Some(Ok(_)) => HandleState::Established,
            Some(Err(_)) => HandleState::Invalidated,
        }
    }
}

enum BrokerState {
    Absent,
    /// A handle exists and is connecting or established.
    Active(Arc<HelperConnectionHandle>),
}

/// Lazily creates, caches, and invalidates the single connection handle to
/// the installed helper.
///
/// Invalidation arrives as a message carrying the handle's generation and is
/// applied under the same lock as handle lookup, so the later of
/// "invalidate" and "fresh lookup" always wins: a stale generation is
/// ignored, and a handle that finished establishing just before its
/// invalidation signal is still torn down.
pub struct HelperConnectionBroker {
    descriptor: HelperDescriptor,
    transport: Arc<dyn HelperTransport>,
    state: Mutex<BrokerState>,
    invalidation_tx: mpsc::UnboundedSender<u64>,
    next_generation: AtomicU64,
}

impl HelperConnectionBroker {
    /// Must be called from within a tokio runtime; the broker spawns a task
    /// that applies invalidation messages to the cached state.
    pub fn new(descriptor: HelperDescriptor, transport: Arc<dyn HelperTransport>) -> Arc<Self> {
        let (invalidation_tx, invalidation_rx) = mpsc::unbounded_channel();
        let broker = Arc::new(Self {
            descriptor,
            transport,
            state: Mutex::new(BrokerState::Absent),
            invalidation_tx,
            next_generation: AtomicU64::new(1),
        });
        tokio::spawn(Self::apply_invalidations(
            Arc::downgrade(&broker),
            invalidation_rx,
        ));
        broker
    }

    /// Returns the live handle, creating one if none exists.
    ///
    /// Never fails synchronously; usability is checked through
    /// [`HelperConnectionHandle::endpoint`]. Repeated calls while a handle
    /// is connecting or established return that same handle, so at most one
    /// establishment attempt is ever in flight.
    pub fn get_connection(&self) -> Arc<HelperConnectionHandle> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if let BrokerState::Active(handle) = &*state
            && handle.state() != HandleState::Invalidated
        {
            return Arc::clone(handle);
        }

        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let transport = Arc::clone(&self.transport);
        let descriptor = self.descriptor.clone();
        let invalidations = self.invalidation_tx.clone();
        let ready = async move {
            transport
                .connect(&descriptor, generation, invalidations)
                .await
        }
        .boxed()
        .shared();
        let handle = Arc::new(HelperConnectionHandle {
            generation,
            ready,
            invalidated: CancellationToken::new(),
        });
        debug!("creating helper connection handle, generation {generation}");
        *state = BrokerState::Active(Arc::clone(&handle));
        handle
    }

    async fn apply_invalidations(
        broker: Weak<Self>,
        mut invalidation_rx: mpsc::UnboundedReceiver<u64>,
    ) {
        while let Some(generation) = invalidation_rx.recv().await {
            let Some(broker) = broker.upgrade() else {
                break;
            };
            broker.invalidate(generation);
        }
    }

    fn invalidate(&self, generation: u64) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        match &*state {
            BrokerState::Active(handle) if handle.generation == generation => {
                debug!("helper connection invalidated, generation {generation}");
                handle.invalidated.cancel();
                *state = BrokerState::Absent;
            }
            _ => {
                debug!("ignoring stale invalidation for generation {generation}");
            }
        }
    }
}
