use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::time::timeout;

use crate::error::SignalError;
use crate::sdp::Envelope;

/// One direction of the handoff: a single-use promise slot.
///
/// Writes resolve the promise immediately; only reads suspend, and every
/// read is bounded by an explicit deadline. Once either side of a slot has
/// been used it stays used.
struct Slot {
    tx: Mutex<Option<oneshot::Sender<Envelope>>>,
    rx: Mutex<Option<oneshot::Receiver<Envelope>>>,
}

impl Slot {
    fn new() -> Self {
        let (tx, rx) = oneshot::channel();
        Self {
            tx: Mutex::new(Some(tx)),
            rx: Mutex::new(Some(rx)),
        }
    }

    fn put(&self, envelope: Envelope) -> Result<(), SignalError> {
        let tx = self
            .tx
            .lock()
            .take()
            .ok_or(SignalError::HandoffConsumed)?;
        // Fails only when the reader already gave up (timed out or dropped).
        tx.send(envelope).map_err(|_| SignalError::HandoffAbandoned)
    }

    async fn take(&self, deadline: Duration) -> Result<Envelope, SignalError> {
        let rx = self
            .rx
            .lock()
            .take()
            .ok_or(SignalError::HandoffConsumed)?;
        match timeout(deadline, rx).await {
            Ok(Ok(envelope)) => Ok(envelope),
            Ok(Err(_)) => Err(SignalError::HandoffAbandoned),
            Err(_) => Err(SignalError::Timeout),
        }
    }
}

/// A per-id one-shot duplex handoff.
///
/// The `client` slot carries the descriptor supplied by the claiming side;
/// the `server` slot carries the registrant's reply. At most one value ever
/// flows through each slot, and the value a reader observes is exactly the
/// single writer's value for that id.
pub struct Listener {
    client: Slot,
    server: Slot,
}

impl Listener {
    pub(crate) fn new() -> Self {
        Self {
            client: Slot::new(),
            server: Slot::new(),
        }
    }

    /// Delivers the remote side's envelope to whoever registered this id.
    pub fn write_client(&self, envelope: Envelope) -> Result<(), SignalError> {
        self.client.put(envelope)
    }

    /// Awaits the remote side's envelope, up to `deadline`.
    pub async fn read_client(&self, deadline: Duration) -> Result<Envelope, SignalError> {
        self.client.take(deadline).await
    }

    /// Delivers the registrant's reply envelope.
    pub fn write_server(&self, envelope: Envelope) -> Result<(), SignalError> {
        self.server.put(envelope)
    }

    /// Awaits the registrant's reply, up to `deadline`.
    pub async fn read_server(&self, deadline: Duration) -> Result<Envelope, SignalError> {
        self.server.take(deadline).await
    }
}
