use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SignalError;
use crate::listener::Listener;
use crate::registry::{Registry, RegistryStats};
use crate::resolver::Resolver;
use crate::sdp::{self, Envelope, SessionDescription};

/// Default bound on every handoff read. Long enough to bridge two callers
/// arriving seconds apart, short enough that an absent counterpart cannot
/// pin a worker indefinitely.
pub const DEFAULT_HANDOFF_TIMEOUT: Duration = Duration::from_secs(30);

/// Request body shared by every descriptor-carrying operation:
/// `{"id": ..., "sdp": <base64 JSON descriptor>, "data": {..}?}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SdpRequest {
    pub id: String,
    pub sdp: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub data: HashMap<String, String>,
}

impl SdpRequest {
    pub fn new(id: impl Into<String>, sdp: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            sdp: sdp.into(),
            data: HashMap::new(),
        }
    }

    pub fn with_data(mut self, data: HashMap<String, String>) -> Self {
        self.data = data;
        self
    }
}

/// Encoded reply handed back to a caller: the descriptor re-encoded through
/// the codec plus the sidecar, which is dropped from the wire when empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvelopeReply {
    pub sdp: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub data: HashMap<String, String>,
}

/// Held by the registering side of a handoff after [`SignalingService::register`].
///
/// `recv_remote` blocks (bounded) until the counterpart's descriptor arrives
/// through the handshake or inform operation; `send_local` delivers the reply
/// a blocked handshake caller is waiting on.
pub struct ListenerHandle {
    listener: Arc<Listener>,
    deadline: Duration,
}

impl ListenerHandle {
    pub async fn recv_remote(&self) -> Result<Envelope, SignalError> {
        self.listener.read_client(self.deadline).await
    }

    pub fn send_local(
        &self,
        description: SessionDescription,
        data: HashMap<String, String>,
    ) -> Result<(), SignalError> {
        self.listener.write_server(Envelope::new(description, data))
    }
}

/// Orchestrates the registry behind the operations the transport shell
/// consumes. Cheap to clone; clones share one registry.
#[derive(Clone)]
pub struct SignalingService {
    registry: Registry,
    handoff_timeout: Duration,
}

impl Default for SignalingService {
    fn default() -> Self {
        Self::new(DEFAULT_HANDOFF_TIMEOUT)
    }
}

impl SignalingService {
    pub fn new(handoff_timeout: Duration) -> Self {
        Self {
            registry: Registry::new(),
            handoff_timeout,
        }
    }

    /// Registers interest in `id` and returns the handle the registrant uses
    /// to complete the handoff. A direct library call, not an HTTP route.
    pub fn register(&self, id: &str) -> Result<ListenerHandle, SignalError> {
        if id.is_empty() {
            return Err(SignalError::EmptyId);
        }
        let listener = self.registry.add_listener(id)?;
        debug!(id = %id, "listener registered");
        Ok(ListenerHandle {
            listener,
            deadline: self.handoff_timeout,
        })
    }

    /// The blocking round trip coupling two independent requests: claim the
    /// id's listener, deliver the caller's descriptor, then await the
    /// registrant's reply under the configured deadline.
    pub async fn handshake(&self, request: &SdpRequest) -> Result<EnvelopeReply, SignalError> {
        let envelope = validate(request)?;
        let listener = self.registry.claim_listener(&request.id)?;
        listener.write_client(envelope)?;
        debug!(id = %request.id, "client descriptor delivered, awaiting reply");
        let reply = listener.read_server(self.handoff_timeout).await?;
        encode_reply(reply)
    }

    /// Fire-and-forget variant of [`SignalingService::handshake`]: same
    /// claim-and-deliver, no reply awaited.
    pub fn inform(&self, request: &SdpRequest) -> Result<(), SignalError> {
        let envelope = validate(request)?;
        let listener = self.registry.claim_listener(&request.id)?;
        listener.write_client(envelope)?;
        debug!(id = %request.id, "client descriptor delivered");
        Ok(())
    }

    /// Insert-once into the non-destructive store.
    pub fn store(&self, request: &SdpRequest) -> Result<(), SignalError> {
        let envelope = validate(request)?;
        self.registry.add_descriptor(&request.id, envelope)?;
        debug!(id = %request.id, "descriptor stored");
        Ok(())
    }

    /// Repeatable read from the store.
    pub fn fetch(&self, id: &str) -> Result<EnvelopeReply, SignalError> {
        if id.is_empty() {
            return Err(SignalError::EmptyId);
        }
        encode_reply(self.registry.get_descriptor(id)?)
    }

    /// Registers the resolver backing the synchronous exchange mode for
    /// `id`. A direct library call, like [`SignalingService::register`].
    pub fn register_resolver(
        &self,
        id: &str,
        resolver: Arc<dyn Resolver>,
    ) -> Result<(), SignalError> {
        if id.is_empty() {
            return Err(SignalError::EmptyId);
        }
        self.registry.add_resolver(id, resolver)?;
        debug!(id = %id, "resolver registered");
        Ok(())
    }

    /// Synchronous exchange: decode the remote descriptor, run the id's
    /// resolver (outside the registry lock), re-encode its local reply. No
    /// suspension beyond the resolver's own execution.
    pub fn resolve(&self, request: &SdpRequest) -> Result<EnvelopeReply, SignalError> {
        let remote = validate(request)?;
        let resolver = self.registry.take_resolver(&request.id)?;
        let local = resolver.resolve(remote);
        debug!(id = %request.id, "resolver produced local descriptor");
        encode_reply(local)
    }

    pub fn stats(&self) -> RegistryStats {
        self.registry.snapshot()
    }
}

fn validate(request: &SdpRequest) -> Result<Envelope, SignalError> {
    if request.id.is_empty() {
        return Err(SignalError::EmptyId);
    }
    if request.sdp.is_empty() {
        return Err(SignalError::EmptySdp);
    }
    let description = sdp::decode(&request.sdp)?;
    Ok(Envelope::new(description, request.data.clone()))
}

fn encode_reply(envelope: Envelope) -> Result<EnvelopeReply, SignalError> {
    Ok(EnvelopeReply {
        sdp: sdp::encode(&envelope.description)?,
        data: envelope.data,
    })
}
