use thiserror::Error;

/// Failures surfaced by the rendezvous engine.
///
/// Every variant maps to a stable reason string spoken on the wire; the
/// transport shell turns each into a 4xx response without retrying.
#[derive(Debug, Error)]
pub enum SignalError {
    #[error("request id is empty")]
    EmptyId,
    #[error("request sdp is empty")]
    EmptySdp,
    #[error("descriptor is not valid base64: {0}")]
    InvalidBase64(#[from] base64::DecodeError),
    #[error("descriptor payload is not a session description: {0}")]
    MalformedDescriptor(#[source] serde_json::Error),
    #[error("descriptor could not be serialized: {0}")]
    Encoding(#[source] serde_json::Error),
    #[error("a listener is already registered for this id")]
    ListenerExists,
    #[error("no listener is registered for this id")]
    ListenerNotFound,
    #[error("a descriptor is already stored for this id")]
    DescriptorExists,
    #[error("no descriptor is stored for this id")]
    DescriptorNotFound,
    #[error("a resolver is already registered for this id")]
    ResolverExists,
    #[error("no resolver is registered for this id")]
    ResolverNotFound,
    #[error("handoff slot was already used")]
    HandoffConsumed,
    #[error("counterpart went away before completing the handoff")]
    HandoffAbandoned,
    #[error("timed out waiting for the handoff counterpart")]
    Timeout,
}

impl SignalError {
    /// Wire reason string, also used as the metric failure label.
    pub fn reason(&self) -> &'static str {
        match self {
            SignalError::EmptyId => "empty_id",
            SignalError::EmptySdp => "empty_sdp",
            SignalError::InvalidBase64(_) => "invalid_base64",
            SignalError::MalformedDescriptor(_) => "malformed_descriptor",
            SignalError::Encoding(_) => "encoding_failed",
            SignalError::ListenerExists => "listener_exists",
            SignalError::ListenerNotFound => "listener_does_not_exist",
            SignalError::DescriptorExists => "sdp_exists",
            SignalError::DescriptorNotFound => "sdp_does_not_exist",
            SignalError::ResolverExists => "resolver_exists",
            SignalError::ResolverNotFound => "resolver_does_not_exist",
            SignalError::HandoffConsumed => "handoff_consumed",
            SignalError::HandoffAbandoned => "handoff_abandoned",
            SignalError::Timeout => "handoff_timeout",
        }
    }
}
