//! Rendezvous engine for the berth SDP relay.
//!
//! Two independent parties exchange opaque session-description envelopes
//! keyed by a shared string id. Three exchange modes share one id-keyed
//! engine: the one-shot blocking handoff, the non-destructive store, and the
//! synchronous resolver callback. The HTTP shell lives in `berth-server`;
//! this crate owns every invariant.

pub mod error;
pub mod listener;
pub mod registry;
pub mod resolver;
pub mod sdp;
pub mod service;

pub use error::SignalError;
pub use registry::{Registry, RegistryStats};
pub use resolver::Resolver;
pub use sdp::{decode, encode, Envelope, SdpKind, SessionDescription};
pub use service::{
    EnvelopeReply, ListenerHandle, SdpRequest, SignalingService, DEFAULT_HANDOFF_TIMEOUT,
};
