use std::collections::HashMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::SignalError;

/// Descriptor kinds carried in the envelope's `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpKind {
    Offer,
    Pranswer,
    Answer,
    Rollback,
}

/// The opaque session-description envelope: `{"type": "...", "sdp": "..."}`.
///
/// The `sdp` text is never parsed here; the relay only moves it around.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub kind: SdpKind,
    pub sdp: String,
}

impl SessionDescription {
    pub fn new(kind: SdpKind, sdp: impl Into<String>) -> Self {
        Self {
            kind,
            sdp: sdp.into(),
        }
    }
}

/// A decoded descriptor plus its uninterpreted string-to-string sidecar.
///
/// The sidecar travels in the outer request/response body, never inside the
/// base64 blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub description: SessionDescription,
    pub data: HashMap<String, String>,
}

impl Envelope {
    pub fn new(description: SessionDescription, data: HashMap<String, String>) -> Self {
        Self { description, data }
    }
}

/// Serializes a description to JSON and wraps it in standard padded base64.
pub fn encode(description: &SessionDescription) -> Result<String, SignalError> {
    let json = serde_json::to_vec(description).map_err(SignalError::Encoding)?;
    Ok(STANDARD.encode(json))
}

/// Reverses [`encode`]: base64 first, then the JSON envelope.
pub fn decode(encoded: &str) -> Result<SessionDescription, SignalError> {
    let json = STANDARD.decode(encoded)?;
    serde_json::from_slice(&json).map_err(SignalError::MalformedDescriptor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_deadline::deadline]
    fn round_trips_a_descriptor() {
        let description = SessionDescription::new(SdpKind::Offer, "v=0\r\no=- 0 0 IN IP4 0.0.0.0");
        let encoded = encode(&description).unwrap();
        assert_eq!(decode(&encoded).unwrap(), description);
    }

    #[test_deadline::deadline]
    fn kind_uses_the_lowercase_wire_name() {
        let encoded = encode(&SessionDescription::new(SdpKind::Answer, "v=0")).unwrap();
        let json = STANDARD.decode(encoded).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&json).unwrap();
        assert_eq!(value["type"], "answer");
        assert_eq!(value["sdp"], "v=0");
    }

    #[test_deadline::deadline]
    fn rejects_invalid_base64() {
        assert!(matches!(
            decode("not//valid=base64!"),
            Err(SignalError::InvalidBase64(_))
        ));
    }

    #[test_deadline::deadline]
    fn rejects_well_formed_base64_with_a_malformed_payload() {
        let encoded = STANDARD.encode(br#"{"type": "offer"}"#);
        assert!(matches!(
            decode(&encoded),
            Err(SignalError::MalformedDescriptor(_))
        ));

        let encoded = STANDARD.encode(b"plainly not json");
        assert!(matches!(
            decode(&encoded),
            Err(SignalError::MalformedDescriptor(_))
        ));
    }

    #[test_deadline::deadline]
    fn rejects_unknown_descriptor_kinds() {
        let encoded = STANDARD.encode(br#"{"type": "renegotiate", "sdp": "v=0"}"#);
        assert!(matches!(
            decode(&encoded),
            Err(SignalError::MalformedDescriptor(_))
        ));
    }
}
