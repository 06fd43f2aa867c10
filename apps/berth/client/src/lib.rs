//! HTTP client for a running berth relay, consumed by the server's CLI
//! subcommands and by the integration tests.

use std::time::Duration;

use berth_core::service::{EnvelopeReply, SdpRequest};
use serde::Deserialize;
use thiserror::Error;

pub use reqwest::StatusCode;

/// The handshake endpoint blocks until the registrant replies or the relay's
/// handoff deadline expires, so the HTTP timeout has to outlive it.
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("relay rejected the request ({status}): {reason}")]
    Rejected { status: StatusCode, reason: String },
}

impl ClientError {
    /// The relay's wire reason string, when the failure came from the relay.
    pub fn reason(&self) -> Option<&str> {
        match self {
            ClientError::Rejected { reason, .. } => Some(reason),
            ClientError::Transport(_) => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct FailureBody {
    #[serde(default)]
    reason: String,
}

/// Thin typed wrapper over the relay's routes.
#[derive(Debug, Clone)]
pub struct RelayClient {
    http: reqwest::Client,
    base_url: String,
}

impl RelayClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::with_timeout(base_url, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Blocking round trip: delivers `request` to the id's registrant and
    /// returns the reply descriptor the registrant sends back.
    pub async fn handshake(&self, request: &SdpRequest) -> Result<EnvelopeReply, ClientError> {
        self.post_reply("handshake", request).await
    }

    /// Fire-and-forget delivery to the id's registrant.
    pub async fn inform(&self, request: &SdpRequest) -> Result<(), ClientError> {
        self.post_ack("inform", request).await
    }

    /// Insert-once into the relay's store.
    pub async fn store(&self, request: &SdpRequest) -> Result<(), ClientError> {
        self.post_ack("store", request).await
    }

    /// Repeatable read of a stored descriptor.
    pub async fn fetch(&self, id: &str) -> Result<EnvelopeReply, ClientError> {
        let response = self
            .http
            .get(format!("{}/store/{}", self.base_url, id))
            .send()
            .await?;
        Self::read_reply(response).await
    }

    /// Runs the id's registered resolver against `request`.
    pub async fn exchange(&self, request: &SdpRequest) -> Result<EnvelopeReply, ClientError> {
        self.post_reply("exchange", request).await
    }

    async fn post_reply(
        &self,
        route: &str,
        request: &SdpRequest,
    ) -> Result<EnvelopeReply, ClientError> {
        let response = self
            .http
            .post(format!("{}/{}", self.base_url, route))
            .json(request)
            .send()
            .await?;
        Self::read_reply(response).await
    }

    async fn post_ack(&self, route: &str, request: &SdpRequest) -> Result<(), ClientError> {
        let response = self
            .http
            .post(format!("{}/{}", self.base_url, route))
            .json(request)
            .send()
            .await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::rejected(response).await)
        }
    }

    async fn read_reply(response: reqwest::Response) -> Result<EnvelopeReply, ClientError> {
        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            Err(Self::rejected(response).await)
        }
    }

    async fn rejected(response: reqwest::Response) -> ClientError {
        let status = response.status();
        let reason = response
            .json::<FailureBody>()
            .await
            .map(|body| body.reason)
            .unwrap_or_default();
        ClientError::Rejected { status, reason }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_deadline::deadline]
    fn base_url_loses_its_trailing_slash() {
        let client = RelayClient::new("http://127.0.0.1:8089/").unwrap();
        assert_eq!(client.base_url, "http://127.0.0.1:8089");
    }
}
