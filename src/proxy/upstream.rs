//! Single-call upstream HTTP client
//!
//! Issues exactly one POST per call with a bounded timeout. Network and
//! timeout failures surface as a typed [`TransportError`] so the retry
//! controller can act on them; retrying is the caller's responsibility.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::types::ShowroomError;

/// Raw outcome of one upstream call. JSON parsing happens later, in the
/// classifier, so the transport layer stays byte-oriented.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body as text
    pub body_text: String,
}

/// The network call itself failed (connect error, timeout, aborted)
#[derive(Debug, Clone)]
pub struct TransportError(pub String);

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "transport error: {}", self.0)
    }
}

impl std::error::Error for TransportError {}

/// One POST to the upstream demo service
#[async_trait]
pub trait Upstream: Send + Sync {
    async fn call(&self, payload: &Value) -> Result<UpstreamResponse, TransportError>;
}

/// reqwest-backed upstream client
pub struct HttpUpstream {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpUpstream {
    /// Create a client for the given absolute endpoint URL.
    ///
    /// The per-attempt timeout aborts the in-flight request; the retry loop
    /// above decides whether to try again.
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, ShowroomError> {
        reqwest::Url::parse(endpoint)
            .map_err(|e| ShowroomError::Config(format!("Invalid upstream URL '{}': {}", endpoint, e)))?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ShowroomError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }
}

#[async_trait]
impl Upstream for HttpUpstream {
    async fn call(&self, payload: &Value) -> Result<UpstreamResponse, TransportError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(payload)
            .send()
            .await
            .map_err(|e| TransportError(e.to_string()))?;

        let status = response.status().as_u16();
        let body_text = response
            .text()
            .await
            .map_err(|e| TransportError(format!("Failed to read response body: {}", e)))?;

        debug!(status, body_len = body_text.len(), "Upstream call completed");

        Ok(UpstreamResponse { status, body_text })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_relative_url() {
        let result = HttpUpstream::new("/not/absolute", Duration::from_secs(1));
        assert!(result.is_err());
    }

    #[test]
    fn test_accepts_absolute_url() {
        let result = HttpUpstream::new("https://demos.example.com/run", Duration::from_secs(1));
        assert!(result.is_ok());
    }
}
