//! HTTP transport implementation using `reqwest`.

use reqwest::header::CONTENT_TYPE;

use crate::{PingTransport, TransportError};

/// A [`PingTransport`] that POSTs pings over HTTP(S).
///
/// Cheap to clone: `reqwest::Client` is an `Arc` around a connection pool.
/// No request timeout is configured here; callers wanting one should build
/// their own client and pass it to [`HttpTransport::with_client`].
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Creates a transport with a default `reqwest` client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps an existing client (custom timeouts, proxies, headers...).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl PingTransport for HttpTransport {
    async fn post(&self, url: &str, body: Vec<u8>) -> Result<Vec<u8>, TransportError> {
        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!(url, status = status.as_u16(), "collector rejected ping");
            return Err(TransportError::Status(status.as_u16()));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| TransportError::ReceiveFailed(e.to_string()))?;
        tracing::trace!(url, len = bytes.len(), "ping acknowledged");
        Ok(bytes.to_vec())
    }
}
