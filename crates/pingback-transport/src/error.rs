/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The request never produced a response (DNS, connect, TLS, reset).
    #[error("send failed: {0}")]
    SendFailed(String),

    /// The collector answered with a non-success status code.
    #[error("collector returned status {0}")]
    Status(u16),

    /// Reading the response body failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(String),
}
