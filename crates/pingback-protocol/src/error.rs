//! Error types for the protocol layer.
//!
//! Each crate in Pingback defines its own error enum. When you see a
//! `ProtocolError`, the problem is in turning a ping into bytes (or a
//! collector reply back into a [`PingResponse`](crate::PingResponse)),
//! not in the network or in storage.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization of an outgoing payload failed.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization of a collector response failed.
    ///
    /// Common causes: an HTML error page instead of JSON, an empty body,
    /// or a `session` field that is not a string.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The message parsed but is not meaningful at the protocol level.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
