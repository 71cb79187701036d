//! Transport abstraction layer for Pingback.
//!
//! Provides the [`PingTransport`] trait: one async request/response
//! exchange with the collector. The tracker never talks HTTP directly,
//! which keeps it testable with an in-process fake and lets embedders
//! plug in their own client.
//!
//! # Feature Flags
//!
//! - `http` (default): [`HttpTransport`] via `reqwest`

mod error;
#[cfg(feature = "http")]
mod http;

pub use error::TransportError;
#[cfg(feature = "http")]
pub use http::HttpTransport;

use std::future::Future;

/// Sends one ping body to the collector and returns the raw response body.
///
/// `Send + Sync + 'static` because the tracker shares the transport with
/// the tasks it spawns for in-flight pings, and the returned future must
/// be `Send` so those tasks can run on any runtime thread.
///
/// # Example
///
/// ```rust
/// use pingback_transport::{PingTransport, TransportError};
///
/// /// Drops every ping and answers with an empty JSON object.
/// struct Blackhole;
///
/// impl PingTransport for Blackhole {
///     async fn post(&self, _url: &str, _body: Vec<u8>) -> Result<Vec<u8>, TransportError> {
///         Ok(b"{}".to_vec())
///     }
/// }
/// ```
pub trait PingTransport: Send + Sync + 'static {
    /// POSTs `body` (JSON) to `url`.
    ///
    /// `url` already carries every query parameter the request needs.
    ///
    /// # Returns
    /// - `Ok(bytes)`: the collector accepted the ping; `bytes` is the
    ///   response body, still undecoded
    /// - `Err(TransportError)`: network failure or non-success status
    fn post(
        &self,
        url: &str,
        body: Vec<u8>,
    ) -> impl Future<Output = Result<Vec<u8>, TransportError>> + Send;
}
