//! Unified error type for Pingback.

use pingback_protocol::{EventKind, ProtocolError};
use pingback_transport::TransportError;

/// The tracker options cannot describe a trackable media.
///
/// Always raised by the constructor, before anything is spawned or sent.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Neither a media URL nor explicit identifiers were supplied.
    #[error("no media URL or video identifiers supplied")]
    MissingSource,

    /// Explicit identifiers were supplied with an empty video id.
    #[error("video id must not be empty")]
    EmptyVideoId,

    /// The media URL has no `/vod/<id>` or `/live/<id>` segment.
    #[error("media URL {0:?} is not a recognized live or vod URL")]
    UnrecognizedMediaUrl(String),

    /// The explicit ping target is not an absolute http(s) URL.
    #[error("invalid ping URL {url:?}: {reason}")]
    InvalidPingUrl { url: String, reason: String },

    /// The playback range is negative, inverted or not finite.
    #[error("invalid playback range {start}..{end}")]
    InvalidRange { start: f64, end: f64 },
}

/// Top-level error returned by [`Tracker`](crate::Tracker) operations.
///
/// The `#[from]` attribute on each wrapped variant lets `?` convert
/// sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum PingbackError {
    /// Invalid construction options.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The ping could not be delivered. The events it carried are not
    /// resent.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The ping could not be encoded or the reply could not be parsed.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The tracker was created outside a Tokio runtime.
    #[error("no Tokio runtime is running")]
    NoRuntime,

    /// An event passed to [`Tracker::push_event`](crate::Tracker::push_event)
    /// is incomplete.
    #[error("invalid {kind} event: {reason}")]
    InvalidEvent { kind: EventKind, reason: String },

    /// The tracker has been destroyed; no more events are accepted.
    #[error("tracker has been destroyed")]
    Destroyed,
}
