//! Wire protocol for Pingback.
//!
//! This crate defines what a ping looks like on the wire:
//!
//! - **Types** ([`PingPayload`], [`SessionSnapshot`], [`PlaybackEvent`],
//!   etc.): the structures serialized into the body of each ping, and
//!   the [`PingResponse`] the collector answers with.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how those structures
//!   are converted to/from bytes.
//! - **Errors** ([`ProtocolError`]): what can go wrong during
//!   encoding/decoding.
//!
//! # Architecture
//!
//! The protocol layer sits between the tracker (which owns the event log
//! and the session) and the transport (which moves raw bytes). It knows
//! nothing about timers, storage or HTTP.
//!
//! ```text
//! Tracker (events + session) → Protocol (PingPayload) → Transport (bytes)
//! ```

// ---------------------------------------------------------------------------
// Module declarations
// ---------------------------------------------------------------------------

mod codec;
mod error;
mod timestamp;
mod types;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    EventKind, MetadataEntry, Navigator, PingPayload, PingResponse,
    PlaybackEvent, PlaybackRange, SessionSnapshot, VideoType,
};
