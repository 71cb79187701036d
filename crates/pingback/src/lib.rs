//! # Pingback
//!
//! Playback telemetry agent for video players.
//!
//! A [`Tracker`] records what the player does (play, pause, seek, ...) and
//! reports it to a collector in periodic and lifecycle-triggered pings.
//! The collector answers with a session token that ties every later ping
//! of the same playback together; the tracker adopts the first one it
//! receives and persists it through a pluggable store.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pingback::prelude::*;
//!
//! # async fn run() -> Result<(), PingbackError> {
//! let options = TrackerOptions::from_media_url("https://cdn.example.com/vod/abc123/manifest.m3u8")
//!     .metadata("plan", "pro")
//!     .on_session_received(|id| println!("session {id}"));
//!
//! let tracker = Tracker::new(options, HttpTransport::new(), MemoryStore::new())?;
//! tracker.play().await?;
//! tracker.update_time(12.0).await?;
//! tracker.pause().await?;
//! tracker.destroy().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Delivery
//!
//! Events are considered delivered as soon as the ping carrying them is
//! dispatched. A failed ping is reported to the caller that triggered it,
//! and its events are not sent again.

mod accumulator;
mod config;
mod error;
mod media;
mod tracker;

pub use accumulator::EventLog;
pub use config::{ResolvedSource, TrackerOptions, VideoSource};
pub use error::{ConfigError, PingbackError};
pub use media::{MediaTarget, parse_media_url};
pub use tracker::{Tracker, TrackerInfo};

pub use pingback_protocol as protocol;
pub use pingback_session as session;
pub use pingback_tick as tick;
pub use pingback_transport as transport;

/// The types most embedders need.
pub mod prelude {
    pub use crate::{ConfigError, PingbackError, Tracker, TrackerInfo, TrackerOptions, VideoSource};
    pub use pingback_protocol::{
        EventKind, MetadataEntry, Navigator, PlaybackEvent, PlaybackRange, VideoType,
    };
    pub use pingback_session::{MemoryStore, NullStore, SessionStore};
    pub use pingback_tick::PlaybackState;
    #[cfg(feature = "http")]
    pub use pingback_transport::HttpTransport;
    pub use pingback_transport::PingTransport;
}
