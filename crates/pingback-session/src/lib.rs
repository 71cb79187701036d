//! Session identity for Pingback.
//!
//! A "session" ties together every ping sent for one continuous playback
//! of one video. The collector issues the session token in its reply to a
//! ping; this crate keeps that token:
//!
//! 1. **Identity**: at most one token per tracker, first one wins
//!    ([`SessionIdentity`])
//! 2. **Persistence**: the token survives restarts through a pluggable
//!    key-value store ([`SessionStore`] trait, [`MemoryStore`])
//! 3. **Reporting**: the immutable session facts that go into every ping
//!    ([`Session`])
//!
//! # How it fits in the stack
//!
//! ```text
//! Tracker (above)  ← snapshots the session into each ping, feeds back tokens
//!     ↕
//! Session Layer (this crate)  ← owns the token and its persistence
//!     ↕
//! Protocol Layer (below)  ← provides SessionSnapshot, VideoType
//! ```

mod error;
mod identity;
mod session;
mod store;

pub use error::StoreError;
pub use identity::{SessionCallback, SessionIdentity};
pub use session::Session;
pub use store::{MemoryStore, NullStore, STORAGE_KEY_PREFIX, SessionStore, storage_key};
