//! The event log: every playback event, in emission order, plus a cursor
//! marking how far the log has been flushed.
//!
//! ```text
//!   events: [play, seek.forward, pause, resume, end]
//!                                      ^
//!                                    cursor = 3
//!   pending_slice() = [resume, end]
//! ```
//!
//! The cursor moves when a ping is *built*, not when the collector
//! acknowledges it. Delivery is therefore at-most-once: a ping that fails
//! in flight loses its events, but two pings built back to back can never
//! carry the same event twice.

use pingback_protocol::PlaybackEvent;

/// Append-only event log with a flushed-through cursor.
///
/// Invariant: `0 <= cursor <= events.len()`, and the cursor never moves
/// backwards.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Vec<PlaybackEvent>,
    cursor: usize,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an event at the end of the log.
    pub fn append(&mut self, event: PlaybackEvent) {
        self.events.push(event);
    }

    /// Events appended since the last [`mark_flushed`](Self::mark_flushed),
    /// oldest first.
    pub fn pending_slice(&self) -> &[PlaybackEvent] {
        &self.events[self.cursor..]
    }

    /// Moves the cursor to the end of the log and returns how many events
    /// it passed over.
    pub fn mark_flushed(&mut self) -> usize {
        let newly_flushed = self.events.len() - self.cursor;
        self.cursor = self.events.len();
        newly_flushed
    }

    /// Total number of events ever appended.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Number of events already handed to a ping.
    pub fn flushed(&self) -> usize {
        self.cursor
    }

    /// The whole log, flushed events included.
    pub fn events(&self) -> &[PlaybackEvent] {
        &self.events
    }
}
