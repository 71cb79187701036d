//! The session record: the facts about one playback that every ping
//! repeats.
//!
//! Everything in a [`Session`] is fixed when the tracker is built. The one
//! field that changes, the collector-issued token, lives in
//! [`SessionIdentity`](crate::SessionIdentity) because it is shared with
//! in-flight pings; [`Session::snapshot`] joins the two back together.

use chrono::{DateTime, Utc};
use pingback_protocol::{MetadataEntry, Navigator, PlaybackRange, SessionSnapshot, VideoType};

/// A single playback session as seen by the tracker.
///
/// `video_type` and `video_id` are private and have no setters: they
/// identify what is being watched and must not change mid-session.
#[derive(Debug, Clone)]
pub struct Session {
    video_type: VideoType,
    video_id: String,
    loaded_at: DateTime<Utc>,

    /// Page or screen the player was embedded in. Empty when unknown.
    pub referrer: String,

    /// Caller-supplied name/value pairs, in the order given.
    pub metadata: Vec<MetadataEntry>,

    pub navigator: Option<Navigator>,

    /// The part of the media this session plays, when it is a clip.
    pub range: Option<PlaybackRange>,
}

impl Session {
    /// Creates a session for the given media, loaded at `loaded_at`.
    pub fn new(video_type: VideoType, video_id: impl Into<String>, loaded_at: DateTime<Utc>) -> Self {
        Self {
            video_type,
            video_id: video_id.into(),
            loaded_at,
            referrer: String::new(),
            metadata: Vec::new(),
            navigator: None,
            range: None,
        }
    }

    pub fn video_type(&self) -> VideoType {
        self.video_type
    }

    pub fn video_id(&self) -> &str {
        &self.video_id
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    /// Builds the wire view of this session, with `session_id` being the
    /// token assigned so far (if any).
    pub fn snapshot(&self, session_id: Option<String>) -> SessionSnapshot {
        let mut snapshot = SessionSnapshot::new(self.video_type, self.video_id.clone(), self.loaded_at);
        snapshot.referrer = self.referrer.clone();
        snapshot.metadata = self.metadata.clone();
        snapshot.session_id = session_id;
        snapshot.navigator = self.navigator.clone();
        snapshot.range = self.range;
        snapshot
    }
}
