//! Core protocol types for Pingback's wire format.
//!
//! Everything here is serialized into (or parsed out of) the body of a
//! ping. Field names follow the collector's snake_case JSON schema, so
//! most structs need no renames; the few that do are called out.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

// ---------------------------------------------------------------------------
// VideoType
// ---------------------------------------------------------------------------

/// Whether the tracked media is a live stream or a video on demand.
///
/// The type decides which identifier field appears in the session
/// snapshot: `live_stream_id` for [`Live`](Self::Live), `video_id` for
/// [`Vod`](Self::Vod).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoType {
    Live,
    Vod,
}

impl VideoType {
    /// The lowercase name used in URLs and on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Live => "live",
            Self::Vod => "vod",
        }
    }

    /// Parses a URL path segment (`"live"` or `"vod"`).
    pub fn from_segment(segment: &str) -> Option<Self> {
        match segment {
            "live" => Some(Self::Live),
            "vod" => Some(Self::Vod),
            _ => None,
        }
    }
}

impl fmt::Display for VideoType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// The kind of a playback event.
///
/// Seek kinds carry a dot in their wire name (`"seek.forward"`), which is
/// why they need explicit renames instead of `rename_all`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    #[serde(rename = "play")]
    Play,
    #[serde(rename = "resume")]
    Resume,
    #[serde(rename = "ready")]
    Ready,
    #[serde(rename = "pause")]
    Pause,
    #[serde(rename = "end")]
    End,
    #[serde(rename = "seek.forward")]
    SeekForward,
    #[serde(rename = "seek.backward")]
    SeekBackward,
}

impl EventKind {
    /// The wire name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Play => "play",
            Self::Resume => "resume",
            Self::Ready => "ready",
            Self::Pause => "pause",
            Self::End => "end",
            Self::SeekForward => "seek.forward",
            Self::SeekBackward => "seek.backward",
        }
    }

    /// Returns `true` for the two seek kinds.
    pub fn is_seek(&self) -> bool {
        matches!(self, Self::SeekForward | Self::SeekBackward)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single observation of the player.
///
/// Events are created once and never modified afterwards; the tracker
/// only ever appends them to its log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackEvent {
    /// When the event was observed.
    #[serde(with = "crate::timestamp")]
    pub emitted_at: DateTime<Utc>,

    /// What happened. Serialized as `"type"`.
    #[serde(rename = "type")]
    pub kind: EventKind,

    /// Playback position (seconds) at the time of the event, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub at: Option<f64>,

    /// Seek origin, in seconds. Only set on seek events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<f64>,

    /// Seek destination, in seconds. Only set on seek events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<f64>,
}

impl PlaybackEvent {
    /// Creates a regular event with no position attached.
    pub fn new(kind: EventKind, emitted_at: DateTime<Utc>) -> Self {
        Self {
            emitted_at,
            kind,
            at: None,
            from: None,
            to: None,
        }
    }

    /// Attaches the playback position the event happened at.
    pub fn with_position(mut self, at: Option<f64>) -> Self {
        self.at = at;
        self
    }

    /// Creates a seek event. Direction is derived from the two positions:
    /// `from < to` is a forward seek, anything else (including a seek to
    /// the same position) is backward.
    pub fn seek(from: f64, to: f64, emitted_at: DateTime<Utc>) -> Self {
        let kind = if from < to {
            EventKind::SeekForward
        } else {
            EventKind::SeekBackward
        };
        Self {
            emitted_at,
            kind,
            at: None,
            from: Some(from),
            to: Some(to),
        }
    }
}

// ---------------------------------------------------------------------------
// Session snapshot
// ---------------------------------------------------------------------------

/// One caller-supplied metadata pair.
///
/// On the wire each pair is its own single-key object, so a list of
/// entries serializes as `[{"plan": "pro"}, {"device": "tv"}]`. The list
/// keeps insertion order and allows repeated names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataEntry {
    pub name: String,
    pub value: String,
}

impl MetadataEntry {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl Serialize for MetadataEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(&self.name, &self.value)?;
        map.end()
    }
}

impl<'de> Deserialize<'de> for MetadataEntry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EntryVisitor;

        impl<'de> Visitor<'de> for EntryVisitor {
            type Value = MetadataEntry;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object with exactly one name/value pair")
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut access: A,
            ) -> Result<MetadataEntry, A::Error> {
                let (name, value): (String, String) = access
                    .next_entry()?
                    .ok_or_else(|| de::Error::invalid_length(0, &self))?;
                if access.next_key::<String>()?.is_some() {
                    return Err(de::Error::invalid_length(2, &self));
                }
                Ok(MetadataEntry { name, value })
            }
        }

        deserializer.deserialize_map(EntryVisitor)
    }
}

/// Information about the client environment, reported as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Navigator {
    pub user_agent: String,

    /// Effective connection type (`"4g"`, `"wifi"`, ...), if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection: Option<String>,

    /// Named load-timing measurements in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timing: Option<BTreeMap<String, f64>>,
}

/// The sub-range of the media being played, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlaybackRange {
    pub start: f64,
    pub end: f64,
}

/// The session as it is reported in each ping.
///
/// Exactly one of `video_id` / `live_stream_id` is set, depending on the
/// [`VideoType`] the snapshot was built for. Use [`SessionSnapshot::new`]
/// to get that right.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// When the tracker was created. Constant for the whole session.
    #[serde(with = "crate::timestamp")]
    pub loaded_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub live_stream_id: Option<String>,

    #[serde(default)]
    pub referrer: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub metadata: Vec<MetadataEntry>,

    /// The collector-issued session token, once one has been assigned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub navigator: Option<Navigator>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<PlaybackRange>,
}

impl SessionSnapshot {
    /// Creates a snapshot carrying the identifier in the field that
    /// matches `video_type`. All optional parts start empty.
    pub fn new(
        video_type: VideoType,
        video_id: impl Into<String>,
        loaded_at: DateTime<Utc>,
    ) -> Self {
        let id = video_id.into();
        let (video_id, live_stream_id) = match video_type {
            VideoType::Vod => (Some(id), None),
            VideoType::Live => (None, Some(id)),
        };
        Self {
            loaded_at,
            video_id,
            live_stream_id,
            referrer: String::new(),
            metadata: Vec::new(),
            session_id: None,
            navigator: None,
            range: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Ping
// ---------------------------------------------------------------------------

/// The body of one ping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PingPayload {
    #[serde(with = "crate::timestamp")]
    pub emitted_at: DateTime<Utc>,
    pub session: SessionSnapshot,
    /// Events appended since the previous ping, in emission order.
    /// May be empty (an idle ping).
    pub events: Vec<PlaybackEvent>,
}

/// What the collector answers to a ping.
///
/// Only `session` is interpreted; any other field is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PingResponse {
    #[serde(default)]
    pub session: Option<String>,
}
