//! Tracker options and their validation.
//!
//! A tracker is built from one of two source shapes, a media URL or an
//! explicit identifier set, plus a handful of common options. The shapes
//! are a [`VideoSource`] variant; [`TrackerOptions::resolve`] turns
//! either one into a single [`ResolvedSource`] once, at construction.

use std::fmt;
use std::time::Duration;

use pingback_protocol::{MetadataEntry, Navigator, PlaybackRange, VideoType};
use pingback_session::SessionCallback;
use pingback_tick::SchedulerConfig;
use url::Url;

use crate::ConfigError;
use crate::media::parse_media_url;

// ---------------------------------------------------------------------------
// VideoSource
// ---------------------------------------------------------------------------

/// Where the tracker learns what is being watched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoSource {
    /// A player source URL such as `https://cdn.example.com/vod/abc123/hls/manifest.m3u8`.
    /// Type, id and collector endpoint are derived from it.
    MediaUrl(String),

    /// Identifiers known up front. Without a `ping_url` the tracker still
    /// records events but never sends them.
    Direct {
        video_type: VideoType,
        video_id: String,
        ping_url: Option<String>,
    },
}

/// The normalized form of a [`VideoSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSource {
    pub video_type: VideoType,
    pub video_id: String,
    pub ping_url: Option<Url>,
}

// ---------------------------------------------------------------------------
// TrackerOptions
// ---------------------------------------------------------------------------

/// Everything needed to construct a [`Tracker`](crate::Tracker).
///
/// ```rust
/// use pingback::TrackerOptions;
///
/// let options = TrackerOptions::from_media_url("https://cdn.example.com/vod/abc123/manifest.m3u8")
///     .metadata("country", "FR")
///     .range(10.0, 42.5);
/// let source = options.resolve().unwrap();
/// assert_eq!(source.video_id, "abc123");
/// ```
#[derive(Default)]
pub struct TrackerOptions {
    pub source: Option<VideoSource>,

    /// Name/value pairs repeated in every ping, in insertion order.
    pub metadata: Vec<MetadataEntry>,

    /// Sub-range of the media being played, in seconds.
    pub range: Option<PlaybackRange>,

    pub referrer: String,

    pub navigator: Option<Navigator>,

    pub scheduler: SchedulerConfig,

    /// Called once, with the first session token the tracker adopts.
    pub on_session: Option<SessionCallback>,
}

impl TrackerOptions {
    /// Options with no source. [`resolve`](Self::resolve) fails until one
    /// is set.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_media_url(url: impl Into<String>) -> Self {
        Self::new().source(VideoSource::MediaUrl(url.into()))
    }

    pub fn direct(video_type: VideoType, video_id: impl Into<String>, ping_url: Option<&str>) -> Self {
        Self::new().source(VideoSource::Direct {
            video_type,
            video_id: video_id.into(),
            ping_url: ping_url.map(str::to_owned),
        })
    }

    pub fn source(mut self, source: VideoSource) -> Self {
        self.source = Some(source);
        self
    }

    /// Appends one metadata entry.
    pub fn metadata(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.push(MetadataEntry::new(name, value));
        self
    }

    pub fn range(mut self, start: f64, end: f64) -> Self {
        self.range = Some(PlaybackRange { start, end });
        self
    }

    pub fn referrer(mut self, referrer: impl Into<String>) -> Self {
        self.referrer = referrer.into();
        self
    }

    pub fn navigator(mut self, navigator: Navigator) -> Self {
        self.navigator = Some(navigator);
        self
    }

    /// Overrides the 10 second periodic ping interval.
    pub fn ping_period(mut self, period: Duration) -> Self {
        self.scheduler = SchedulerConfig::with_period(period);
        self
    }

    pub fn on_session_received<F>(mut self, callback: F) -> Self
    where
        F: FnOnce(&str) + Send + 'static,
    {
        self.on_session = Some(Box::new(callback));
        self
    }

    /// Validates the options and normalizes the source.
    ///
    /// # Errors
    /// - [`ConfigError::MissingSource`] when no source is set
    /// - [`ConfigError::UnrecognizedMediaUrl`] when the media URL has no
    ///   `vod`/`live` segment followed by an id
    /// - [`ConfigError::EmptyVideoId`] for a direct source with a blank id
    /// - [`ConfigError::InvalidPingUrl`] when the ping target is not an
    ///   absolute http(s) URL
    /// - [`ConfigError::InvalidRange`] when the range is negative,
    ///   inverted or not finite
    pub fn resolve(&self) -> Result<ResolvedSource, ConfigError> {
        if let Some(range) = self.range {
            let PlaybackRange { start, end } = range;
            if !start.is_finite() || !end.is_finite() || start < 0.0 || end < start {
                return Err(ConfigError::InvalidRange { start, end });
            }
        }

        match self.source.as_ref().ok_or(ConfigError::MissingSource)? {
            VideoSource::MediaUrl(media_url) => {
                let target = parse_media_url(media_url)
                    .ok_or_else(|| ConfigError::UnrecognizedMediaUrl(media_url.clone()))?;
                Ok(ResolvedSource {
                    video_type: target.video_type,
                    video_id: target.video_id,
                    ping_url: Some(parse_ping_url(&target.ping_url)?),
                })
            }
            VideoSource::Direct {
                video_type,
                video_id,
                ping_url,
            } => {
                if video_id.trim().is_empty() {
                    return Err(ConfigError::EmptyVideoId);
                }
                Ok(ResolvedSource {
                    video_type: *video_type,
                    video_id: video_id.clone(),
                    ping_url: ping_url.as_deref().map(parse_ping_url).transpose()?,
                })
            }
        }
    }
}

impl fmt::Debug for TrackerOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackerOptions")
            .field("source", &self.source)
            .field("metadata", &self.metadata)
            .field("range", &self.range)
            .field("referrer", &self.referrer)
            .field("navigator", &self.navigator)
            .field("scheduler", &self.scheduler)
            .field("on_session", &self.on_session.is_some())
            .finish()
    }
}

fn parse_ping_url(raw: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidPingUrl {
        url: raw.to_owned(),
        reason,
    };

    let url = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(invalid(format!("unsupported scheme {other:?}"))),
    }
}
