//! Media URL classification.
//!
//! Turns a player source URL such as
//! `https://cdn.example.com/vod/vi5oDag/hls/manifest.m3u8` into the
//! identifier triple the tracker needs: the media type, its id, and the
//! collector endpoint for that type
//! (`https://collector.example.com/vod`).

use std::sync::LazyLock;

use pingback_protocol::VideoType;
use regex::Regex;

/// `scheme://host[:port]/(vod|live)/<id>` followed by anything. Scheme and
/// host are case-insensitive, as in any URL. The id stops at the next `/`,
/// `.`, `?` or `#`.
static MEDIA_URL: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^(?P<scheme>(?i:https?))://(?P<host>[^/?#:]+)(?::\d+)?/(?P<kind>vod|live)/(?P<id>[^/?#.]+)")
        .ok()
});

/// What a media URL resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaTarget {
    pub video_type: VideoType,
    pub video_id: String,
    /// Collector endpoint for this media type.
    pub ping_url: String,
}

/// Classifies a media URL. Returns `None` when the URL has no
/// recognizable `vod`/`live` segment followed by an id.
pub fn parse_media_url(url: &str) -> Option<MediaTarget> {
    let caps = MEDIA_URL.as_ref()?.captures(url.trim())?;

    let video_type = VideoType::from_segment(&caps["kind"])?;
    let host = &caps["host"];
    let ping_url = format!(
        "{}://collector.{}/{}",
        caps["scheme"].to_ascii_lowercase(),
        registrable_domain(host).to_ascii_lowercase(),
        video_type
    );

    Some(MediaTarget {
        video_type,
        video_id: caps["id"].to_owned(),
        ping_url,
    })
}

/// The last two labels of `host` (`cdn.eu.example.com` → `example.com`).
/// Single-label hosts are returned unchanged.
fn registrable_domain(host: &str) -> &str {
    match host.rmatch_indices('.').nth(1) {
        Some((idx, _)) => &host[idx + 1..],
        None => host,
    }
}
