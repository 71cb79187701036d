//! Simulates one viewer watching a video and reports it to a collector.
//!
//! ```text
//! RUST_LOG=pingback=debug cargo run -p watch-session -- https://cdn.example.com/vod/abc123/manifest.m3u8
//! ```

use std::time::Duration;

use pingback::prelude::*;
use tracing_subscriber::EnvFilter;

const DEFAULT_MEDIA_URL: &str = "http://localhost:8080/vod/demo1/manifest.m3u8";

#[tokio::main]
async fn main() -> Result<(), PingbackError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,pingback=debug"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).init();

    let media_url = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_MEDIA_URL.to_owned());

    let options = TrackerOptions::from_media_url(media_url)
        .metadata("demo", "watch-session")
        .referrer("https://blog.example.com/post")
        .ping_period(Duration::from_secs(2))
        .on_session_received(|id| tracing::info!(session_id = %id, "collector assigned a session"));

    let tracker = Tracker::new(options, HttpTransport::new(), MemoryStore::new())?;
    tracing::info!(
        video_type = %tracker.video_type(),
        video_id = %tracker.video_id(),
        ping_url = ?tracker.ping_url().map(|u| u.as_str()),
        "watching"
    );

    // Failed pings are reported and the session carries on.
    report(tracker.ready().await);
    report(tracker.play().await);

    let mut position = 0.0;
    for _ in 0..5 {
        tokio::time::sleep(Duration::from_secs(1)).await;
        position += 1.0;
        tracker.update_time(position).await?;
    }

    tracker.seek(position, 42.0).await?;
    position = 42.0;
    tracker.update_time(position).await?;
    report(tracker.pause().await);

    tokio::time::sleep(Duration::from_secs(3)).await;
    report(tracker.resume().await);

    for _ in 0..3 {
        tokio::time::sleep(Duration::from_secs(1)).await;
        position += 1.0;
        tracker.update_time(position).await?;
    }
    report(tracker.end().await);

    let info = tracker.info().await?;
    report(tracker.destroy().await);

    tracing::info!(
        session_id = ?info.session_id,
        events = info.events,
        periodic_pings = info.scheduler.total_ticks,
        "done"
    );
    Ok(())
}

fn report(result: Result<(), PingbackError>) {
    if let Err(e) = result {
        tracing::warn!(error = %e, "ping failed");
    }
}
