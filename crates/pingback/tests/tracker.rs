//! Integration tests for the tracker: lifecycle flushes, the periodic
//! timer, session adoption and failure handling.
//!
//! Every test runs on tokio's paused clock, so the 10 second cadence costs
//! nothing, and stamps events with a [`ManualClock`] so payload timestamps
//! are exact.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use pingback::prelude::*;
use pingback::protocol::PingPayload;
use pingback::session::storage_key;
use pingback::tick::ManualClock;
use pingback::transport::TransportError;
use tokio::sync::{Semaphore, mpsc};
use url::Url;

const VOD_URL: &str = "https://cdn.example.com/vod/abc123/hls/manifest.m3u8";

// =========================================================================
// Fake transport
// =========================================================================

/// One ping as the collector received it.
#[derive(Debug)]
struct SentPing {
    url: Url,
    payload: PingPayload,
    json: serde_json::Value,
}

impl SentPing {
    fn kinds(&self) -> Vec<EventKind> {
        self.payload.events.iter().map(|e| e.kind).collect()
    }
}

struct FakeInner {
    sent: mpsc::UnboundedSender<SentPing>,
    replies: Mutex<VecDeque<Result<Vec<u8>, TransportError>>>,
    /// When set, each post waits for a permit before answering.
    gate: Option<Arc<Semaphore>>,
}

/// Records every ping and answers from a script (`{}` once the script
/// runs out).
#[derive(Clone)]
struct FakeTransport {
    inner: Arc<FakeInner>,
}

impl FakeTransport {
    fn new() -> (Self, mpsc::UnboundedReceiver<SentPing>) {
        Self::build(None)
    }

    /// A transport whose replies are held until permits are added to the
    /// returned semaphore.
    fn gated() -> (Self, mpsc::UnboundedReceiver<SentPing>, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        let (transport, rx) = Self::build(Some(Arc::clone(&gate)));
        (transport, rx, gate)
    }

    fn build(gate: Option<Arc<Semaphore>>) -> (Self, mpsc::UnboundedReceiver<SentPing>) {
        let (sent, rx) = mpsc::unbounded_channel();
        let inner = FakeInner {
            sent,
            replies: Mutex::new(VecDeque::new()),
            gate,
        };
        (Self { inner: Arc::new(inner) }, rx)
    }

    fn reply_with(&self, reply: Result<&[u8], TransportError>) {
        self.inner
            .replies
            .lock()
            .unwrap()
            .push_back(reply.map(<[u8]>::to_vec));
    }
}

impl PingTransport for FakeTransport {
    async fn post(&self, url: &str, body: Vec<u8>) -> Result<Vec<u8>, TransportError> {
        let ping = SentPing {
            url: Url::parse(url).unwrap(),
            payload: serde_json::from_slice(&body).unwrap(),
            json: serde_json::from_slice(&body).unwrap(),
        };
        let _ = self.inner.sent.send(ping);

        if let Some(gate) = &self.inner.gate {
            gate.acquire().await.unwrap().forget();
        }

        let reply = self.inner.replies.lock().unwrap().pop_front();
        reply.unwrap_or_else(|| Ok(b"{}".to_vec()))
    }
}

// =========================================================================
// Helpers
// =========================================================================

fn at_noon() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
}

fn clock() -> ManualClock {
    ManualClock::new(at_noon())
}

fn start(options: TrackerOptions, transport: FakeTransport, store: MemoryStore) -> Tracker {
    Tracker::with_clock(options, transport, store, clock()).expect("tracker should start")
}

async fn next_ping(rx: &mut mpsc::UnboundedReceiver<SentPing>) -> SentPing {
    rx.recv().await.expect("a ping should have been sent")
}

fn assert_no_ping(rx: &mut mpsc::UnboundedReceiver<SentPing>) {
    if let Ok(ping) = rx.try_recv() {
        panic!("unexpected ping: {:?}", ping.kinds());
    }
}

/// Collects every token passed to the session callback.
fn recording_callback() -> (Arc<Mutex<Vec<String>>>, impl FnOnce(&str) + Send + 'static) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    (seen, move |id: &str| sink.lock().unwrap().push(id.to_owned()))
}

// =========================================================================
// Lifecycle flushes
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_play_then_pause_sends_one_ping_with_both_events() {
    let (transport, mut rx) = FakeTransport::new();
    let tracker = start(TrackerOptions::from_media_url(VOD_URL), transport, MemoryStore::new());

    tracker.play().await.unwrap();
    tracker.pause().await.unwrap();

    let ping = next_ping(&mut rx).await;
    assert_eq!(ping.kinds(), vec![EventKind::Play, EventKind::Pause]);
    assert_no_ping(&mut rx);

    let info = tracker.info().await.unwrap();
    assert_eq!(info.pending, 0);
    assert_eq!(info.events, 2);
    assert_eq!(info.state, PlaybackState::Paused);
}

#[tokio::test(start_paused = true)]
async fn test_ready_flushes_without_changing_state() {
    let (transport, mut rx) = FakeTransport::new();
    let tracker = start(TrackerOptions::from_media_url(VOD_URL), transport, MemoryStore::new());

    tracker.play().await.unwrap();
    tracker.ready().await.unwrap();

    let ping = next_ping(&mut rx).await;
    assert_eq!(ping.kinds(), vec![EventKind::Play, EventKind::Ready]);
    assert_eq!(tracker.info().await.unwrap().state, PlaybackState::Active);
}

#[tokio::test(start_paused = true)]
async fn test_seek_records_direction_without_flushing() {
    let (transport, mut rx) = FakeTransport::new();
    let tracker = start(TrackerOptions::from_media_url(VOD_URL), transport, MemoryStore::new());

    tracker.seek(5.0, 10.0).await.unwrap();
    tracker.seek(10.0, 5.0).await.unwrap();

    let info = tracker.info().await.unwrap();
    assert_eq!(info.pending, 2);
    assert_no_ping(&mut rx);

    tracker.pause().await.unwrap();
    let ping = next_ping(&mut rx).await;
    assert_eq!(
        ping.kinds(),
        vec![EventKind::SeekForward, EventKind::SeekBackward, EventKind::Pause]
    );

    let forward = &ping.payload.events[0];
    assert_eq!((forward.from, forward.to), (Some(5.0), Some(10.0)));
    let backward = &ping.payload.events[1];
    assert_eq!((backward.from, backward.to), (Some(10.0), Some(5.0)));
    assert_eq!(ping.json["events"][0]["type"], "seek.forward");
    assert_eq!(ping.json["events"][1]["type"], "seek.backward");
}

#[tokio::test(start_paused = true)]
async fn test_update_time_sets_position_of_later_events() {
    let (transport, mut rx) = FakeTransport::new();
    let tracker = start(TrackerOptions::from_media_url(VOD_URL), transport, MemoryStore::new());

    tracker.play().await.unwrap();
    tracker.update_time(12.5).await.unwrap();
    tracker.pause().await.unwrap();

    let ping = next_ping(&mut rx).await;
    assert_eq!(ping.payload.events[0].at, None);
    assert_eq!(ping.payload.events[1].at, Some(12.5));
    assert!(ping.json["events"][0].get("at").is_none());
    assert_eq!(tracker.info().await.unwrap().position, Some(12.5));
}

#[tokio::test(start_paused = true)]
async fn test_push_event_records_without_state_change() {
    let (transport, mut rx) = FakeTransport::new();
    let tracker = start(TrackerOptions::from_media_url(VOD_URL), transport, MemoryStore::new());

    tracker.update_time(3.0).await.unwrap();
    tracker
        .push_event(PlaybackEvent::new(EventKind::Resume, at_noon()))
        .await
        .unwrap();

    let info = tracker.info().await.unwrap();
    assert_eq!(info.state, PlaybackState::Paused);
    assert_eq!(info.pending, 1);
    assert_no_ping(&mut rx);

    tracker.end().await.unwrap();
    let ping = next_ping(&mut rx).await;
    assert_eq!(ping.kinds(), vec![EventKind::Resume, EventKind::End]);
    assert_eq!(ping.payload.events[0].at, Some(3.0));
}

#[tokio::test(start_paused = true)]
async fn test_pushed_seek_keeps_from_and_to() {
    let (transport, mut rx) = FakeTransport::new();
    let tracker = start(TrackerOptions::from_media_url(VOD_URL), transport, MemoryStore::new());

    tracker.update_time(8.0).await.unwrap();
    tracker
        .push_event(PlaybackEvent::seek(8.0, 2.0, at_noon()))
        .await
        .unwrap();
    tracker.pause().await.unwrap();

    let ping = next_ping(&mut rx).await;
    assert_eq!(ping.kinds(), vec![EventKind::SeekBackward, EventKind::Pause]);
    assert_eq!(ping.json["events"][0]["from"], 8.0);
    assert_eq!(ping.json["events"][0]["to"], 2.0);
    assert!(ping.json["events"][0].get("at").is_none());
}

#[tokio::test(start_paused = true)]
async fn test_pushed_seek_without_positions_is_rejected() {
    let (transport, mut rx) = FakeTransport::new();
    let tracker = start(TrackerOptions::from_media_url(VOD_URL), transport, MemoryStore::new());

    let err = tracker
        .push_event(PlaybackEvent::new(EventKind::SeekForward, at_noon()))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PingbackError::InvalidEvent { kind: EventKind::SeekForward, .. }
    ));

    assert_eq!(tracker.info().await.unwrap().events, 0);
    assert_no_ping(&mut rx);
}

// =========================================================================
// Payload
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_vod_payload_shape_and_cache_buster() {
    let (transport, mut rx) = FakeTransport::new();
    let options = TrackerOptions::from_media_url(VOD_URL)
        .metadata("plan", "pro")
        .metadata("device", "tv")
        .referrer("https://blog.example.com/post");
    let tracker = start(options, transport, MemoryStore::new());

    tracker.pause().await.unwrap();
    let ping = next_ping(&mut rx).await;

    assert_eq!(ping.url.host_str(), Some("collector.example.com"));
    assert_eq!(ping.url.path(), "/vod");
    let t: Vec<_> = ping.url.query_pairs().filter(|(k, _)| k == "t").collect();
    assert_eq!(t.len(), 1);
    assert_eq!(t[0].1, "1709294400000");

    let session = &ping.json["session"];
    assert_eq!(session["video_id"], "abc123");
    assert!(session.get("live_stream_id").is_none());
    assert!(session.get("session_id").is_none());
    assert_eq!(session["loaded_at"], "2024-03-01T12:00:00.000Z");
    assert_eq!(session["referrer"], "https://blog.example.com/post");
    assert_eq!(
        session["metadata"],
        serde_json::json!([{ "plan": "pro" }, { "device": "tv" }])
    );
    assert_eq!(ping.json["emitted_at"], "2024-03-01T12:00:00.000Z");
}

#[tokio::test(start_paused = true)]
async fn test_live_payload_uses_live_stream_id() {
    let (transport, mut rx) = FakeTransport::new();
    let options = TrackerOptions::direct(VideoType::Live, "li42", Some("https://collector.example.com/live"));
    let tracker = start(options, transport, MemoryStore::new());

    tracker.pause().await.unwrap();
    let ping = next_ping(&mut rx).await;

    assert_eq!(ping.url.path(), "/live");
    assert_eq!(ping.json["session"]["live_stream_id"], "li42");
    assert!(ping.json["session"].get("video_id").is_none());
    assert!(ping.json["session"].get("metadata").is_none());
}

#[tokio::test(start_paused = true)]
async fn test_range_and_navigator_are_reported() {
    let (transport, mut rx) = FakeTransport::new();
    let options = TrackerOptions::from_media_url(VOD_URL)
        .range(10.0, 40.0)
        .navigator(Navigator {
            user_agent: "pingback-tests".into(),
            connection: Some("wifi".into()),
            timing: None,
        });
    let tracker = start(options, transport, MemoryStore::new());

    tracker.pause().await.unwrap();
    let ping = next_ping(&mut rx).await;

    let session = &ping.json["session"];
    assert_eq!(session["range"], serde_json::json!({ "start": 10.0, "end": 40.0 }));
    assert_eq!(session["navigator"]["user_agent"], "pingback-tests");
    assert_eq!(session["navigator"]["connection"], "wifi");
    assert!(session["navigator"].get("timing").is_none());
}

// =========================================================================
// Periodic pings
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_periodic_pings_only_while_active() {
    let (transport, mut rx) = FakeTransport::new();
    let tracker = start(TrackerOptions::from_media_url(VOD_URL), transport, MemoryStore::new());

    // Paused from the start: the 10s and 20s deadlines pass silently.
    tokio::time::sleep(Duration::from_secs(25)).await;
    assert_no_ping(&mut rx);

    tracker.play().await.unwrap();
    let ping = next_ping(&mut rx).await;
    assert_eq!(ping.kinds(), vec![EventKind::Play]);

    // Nothing new happened: the next tick sends an idle ping.
    let idle = next_ping(&mut rx).await;
    assert!(idle.payload.events.is_empty());
    assert_eq!(idle.json["events"], serde_json::json!([]));

    tracker.pause().await.unwrap();
    assert_eq!(next_ping(&mut rx).await.kinds(), vec![EventKind::Pause]);

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_no_ping(&mut rx);

    let info = tracker.info().await.unwrap();
    assert_eq!(info.scheduler.total_ticks, 2);
    assert!(info.scheduler.suppressed_ticks >= 4);
}

#[tokio::test(start_paused = true)]
async fn test_custom_ping_period() {
    let (transport, mut rx) = FakeTransport::new();
    let options = TrackerOptions::from_media_url(VOD_URL).ping_period(Duration::from_secs(3));
    let tracker = start(options, transport, MemoryStore::new());
    let started = tokio::time::Instant::now();

    tracker.play().await.unwrap();
    next_ping(&mut rx).await;

    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(3) && elapsed < Duration::from_secs(4));
}

#[tokio::test(start_paused = true)]
async fn test_huge_ping_period_is_clamped_not_fatal() {
    let (transport, mut rx) = FakeTransport::new();
    let options = TrackerOptions::from_media_url(VOD_URL).ping_period(Duration::MAX);
    let tracker = start(options, transport, MemoryStore::new());

    tracker.play().await.unwrap();
    tokio::time::sleep(Duration::from_secs(3600)).await;
    assert_no_ping(&mut rx);

    tracker.pause().await.unwrap();
    assert_eq!(next_ping(&mut rx).await.kinds(), vec![EventKind::Play, EventKind::Pause]);
}

#[tokio::test(start_paused = true)]
async fn test_end_stops_periodic_pings() {
    let (transport, mut rx) = FakeTransport::new();
    let tracker = start(TrackerOptions::from_media_url(VOD_URL), transport, MemoryStore::new());

    tracker.play().await.unwrap();
    tracker.end().await.unwrap();
    assert_eq!(next_ping(&mut rx).await.kinds(), vec![EventKind::Play, EventKind::End]);

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_no_ping(&mut rx);
}

#[tokio::test(start_paused = true)]
async fn test_periodic_failure_is_logged_not_fatal() {
    let (transport, mut rx) = FakeTransport::new();
    transport.reply_with(Err(TransportError::SendFailed("connection reset".into())));
    let tracker = start(TrackerOptions::from_media_url(VOD_URL), transport, MemoryStore::new());

    tracker.play().await.unwrap();
    assert_eq!(next_ping(&mut rx).await.kinds(), vec![EventKind::Play]);

    tracker.pause().await.unwrap();
    assert_eq!(next_ping(&mut rx).await.kinds(), vec![EventKind::Pause]);
}

// =========================================================================
// Teardown
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_destroy_flushes_pause_and_stops_timer() {
    let (transport, mut rx) = FakeTransport::new();
    let tracker = start(TrackerOptions::from_media_url(VOD_URL), transport, MemoryStore::new());

    tracker.play().await.unwrap();
    tracker.destroy().await.unwrap();
    assert_eq!(next_ping(&mut rx).await.kinds(), vec![EventKind::Play, EventKind::Pause]);
    assert!(tracker.is_destroyed());

    tokio::time::sleep(Duration::from_secs(35)).await;
    assert_no_ping(&mut rx);

    assert!(matches!(tracker.play().await, Err(PingbackError::Destroyed)));
    assert!(matches!(tracker.seek(1.0, 2.0).await, Err(PingbackError::Destroyed)));
    assert!(matches!(tracker.info().await, Err(PingbackError::Destroyed)));
    assert!(matches!(tracker.destroy().await, Err(PingbackError::Destroyed)));
}

#[tokio::test(start_paused = true)]
async fn test_commands_queued_behind_destroy() {
    let (transport, mut rx) = FakeTransport::new();
    let tracker = start(TrackerOptions::from_media_url(VOD_URL), transport, MemoryStore::new());
    let other = tracker.clone();

    // All four are queued before the actor runs: the seek and the position
    // update are acknowledged, the play call waits for a reply.
    let (destroyed, seeked, timed, played) = tokio::join!(
        tracker.destroy(),
        other.seek(1.0, 4.0),
        other.update_time(4.0),
        other.play(),
    );
    destroyed.unwrap();
    seeked.unwrap();
    timed.unwrap();
    assert!(matches!(played, Err(PingbackError::Destroyed)));

    let ping = next_ping(&mut rx).await;
    assert_eq!(ping.kinds(), vec![EventKind::SeekForward, EventKind::Pause]);
    assert_eq!(ping.payload.events[1].at, Some(4.0));
}

#[tokio::test(start_paused = true)]
async fn test_destroy_while_paused_still_flushes() {
    let (transport, mut rx) = FakeTransport::new();
    let tracker = start(TrackerOptions::from_media_url(VOD_URL), transport, MemoryStore::new());

    tracker.destroy().await.unwrap();
    assert_eq!(next_ping(&mut rx).await.kinds(), vec![EventKind::Pause]);
}

#[tokio::test(start_paused = true)]
async fn test_late_session_after_destroy_is_adopted() {
    let (transport, mut rx, gate) = FakeTransport::gated();
    transport.reply_with(Ok(br#"{"session":"ps_late"}"#));
    let store = MemoryStore::new();
    let (seen, callback) = recording_callback();
    let options = TrackerOptions::from_media_url(VOD_URL).on_session_received(callback);
    let tracker = start(options, transport, store.clone());

    let destroying = tokio::spawn({
        let tracker = tracker.clone();
        async move { tracker.destroy().await }
    });

    // The final ping is in flight and the actor is already gone.
    next_ping(&mut rx).await;
    assert!(tracker.is_destroyed());
    assert!(matches!(tracker.play().await, Err(PingbackError::Destroyed)));

    gate.add_permits(1);
    destroying.await.unwrap().unwrap();

    assert_eq!(store.value(&storage_key("abc123")).as_deref(), Some("ps_late"));
    assert_eq!(*seen.lock().unwrap(), vec!["ps_late".to_owned()]);
}

// =========================================================================
// Session identity
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_session_token_adopted_once_and_persisted() {
    let (transport, mut rx) = FakeTransport::new();
    transport.reply_with(Ok(br#"{"session":"ps_1"}"#));
    transport.reply_with(Ok(br#"{"session":"ps_2"}"#));
    let store = MemoryStore::new();
    let (seen, callback) = recording_callback();
    let options = TrackerOptions::from_media_url(VOD_URL).on_session_received(callback);
    let tracker = start(options, transport, store.clone());

    tracker.play().await.unwrap();
    tracker.pause().await.unwrap();
    let first = next_ping(&mut rx).await;
    assert!(first.json["session"].get("session_id").is_none());
    assert_eq!(tracker.session_id().await.unwrap().as_deref(), Some("ps_1"));

    tracker.resume().await.unwrap();
    tracker.pause().await.unwrap();
    let second = next_ping(&mut rx).await;
    assert_eq!(second.json["session"]["session_id"], "ps_1");

    // The second token was ignored.
    tracker.end().await.unwrap();
    let third = next_ping(&mut rx).await;
    assert_eq!(third.json["session"]["session_id"], "ps_1");
    assert_eq!(store.value(&storage_key("abc123")).as_deref(), Some("ps_1"));
    assert_eq!(*seen.lock().unwrap(), vec!["ps_1".to_owned()]);
}

#[tokio::test(start_paused = true)]
async fn test_persisted_session_restored_at_start() {
    let (transport, mut rx) = FakeTransport::new();
    transport.reply_with(Ok(br#"{"session":"ps_new"}"#));
    let store = MemoryStore::new();
    store.insert(storage_key("abc123"), "ps_saved");
    let (seen, callback) = recording_callback();
    let options = TrackerOptions::from_media_url(VOD_URL).on_session_received(callback);
    let tracker = start(options, transport, store.clone());

    tracker.play().await.unwrap();
    tracker.pause().await.unwrap();

    let ping = next_ping(&mut rx).await;
    assert_eq!(ping.json["session"]["session_id"], "ps_saved");
    assert_eq!(tracker.session_id().await.unwrap().as_deref(), Some("ps_saved"));
    assert_eq!(store.value(&storage_key("abc123")).as_deref(), Some("ps_saved"));
    assert_eq!(*seen.lock().unwrap(), vec!["ps_saved".to_owned()]);
}

#[tokio::test(start_paused = true)]
async fn test_session_from_other_video_is_not_restored() {
    let (transport, mut rx) = FakeTransport::new();
    let store = MemoryStore::new();
    store.insert(storage_key("other"), "ps_other");
    let tracker = start(TrackerOptions::from_media_url(VOD_URL), transport, store);

    tracker.pause().await.unwrap();
    assert!(next_ping(&mut rx).await.json["session"].get("session_id").is_none());
    assert_eq!(tracker.session_id().await.unwrap(), None);
}

// =========================================================================
// Failures
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_transport_failure_surfaces_and_events_are_not_resent() {
    let (transport, mut rx) = FakeTransport::new();
    transport.reply_with(Err(TransportError::Status(503)));
    let tracker = start(TrackerOptions::from_media_url(VOD_URL), transport, MemoryStore::new());

    tracker.play().await.unwrap();
    let err = tracker.pause().await.unwrap_err();
    assert!(matches!(err, PingbackError::Transport(TransportError::Status(503))));
    assert_eq!(next_ping(&mut rx).await.kinds(), vec![EventKind::Play, EventKind::Pause]);

    tracker.end().await.unwrap();
    assert_eq!(next_ping(&mut rx).await.kinds(), vec![EventKind::End]);
}

#[tokio::test(start_paused = true)]
async fn test_malformed_response_is_protocol_error() {
    let (transport, mut rx) = FakeTransport::new();
    transport.reply_with(Ok(b"<html>bad gateway</html>"));
    let tracker = start(TrackerOptions::from_media_url(VOD_URL), transport, MemoryStore::new());

    let err = tracker.pause().await.unwrap_err();
    assert!(matches!(err, PingbackError::Protocol(_)));
    next_ping(&mut rx).await;

    // Still usable.
    assert_eq!(tracker.info().await.unwrap().pending, 0);
}

#[tokio::test(start_paused = true)]
async fn test_empty_response_body_is_accepted() {
    let (transport, mut rx) = FakeTransport::new();
    transport.reply_with(Ok(b""));
    let tracker = start(TrackerOptions::from_media_url(VOD_URL), transport, MemoryStore::new());

    tracker.pause().await.unwrap();
    next_ping(&mut rx).await;
    assert_eq!(tracker.session_id().await.unwrap(), None);
}

// =========================================================================
// Overlapping flushes
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_overlapping_flushes_never_resend_events() {
    let (transport, mut rx, gate) = FakeTransport::gated();
    let tracker = start(TrackerOptions::from_media_url(VOD_URL), transport, MemoryStore::new());

    tracker.play().await.unwrap();
    let readying = tokio::spawn({
        let tracker = tracker.clone();
        async move { tracker.ready().await }
    });

    let first = next_ping(&mut rx).await;
    assert_eq!(first.kinds(), vec![EventKind::Play, EventKind::Ready]);

    // The first ping is still waiting for its reply when the timer fires.
    let second = next_ping(&mut rx).await;
    assert!(second.payload.events.is_empty());

    gate.add_permits(2);
    readying.await.unwrap().unwrap();
}

// =========================================================================
// Configuration
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_without_ping_url_nothing_is_sent() {
    let (transport, mut rx) = FakeTransport::new();
    let options = TrackerOptions::direct(VideoType::Vod, "vi1", None);
    let tracker = start(options, transport, MemoryStore::new());

    tracker.play().await.unwrap();
    tracker.pause().await.unwrap();
    tokio::time::sleep(Duration::from_secs(20)).await;

    assert_no_ping(&mut rx);
    // The cursor is left alone.
    assert_eq!(tracker.info().await.unwrap().pending, 2);
    assert!(tracker.ping_url().is_none());
}

#[tokio::test]
async fn test_invalid_options_fail_at_construction() {
    let (transport, _rx) = FakeTransport::new();
    let err = Tracker::new(TrackerOptions::new(), transport.clone(), MemoryStore::new()).unwrap_err();
    assert!(matches!(err, PingbackError::Config(ConfigError::MissingSource)));

    let options = TrackerOptions::from_media_url("https://cdn.example.com/watch?v=abc123");
    let err = Tracker::new(options, transport, MemoryStore::new()).unwrap_err();
    assert!(matches!(err, PingbackError::Config(ConfigError::UnrecognizedMediaUrl(_))));
}

#[test]
fn test_construction_outside_runtime_fails() {
    let (transport, _rx) = FakeTransport::new();
    let err = Tracker::new(TrackerOptions::from_media_url(VOD_URL), transport, NullStore).unwrap_err();
    assert!(matches!(err, PingbackError::NoRuntime));
}

#[tokio::test]
async fn test_accessors_reflect_resolved_source() {
    let (transport, _rx) = FakeTransport::new();
    let tracker = Tracker::new(
        TrackerOptions::from_media_url("https://live.example.com/live/li42xyz.m3u8"),
        transport,
        NullStore,
    )
    .unwrap();

    assert_eq!(tracker.video_type(), VideoType::Live);
    assert_eq!(tracker.video_id(), "li42xyz");
    assert_eq!(
        tracker.ping_url().map(Url::as_str),
        Some("https://collector.example.com/live")
    );
    assert!(!tracker.is_destroyed());
}
