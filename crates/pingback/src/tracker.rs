//! The tracker: a handle plus an actor task that owns all playback state.
//!
//! ```text
//!  Tracker (handle, Clone) ──mpsc──→ TrackerActor (one Tokio task)
//!                                      ├── EventLog
//!                                      ├── PingScheduler ──tick──┐
//!                                      └── flush() ←─────────────┘
//!                                             │ tokio::spawn
//!                                             ▼
//!                                    PingTransport::post → SessionIdentity::assign
//! ```
//!
//! Every state change happens inside the actor, one command or tick at a
//! time, so the event log needs no lock. A flush builds its payload and
//! advances the cursor synchronously, then hands the network round trip
//! to a separate task: the actor keeps accepting commands while pings are
//! in flight, and a flush started meanwhile only sees newer events.

use std::ops::ControlFlow;
use std::sync::Arc;

use pingback_protocol::{
    Codec, EventKind, JsonCodec, PingPayload, PingResponse, PlaybackEvent, VideoType,
};
use pingback_session::{Session, SessionIdentity, SessionStore};
use pingback_tick::{Clock, PingScheduler, PlaybackState, SchedulerMetrics, SystemClock};
use pingback_transport::PingTransport;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use url::Url;

use crate::{EventLog, PingbackError, TrackerOptions};

/// Commands waiting for the actor before senders start to wait.
const COMMAND_BUFFER: usize = 64;

type Reply = oneshot::Sender<Result<(), PingbackError>>;

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// Player actions that append a regular event and may flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Play,
    Resume,
    Ready,
    Pause,
    End,
}

impl Lifecycle {
    fn kind(self) -> EventKind {
        match self {
            Self::Play => EventKind::Play,
            Self::Resume => EventKind::Resume,
            Self::Ready => EventKind::Ready,
            Self::Pause => EventKind::Pause,
            Self::End => EventKind::End,
        }
    }
}

/// Commands sent from a [`Tracker`] to its actor.
///
/// Variants with a `reply` complete once the flush they trigger (if any)
/// has been delivered; the others complete as soon as they are queued.
enum TrackerCommand {
    Lifecycle { action: Lifecycle, reply: Reply },
    Seek { from: f64, to: f64 },
    UpdateTime { time: f64 },
    Push { event: PlaybackEvent },
    Info { reply: oneshot::Sender<TrackerInfo> },
    Destroy { reply: Reply },
}

/// A snapshot of the tracker's internal state.
#[derive(Debug, Clone)]
pub struct TrackerInfo {
    /// The session token, once the collector (or the store) provided one.
    pub session_id: Option<String>,
    pub state: PlaybackState,
    /// Events recorded since construction.
    pub events: usize,
    /// Events not yet handed to a ping.
    pub pending: usize,
    /// Last position given to [`Tracker::update_time`].
    pub position: Option<f64>,
    pub scheduler: SchedulerMetrics,
}

// ---------------------------------------------------------------------------
// Tracker (handle)
// ---------------------------------------------------------------------------

/// Handle to a running tracker. Cheap to clone; all clones drive the same
/// session.
///
/// Dropping every handle without calling [`destroy`](Self::destroy) stops
/// the actor and discards events that were never flushed.
#[derive(Clone)]
pub struct Tracker {
    sender: mpsc::Sender<TrackerCommand>,
    video_type: VideoType,
    video_id: String,
    ping_url: Option<Url>,
}

impl Tracker {
    /// Validates `options` and starts the tracker actor on the current
    /// Tokio runtime.
    ///
    /// # Errors
    /// - [`PingbackError::Config`] if the options do not resolve
    /// - [`PingbackError::NoRuntime`] if called outside a Tokio runtime
    pub fn new<T, S>(options: TrackerOptions, transport: T, store: S) -> Result<Self, PingbackError>
    where
        T: PingTransport,
        S: SessionStore,
    {
        Self::with_clock(options, transport, store, SystemClock)
    }

    /// Like [`new`](Self::new), with wall-clock timestamps taken from
    /// `clock`.
    pub fn with_clock<T, S, C>(
        options: TrackerOptions,
        transport: T,
        store: S,
        clock: C,
    ) -> Result<Self, PingbackError>
    where
        T: PingTransport,
        S: SessionStore,
        C: Clock,
    {
        let source = options.resolve()?;
        let runtime = Handle::try_current().map_err(|_| PingbackError::NoRuntime)?;

        let TrackerOptions {
            metadata,
            range,
            referrer,
            navigator,
            scheduler,
            on_session,
            ..
        } = options;

        let mut session = Session::new(source.video_type, source.video_id.clone(), clock.now());
        session.metadata = metadata;
        session.range = range;
        session.referrer = referrer;
        session.navigator = navigator;

        let mut identity = SessionIdentity::new(&source.video_id, store);
        if let Some(callback) = on_session {
            identity = identity.on_received(callback);
        }

        let (sender, receiver) = mpsc::channel(COMMAND_BUFFER);
        let actor = TrackerActor {
            session,
            identity: Arc::new(identity),
            transport: Arc::new(transport),
            codec: JsonCodec,
            clock,
            ping_url: source.ping_url.clone(),
            log: EventLog::new(),
            // Armed here so the cadence counts from construction.
            scheduler: PingScheduler::new(scheduler),
            position: None,
            receiver,
        };
        runtime.spawn(actor.run());

        Ok(Self {
            sender,
            video_type: source.video_type,
            video_id: source.video_id,
            ping_url: source.ping_url,
        })
    }

    /// Playback started. Starts periodic pings.
    pub async fn play(&self) -> Result<(), PingbackError> {
        self.lifecycle(Lifecycle::Play).await
    }

    /// Playback resumed after a pause. Starts periodic pings.
    pub async fn resume(&self) -> Result<(), PingbackError> {
        self.lifecycle(Lifecycle::Resume).await
    }

    /// The player has buffered enough to play. Sends a ping right away.
    pub async fn ready(&self) -> Result<(), PingbackError> {
        self.lifecycle(Lifecycle::Ready).await
    }

    /// Playback paused. Stops periodic pings and sends one right away.
    pub async fn pause(&self) -> Result<(), PingbackError> {
        self.lifecycle(Lifecycle::Pause).await
    }

    /// Playback reached the end. Stops periodic pings and sends one right
    /// away.
    pub async fn end(&self) -> Result<(), PingbackError> {
        self.lifecycle(Lifecycle::End).await
    }

    /// Records a seek from `from` to `to` seconds. Does not ping.
    pub async fn seek(&self, from: f64, to: f64) -> Result<(), PingbackError> {
        self.send(TrackerCommand::Seek { from, to }).await
    }

    /// Sets the playback position attached to subsequent events.
    pub async fn update_time(&self, time: f64) -> Result<(), PingbackError> {
        self.send(TrackerCommand::UpdateTime { time }).await
    }

    /// Records a caller-built event without touching the playback state
    /// or pinging.
    ///
    /// Regular events without a position get the current one. Seek events
    /// are kept as given and must carry both `from` and `to`; build them
    /// with [`PlaybackEvent::seek`] or use [`seek`](Self::seek).
    ///
    /// # Errors
    /// [`PingbackError::InvalidEvent`] for a seek event missing `from` or
    /// `to`. Nothing is recorded in that case.
    pub async fn push_event(&self, event: PlaybackEvent) -> Result<(), PingbackError> {
        if event.kind.is_seek() && (event.from.is_none() || event.to.is_none()) {
            return Err(PingbackError::InvalidEvent {
                kind: event.kind,
                reason: "seek events need both from and to".into(),
            });
        }
        self.send(TrackerCommand::Push { event }).await
    }

    /// Stops the timer for good, records a final `pause` and flushes it.
    ///
    /// Seeks, position updates and pushed events queued by other clones
    /// before this call is processed are recorded ahead of the final
    /// `pause`. Queued lifecycle calls fail with
    /// [`PingbackError::Destroyed`], as does every call made afterwards.
    /// Pings already in flight are not cancelled.
    pub async fn destroy(&self) -> Result<(), PingbackError> {
        self.request(|reply| TrackerCommand::Destroy { reply }).await?
    }

    /// Current internal state.
    pub async fn info(&self) -> Result<TrackerInfo, PingbackError> {
        self.request(|reply| TrackerCommand::Info { reply }).await
    }

    /// The session token, once assigned.
    pub async fn session_id(&self) -> Result<Option<String>, PingbackError> {
        Ok(self.info().await?.session_id)
    }

    pub fn video_type(&self) -> VideoType {
        self.video_type
    }

    pub fn video_id(&self) -> &str {
        &self.video_id
    }

    /// The collector endpoint, without the per-request `t` parameter.
    pub fn ping_url(&self) -> Option<&Url> {
        self.ping_url.as_ref()
    }

    /// Returns `true` once [`destroy`](Self::destroy) has been processed.
    pub fn is_destroyed(&self) -> bool {
        self.sender.is_closed()
    }

    async fn lifecycle(&self, action: Lifecycle) -> Result<(), PingbackError> {
        self.request(|reply| TrackerCommand::Lifecycle { action, reply }).await?
    }

    /// Queues a command that has no reply.
    async fn send(&self, cmd: TrackerCommand) -> Result<(), PingbackError> {
        self.sender.send(cmd).await.map_err(|_| PingbackError::Destroyed)
    }

    /// Queues a command and waits for its reply.
    async fn request<R>(
        &self,
        make: impl FnOnce(oneshot::Sender<R>) -> TrackerCommand,
    ) -> Result<R, PingbackError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(make(reply_tx)).await?;
        reply_rx.await.map_err(|_| PingbackError::Destroyed)
    }
}

impl std::fmt::Debug for Tracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tracker")
            .field("video_type", &self.video_type)
            .field("video_id", &self.video_id)
            .field("ping_url", &self.ping_url.as_ref().map(Url::as_str))
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// TrackerActor
// ---------------------------------------------------------------------------

/// What woke the actor up.
enum Wakeup {
    Command(Option<TrackerCommand>),
    Tick,
}

struct TrackerActor<T, S, C>
where
    T: PingTransport,
    S: SessionStore,
    C: Clock,
{
    session: Session,
    identity: Arc<SessionIdentity<S>>,
    transport: Arc<T>,
    codec: JsonCodec,
    clock: C,
    ping_url: Option<Url>,
    log: EventLog,
    scheduler: PingScheduler,
    /// Playback position attached to regular events.
    position: Option<f64>,
    receiver: mpsc::Receiver<TrackerCommand>,
}

impl<T, S, C> TrackerActor<T, S, C>
where
    T: PingTransport,
    S: SessionStore,
    C: Clock,
{
    async fn run(mut self) {
        tracing::info!(
            video_type = %self.session.video_type(),
            video_id = %self.session.video_id(),
            loaded_at = %self.session.loaded_at(),
            "tracker started"
        );

        self.identity.initialize().await;

        loop {
            let wakeup = tokio::select! {
                cmd = self.receiver.recv() => Wakeup::Command(cmd),
                _ = self.scheduler.wait_for_tick() => Wakeup::Tick,
            };

            match wakeup {
                Wakeup::Command(Some(cmd)) => {
                    if self.handle(cmd).is_break() {
                        break;
                    }
                }
                Wakeup::Command(None) => {
                    tracing::debug!(
                        video_id = %self.session.video_id(),
                        discarded = self.log.pending_slice().len(),
                        "all tracker handles dropped"
                    );
                    break;
                }
                Wakeup::Tick => self.flush(None),
            }
        }

        tracing::info!(
            video_id = %self.session.video_id(),
            events = self.log.len(),
            "tracker stopped"
        );
    }

    fn handle(&mut self, cmd: TrackerCommand) -> ControlFlow<()> {
        match cmd {
            TrackerCommand::Lifecycle { action, reply } => {
                self.record(action.kind());
                match action {
                    Lifecycle::Play | Lifecycle::Resume => {
                        self.scheduler.activate();
                        let _ = reply.send(Ok(()));
                    }
                    Lifecycle::Ready => self.flush(Some(reply)),
                    Lifecycle::Pause | Lifecycle::End => {
                        self.scheduler.pause();
                        self.flush(Some(reply));
                    }
                }
            }
            TrackerCommand::Seek { .. }
            | TrackerCommand::UpdateTime { .. }
            | TrackerCommand::Push { .. } => self.apply_recording(cmd),
            TrackerCommand::Info { reply } => {
                let _ = reply.send(self.info());
            }
            TrackerCommand::Destroy { reply } => {
                // Refuse new commands before the final flush can complete.
                self.receiver.close();
                self.drain_queued();
                self.scheduler.stop();
                self.scheduler.pause();
                self.record(EventKind::Pause);
                self.flush(Some(reply));
                tracing::info!(video_id = %self.session.video_id(), "tracker destroyed");
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    /// Applies a command that only records state and has no reply.
    fn apply_recording(&mut self, cmd: TrackerCommand) {
        match cmd {
            TrackerCommand::Seek { from, to } => {
                let event = PlaybackEvent::seek(from, to, self.clock.now());
                tracing::trace!(kind = %event.kind, from, to, "seek recorded");
                self.log.append(event);
            }
            TrackerCommand::UpdateTime { time } => {
                self.position = Some(time);
            }
            TrackerCommand::Push { mut event } => {
                if !event.kind.is_seek() && event.at.is_none() {
                    event.at = self.position;
                }
                tracing::trace!(kind = %event.kind, at = ?event.at, "event pushed");
                self.log.append(event);
            }
            TrackerCommand::Lifecycle { .. }
            | TrackerCommand::Info { .. }
            | TrackerCommand::Destroy { .. } => {}
        }
    }

    /// Empties the closed command queue. Recording commands already
    /// acknowledged to their callers are applied; the rest are dropped,
    /// which fails their callers with `Destroyed`.
    fn drain_queued(&mut self) {
        let mut dropped = 0usize;
        while let Ok(cmd) = self.receiver.try_recv() {
            match cmd {
                TrackerCommand::Seek { .. }
                | TrackerCommand::UpdateTime { .. }
                | TrackerCommand::Push { .. } => self.apply_recording(cmd),
                _ => dropped += 1,
            }
        }
        if dropped > 0 {
            tracing::debug!(dropped, "commands queued behind destroy refused");
        }
    }

    /// Appends a regular event at the current position.
    fn record(&mut self, kind: EventKind) {
        tracing::trace!(%kind, at = ?self.position, "event recorded");
        self.log
            .append(PlaybackEvent::new(kind, self.clock.now()).with_position(self.position));
    }

    /// Sends everything pending as one ping.
    ///
    /// The payload is built and the cursor advanced before this returns;
    /// only the network round trip runs in a separate task. Its result
    /// goes to `reply` when a caller is waiting on it, and to the log
    /// otherwise.
    fn flush(&mut self, reply: Option<Reply>) {
        let Some(ping_url) = &self.ping_url else {
            tracing::trace!("no ping url configured, nothing sent");
            respond(reply, Ok(()));
            return;
        };

        let events = self.log.pending_slice().to_vec();
        self.log.mark_flushed();

        let emitted_at = self.clock.now();
        let payload = PingPayload {
            emitted_at,
            session: self.session.snapshot(self.identity.current()),
            events,
        };

        let body = match self.codec.encode(&payload) {
            Ok(body) => body,
            Err(e) => {
                respond(reply, Err(e.into()));
                return;
            }
        };

        let mut url = ping_url.clone();
        url.query_pairs_mut()
            .append_pair("t", &emitted_at.timestamp_millis().to_string());

        tracing::debug!(
            url = %url,
            events = payload.events.len(),
            flushed = self.log.flushed(),
            "ping dispatched"
        );

        let transport = Arc::clone(&self.transport);
        let identity = Arc::clone(&self.identity);
        let codec = self.codec;
        tokio::spawn(async move {
            let result = deliver(&*transport, &*identity, codec, url.as_str(), body).await;
            respond(reply, result);
        });
    }

    fn info(&self) -> TrackerInfo {
        TrackerInfo {
            session_id: self.identity.current(),
            state: self.scheduler.state(),
            events: self.log.len(),
            pending: self.log.pending_slice().len(),
            position: self.position,
            scheduler: self.scheduler.metrics().clone(),
        }
    }
}

/// Hands a flush result to the waiting caller. Without one, failures are
/// only logged.
fn respond(reply: Option<Reply>, result: Result<(), PingbackError>) {
    match (reply, result) {
        (Some(reply), result) => {
            let _ = reply.send(result);
        }
        (None, Err(e)) => tracing::warn!(error = %e, "periodic ping failed"),
        (None, Ok(())) => {}
    }
}

/// Posts one ping and adopts the session token from the reply, if any.
///
/// An empty body counts as a reply without a token.
async fn deliver<T, S, K>(
    transport: &T,
    identity: &SessionIdentity<S>,
    codec: K,
    url: &str,
    body: Vec<u8>,
) -> Result<(), PingbackError>
where
    T: PingTransport,
    S: SessionStore,
    K: Codec,
{
    let raw = transport.post(url, body).await?;
    let response: PingResponse = if raw.iter().all(u8::is_ascii_whitespace) {
        PingResponse::default()
    } else {
        codec.decode(&raw)?
    };

    if let Some(id) = response.session {
        if !identity.is_assigned() {
            identity.assign(&id).await;
        }
    }
    Ok(())
}
