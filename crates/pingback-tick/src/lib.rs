//! Ping scheduling for Pingback.
//!
//! Provides the fixed-period timer that drives periodic pings, gated by
//! the playback state: ticks are only delivered while the player is
//! [`PlaybackState::Active`]. Also provides the [`Clock`] used to stamp
//! events and payloads with wall-clock time.
//!
//! # Cadence
//!
//! The timer is armed once, at construction, and keeps its cadence for
//! the scheduler's whole life. Pausing does not re-arm it: a deadline that
//! passes while paused is consumed silently, and the first tick after
//! [`PingScheduler::activate`] lands on the original cadence. Only
//! [`PingScheduler::stop`] cancels the timer, permanently.
//!
//! # Integration
//!
//! The scheduler is designed to sit inside the tracker actor's
//! `tokio::select!` loop:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         Some(cmd) = cmd_rx.recv() => { /* lifecycle commands */ }
//!         _ = scheduler.wait_for_tick() => { /* periodic flush */ }
//!     }
//! }
//! ```
//!
//! Time comes from `tokio::time`, so tests control it with
//! `#[tokio::test(start_paused = true)]` and `tokio::time::advance`.

mod clock;

pub use clock::{Clock, ManualClock, SystemClock};

use std::time::Duration;

use tokio::time::{self, Instant};
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Period between two periodic pings unless configured otherwise.
pub const DEFAULT_PING_PERIOD: Duration = Duration::from_secs(10);

/// Longest accepted period. Longer ones are clamped to this.
pub const MAX_PING_PERIOD: Duration = Duration::from_secs(24 * 60 * 60);

/// Configuration for the ping scheduler.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Time between two periodic ticks.
    pub period: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            period: DEFAULT_PING_PERIOD,
        }
    }
}

impl SchedulerConfig {
    /// Create a config with a specific period.
    pub fn with_period(period: Duration) -> Self {
        Self { period }
    }

    /// Fix any out-of-range values so the config is safe to use.
    ///
    /// Called automatically by [`PingScheduler::new`]. A zero period would
    /// spin the actor loop, so it falls back to [`DEFAULT_PING_PERIOD`];
    /// anything above [`MAX_PING_PERIOD`] is clamped so deadlines stay
    /// representable as an `Instant`.
    pub fn validated(mut self) -> Self {
        if self.period.is_zero() {
            warn!(
                default_ms = DEFAULT_PING_PERIOD.as_millis() as u64,
                "ping period is zero, using default"
            );
            self.period = DEFAULT_PING_PERIOD;
        } else if self.period > MAX_PING_PERIOD {
            warn!(
                max_ms = MAX_PING_PERIOD.as_millis() as u64,
                "ping period too long, clamping"
            );
            self.period = MAX_PING_PERIOD;
        }
        self
    }
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Whether the player is currently playing.
///
/// ```text
///   Paused ──(play / resume)──→ Active
///     ↑                            │
///     └──────(pause / end)─────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    /// Nothing is playing. Ticks are suppressed. Initial state.
    #[default]
    Paused,
    /// Playback in progress. Ticks are delivered.
    Active,
}

/// Information about a delivered tick, returned by
/// [`PingScheduler::wait_for_tick`].
#[derive(Debug, Clone)]
pub struct TickInfo {
    /// Number of delivered ticks so far, including this one (starts at 1).
    pub tick: u64,
    /// Deadlines missed entirely because the actor was busy (0 normally).
    pub ticks_skipped: u64,
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

/// Counters describing what the timer has done so far.
#[derive(Debug, Clone, Default)]
pub struct SchedulerMetrics {
    /// Ticks delivered while active.
    pub total_ticks: u64,
    /// Deadlines that passed while paused.
    pub suppressed_ticks: u64,
    /// Deadlines skipped because the actor woke up late.
    pub total_skipped: u64,
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Fixed-period ping timer with a playback gate.
///
/// One `PingScheduler` per tracker actor.
pub struct PingScheduler {
    config: SchedulerConfig,
    tick_count: u64,
    /// When the next deadline falls (Tokio instant for `sleep_until`).
    next_tick: Instant,
    state: PlaybackState,
    stopped: bool,
    metrics: SchedulerMetrics,
}

impl PingScheduler {
    /// Create a new scheduler in the [`Paused`](PlaybackState::Paused)
    /// state. The first deadline is one period from now.
    pub fn new(config: SchedulerConfig) -> Self {
        let config = config.validated();
        let next_tick = deadline_after(Instant::now(), config.period);

        debug!(
            period_ms = config.period.as_millis() as u64,
            "ping scheduler created"
        );

        Self {
            config,
            tick_count: 0,
            next_tick,
            state: PlaybackState::Paused,
            stopped: false,
            metrics: SchedulerMetrics::default(),
        }
    }

    /// Create a scheduler with the default 10 second period.
    pub fn with_default_period() -> Self {
        Self::new(SchedulerConfig::default())
    }

    /// Wait until the next deadline that falls while active.
    ///
    /// Deadlines passing while paused are consumed without returning.
    /// Once [`stop`](Self::stop) has been called this future pends forever
    /// while `tokio::select!` keeps serving its other branches.
    ///
    /// Cancel-safe: dropping the future before a deadline leaves the
    /// schedule untouched.
    pub async fn wait_for_tick(&mut self) -> TickInfo {
        if self.stopped {
            return std::future::pending().await;
        }

        let period = self.config.period;
        loop {
            time::sleep_until(self.next_tick).await;

            let now = Instant::now();
            let late_by = now.saturating_duration_since(self.next_tick);
            let ticks_skipped = (late_by.as_nanos() / period.as_nanos()) as u64;

            // Skip ahead rather than firing a burst of catch-up ticks.
            self.next_tick = if ticks_skipped > 0 {
                warn!(
                    skipped = ticks_skipped,
                    late_ms = late_by.as_secs_f64() * 1000.0,
                    "ping timer overrun, skipping ahead"
                );
                deadline_after(now, period)
            } else {
                deadline_after(self.next_tick, period)
            };
            self.metrics.total_skipped += ticks_skipped;

            match self.state {
                PlaybackState::Active => {
                    self.tick_count += 1;
                    self.metrics.total_ticks += 1;
                    trace!(tick = self.tick_count, "ping tick");
                    return TickInfo {
                        tick: self.tick_count,
                        ticks_skipped,
                    };
                }
                PlaybackState::Paused => {
                    self.metrics.suppressed_ticks += 1;
                    trace!("ping tick suppressed while paused");
                }
            }
        }
    }

    /// Switch to [`Active`](PlaybackState::Active). Idempotent.
    pub fn activate(&mut self) {
        if self.state != PlaybackState::Active {
            self.state = PlaybackState::Active;
            debug!(tick = self.tick_count, "ping scheduler active");
        }
    }

    /// Switch to [`Paused`](PlaybackState::Paused). Idempotent.
    pub fn pause(&mut self) {
        if self.state != PlaybackState::Paused {
            self.state = PlaybackState::Paused;
            debug!(tick = self.tick_count, "ping scheduler paused");
        }
    }

    /// Cancel the timer for good. Playback state is left as is.
    pub fn stop(&mut self) {
        if !self.stopped {
            self.stopped = true;
            debug!(tick = self.tick_count, "ping scheduler stopped");
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_paused(&self) -> bool {
        self.state == PlaybackState::Paused
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Number of ticks delivered so far.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Snapshot of current metrics.
    pub fn metrics(&self) -> &SchedulerMetrics {
        &self.metrics
    }

    /// The configured period.
    pub fn period(&self) -> Duration {
        self.config.period
    }
}

/// `from + period`, saturating at a far-future instant instead of
/// overflowing.
fn deadline_after(from: Instant, period: Duration) -> Instant {
    from.checked_add(period)
        .or_else(|| from.checked_add(MAX_PING_PERIOD))
        .unwrap_or(from)
}
