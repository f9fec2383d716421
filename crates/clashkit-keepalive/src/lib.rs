//! Fixed-interval keep-alive scheduler for clashkit.
//!
//! Once a session is logged in, the server expects a keep-alive packet at a
//! steady cadence or it drops the connection. [`KeepAliveScheduler`] runs
//! that cadence on its own Tokio task, independent of the receive loop, and
//! hands each tick to a [`KeepAliveSink`].
//!
//! # Failure policy
//!
//! The scheduler never retries. A failed send is counted, logged, and
//! passed to [`KeepAliveSink::keep_alive_failed`]; deciding what happens
//! next (usually: fault the session) belongs to whoever owns the sink.
//!
//! # Integration
//!
//! ```ignore
//! let scheduler = KeepAliveScheduler::new(KeepAliveConfig::default());
//! scheduler.start(link)?;   // once, after login
//! // ...
//! scheduler.stop();         // idempotent; also happens on drop
//! ```

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for the keep-alive scheduler.
#[derive(Debug, Clone)]
pub struct KeepAliveConfig {
    /// Time between keep-alive packets. The first one goes out one interval
    /// after [`KeepAliveScheduler::start`].
    pub interval: Duration,
}

impl Default for KeepAliveConfig {
    fn default() -> Self {
        Self {
            interval: Self::DEFAULT_INTERVAL,
        }
    }
}

impl KeepAliveConfig {
    /// Cadence the game server expects.
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);

    pub fn with_interval(interval: Duration) -> Self {
        Self { interval }
    }

    /// Replaces out-of-range values so the config is safe to use.
    ///
    /// Called automatically by [`KeepAliveScheduler::new`]. A zero interval
    /// would make the timer spin, so it falls back to the default.
    pub fn validated(mut self) -> Self {
        if self.interval.is_zero() {
            warn!(
                default_ms = Self::DEFAULT_INTERVAL.as_millis() as u64,
                "keep-alive interval is zero, using default"
            );
            self.interval = Self::DEFAULT_INTERVAL;
        }
        self
    }
}

// ---------------------------------------------------------------------------
// Sink
// ---------------------------------------------------------------------------

/// Where keep-alive ticks go.
///
/// Both methods are called on the scheduler's task and must not block.
pub trait KeepAliveSink: Send + Sync + 'static {
    /// The error a failed send produces.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Sends one keep-alive packet.
    fn send_keep_alive(&self) -> Result<(), Self::Error>;

    /// Reports a send that failed. Called once per failed tick.
    fn keep_alive_failed(&self, error: Self::Error);
}

// ---------------------------------------------------------------------------
// Errors and stats
// ---------------------------------------------------------------------------

/// Errors returned by the scheduler.
#[derive(Debug, thiserror::Error)]
pub enum KeepAliveError {
    /// [`KeepAliveScheduler::start`] was already called on this scheduler.
    #[error("keep-alive scheduler already started")]
    AlreadyStarted,
}

/// Counters for a scheduler's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeepAliveStats {
    /// Keep-alives handed to the sink successfully.
    pub sent: u64,
    /// Keep-alives the sink failed to send.
    pub failed: u64,
}

#[derive(Debug, Default)]
struct Counters {
    sent: AtomicU64,
    failed: AtomicU64,
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Emits keep-alives at a fixed interval until stopped.
///
/// One scheduler serves one session: it can be started once, and a stopped
/// scheduler stays stopped. Dropping the scheduler stops it.
pub struct KeepAliveScheduler {
    config: KeepAliveConfig,
    started: AtomicBool,
    shutdown: watch::Sender<bool>,
    counters: Arc<Counters>,
}

impl KeepAliveScheduler {
    pub fn new(config: KeepAliveConfig) -> Self {
        let config = config.validated();
        let (shutdown, _) = watch::channel(false);
        Self {
            config,
            started: AtomicBool::new(false),
            shutdown,
            counters: Arc::new(Counters::default()),
        }
    }

    /// Spawns the timer task. Must be called inside a Tokio runtime.
    ///
    /// Ticks fire at `interval`, `2 × interval`, … after this call. A tick
    /// that fires late is not made up for: the next one is scheduled a full
    /// interval later.
    ///
    /// # Errors
    /// Returns [`KeepAliveError::AlreadyStarted`] on every call after the
    /// first, including after [`stop`](Self::stop).
    pub fn start<S: KeepAliveSink>(&self, sink: S) -> Result<(), KeepAliveError> {
        if self.started.swap(true, Ordering::AcqRel) {
            return Err(KeepAliveError::AlreadyStarted);
        }

        let period = self.config.interval;
        let counters = Arc::clone(&self.counters);
        let mut shutdown = self.shutdown.subscribe();
        if *shutdown.borrow_and_update() {
            debug!("keep-alive scheduler stopped before start");
            return Ok(());
        }

        debug!(interval_ms = period.as_millis() as u64, "keep-alive scheduler started");

        tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = shutdown.changed() => break,
                    _ = ticker.tick() => {}
                }

                match sink.send_keep_alive() {
                    Ok(()) => {
                        let sent = counters.sent.fetch_add(1, Ordering::Relaxed) + 1;
                        trace!(sent, "keep-alive sent");
                    }
                    Err(e) => {
                        counters.failed.fetch_add(1, Ordering::Relaxed);
                        warn!(error = %e, "keep-alive send failed");
                        sink.keep_alive_failed(e);
                    }
                }
            }

            debug!("keep-alive scheduler stopped");
        });

        Ok(())
    }

    /// Stops the timer. Safe to call any number of times, before or after
    /// [`start`](Self::start).
    pub fn stop(&self) {
        self.shutdown.send_replace(true);
    }

    /// Whether the timer task is (or is about to be) ticking.
    pub fn is_running(&self) -> bool {
        self.started.load(Ordering::Acquire) && !*self.shutdown.borrow()
    }

    pub fn stats(&self) -> KeepAliveStats {
        KeepAliveStats {
            sent: self.counters.sent.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
        }
    }

    pub fn interval(&self) -> Duration {
        self.config.interval
    }
}

impl Drop for KeepAliveScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
