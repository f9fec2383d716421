//! Integration tests for the keep-alive scheduler.
//!
//! Uses `start_paused = true` so Tokio's clock only moves when every task
//! is idle; sleeping in the test advances time deterministically.

use std::sync::Arc;
use std::time::Duration;

use clashkit_keepalive::{
    KeepAliveConfig, KeepAliveError, KeepAliveScheduler, KeepAliveSink, KeepAliveStats,
};
use parking_lot::Mutex;
use tokio::time::Instant;

// =========================================================================
// Helpers
// =========================================================================

const T: Duration = Duration::from_secs(5);

#[derive(Debug, thiserror::Error)]
#[error("pipe broken")]
struct Broken;

/// Records when each keep-alive was sent; optionally fails every send.
#[derive(Clone, Default)]
struct Recorder {
    sent_at: Arc<Mutex<Vec<Instant>>>,
    failures: Arc<Mutex<Vec<String>>>,
    fail: bool,
}

impl KeepAliveSink for Recorder {
    type Error = Broken;

    fn send_keep_alive(&self) -> Result<(), Broken> {
        if self.fail {
            return Err(Broken);
        }
        self.sent_at.lock().push(Instant::now());
        Ok(())
    }

    fn keep_alive_failed(&self, error: Broken) {
        self.failures.lock().push(error.to_string());
    }
}

fn scheduler() -> KeepAliveScheduler {
    KeepAliveScheduler::new(KeepAliveConfig::with_interval(T))
}

// =========================================================================
// Config
// =========================================================================

#[test]
fn test_default_interval_is_five_seconds() {
    assert_eq!(KeepAliveConfig::default().interval, Duration::from_secs(5));
}

#[test]
fn test_zero_interval_falls_back_to_default() {
    let cfg = KeepAliveConfig::with_interval(Duration::ZERO).validated();
    assert_eq!(cfg.interval, KeepAliveConfig::DEFAULT_INTERVAL);

    let s = KeepAliveScheduler::new(KeepAliveConfig::with_interval(Duration::ZERO));
    assert_eq!(s.interval(), KeepAliveConfig::DEFAULT_INTERVAL);
}

// =========================================================================
// Cadence
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_three_intervals_send_exactly_three() {
    let s = scheduler();
    let sink = Recorder::default();
    let started = Instant::now();

    s.start(sink.clone()).unwrap();
    tokio::time::sleep(T * 3 + T / 2).await;

    let sent_at = sink.sent_at.lock().clone();
    assert_eq!(sent_at.len(), 3);
    // Strictly increasing, one interval apart.
    for (i, at) in sent_at.iter().enumerate() {
        assert_eq!(*at - started, T * (i as u32 + 1));
    }
    assert_eq!(s.stats(), KeepAliveStats { sent: 3, failed: 0 });
}

#[tokio::test(start_paused = true)]
async fn test_nothing_is_sent_before_the_first_interval() {
    let s = scheduler();
    let sink = Recorder::default();

    s.start(sink.clone()).unwrap();
    tokio::time::sleep(T - Duration::from_millis(1)).await;

    assert!(sink.sent_at.lock().is_empty());
    assert!(s.is_running());
}

// =========================================================================
// Start / stop
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_start_twice_is_rejected() {
    let s = scheduler();
    s.start(Recorder::default()).unwrap();

    let second = s.start(Recorder::default());
    assert!(matches!(second, Err(KeepAliveError::AlreadyStarted)));
}

#[tokio::test(start_paused = true)]
async fn test_stop_halts_ticks_and_is_idempotent() {
    let s = scheduler();
    let sink = Recorder::default();
    s.start(sink.clone()).unwrap();

    tokio::time::sleep(T + T / 2).await;
    s.stop();
    s.stop();
    tokio::time::sleep(T * 5).await;

    assert_eq!(sink.sent_at.lock().len(), 1);
    assert!(!s.is_running());
}

#[tokio::test(start_paused = true)]
async fn test_stop_before_start_means_never_ticking() {
    let s = scheduler();
    let sink = Recorder::default();
    s.stop();

    s.start(sink.clone()).unwrap();
    tokio::time::sleep(T * 3).await;

    assert!(sink.sent_at.lock().is_empty());
    assert!(!s.is_running());
}

#[tokio::test(start_paused = true)]
async fn test_drop_stops_the_task() {
    let sink = Recorder::default();
    {
        let s = scheduler();
        s.start(sink.clone()).unwrap();
    }
    tokio::time::sleep(T * 3).await;

    assert!(sink.sent_at.lock().is_empty());
}

// =========================================================================
// Failures
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_failed_sends_are_reported_not_retried() {
    let s = scheduler();
    let sink = Recorder {
        fail: true,
        ..Recorder::default()
    };
    s.start(sink.clone()).unwrap();

    tokio::time::sleep(T * 2 + T / 2).await;

    // One report per tick: no extra attempts in between.
    assert_eq!(*sink.failures.lock(), vec!["pipe broken", "pipe broken"]);
    assert_eq!(s.stats(), KeepAliveStats { sent: 0, failed: 2 });
}

#[test]
fn test_initial_stats_are_zero() {
    assert_eq!(scheduler().stats(), KeepAliveStats::default());
    assert!(!scheduler().is_running());
}
