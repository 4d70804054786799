//! Shared control state for a running session.
//!
//! The stepping loop and whoever drives it (the binary's signal handler, a
//! display task) share one [`SimulationControl`] through an [`Arc`]. Pause
//! goes through the clock's own [`ClockControl`], so pausing the session and
//! pausing the clock are the same thing, and a resume through either handle
//! wakes the loop. Atomic fields keep the loop's hot path lock-free.
//!
//! [`Arc`]: std::sync::Arc

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::clock::ClockControl;
use crate::config::SessionConfig;

/// Shortest accepted pause between steps, in milliseconds.
pub const MIN_STEP_INTERVAL_MS: u64 = 10;

/// Why a session stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimulationEndReason {
    /// Reached the configured `max_steps`.
    MaxStepsReached,
    /// Reached the configured `max_real_time_seconds`.
    MaxRealTimeReached,
    /// A stop was requested.
    StopRequested,
}

/// Pause, stop, pace, and bounds of one session.
#[derive(Debug)]
pub struct SimulationControl {
    clock: Arc<ClockControl>,
    stop_requested: AtomicBool,
    step_interval_ms: AtomicU64,
    started_at: DateTime<Utc>,
    max_steps: u64,
    max_real_time_seconds: u64,
    end_reason: Mutex<Option<SimulationEndReason>>,
}

impl SimulationControl {
    /// Control state for a session whose clock is paused through `clock`.
    pub fn new(clock: Arc<ClockControl>, session: &SessionConfig) -> Self {
        Self {
            clock,
            stop_requested: AtomicBool::new(false),
            step_interval_ms: AtomicU64::new(session.step_interval_ms),
            started_at: Utc::now(),
            max_steps: session.max_steps,
            max_real_time_seconds: session.max_real_time_seconds,
            end_reason: Mutex::new(None),
        }
    }

    // -----------------------------------------------------------------------
    // Pause / Resume
    // -----------------------------------------------------------------------

    /// Whether the session is paused.
    pub fn is_paused(&self) -> bool {
        self.clock.is_paused()
    }

    /// Pause. The loop sleeps until [`resume`](Self::resume).
    pub fn pause(&self) {
        self.clock.set_paused(true);
    }

    /// Resume and wake the loop.
    pub fn resume(&self) {
        self.clock.set_paused(false);
    }

    /// Wait until the session is no longer paused or a stop is requested.
    pub async fn wait_if_paused(&self) {
        while self.is_paused() && !self.is_stop_requested() {
            self.clock.notified().await;
        }
    }

    // -----------------------------------------------------------------------
    // Stop
    // -----------------------------------------------------------------------

    /// Ask the loop to stop after the current step. Also wakes a paused loop.
    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::Release);
        self.clock.wake();
    }

    /// Whether a stop was requested.
    pub fn is_stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::Acquire)
    }

    /// Record why the session ended.
    pub async fn set_end_reason(&self, reason: SimulationEndReason) {
        *self.end_reason.lock().await = Some(reason);
    }

    /// Why the session ended, if it has.
    pub async fn end_reason(&self) -> Option<SimulationEndReason> {
        self.end_reason.lock().await.clone()
    }

    // -----------------------------------------------------------------------
    // Pace
    // -----------------------------------------------------------------------

    /// Real-time pause between steps in milliseconds.
    pub fn step_interval_ms(&self) -> u64 {
        self.step_interval_ms.load(Ordering::Acquire)
    }

    /// Change the pause between steps. Zero runs flat out; other values
    /// below [`MIN_STEP_INTERVAL_MS`] are rejected with `None`. Returns the
    /// previous interval.
    pub fn set_step_interval_ms(&self, ms: u64) -> Option<u64> {
        if ms != 0 && ms < MIN_STEP_INTERVAL_MS {
            return None;
        }
        Some(self.step_interval_ms.swap(ms, Ordering::AcqRel))
    }

    // -----------------------------------------------------------------------
    // Bounds
    // -----------------------------------------------------------------------

    /// Whether `max_steps` is set and `step` has reached it.
    pub const fn step_limit_reached(&self, step: u64) -> bool {
        self.max_steps > 0 && step >= self.max_steps
    }

    /// Whether `max_real_time_seconds` is set and has elapsed.
    pub fn time_limit_reached(&self) -> bool {
        self.max_real_time_seconds > 0 && self.elapsed_seconds() >= self.max_real_time_seconds
    }

    /// Wall-clock seconds since the session started.
    pub fn elapsed_seconds(&self) -> u64 {
        let elapsed = Utc::now()
            .signed_duration_since(self.started_at)
            .num_seconds();
        // Negative if the system clock was set back.
        u64::try_from(elapsed.max(0)).unwrap_or(u64::MAX)
    }

    /// Configured step bound, 0 for none.
    pub const fn max_steps(&self) -> u64 {
        self.max_steps
    }

    /// Configured wall-clock bound, 0 for none.
    pub const fn max_real_time_seconds(&self) -> u64 {
        self.max_real_time_seconds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn control(max_steps: u64) -> SimulationControl {
        let session = SessionConfig {
            max_steps,
            step_interval_ms: 100,
            ..SessionConfig::default()
        };
        SimulationControl::new(Arc::new(ClockControl::new()), &session)
    }

    #[test]
    fn pausing_the_session_pauses_the_clock() {
        let clock = Arc::new(ClockControl::new());
        let control = SimulationControl::new(Arc::clone(&clock), &SessionConfig::default());
        assert!(!control.is_paused());
        control.pause();
        assert!(clock.is_paused());
        control.resume();
        assert!(!clock.is_paused());
    }

    #[test]
    fn stop_request() {
        let control = control(0);
        assert!(!control.is_stop_requested());
        control.request_stop();
        assert!(control.is_stop_requested());
    }

    #[test]
    fn step_interval_changes() {
        let control = control(0);
        assert_eq!(control.set_step_interval_ms(250), Some(100));
        assert_eq!(control.step_interval_ms(), 250);
        assert_eq!(control.set_step_interval_ms(5), None);
        assert_eq!(control.set_step_interval_ms(0), Some(250));
        assert_eq!(control.step_interval_ms(), 0);
    }

    #[test]
    fn step_limits() {
        assert!(!control(0).step_limit_reached(1_000_000));
        let bounded = control(100);
        assert!(!bounded.step_limit_reached(99));
        assert!(bounded.step_limit_reached(100));
        assert!(!bounded.time_limit_reached());
    }

    #[tokio::test]
    async fn resuming_the_clock_directly_wakes_a_paused_loop() {
        let clock = Arc::new(ClockControl::new());
        let control = Arc::new(SimulationControl::new(Arc::clone(&clock), &SessionConfig::default()));
        control.pause();
        let waiter = {
            let control = Arc::clone(&control);
            tokio::spawn(async move { control.wait_if_paused().await })
        };
        tokio::task::yield_now().await;
        clock.set_paused(false);
        let woke = tokio::time::timeout(std::time::Duration::from_secs(2), waiter).await;
        assert!(matches!(woke, Ok(Ok(()))));
        assert!(!control.is_paused());
    }

    #[tokio::test]
    async fn a_stop_wakes_a_paused_loop() {
        let control = Arc::new(control(0));
        control.pause();
        let waiter = {
            let control = Arc::clone(&control);
            tokio::spawn(async move { control.wait_if_paused().await })
        };
        control.request_stop();
        assert!(waiter.await.is_ok());
        control.set_end_reason(SimulationEndReason::StopRequested).await;
        assert_eq!(
            control.end_reason().await,
            Some(SimulationEndReason::StopRequested)
        );
    }
}
