//! Simulation clocks: Mars time, Earth time, and the master clock pacing both.
//!
//! The master clock is the single source of simulated time. Each step it
//! advances Mars time by a number of millisols and derives Earth time from
//! the elapsed total, so the two never drift apart. Pausing goes through a
//! shared [`ClockControl`] that other tasks may toggle while the stepping
//! loop runs.
//!
//! # Modules
//!
//! - [`mars`] -- Darian calendar time ([`MarsClock`]).
//! - [`earth`] -- UTC time and astronomical dates ([`EarthClock`]).

pub mod earth;
pub mod mars;

use core::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use marsim_types::ClockSnapshot;
use tokio::sync::Notify;
use tokio::sync::futures::Notified;
use tracing::debug;

pub use earth::EarthClock;
pub use mars::{MILLISOLS_PER_SOL, MarsClock};

use crate::config::ClockConfig;

/// Errors that can occur during clock operations.
#[derive(Debug, thiserror::Error)]
pub enum ClockError {
    /// A Mars timestamp could not be parsed.
    #[error("invalid Mars timestamp {input:?}: {reason}")]
    InvalidMarsTimestamp {
        /// The rejected input.
        input: String,
        /// What is wrong with it.
        reason: String,
    },

    /// Calendar fields do not name a real Mars date.
    #[error("invalid Mars date {orbit}-{month}-{sol}: {reason}")]
    InvalidMarsDate {
        /// Orbit number.
        orbit: u32,
        /// Month of the orbit.
        month: u32,
        /// Sol of the month.
        sol: u32,
        /// What is wrong with it.
        reason: String,
    },

    /// An Earth timestamp could not be parsed.
    #[error("invalid Earth timestamp {input:?}: {source}")]
    InvalidEarthTimestamp {
        /// The rejected input.
        input: String,
        /// The underlying parse error.
        source: chrono::ParseError,
    },

    /// Earth time cannot move by this many seconds.
    #[error("Earth clock cannot advance by {seconds} s")]
    EarthOutOfRange {
        /// The requested step.
        seconds: f64,
    },

    /// Time can only move forward by a finite amount.
    #[error("cannot advance the clock by {delta} millisols")]
    InvalidAdvance {
        /// The requested step.
        delta: f64,
    },

    /// Invalid clock configuration.
    #[error("invalid clock configuration: {reason}")]
    InvalidConfig {
        /// Explanation of what is wrong with the configuration.
        reason: String,
    },
}

/// Pause state shared between the stepping loop and its controllers.
///
/// Clearing the flag wakes whoever waits in [`notified`](Self::notified),
/// whichever handle cleared it.
#[derive(Debug, Default)]
pub struct ClockControl {
    paused: AtomicBool,
    wake: Notify,
}

impl ClockControl {
    /// A running clock.
    pub fn new() -> Self {
        Self {
            paused: AtomicBool::new(false),
            wake: Notify::new(),
        }
    }

    /// Whether the clock is paused.
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    /// Pause or resume the clock. Resuming wakes a waiting loop.
    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::Release);
        if !paused {
            self.wake.notify_one();
        }
    }

    /// Resolves on the next resume or [`wake`](Self::wake). A wake sent
    /// while nobody waits is kept for the next waiter.
    pub fn notified(&self) -> Notified<'_> {
        self.wake.notified()
    }

    /// Wake a waiting loop without resuming, so it can see a stop request.
    pub fn wake(&self) {
        self.wake.notify_one();
    }
}

/// What one advance of the master clock did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClockPulse {
    /// Millisols added this advance.
    pub delta: f64,
    /// Millisols since the session started.
    pub elapsed: f64,
    /// Sols since the Mars calendar epoch.
    pub sol: u64,
    /// Time of day in millisols.
    pub millisol: f64,
    /// Whether this advance crossed into a new sol.
    pub new_sol: bool,
}

/// Notified after every advance, in registration order.
pub trait ClockListener: Send {
    /// Called with the pulse of a completed advance.
    fn clock_pulse(&mut self, pulse: &ClockPulse);
}

/// Owns Mars and Earth time and advances them together.
pub struct MasterClock {
    mars: MarsClock,
    earth: EarthClock,
    earth_epoch: EarthClock,
    elapsed: f64,
    seconds_per_millisol: f64,
    control: Arc<ClockControl>,
    listeners: Vec<Box<dyn ClockListener>>,
}

impl fmt::Debug for MasterClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MasterClock")
            .field("mars", &self.mars)
            .field("earth", &self.earth)
            .field("elapsed", &self.elapsed)
            .field("paused", &self.control.is_paused())
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}

impl MasterClock {
    /// Create a clock at the configured start times.
    pub fn new(config: &ClockConfig) -> Result<Self, ClockError> {
        let spm = config.earth_seconds_per_millisol;
        if !(spm.is_finite() && spm > 0.0) {
            return Err(ClockError::InvalidConfig {
                reason: format!("earth_seconds_per_millisol must be positive, got {spm}"),
            });
        }
        let mars = MarsClock::parse(&config.mars_start)?;
        let earth = EarthClock::parse(&config.earth_start)?;
        Ok(Self {
            mars,
            earth,
            earth_epoch: earth,
            elapsed: 0.0,
            seconds_per_millisol: spm,
            control: Arc::new(ClockControl::new()),
            listeners: Vec::new(),
        })
    }

    /// Shared pause control.
    pub fn control(&self) -> Arc<ClockControl> {
        Arc::clone(&self.control)
    }

    /// Whether the clock is paused.
    pub fn is_paused(&self) -> bool {
        self.control.is_paused()
    }

    /// Pause or resume.
    pub fn set_paused(&self, paused: bool) {
        self.control.set_paused(paused);
        debug!(paused, "clock pause toggled");
    }

    /// Register a listener. Listeners are notified in registration order.
    pub fn add_listener(&mut self, listener: Box<dyn ClockListener>) {
        self.listeners.push(listener);
    }

    /// Advance by `delta` millisols. Returns `None` while paused.
    pub fn advance(&mut self, delta: f64) -> Result<Option<ClockPulse>, ClockError> {
        if !(delta.is_finite() && delta >= 0.0) {
            return Err(ClockError::InvalidAdvance { delta });
        }
        if self.is_paused() {
            return Ok(None);
        }

        let elapsed = self.elapsed + delta;
        let mut earth = self.earth_epoch;
        earth.add_time(elapsed * self.seconds_per_millisol)?;

        let before = self.mars.total_sols();
        self.mars.add_time(delta);
        self.earth = earth;
        self.elapsed = elapsed;

        let pulse = ClockPulse {
            delta,
            elapsed,
            sol: self.mars.total_sols(),
            millisol: self.mars.millisol(),
            new_sol: self.mars.total_sols() > before,
        };
        for listener in &mut self.listeners {
            listener.clock_pulse(&pulse);
        }
        Ok(Some(pulse))
    }

    /// Current Mars time.
    pub const fn mars_time(&self) -> &MarsClock {
        &self.mars
    }

    /// Current Earth time.
    pub const fn earth_time(&self) -> &EarthClock {
        &self.earth
    }

    /// Millisols simulated since the session started.
    pub const fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Formatted Earth timestamp.
    pub fn earth_timestamp(&self) -> String {
        self.earth.timestamp()
    }

    /// Display snapshot.
    pub fn snapshot(&self) -> ClockSnapshot {
        ClockSnapshot {
            total_sols: self.mars.total_sols(),
            orbit: self.mars.orbit(),
            month: self.mars.month(),
            sol_of_month: self.mars.sol_of_month(),
            millisol: self.mars.millisol(),
            mars_timestamp: self.mars.to_string(),
            earth_timestamp: self.earth.timestamp(),
            elapsed_millisols: self.elapsed,
            paused: self.is_paused(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    fn clock() -> MasterClock {
        MasterClock::new(&ClockConfig::default()).unwrap()
    }

    struct Recorder {
        tag: &'static str,
        log: Arc<Mutex<Vec<(&'static str, bool)>>>,
    }

    impl ClockListener for Recorder {
        fn clock_pulse(&mut self, pulse: &ClockPulse) {
            self.log.lock().unwrap().push((self.tag, pulse.new_sol));
        }
    }

    #[test]
    fn starts_at_the_configured_times() {
        let clock = clock();
        assert_eq!(clock.mars_time().to_string(), "15-Adir-01:000.000");
        assert_eq!(clock.earth_timestamp(), "2043-Sep-30  00:00:00 (UT)");
        assert!(!clock.is_paused());
    }

    #[test]
    fn advancing_is_additive() {
        let mut split = clock();
        split.advance(312.5).unwrap();
        split.advance(904.25).unwrap();
        let mut whole = clock();
        whole.advance(1216.75).unwrap();

        assert_eq!(split.mars_time().total_sols(), whole.mars_time().total_sols());
        assert!((split.mars_time().millisol() - whole.mars_time().millisol()).abs() < 1e-9);
        assert_eq!(split.earth_time(), whole.earth_time());
        assert!((split.elapsed() - 1216.75).abs() < 1e-9);
    }

    #[test]
    fn a_sol_on_mars_is_longer_than_a_day_on_earth() {
        let mut clock = clock();
        clock.advance(1000.0).unwrap();
        assert_eq!(clock.mars_time().to_string(), "15-Adir-02:000.000");
        // 88 775.244 s is a day, 39 minutes and 35 seconds.
        assert_eq!(clock.earth_timestamp(), "2043-Oct-01  00:39:35 (UT)");
    }

    #[test]
    fn pausing_stops_time() {
        let mut clock = clock();
        let control = clock.control();
        control.set_paused(true);
        assert!(clock.is_paused());
        assert!(clock.advance(100.0).unwrap().is_none());
        assert!(clock.elapsed().abs() < f64::EPSILON);

        clock.set_paused(false);
        let pulse = clock.advance(100.0).unwrap().unwrap();
        assert!((pulse.elapsed - 100.0).abs() < f64::EPSILON);
        assert!(clock.snapshot().millisol > 99.0);
    }

    #[test]
    fn negative_steps_are_refused() {
        let mut clock = clock();
        assert!(matches!(
            clock.advance(-1.0),
            Err(ClockError::InvalidAdvance { .. })
        ));
        assert!(clock.advance(f64::NAN).is_err());
    }

    #[test]
    fn listeners_hear_every_pulse_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut clock = clock();
        for tag in ["first", "second"] {
            clock.add_listener(Box::new(Recorder {
                tag,
                log: Arc::clone(&log),
            }));
        }
        clock.advance(600.0).unwrap();
        clock.advance(600.0).unwrap();

        let log = log.lock().unwrap();
        assert_eq!(
            *log,
            vec![
                ("first", false),
                ("second", false),
                ("first", true),
                ("second", true)
            ]
        );
    }

    #[test]
    fn bad_configuration_is_reported() {
        let config = ClockConfig {
            earth_seconds_per_millisol: 0.0,
            ..ClockConfig::default()
        };
        assert!(MasterClock::new(&config).is_err());
        let config = ClockConfig {
            mars_start: "15-Adir".to_owned(),
            ..ClockConfig::default()
        };
        assert!(MasterClock::new(&config).is_err());
    }
}
