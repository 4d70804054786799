//! Clocks, configuration, and the stepping loop of the Mars colony simulation.
//!
//! This crate owns simulated time and drives everything else: each step it
//! advances the [`MasterClock`], updates surface conditions, lets every
//! agent act in settlement roster order, steps missions, and audits the
//! settlement inventories.
//!
//! # Modules
//!
//! - [`clock`] -- Mars and Earth time and the [`MasterClock`].
//! - [`config`] -- YAML configuration ([`SimulationConfig`]).
//! - [`context`] -- The [`SimulationContext`] owning all mutable state.
//! - [`control`] -- Shared pause/stop/pace state ([`SimulationControl`]).
//! - [`runner`] -- The async loop around single steps.
//! - [`step`] -- One simulation step ([`run_step`]).

pub mod clock;
pub mod config;
pub mod context;
pub mod control;
pub mod runner;
pub mod step;

pub use clock::{ClockError, ClockListener, ClockPulse, EarthClock, MarsClock, MasterClock};
pub use config::{ConfigError, SimulationConfig};
pub use context::SimulationContext;
pub use control::{SimulationControl, SimulationEndReason};
pub use runner::{RunnerError, SimulationResult, StepCallback, run_simulation};
pub use step::{StepError, StepSummary, run_step};
