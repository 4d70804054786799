//! Surface conditions: sunlight and radiation events.
//!
//! Solar irradiance follows a half-sine between local sunrise and sunset
//! (250 and 750 millisols). Radiation events are rolled once per sol from a
//! deterministic hash of the world seed and the sol number, so replays with
//! the same seed see the same storms.

use serde::{Deserialize, Serialize};
use tracing::info;

/// Millisol of local sunrise.
pub const SUNRISE_MILLISOL: f64 = 250.0;

/// Millisol of local sunset.
pub const SUNSET_MILLISOL: f64 = 750.0;

/// Irradiance below which it counts as getting dark, in W/m2.
pub const DARKNESS_THRESHOLD: f64 = 100.0;

/// Per-sol event probabilities and the peak irradiance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceConfig {
    /// Chance of elevated baseline radiation on a given sol.
    pub baseline_radiation_probability: f64,
    /// Chance of a galactic cosmic ray event on a given sol.
    pub gcr_probability: f64,
    /// Chance of a solar energetic particle event on a given sol.
    pub sep_probability: f64,
    /// Chance of a regional dust storm on a given sol.
    pub dust_storm_probability: f64,
    /// Irradiance at local noon on a clear sol, in W/m2.
    pub max_irradiance: f64,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            baseline_radiation_probability: 0.3,
            gcr_probability: 0.05,
            sep_probability: 0.02,
            dust_storm_probability: 0.01,
            max_irradiance: 590.0,
        }
    }
}

/// Conditions at the settlements' location for the current instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SurfaceConditions {
    /// Solar irradiance in W/m2.
    pub irradiance: f64,
    /// Elevated baseline radiation today.
    pub baseline_radiation: bool,
    /// Galactic cosmic ray event today.
    pub gcr_event: bool,
    /// Solar energetic particle event today.
    pub sep_event: bool,
    /// Dust storm today.
    pub dust_storm: bool,
}

impl SurfaceConditions {
    /// Whether the light is too low for surface work.
    pub fn is_getting_dark(&self) -> bool {
        self.irradiance < DARKNESS_THRESHOLD
    }
}

/// Tracks surface conditions as the clock advances.
#[derive(Debug, Clone)]
pub struct SurfaceSystem {
    seed: u64,
    config: SurfaceConfig,
    conditions: SurfaceConditions,
    rolled_sol: Option<u64>,
}

impl SurfaceSystem {
    /// Create a system with no events rolled yet.
    pub const fn new(seed: u64, config: SurfaceConfig) -> Self {
        Self {
            seed,
            config,
            conditions: SurfaceConditions {
                irradiance: 0.0,
                baseline_radiation: false,
                gcr_event: false,
                sep_event: false,
                dust_storm: false,
            },
            rolled_sol: None,
        }
    }

    /// Current conditions.
    pub const fn conditions(&self) -> &SurfaceConditions {
        &self.conditions
    }

    /// The configuration in use.
    pub const fn config(&self) -> &SurfaceConfig {
        &self.config
    }

    /// Override conditions directly. Used by scenario setups.
    pub const fn set_conditions(&mut self, conditions: SurfaceConditions) {
        self.conditions = conditions;
    }

    /// Recompute conditions for a point in time. Events are re-rolled only
    /// when the sol changes.
    pub fn update(&mut self, total_sols: u64, millisol: f64) {
        if self.rolled_sol != Some(total_sols) {
            self.roll_events(total_sols);
            self.rolled_sol = Some(total_sols);
        }
        let mut irradiance = daylight_fraction(millisol) * self.config.max_irradiance;
        if self.conditions.dust_storm {
            irradiance *= 0.25;
        }
        self.conditions.irradiance = irradiance;
    }

    fn roll_events(&mut self, sol: u64) {
        let base = sol.wrapping_mul(4);
        let config = &self.config;
        let roll = |slot: u64| unit_interval(deterministic_random(self.seed, base.wrapping_add(slot)));
        let baseline_radiation = roll(0) < config.baseline_radiation_probability;
        let gcr_event = roll(1) < config.gcr_probability;
        let sep_event = roll(2) < config.sep_probability;
        let dust_storm = roll(3) < config.dust_storm_probability;

        if gcr_event || sep_event || dust_storm {
            info!(sol, gcr_event, sep_event, dust_storm, "surface event");
        }
        self.conditions.baseline_radiation = baseline_radiation;
        self.conditions.gcr_event = gcr_event;
        self.conditions.sep_event = sep_event;
        self.conditions.dust_storm = dust_storm;
    }
}

/// Fraction of noon light at a millisol, zero outside daylight hours.
pub fn daylight_fraction(millisol: f64) -> f64 {
    if !(SUNRISE_MILLISOL..=SUNSET_MILLISOL).contains(&millisol) {
        return 0.0;
    }
    let progress = (millisol - SUNRISE_MILLISOL) / (SUNSET_MILLISOL - SUNRISE_MILLISOL);
    (progress * std::f64::consts::PI).sin().max(0.0)
}

/// `xorshift64` over the seed mixed with a counter.
const fn deterministic_random(seed: u64, counter: u64) -> u64 {
    let mut state = seed.wrapping_add(counter.wrapping_mul(0x9e37_79b9_7f4a_7c15));
    if state == 0 {
        state = 0x2545_f491_4f6c_dd1d;
    }
    state ^= state << 13;
    state ^= state >> 7;
    state ^= state << 17;
    state
}

/// Map the high 32 bits of a random word into `[0, 1)`.
fn unit_interval(random: u64) -> f64 {
    let high = u32::try_from(random >> 32).unwrap_or(u32::MAX);
    f64::from(high) / 4_294_967_296.0
}
