//! Physical condition: fatigue, hunger, stress, and performance.
//!
//! Fatigue and hunger are measured in millisols since the agent last slept
//! or ate and grow with the clock. Stress sits in `0..=100` and moves with
//! the stress modifier of whatever task the agent is doing. Performance is
//! derived from all three and scales work output.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Highest stress value.
pub const MAX_STRESS: f64 = 100.0;

/// Rates and thresholds for condition changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConditionConfig {
    /// Fatigue gained per millisol awake.
    pub fatigue_rate: f64,
    /// Hunger gained per millisol.
    pub hunger_rate: f64,
    /// Hunger at which starvation becomes a serious medical problem.
    pub starvation_threshold: f64,
    /// Fatigue at which exhaustion becomes a serious medical problem.
    pub exhaustion_threshold: f64,
}

impl Default for ConditionConfig {
    fn default() -> Self {
        Self {
            fatigue_rate: 1.0,
            hunger_rate: 1.0,
            starvation_threshold: 3000.0,
            exhaustion_threshold: 4000.0,
        }
    }
}

/// One agent's physical condition.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PhysicalCondition {
    /// Millisols since the last sleep.
    pub fatigue: f64,
    /// Millisols since the last meal.
    pub hunger: f64,
    stress: f64,
    medical_problem: Option<String>,
}

impl PhysicalCondition {
    /// A rested, fed, calm agent.
    pub const fn new() -> Self {
        Self {
            fatigue: 0.0,
            hunger: 0.0,
            stress: 0.0,
            medical_problem: None,
        }
    }

    /// Stress in `0..=100`.
    pub const fn stress(&self) -> f64 {
        self.stress
    }

    /// Change stress, clamped to `0..=100`.
    pub fn adjust_stress(&mut self, delta: f64) {
        if delta.is_finite() {
            self.stress = (self.stress + delta).clamp(0.0, MAX_STRESS);
        }
    }

    /// Recover fatigue, never below zero.
    pub fn recover_fatigue(&mut self, amount: f64) {
        if amount > 0.0 {
            self.fatigue = (self.fatigue - amount).max(0.0);
        }
    }

    /// The agent has just eaten.
    pub const fn eat(&mut self) {
        self.hunger = 0.0;
    }

    /// The active serious medical problem, if any.
    pub fn serious_medical_problem(&self) -> Option<&str> {
        self.medical_problem.as_deref()
    }

    /// Whether the agent has a serious medical problem.
    pub const fn has_serious_medical_problem(&self) -> bool {
        self.medical_problem.is_some()
    }

    /// Force a medical problem, e.g. from an accident.
    pub fn set_medical_problem(&mut self, problem: Option<String>) {
        self.medical_problem = problem;
    }

    /// Performance rating in `0..=1`.
    pub fn performance(&self) -> f64 {
        let fatigue_penalty = ((self.fatigue - 1000.0) / 2000.0).max(0.0);
        let hunger_penalty = ((self.hunger - 1000.0) / 4000.0).max(0.0);
        let stress_penalty = self.stress / 200.0;
        (1.0 - fatigue_penalty - hunger_penalty - stress_penalty).clamp(0.0, 1.0)
    }

    /// Let `time` millisols pass.
    pub fn time_passing(&mut self, time: f64, config: &ConditionConfig) {
        if !(time.is_finite() && time > 0.0) {
            return;
        }
        self.fatigue += time * config.fatigue_rate;
        self.hunger += time * config.hunger_rate;

        let problem = if self.hunger >= config.starvation_threshold {
            Some("Starvation")
        } else if self.fatigue >= config.exhaustion_threshold {
            Some("Exhaustion")
        } else {
            None
        };
        match (problem, self.medical_problem.as_deref()) {
            (Some(new), None) => {
                warn!(problem = new, "serious medical problem");
                self.medical_problem = Some(new.to_owned());
            }
            (None, Some("Starvation" | "Exhaustion")) => self.medical_problem = None,
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stress_is_clamped() {
        let mut condition = PhysicalCondition::new();
        condition.adjust_stress(-10.0);
        assert!(condition.stress().abs() < f64::EPSILON);
        condition.adjust_stress(250.0);
        assert!((condition.stress() - MAX_STRESS).abs() < f64::EPSILON);
    }

    #[test]
    fn fresh_agent_performs_fully() {
        assert!((PhysicalCondition::new().performance() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn starvation_comes_and_goes() {
        let config = ConditionConfig::default();
        let mut condition = PhysicalCondition::new();
        condition.time_passing(3000.0, &config);
        assert_eq!(condition.serious_medical_problem(), Some("Starvation"));
        condition.eat();
        condition.fatigue = 0.0;
        condition.time_passing(1.0, &config);
        assert!(!condition.has_serious_medical_problem());
    }

    #[test]
    fn injuries_are_not_cleared_by_eating() {
        let config = ConditionConfig::default();
        let mut condition = PhysicalCondition::new();
        condition.set_medical_problem(Some("Broken leg".to_owned()));
        condition.time_passing(10.0, &config);
        assert_eq!(condition.serious_medical_problem(), Some("Broken leg"));
    }
}
