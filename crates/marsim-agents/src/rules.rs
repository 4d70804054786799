//! Catalogs and tuning shared by every agent, task, and mission.
//!
//! [`SimulationRules`] is built once at startup from configuration and
//! borrowed immutably for the rest of the session.

use marsim_world::{BuildingCatalog, ConstructionCatalog};
use serde::{Deserialize, Serialize};

use crate::condition::ConditionConfig;
use crate::job::JobAffinityTable;
use crate::meta::MetaTaskRegistry;

/// Durations, rates, and amounts used by the concrete tasks.
///
/// Times are in millisols, masses in kg.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskConfig {
    /// Food eaten per meal.
    pub meal_mass: f64,
    /// Time to eat a meal.
    pub eat_duration: f64,
    /// Longest sleep.
    pub sleep_max_duration: f64,
    /// Fatigue recovered per millisol asleep.
    pub sleep_recovery_rate: f64,
    /// Shortest relaxation.
    pub relax_min_duration: f64,
    /// Longest relaxation.
    pub relax_max_duration: f64,
    /// Time to cycle through an airlock.
    pub airlock_cycle_time: f64,
    /// Longest wait for an airlock slot when leaving.
    pub airlock_max_wait: f64,
    /// Ice collected per millisol at full performance.
    pub ice_collection_rate: f64,
    /// Ice one bag holds.
    pub bag_capacity: f64,
    /// Longest time spent collecting ice.
    pub dig_duration: f64,
    /// Base value of a kilogram of ice to an empty store.
    pub ice_value: f64,
    /// Use between services of a vehicle.
    pub maintenance_period: f64,
    /// Work needed for one service.
    pub maintenance_work: f64,
    /// Longest maintenance shift.
    pub maintenance_duration: f64,
    /// Cargo unloaded per millisol with a garage.
    pub unload_rate: f64,
    /// Shortest job review.
    pub review_base_duration: f64,
    /// Extra random review time, drawn from `0..review_random_duration`.
    pub review_random_duration: f64,
    /// Longest construction shift.
    pub construct_duration: f64,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            meal_mass: 0.62,
            eat_duration: 20.0,
            sleep_max_duration: 300.0,
            sleep_recovery_rate: 4.0,
            relax_min_duration: 10.0,
            relax_max_duration: 100.0,
            airlock_cycle_time: 10.0,
            airlock_max_wait: 20.0,
            ice_collection_rate: 1.0,
            bag_capacity: 50.0,
            dig_duration: 250.0,
            ice_value: 0.05,
            maintenance_period: 1000.0,
            maintenance_work: 100.0,
            maintenance_duration: 150.0,
            unload_rate: 10.0,
            review_base_duration: 50.0,
            review_random_duration: 100.0,
            construct_duration: 200.0,
        }
    }
}

/// Tuning for group missions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MissionConfig {
    /// Fewest participants a mission may run with.
    pub min_people: usize,
    /// Most participants a mission may recruit.
    pub max_people: usize,
    /// Time spent preparing a construction site.
    pub site_preparation_time: f64,
    /// Chance that an idle participant is put to work each step.
    pub work_assignment_probability: f64,
    /// Profit that makes a construction mission a sure pick.
    pub construction_profit_scale: f64,
    /// Ended missions kept for display.
    pub ended_history: usize,
}

impl Default for MissionConfig {
    fn default() -> Self {
        Self {
            min_people: 3,
            max_people: 10,
            site_preparation_time: 500.0,
            work_assignment_probability: 0.75,
            construction_profit_scale: 1000.0,
            ended_history: 20,
        }
    }
}

/// Everything immutable an agent or mission consults.
#[derive(Debug, Clone, Default)]
pub struct SimulationRules {
    /// Building types and their storage.
    pub buildings: BuildingCatalog,
    /// Construction stage infos.
    pub construction: ConstructionCatalog,
    /// Job-to-task probability multipliers.
    pub affinities: JobAffinityTable,
    /// Condition rates.
    pub condition: ConditionConfig,
    /// Task tuning.
    pub tasks: TaskConfig,
    /// Mission tuning.
    pub missions: MissionConfig,
    /// Meta tasks agents choose from.
    pub meta: MetaTaskRegistry,
}
