//! Meta tasks: the selectable kinds of work and how much an agent wants each.
//!
//! A [`MetaTaskKind`] knows when its task is possible and how attractive it
//! is to a given agent right now. The [`MetaTaskRegistry`] lists the kinds
//! on offer and draws one with [`select_weighted`].
//!
//! Probabilities follow one convention: hard conditions give zero; the base
//! value is then scaled by performance, job affinity, and a favorite-activity
//! bonus for work, and by the agent's preference for every kind. The result
//! is never negative.

use marsim_types::{FavoriteActivity, Part, Resource};
use marsim_world::{SUNRISE_MILLISOL, SUNSET_MILLISOL, Settlement};
use serde::{Deserialize, Serialize};

use crate::agent::{AgentState, MAX_PREFERENCE};
use crate::context::ActionContext;
use crate::selection::select_weighted;
use crate::task::maintain_vehicle::due_vehicles;
use crate::task::review_job::pending_requests;
use crate::task::unload_vehicle::loaded_vehicles;
use crate::task::{
    DigLocalIce, EatMeal, MaintainGroundVehicle, Relax, ReviewJobReassignment, Sleep, Task,
    UnloadVehicle,
};

/// Hunger below this never makes anyone eat.
const HUNGER_THRESHOLD: f64 = 250.0;

/// Fatigue below this never makes anyone sleep.
const FATIGUE_THRESHOLD: f64 = 500.0;

/// Relaxation weight with no stress at all.
const RELAX_BASELINE: f64 = 5.0;

/// Weight of a pending job review.
const REVIEW_WEIGHT: f64 = 500.0;

/// Largest contribution of a single vehicle to maintenance or unloading.
const MAINTENANCE_CAP: f64 = 50.0;
const UNLOAD_CAP: f64 = 100.0;

/// A selectable kind of task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetaTaskKind {
    /// Eat a meal.
    EatMeal,
    /// Sleep.
    Sleep,
    /// Relax.
    Relax,
    /// Go out and dig ice.
    DigLocalIce,
    /// Service a ground vehicle.
    MaintainGroundVehicle,
    /// Unload a parked vehicle.
    UnloadVehicle,
    /// Decide pending job requests.
    ReviewJobReassignment,
}

impl MetaTaskKind {
    /// Every kind, in selection order.
    pub const ALL: [Self; 7] = [
        Self::EatMeal,
        Self::Sleep,
        Self::Relax,
        Self::DigLocalIce,
        Self::MaintainGroundVehicle,
        Self::UnloadVehicle,
        Self::ReviewJobReassignment,
    ];

    /// Display name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::EatMeal => "Eat Meal",
            Self::Sleep => "Sleep",
            Self::Relax => "Relax",
            Self::DigLocalIce => "Dig Local Ice",
            Self::MaintainGroundVehicle => "Maintain Ground Vehicle",
            Self::UnloadVehicle => "Unload Vehicle",
            Self::ReviewJobReassignment => "Review Job Reassignment",
        }
    }

    /// Kinds that keep an agent alive and sane. Mission participants pick
    /// only these.
    pub const fn is_personal_care(self) -> bool {
        matches!(self, Self::EatMeal | Self::Sleep | Self::Relax)
    }

    /// Whether a robot may do this.
    pub const fn robot_eligible(self) -> bool {
        matches!(self, Self::MaintainGroundVehicle | Self::UnloadVehicle)
    }

    /// The favorite activity this kind counts as.
    pub const fn favorite_activity(self) -> Option<FavoriteActivity> {
        match self {
            Self::DigLocalIce => Some(FavoriteActivity::FieldWork),
            Self::MaintainGroundVehicle => Some(FavoriteActivity::Tinkering),
            Self::UnloadVehicle | Self::ReviewJobReassignment => Some(FavoriteActivity::Operations),
            Self::EatMeal | Self::Sleep | Self::Relax => None,
        }
    }

    /// How much `agent` wants this task right now. Zero when impossible.
    pub fn probability(self, agent: &AgentState, ctx: &ActionContext<'_>) -> f64 {
        if !agent.is_person() && !self.robot_eligible() {
            return 0.0;
        }
        let Some(settlement) = ctx.settlement(agent.settlement).filter(|_| agent.is_inside()) else {
            return 0.0;
        };
        let mut probability = self.base_probability(agent, settlement, ctx);
        if !(probability.is_finite() && probability > 0.0) {
            return 0.0;
        }

        if !self.is_personal_care() {
            probability *= agent.performance();
            probability *= ctx.rules.affinities.affinity(agent.jobs.active(), self);
            if self.favorite_activity() == Some(agent.favorite) {
                probability *= 2.0;
            }
        }
        let score = f64::from(agent.preference(self));
        probability += probability * score / f64::from(MAX_PREFERENCE);
        probability.max(0.0)
    }

    fn base_probability(self, agent: &AgentState, settlement: &Settlement, ctx: &ActionContext<'_>) -> f64 {
        let condition = &agent.condition;
        match self {
            Self::EatMeal => {
                if !settlement.inventory.has_amount(Resource::Food, ctx.rules.tasks.meal_mass) {
                    return 0.0;
                }
                (condition.hunger - HUNGER_THRESHOLD).max(0.0)
            }
            Self::Sleep => {
                let base = ((condition.fatigue - FATIGUE_THRESHOLD) / 4.0).max(0.0);
                let night = !(SUNRISE_MILLISOL..SUNSET_MILLISOL).contains(&ctx.time.millisol);
                if night { base * 2.0 } else { base }
            }
            Self::Relax => condition.stress().mul_add(2.0, RELAX_BASELINE),
            Self::DigLocalIce => dig_ice_probability(agent, settlement, ctx),
            Self::MaintainGroundVehicle => due_vehicles(ctx.world, settlement.id, ctx.rules.tasks.maintenance_period)
                .map(|vehicle| (vehicle.time_since_maintenance() / 200.0).min(MAINTENANCE_CAP))
                .sum(),
            Self::UnloadVehicle => loaded_vehicles(ctx.world, settlement.id)
                .map(|vehicle| (vehicle.cargo.total_mass() / 10.0).clamp(1.0, UNLOAD_CAP))
                .sum(),
            Self::ReviewJobReassignment => {
                if agent.role.reviews_job_reassignments() && pending_requests(ctx.agents, agent) > 0 {
                    REVIEW_WEIGHT
                } else {
                    0.0
                }
            }
        }
    }

    /// Build the task. The task may come back already ended when it turns
    /// out to be inapplicable.
    pub fn create_task(self, agent: &AgentState, ctx: &mut ActionContext<'_>) -> Task {
        match self {
            Self::EatMeal => EatMeal::create(agent),
            Self::Sleep => Sleep::create(agent),
            Self::Relax => Relax::create(agent, ctx),
            Self::DigLocalIce => DigLocalIce::create(agent, ctx),
            Self::MaintainGroundVehicle => MaintainGroundVehicle::create(agent, ctx),
            Self::UnloadVehicle => UnloadVehicle::create(agent, ctx),
            Self::ReviewJobReassignment => ReviewJobReassignment::create(agent, ctx),
        }
    }
}

/// Ice digging weight: high when the ice store is empty, lowered by stress
/// and fatigue, and cut by radiation.
fn dig_ice_probability(agent: &AgentState, settlement: &Settlement, ctx: &ActionContext<'_>) -> f64 {
    let surface = ctx.world.surface.conditions();
    let inventory = &settlement.inventory;
    if surface.sep_event
        || surface.is_getting_dark()
        || settlement.airlock.airlock_count() == 0
        || !inventory.has_part(Part::EvaSuit)
        || !inventory.has_part(Part::Bag)
    {
        return 0.0;
    }
    let capacity = inventory.capacity(Resource::Ice);
    if capacity <= 0.0 {
        return 0.0;
    }
    let empty_share = (1.0 - inventory.stored(Resource::Ice) / capacity).clamp(0.0, 1.0);
    let value = ctx.rules.tasks.ice_value * empty_share;

    let mut probability =
        value * 4000.0 - agent.condition.stress() - (agent.condition.fatigue - 100.0) / 50.0;
    if probability < 1.0 {
        return 0.0;
    }
    if settlement.is_overcrowded() {
        probability *= 1.5;
    }
    if settlement.population() <= 4 {
        probability *= 1.5;
    }
    if surface.baseline_radiation {
        probability /= 2.0;
    }
    if surface.gcr_event {
        probability /= 4.0;
    }
    probability
}

/// The meta tasks agents choose from, in selection order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetaTaskRegistry {
    kinds: Vec<MetaTaskKind>,
}

impl MetaTaskRegistry {
    /// A registry offering `kinds`, duplicates removed.
    pub fn new(kinds: impl IntoIterator<Item = MetaTaskKind>) -> Self {
        let mut unique = Vec::new();
        for kind in kinds {
            if !unique.contains(&kind) {
                unique.push(kind);
            }
        }
        Self { kinds: unique }
    }

    /// Kinds on offer.
    pub fn kinds(&self) -> &[MetaTaskKind] {
        &self.kinds
    }

    /// Weighted candidates for `agent`, in registry order. With
    /// `personal_care_only` work kinds are left out.
    pub fn candidates(
        &self,
        agent: &AgentState,
        ctx: &ActionContext<'_>,
        personal_care_only: bool,
    ) -> Vec<(MetaTaskKind, f64)> {
        self.kinds
            .iter()
            .filter(|kind| !personal_care_only || kind.is_personal_care())
            .map(|kind| (*kind, kind.probability(agent, ctx)))
            .collect()
    }

    /// Draw a kind for `agent`, or `None` when nothing is wanted.
    pub fn select(&self, agent: &AgentState, ctx: &mut ActionContext<'_>) -> Option<MetaTaskKind> {
        let candidates = self.candidates(agent, ctx, false);
        select_weighted(&candidates, ctx.rng)
    }
}

impl Default for MetaTaskRegistry {
    fn default() -> Self {
        Self::new(MetaTaskKind::ALL)
    }
}
