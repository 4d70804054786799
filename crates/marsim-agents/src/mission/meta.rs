//! Mission kinds an agent can choose to start, and how attractive each is.

use marsim_types::{Part, SkillType};
use marsim_world::ConstructionSite;
use serde::{Deserialize, Serialize};

use super::{BuildingConstructionMission, MissionKind};
use crate::agent::AgentState;
use crate::context::ActionContext;

/// A mission an agent may start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetaMissionKind {
    /// Build the next construction stage at the agent's settlement.
    BuildingConstruction,
}

impl MetaMissionKind {
    /// Every mission kind, in selection order.
    pub const ALL: [Self; 1] = [Self::BuildingConstruction];

    /// Display name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::BuildingConstruction => "Building Construction",
        }
    }

    /// Selection weight for `agent` starting this mission now.
    ///
    /// Takes the context mutably because it fills the settlement's
    /// construction value cache.
    pub fn probability(self, agent: &AgentState, ctx: &mut ActionContext<'_>) -> f64 {
        match self {
            Self::BuildingConstruction => construction_probability(agent, ctx),
        }
    }

    /// Start the mission with `agent` as starter. The result may already
    /// have ended if it could not get going.
    pub fn start(self, agent: &mut AgentState, ctx: &mut ActionContext<'_>) -> MissionKind {
        match self {
            Self::BuildingConstruction => {
                MissionKind::BuildingConstruction(BuildingConstructionMission::start(agent, ctx))
            }
        }
    }
}

/// Best construction profit at the agent's settlement over the profit
/// scale. Zero when a crew, suits, attachments, or a utility vehicle are
/// lacking, or a construction mission is already running there.
fn construction_probability(agent: &AgentState, ctx: &mut ActionContext<'_>) -> f64 {
    if !agent.is_person() || !agent.is_inside() || agent.mission.is_some() {
        return 0.0;
    }
    let Some(id) = agent.settlement else {
        return 0.0;
    };
    let rules = ctx.rules;
    let busy = ctx
        .missions
        .active_at(id)
        .any(|mission| matches!(mission, MissionKind::BuildingConstruction(_)));
    if busy || ctx.world.available_utility_vehicle(id).is_none() {
        return 0.0;
    }
    let Some(settlement) = ctx.world.settlement_mut(id) else {
        return 0.0;
    };

    let crew = rules.missions.min_people;
    let suits = usize::try_from(settlement.inventory.part_count(Part::EvaSuit)).unwrap_or(usize::MAX);
    let attachments = Part::ATTACHMENTS
        .iter()
        .any(|part| settlement.inventory.has_part(*part));
    if suits < crew || settlement.population() < crew || !attachments {
        return 0.0;
    }

    let skill = agent.skills.skill_level(SkillType::Construction);
    let open_sites: Vec<ConstructionSite> = settlement
        .sites()
        .iter()
        .filter(|site| !site.is_under_construction() && !site.is_all_construction_complete())
        .cloned()
        .collect();
    let values = &mut settlement.construction_values;
    let inventory = &settlement.inventory;
    let profit = open_sites.iter().fold(
        values.new_site_profit(&rules.construction, inventory, skill),
        |best, site| best.max(values.site_profit(site, &rules.construction, inventory, skill)),
    );

    let scale = rules.missions.construction_profit_scale;
    if scale > 0.0 { (profit / scale).max(0.0) } else { 0.0 }
}
