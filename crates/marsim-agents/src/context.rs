//! The mutable view of the simulation handed to tasks, minds, and missions.
//!
//! While an agent acts it is taken out of the agent map, so
//! [`ActionContext::agents`] holds everyone else. Missions are stepped the
//! same way: the mission being stepped is taken out of the registry.

use std::collections::BTreeMap;

use marsim_types::{AgentId, SettlementId};
use marsim_world::{Settlement, World};
use rand::rngs::StdRng;

use crate::agent::Agent;
use crate::mission::MissionRegistry;
use crate::rules::SimulationRules;

/// Simulated time at the start of the current step.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SimTime {
    /// Millisols elapsed since the session started.
    pub now: f64,
    /// Sols since the Mars calendar epoch.
    pub sol: u64,
    /// Time of day in millisols.
    pub millisol: f64,
}

/// Everything an acting agent or mission may read or change.
#[derive(Debug)]
pub struct ActionContext<'a> {
    /// Settlements, vehicles, surface conditions.
    pub world: &'a mut World,
    /// Every agent not currently acting.
    pub agents: &'a mut BTreeMap<AgentId, Agent>,
    /// Missions not currently being stepped.
    pub missions: &'a mut MissionRegistry,
    /// Catalogs and tuning.
    pub rules: &'a SimulationRules,
    /// The session's seeded random source.
    pub rng: &'a mut StdRng,
    /// Current time.
    pub time: SimTime,
}

impl ActionContext<'_> {
    /// Look up a settlement.
    pub fn settlement(&self, id: Option<SettlementId>) -> Option<&Settlement> {
        id.and_then(|id| self.world.settlement(id))
    }

    /// Look up a settlement mutably.
    pub fn settlement_mut(&mut self, id: Option<SettlementId>) -> Option<&mut Settlement> {
        id.and_then(|id| self.world.settlement_mut(id))
    }
}
