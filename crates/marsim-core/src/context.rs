//! The simulation context: every piece of mutable state in one place.
//!
//! [`SimulationContext`] owns the master clock, the world, the agent map,
//! the mission registry, the rule catalogs, and the session's single seeded
//! random source. The stepping loop borrows it mutably for one step at a
//! time; nothing else holds references into it.

use std::collections::{BTreeMap, BTreeSet};

use marsim_agents::{ActionContext, Agent, MissionRegistry, SimTime, SimulationRules};
use marsim_types::{AgentId, SettlementId, SimulationSnapshot};
use marsim_world::{Settlement, SurfaceSystem, World, WorldError};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::debug;

use crate::clock::{ClockError, MasterClock};
use crate::config::SimulationConfig;

/// Mutable state of a running session.
#[derive(Debug)]
pub struct SimulationContext {
    /// Simulated time.
    pub clock: MasterClock,
    /// Settlements, vehicles, and surface conditions.
    pub world: World,
    /// Every agent, keyed by id.
    pub agents: BTreeMap<AgentId, Agent>,
    /// Active and ended missions.
    pub missions: MissionRegistry,
    /// Catalogs and tuning.
    pub rules: SimulationRules,
    /// The session's only random source.
    pub rng: StdRng,
    steps: u64,
}

impl SimulationContext {
    /// Assemble a context from its parts.
    pub fn new(clock: MasterClock, world: World, rules: SimulationRules, seed: u64) -> Self {
        Self {
            clock,
            world,
            agents: BTreeMap::new(),
            missions: MissionRegistry::new(),
            rules,
            rng: StdRng::seed_from_u64(seed),
            steps: 0,
        }
    }

    /// An empty world at the configured start time. Settlements and agents
    /// are added afterwards.
    pub fn from_config(config: &SimulationConfig) -> Result<Self, ClockError> {
        let clock = MasterClock::new(&config.clock)?;
        let seed = config.simulation.seed;
        let mut world = World::new(SurfaceSystem::new(seed, config.surface.clone()));
        let mars = clock.mars_time();
        world.update_surface(mars.total_sols(), mars.millisol());
        Ok(Self::new(clock, world, config.rules(), seed))
    }

    /// Add a settlement.
    pub fn add_settlement(&mut self, settlement: Settlement) -> SettlementId {
        self.world.add_settlement(settlement)
    }

    /// Add an agent and enrol it in its settlement's roster.
    pub fn add_agent(&mut self, agent: Agent) -> Result<AgentId, WorldError> {
        let id = agent.id();
        if let Some(settlement) = agent.state.settlement {
            self.world.require_settlement_mut(settlement)?.add_member(id);
        }
        debug!(agent = %agent.state.name, %id, "agent added");
        self.agents.insert(id, agent);
        Ok(id)
    }

    /// Look up an agent.
    pub fn agent(&self, id: AgentId) -> Option<&Agent> {
        self.agents.get(&id)
    }

    /// Steps completed so far.
    pub const fn steps(&self) -> u64 {
        self.steps
    }

    pub(crate) const fn record_step(&mut self) -> u64 {
        self.steps = self.steps.saturating_add(1);
        self.steps
    }

    /// Simulated time now.
    pub fn time(&self) -> SimTime {
        let mars = self.clock.mars_time();
        SimTime {
            now: self.clock.elapsed(),
            sol: mars.total_sols(),
            millisol: mars.millisol(),
        }
    }

    /// The order agents act in: settlements by id, each in roster order,
    /// then agents outside any roster by id.
    pub fn acting_order(&self) -> Vec<AgentId> {
        let mut seen = BTreeSet::new();
        let mut order = Vec::with_capacity(self.agents.len());
        for settlement in self.world.settlements() {
            for id in settlement.roster() {
                if self.agents.contains_key(id) && seen.insert(*id) {
                    order.push(*id);
                }
            }
        }
        for id in self.agents.keys() {
            if seen.insert(*id) {
                order.push(*id);
            }
        }
        order
    }

    /// Borrow everything an acting agent or mission may touch.
    pub const fn action_context(&mut self, time: SimTime) -> ActionContext<'_> {
        ActionContext {
            world: &mut self.world,
            agents: &mut self.agents,
            missions: &mut self.missions,
            rules: &self.rules,
            rng: &mut self.rng,
            time,
        }
    }

    /// Display snapshot of the whole session.
    pub fn snapshot(&self) -> SimulationSnapshot {
        SimulationSnapshot {
            step: self.steps,
            clock: self.clock.snapshot(),
            agents: self
                .acting_order()
                .iter()
                .filter_map(|id| self.agents.get(id))
                .map(Agent::snapshot)
                .collect(),
            missions: self.missions.snapshots(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use marsim_agents::{AgentManager, AgentSeed};
    use marsim_types::{JobKind, RoleType};

    use super::*;

    fn context() -> SimulationContext {
        SimulationContext::from_config(&SimulationConfig::default()).unwrap()
    }

    #[test]
    fn agents_act_in_roster_order() {
        let mut ctx = context();
        let first = ctx.add_settlement(Settlement::new("Alpha Base"));
        let second = ctx.add_settlement(Settlement::new("Beta Base"));
        let mut manager = AgentManager::new();

        let mut added = Vec::new();
        for (name, home) in [("Reyes", second), ("Okafor", first), ("Sato", second)] {
            let seed = AgentSeed {
                name: name.to_owned(),
                role: RoleType::CrewEngineer,
                job: Some(JobKind::Engineer),
            };
            let agent = manager.create_person(&seed, home, 1, &mut ctx.rng).unwrap();
            added.push((ctx.add_agent(agent).unwrap(), home));
        }

        let order = ctx.acting_order();
        assert_eq!(order.len(), 3);
        // Each settlement keeps its members in the order they arrived.
        let by_home = |home: SettlementId| -> Vec<AgentId> {
            order
                .iter()
                .copied()
                .filter(|id| added.iter().any(|(agent, at)| agent == id && *at == home))
                .collect()
        };
        assert_eq!(by_home(second), vec![added.first().unwrap().0, added.last().unwrap().0]);
        assert_eq!(ctx.world.settlement(first).unwrap().population(), 1);
        assert_eq!(ctx.snapshot().agents.len(), 3);
    }

    #[test]
    fn agents_need_a_known_settlement() {
        let mut ctx = context();
        let mut manager = AgentManager::new();
        let agent = manager
            .create_robot("Unit 1", JobKind::ConstructionBot, SettlementId::new(), 1)
            .unwrap();
        assert!(matches!(
            ctx.add_agent(agent),
            Err(WorldError::SettlementNotFound(_))
        ));
        assert!(ctx.agents.is_empty());
    }

    #[test]
    fn a_fresh_context_snapshot_is_at_the_start_time() {
        let ctx = context();
        let snapshot = ctx.snapshot();
        assert_eq!(snapshot.step, 0);
        assert_eq!(snapshot.clock.mars_timestamp, "15-Adir-01:000.000");
        assert!(snapshot.agents.is_empty());
        assert!(snapshot.missions.is_empty());
        assert!(ctx.time().now.abs() < f64::EPSILON);

        let json = serde_json::to_value(&snapshot).unwrap();
        let paused = json.get("clock").and_then(|clock| clock.get("paused"));
        assert_eq!(paused, Some(&serde_json::Value::Bool(false)));
    }
}
