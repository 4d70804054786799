//! One simulation step: the phases every pulse of the master clock runs.
//!
//! 1. **Clock** -- advance the [`MasterClock`](crate::clock::MasterClock).
//!    A paused clock ends the step early with no effect.
//! 2. **Surface** -- recompute daylight, dust storms, and radiation. On the
//!    first step of a new sol, reset each settlement's daily supply and
//!    demand statistics.
//! 3. **Agents** -- settlements in id order, each agent in roster order:
//!    physical condition ages, then the agent's mind spends the step's time
//!    on tasks. The acting agent is taken out of the agent map so it can
//!    read and change everyone else.
//! 4. **Missions** -- each active mission performs its phase.
//! 5. **Audit** -- every settlement inventory is checked against its
//!    capacities. Anomalies are logged, never repaired.
//!
//! A fault inside one agent's task or one mission ends that task or mission
//! and is logged; it never aborts the step.

use marsim_agents::step_missions;
use marsim_ledger::AuditResult;
use marsim_ledger::audit::audit;
use marsim_types::SettlementId;
use tracing::{debug, info, warn};

use crate::clock::ClockError;
use crate::context::SimulationContext;

/// Errors that abort a step.
#[derive(Debug, thiserror::Error)]
pub enum StepError {
    /// The clock refused to advance.
    #[error("clock error: {source}")]
    Clock {
        /// The underlying clock error.
        #[from]
        source: ClockError,
    },
}

/// What one step did.
#[derive(Debug, Clone, PartialEq)]
pub struct StepSummary {
    /// The step number that was executed.
    pub step: u64,
    /// Sols since the Mars calendar epoch after the step.
    pub sol: u64,
    /// Time of day after the step.
    pub millisol: f64,
    /// Whether the step crossed into a new sol.
    pub new_sol: bool,
    /// Agents that acted.
    pub agents_acted: usize,
    /// Agents that found nothing to do for the whole step.
    pub agents_idle: usize,
    /// Missions still active after the step.
    pub missions_active: usize,
    /// Missions that ended during the step.
    pub missions_ended: usize,
    /// Settlements whose inventory failed the audit, with the reason.
    pub anomalies: Vec<(SettlementId, String)>,
}

/// Advance the simulation by `delta` millisols.
///
/// Returns `None` when the clock is paused.
///
/// # Errors
///
/// Returns [`StepError`] if the clock cannot advance by `delta`.
pub fn run_step(ctx: &mut SimulationContext, delta: f64) -> Result<Option<StepSummary>, StepError> {
    let time = ctx.time();

    // --- Phase 1: Clock ---
    let Some(pulse) = ctx.clock.advance(delta)? else {
        debug!("clock paused, step skipped");
        return Ok(None);
    };
    let step = ctx.record_step();

    // --- Phase 2: Surface ---
    ctx.world.update_surface(pulse.sol, pulse.millisol);
    if pulse.new_sol {
        for settlement in ctx.world.settlements_mut() {
            settlement.inventory.flows_mut().reset();
        }
        info!(step, sol = pulse.sol, mars = %ctx.clock.mars_time(), "new sol");
    }

    // --- Phase 3: Agents ---
    let mut agents_acted = 0_usize;
    let mut agents_idle = 0_usize;
    for id in ctx.acting_order() {
        let Some(mut agent) = ctx.agents.remove(&id) else {
            warn!(%id, "agent vanished before acting");
            continue;
        };
        agent.state.time_passing(delta, &ctx.rules.condition);
        let leftover = {
            let mut action = ctx.action_context(time);
            agent.mind.take_action(&mut agent.state, delta, &mut action)
        };
        agents_acted = agents_acted.saturating_add(1);
        if leftover >= delta && delta > 0.0 {
            agents_idle = agents_idle.saturating_add(1);
        }
        ctx.agents.insert(id, agent);
    }

    // --- Phase 4: Missions ---
    let missions_ended = {
        let mut action = ctx.action_context(time);
        step_missions(&mut action)
    };

    // --- Phase 5: Audit ---
    let mut anomalies = Vec::new();
    for settlement in ctx.world.settlements() {
        if let AuditResult::Anomaly(anomaly) = audit(&settlement.inventory) {
            warn!(
                step,
                settlement = %settlement.name,
                violations = anomaly.violations.len(),
                %anomaly,
                "inventory anomaly"
            );
            anomalies.push((settlement.id, anomaly.message));
        }
    }

    let summary = StepSummary {
        step,
        sol: pulse.sol,
        millisol: pulse.millisol,
        new_sol: pulse.new_sol,
        agents_acted,
        agents_idle,
        missions_active: ctx.missions.len(),
        missions_ended,
        anomalies,
    };
    debug!(
        step,
        mars = %ctx.clock.mars_time(),
        agents_acted,
        agents_idle,
        missions_active = summary.missions_active,
        missions_ended,
        "step complete"
    );
    Ok(Some(summary))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use marsim_agents::{AgentManager, AgentSeed, MetaTaskRegistry};
    use marsim_types::{JobKind, Resource, RoleType};
    use marsim_world::Settlement;

    use super::*;
    use crate::config::SimulationConfig;

    fn context(meta: MetaTaskRegistry) -> (SimulationContext, SettlementId) {
        let mut ctx = SimulationContext::from_config(&SimulationConfig::default()).unwrap();
        ctx.rules.meta = meta;
        let mut settlement = Settlement::new("Schiaparelli Point");
        for building in ["Lander Hab", "Storage Shed"] {
            settlement.add_building(building, &ctx.rules.buildings).unwrap();
        }
        let base = ctx.add_settlement(settlement);
        (ctx, base)
    }

    fn add_crew(ctx: &mut SimulationContext, base: SettlementId, name: &str) {
        let seed = AgentSeed {
            name: name.to_owned(),
            role: RoleType::CrewEngineer,
            job: Some(JobKind::Engineer),
        };
        let agent = AgentManager::new()
            .create_person(&seed, base, 1, &mut ctx.rng)
            .unwrap();
        ctx.add_agent(agent).unwrap();
    }

    #[test]
    fn a_step_advances_time_and_counts() {
        let (mut ctx, base) = context(MetaTaskRegistry::default());
        add_crew(&mut ctx, base, "Reyes");
        let summary = run_step(&mut ctx, 10.0).unwrap().unwrap();
        assert_eq!(summary.step, 1);
        assert_eq!(summary.agents_acted, 1);
        assert!(summary.anomalies.is_empty());
        assert_eq!(ctx.steps(), 1);
        assert!((ctx.clock.elapsed() - 10.0).abs() < 1e-9);
        assert_eq!(ctx.agents.len(), 1);
    }

    #[test]
    fn agents_with_nothing_to_do_stay_idle() {
        let (mut ctx, base) = context(MetaTaskRegistry::new([]));
        add_crew(&mut ctx, base, "Reyes");
        add_crew(&mut ctx, base, "Okafor");
        let summary = run_step(&mut ctx, 10.0).unwrap().unwrap();
        assert_eq!(summary.agents_idle, 2);
        assert!(ctx.agents.values().all(|agent| agent.mind.task().is_none()));
    }

    #[test]
    fn a_paused_clock_skips_the_step() {
        let (mut ctx, base) = context(MetaTaskRegistry::default());
        add_crew(&mut ctx, base, "Reyes");
        ctx.clock.set_paused(true);
        assert!(run_step(&mut ctx, 10.0).unwrap().is_none());
        assert_eq!(ctx.steps(), 0);
        assert!(ctx.clock.elapsed().abs() < f64::EPSILON);
    }

    #[test]
    fn invalid_steps_are_errors() {
        let (mut ctx, _) = context(MetaTaskRegistry::default());
        assert!(matches!(
            run_step(&mut ctx, -5.0),
            Err(StepError::Clock { .. })
        ));
    }

    #[test]
    fn a_new_sol_resets_daily_flows() {
        let (mut ctx, base) = context(MetaTaskRegistry::new([]));
        ctx.world
            .settlement_mut(base)
            .unwrap()
            .inventory
            .flows_mut()
            .record_demand(Resource::Water, 5.0);

        let summary = run_step(&mut ctx, 1000.0).unwrap().unwrap();
        assert!(summary.new_sol);
        let flow = ctx
            .world
            .settlement(base)
            .unwrap()
            .inventory
            .flows()
            .flow(Resource::Water);
        assert_eq!(flow.demand_count, 0);
        assert!(flow.demand_amount.abs() < f64::EPSILON);
    }
}
