//! Collecting ice from the surface near the settlement.
//!
//! The digger takes a bag, goes outside, fills it until it is full, the
//! shift ends, it gets dark, or a solar particle event starts, then comes
//! back in and stores what they collected. Ice that does not fit in the
//! store is lost.

use marsim_types::{NaturalAttribute, Part, Resource, SettlementId, SkillType};
use tracing::{debug, warn};

use super::airlock::{airlock_walk_ended, enter_phase, exit_phase};
use super::{PhaseOutcome, PhaseStep, SubtaskResult, Task, TaskBehavior, TaskKind, TaskPhase};
use crate::agent::AgentState;
use crate::context::ActionContext;
use crate::error::TaskFault;

const PHASES: &[TaskPhase] = &[
    TaskPhase::ExitAirlock,
    TaskPhase::CollectIce,
    TaskPhase::EnterAirlock,
];

/// Go outside and dig ice.
#[derive(Debug, Clone)]
pub struct DigLocalIce {
    settlement: SettlementId,
    carrying_bag: bool,
    collected: f64,
}

impl DigLocalIce {
    /// Take a bag and head for the airlock. Inapplicable without a bag.
    pub fn create(agent: &AgentState, ctx: &mut ActionContext<'_>) -> Task {
        let mut task = Self {
            settlement: agent.settlement.unwrap_or_default(),
            carrying_bag: false,
            collected: 0.0,
        };
        if !agent.is_person() || !agent.is_inside() {
            return Task::inapplicable(TaskKind::DigLocalIce(task), "Must start inside.");
        }
        let Some(settlement) = ctx.settlement_mut(agent.settlement) else {
            return Task::inapplicable(TaskKind::DigLocalIce(task), "No settlement.");
        };
        if !settlement.inventory.retrieve_parts(Part::Bag, 1, true) {
            return Task::inapplicable(TaskKind::DigLocalIce(task), "No bag available.");
        }
        task.carrying_bag = true;
        Task::new(TaskKind::DigLocalIce(task))
    }

    /// Ice in the bag.
    pub const fn collected(&self) -> f64 {
        self.collected
    }

    fn collect(&mut self, step: PhaseStep, agent: &AgentState, ctx: &ActionContext<'_>) -> PhaseOutcome {
        let surface = ctx.world.surface.conditions();
        if surface.is_getting_dark() || surface.sep_event {
            return PhaseOutcome::PhaseDone { leftover: step.time };
        }
        let tasks = &ctx.rules.tasks;
        let rate = tasks.ice_collection_rate * agent.performance();
        let until_full = (tasks.bag_capacity - self.collected).max(0.0);
        let until_shift_end = (tasks.dig_duration - step.phase_elapsed).max(0.0);
        if rate <= 0.0 || until_full <= 0.0 || until_shift_end <= 0.0 {
            return PhaseOutcome::PhaseDone { leftover: step.time };
        }

        let needed = (until_full / rate).min(until_shift_end);
        if step.time < needed {
            self.collected += step.time * rate;
            return PhaseOutcome::InProgress;
        }
        self.collected += needed * rate;
        PhaseOutcome::PhaseDone {
            leftover: step.time - needed,
        }
    }

    fn deliver(&mut self, agent: &AgentState, ctx: &mut ActionContext<'_>) -> Result<(), TaskFault> {
        let settlement = ctx
            .world
            .settlement_mut(self.settlement)
            .ok_or(TaskFault::SettlementMissing { task: "Dig Local Ice" })?;
        let stored = settlement
            .inventory
            .store(Resource::Ice, self.collected)
            .unwrap_or(0.0);
        settlement.inventory.flows_mut().record_supply(Resource::Ice, stored);
        debug!(agent = %agent.name, collected = self.collected, stored, "ice delivered");
        self.collected = 0.0;
        self.return_bag(ctx);
        Ok(())
    }

    fn return_bag(&mut self, ctx: &mut ActionContext<'_>) {
        if !self.carrying_bag {
            return;
        }
        self.carrying_bag = false;
        if let Some(settlement) = ctx.world.settlement_mut(self.settlement)
            && let Err(source) = settlement.inventory.store_parts(Part::Bag, 1)
        {
            warn!(%source, "bag could not be returned");
        }
    }
}

impl TaskBehavior for DigLocalIce {
    fn name(&self) -> &'static str {
        "Dig Local Ice"
    }

    fn phases(&self) -> &'static [TaskPhase] {
        PHASES
    }

    fn stress_modifier(&self) -> f64 {
        0.05
    }

    fn perform_phase(
        &mut self,
        phase: TaskPhase,
        step: PhaseStep,
        agent: &mut AgentState,
        ctx: &mut ActionContext<'_>,
    ) -> Result<PhaseOutcome, TaskFault> {
        match phase {
            TaskPhase::ExitAirlock => Ok(exit_phase(step, agent)),
            TaskPhase::CollectIce => Ok(self.collect(step, agent, ctx)),
            TaskPhase::EnterAirlock => match enter_phase(step, agent) {
                PhaseOutcome::PhaseDone { leftover } => {
                    self.deliver(agent, ctx)?;
                    Ok(PhaseOutcome::Completed { leftover })
                }
                other => Ok(other),
            },
            _ => Err(TaskFault::UnknownPhase {
                task: self.name(),
                phase,
            }),
        }
    }

    fn add_experience(&self, agent: &mut AgentState, time: f64) {
        let points = time / 100.0 * (1.0 + agent.attributes.modifier(NaturalAttribute::ExperienceAptitude));
        agent.skills.add_experience(SkillType::Areology, points);
        agent.skills.add_experience(SkillType::EvaOperations, points);
    }

    fn release(&mut self, _agent: &mut AgentState, ctx: &mut ActionContext<'_>) {
        self.return_bag(ctx);
    }

    fn subtask_ended(&mut self, subtask: &Task, agent: &AgentState) -> SubtaskResult {
        airlock_walk_ended(subtask, agent)
    }

    fn description(&self) -> String {
        format!("Digging ice ({:.1} kg collected)", self.collected)
    }
}
