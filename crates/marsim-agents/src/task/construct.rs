//! Working on a construction mission's current stage.
//!
//! Assigned by the mission, never chosen by the selector. The builder goes
//! outside and adds work until the stage is done, the mission stops
//! building, or the shift ends.

use marsim_types::{MissionId, NaturalAttribute, SettlementId, SiteId, SkillType};
use tracing::debug;

use super::airlock::{airlock_walk_ended, enter_phase, exit_phase};
use super::{PhaseOutcome, PhaseStep, SubtaskResult, Task, TaskBehavior, TaskKind, TaskPhase};
use crate::agent::AgentState;
use crate::context::ActionContext;
use crate::error::TaskFault;
use crate::mission::MissionPhase;

const PHASES: &[TaskPhase] = &[
    TaskPhase::ExitAirlock,
    TaskPhase::Construct,
    TaskPhase::EnterAirlock,
];

/// Extra work per construction skill level.
const SKILL_BONUS: f64 = 0.1;

/// Build on a mission's site.
#[derive(Debug, Clone)]
pub struct ConstructBuilding {
    mission: MissionId,
    settlement: SettlementId,
    site: SiteId,
    work_done: f64,
}

impl ConstructBuilding {
    /// Start building. Inapplicable unless the agent is inside.
    pub fn create(agent: &AgentState, mission: MissionId, settlement: SettlementId, site: SiteId) -> Task {
        let task = Self {
            mission,
            settlement,
            site,
            work_done: 0.0,
        };
        if !agent.is_inside() {
            return Task::inapplicable(TaskKind::ConstructBuilding(task), "Must start inside.");
        }
        Task::new(TaskKind::ConstructBuilding(task))
    }

    /// The mission this work is for.
    pub const fn mission(&self) -> MissionId {
        self.mission
    }

    /// Work added so far.
    pub const fn work_done(&self) -> f64 {
        self.work_done
    }

    fn construct(&mut self, step: PhaseStep, agent: &AgentState, ctx: &mut ActionContext<'_>) -> PhaseOutcome {
        let building = ctx
            .missions
            .get(self.mission)
            .is_some_and(|mission| !mission.is_ended() && mission.phase() == Some(MissionPhase::Construction));
        let until_shift_end = (ctx.rules.tasks.construct_duration - step.phase_elapsed).max(0.0);
        if !building || until_shift_end <= 0.0 {
            return PhaseOutcome::PhaseDone { leftover: step.time };
        }

        let skill = agent.skills.effective_skill_level(SkillType::Construction, agent.performance());
        let rate = agent.performance() * SKILL_BONUS.mul_add(f64::from(skill), 1.0);
        let Some(stage) = ctx
            .world
            .settlement_mut(self.settlement)
            .and_then(|settlement| settlement.site_mut(self.site))
            .and_then(|site| site.current_stage_mut())
        else {
            return PhaseOutcome::Blocked {
                reason: "Construction site is gone.".to_owned(),
            };
        };
        if stage.is_complete() || rate <= 0.0 {
            return PhaseOutcome::PhaseDone { leftover: step.time };
        }

        let needed = (stage.remaining_work() / rate).min(until_shift_end);
        if step.time < needed {
            stage.add_work(step.time * rate);
            self.work_done += step.time * rate;
            return PhaseOutcome::InProgress;
        }
        stage.add_work(needed * rate);
        self.work_done += needed * rate;
        if stage.is_complete() {
            debug!(agent = %agent.name, stage = %stage.info.name, "stage work finished");
        }
        PhaseOutcome::PhaseDone {
            leftover: step.time - needed,
        }
    }
}

impl TaskBehavior for ConstructBuilding {
    fn name(&self) -> &'static str {
        "Construct Building"
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
            TaskPhase::Construct => Ok(self.construct(step, agent, ctx)),
            TaskPhase::EnterAirlock => Ok(enter_phase(step, agent)),
            _ => Err(TaskFault::UnknownPhase {
                task: self.name(),
                phase,
            }),
        }
    }

    fn add_experience(&self, agent: &mut AgentState, time: f64) {
        let points = time / 100.0 * (1.0 + agent.attributes.modifier(NaturalAttribute::ExperienceAptitude));
        agent.skills.add_experience(SkillType::Construction, points);
        agent.skills.add_experience(SkillType::EvaOperations, points / 2.0);
    }

    fn subtask_ended(&mut self, subtask: &Task, agent: &AgentState) -> SubtaskResult {
        airlock_walk_ended(subtask, agent)
    }

    fn description(&self) -> String {
        format!("Constructing ({:.0} work done)", self.work_done)
    }
}
