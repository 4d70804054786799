//! Sleeping.

use super::{PhaseOutcome, PhaseStep, Task, TaskBehavior, TaskKind, TaskPhase};
use crate::agent::AgentState;
use crate::context::ActionContext;
use crate::error::TaskFault;

const PHASES: &[TaskPhase] = &[TaskPhase::Sleeping];

/// Sleep until rested or the longest sleep has passed.
#[derive(Debug, Clone, Default)]
pub struct Sleep;

impl Sleep {
    /// Lie down. Inapplicable outside.
    pub fn create(agent: &AgentState) -> Task {
        if !agent.is_inside() {
            return Task::inapplicable(TaskKind::Sleep(Self), "Cannot sleep outside.");
        }
        Task::new(TaskKind::Sleep(Self))
    }
}

impl TaskBehavior for Sleep {
    fn name(&self) -> &'static str {
        "Sleep"
    }

    fn phases(&self) -> &'static [TaskPhase] {
        PHASES
    }

    fn stress_modifier(&self) -> f64 {
        -0.3
    }

    fn perform_phase(
        &mut self,
        phase: TaskPhase,
        step: PhaseStep,
        agent: &mut AgentState,
        ctx: &mut ActionContext<'_>,
    ) -> Result<PhaseOutcome, TaskFault> {
        if phase != TaskPhase::Sleeping {
            return Err(TaskFault::UnknownPhase {
                task: self.name(),
                phase,
            });
        }
        let rate = ctx.rules.tasks.sleep_recovery_rate.max(f64::MIN_POSITIVE);
        let until_rested = agent.condition.fatigue / rate;
        let until_limit = (ctx.rules.tasks.sleep_max_duration - step.phase_elapsed).max(0.0);
        let needed = until_rested.min(until_limit);

        if step.time < needed {
            agent.condition.recover_fatigue(step.time * rate);
            return Ok(PhaseOutcome::InProgress);
        }
        agent.condition.recover_fatigue(needed * rate);
        Ok(PhaseOutcome::Completed {
            leftover: step.time - needed,
        })
    }

    fn description(&self) -> String {
        "Sleeping".to_owned()
    }
}
