//! Relaxing.

use rand::Rng;

use super::{PhaseOutcome, PhaseStep, Task, TaskBehavior, TaskKind, TaskPhase};
use crate::agent::AgentState;
use crate::context::ActionContext;
use crate::error::TaskFault;

const PHASES: &[TaskPhase] = &[TaskPhase::Relaxing];

/// Unwind for a random while.
#[derive(Debug, Clone)]
pub struct Relax {
    duration: f64,
}

impl Relax {
    /// Pick a duration and start relaxing.
    pub fn create(agent: &AgentState, ctx: &mut ActionContext<'_>) -> Task {
        let tasks = &ctx.rules.tasks;
        let (low, high) = (tasks.relax_min_duration, tasks.relax_max_duration.max(tasks.relax_min_duration));
        let duration = if high > low {
            ctx.rng.random_range(low..high)
        } else {
            low
        };
        let relax = Self { duration };
        if !agent.is_inside() {
            return Task::inapplicable(TaskKind::Relax(relax), "Cannot relax outside.");
        }
        Task::new(TaskKind::Relax(relax))
    }

    /// Planned length in millisols.
    pub const fn duration(&self) -> f64 {
        self.duration
    }
}

impl TaskBehavior for Relax {
    fn name(&self) -> &'static str {
        "Relax"
    }

    fn phases(&self) -> &'static [TaskPhase] {
        PHASES
    }

    fn stress_modifier(&self) -> f64 {
        -0.5
    }

    fn perform_phase(
        &mut self,
        phase: TaskPhase,
        step: PhaseStep,
        _agent: &mut AgentState,
        _ctx: &mut ActionContext<'_>,
    ) -> Result<PhaseOutcome, TaskFault> {
        if phase != TaskPhase::Relaxing {
            return Err(TaskFault::UnknownPhase {
                task: self.name(),
                phase,
            });
        }
        let needed = (self.duration - step.phase_elapsed).max(0.0);
        if step.time < needed {
            return Ok(PhaseOutcome::InProgress);
        }
        Ok(PhaseOutcome::Completed {
            leftover: step.time - needed,
        })
    }

    fn description(&self) -> String {
        "Relaxing".to_owned()
    }
}
