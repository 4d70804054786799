//! Reviewing job-change requests.
//!
//! Only settlement leaders review. At the end of the review every settlement
//! member whose latest job record is still pending gets a decision: approved
//! unless the requested job is one their kind cannot hold. The reviewer is
//! a member too, and their own request is decided with the rest.

use std::collections::BTreeMap;

use marsim_types::{AgentId, JobAssignmentStatus, SettlementId};
use rand::Rng;
use tracing::{info, warn};

use super::{PhaseOutcome, PhaseStep, Task, TaskBehavior, TaskKind, TaskPhase};
use crate::agent::{Agent, AgentState};
use crate::context::ActionContext;
use crate::error::TaskFault;

const PHASES: &[TaskPhase] = &[TaskPhase::Reviewing];

/// Members of the reviewer's settlement with a job request awaiting review,
/// the reviewer included. The reviewer is out of `agents` while acting.
pub(crate) fn pending_requests(agents: &BTreeMap<AgentId, Agent>, reviewer: &AgentState) -> usize {
    let Some(settlement) = reviewer.settlement else {
        return 0;
    };
    let others = agents
        .values()
        .filter(|agent| agent.id() != reviewer.id)
        .filter(|agent| agent.state.settlement == Some(settlement) && agent.state.jobs.pending().is_some())
        .count();
    others.saturating_add(usize::from(reviewer.jobs.pending().is_some()))
}

/// Decide the settlement's pending job requests.
#[derive(Debug, Clone)]
pub struct ReviewJobReassignment {
    settlement: SettlementId,
    duration: f64,
    decided: usize,
}

impl ReviewJobReassignment {
    /// Sit down to review. Inapplicable for anyone but a leader.
    pub fn create(agent: &AgentState, ctx: &mut ActionContext<'_>) -> Task {
        let tasks = &ctx.rules.tasks;
        let extra = if tasks.review_random_duration > 0.0 {
            ctx.rng.random_range(0.0..tasks.review_random_duration)
        } else {
            0.0
        };
        let review = Self {
            settlement: agent.settlement.unwrap_or_default(),
            duration: tasks.review_base_duration + extra,
            decided: 0,
        };
        if !agent.role.reviews_job_reassignments() {
            return Task::inapplicable(
                TaskKind::ReviewJobReassignment(review),
                "Only settlement leaders review job requests.",
            );
        }
        if !agent.is_inside() || agent.settlement.is_none() {
            return Task::inapplicable(TaskKind::ReviewJobReassignment(review), "Not inside a settlement.");
        }
        Task::new(TaskKind::ReviewJobReassignment(review))
    }

    /// Requests decided when the review finished.
    pub const fn decided(&self) -> usize {
        self.decided
    }

    fn decide_all(&mut self, reviewer: &mut AgentState, ctx: &mut ActionContext<'_>) {
        let sol = ctx.time.sol;
        let (reviewer_id, reviewer_name) = (reviewer.id, reviewer.name.clone());
        for agent in ctx.agents.values_mut() {
            if agent.state.settlement == Some(self.settlement) && agent.state.id != reviewer_id {
                self.decide(&mut agent.state, reviewer_id, &reviewer_name, sol);
            }
        }
        if reviewer.settlement == Some(self.settlement) {
            self.decide(reviewer, reviewer_id, &reviewer_name, sol);
        }
    }

    fn decide(&mut self, state: &mut AgentState, reviewer_id: AgentId, reviewer_name: &str, sol: u64) {
        let Some(request) = state.jobs.pending() else {
            return;
        };
        let approve = request.job.suits(state.kind);
        match state.jobs.decide(state.id, approve, reviewer_id, sol) {
            Ok(status) => {
                self.decided = self.decided.saturating_add(1);
                if status == JobAssignmentStatus::Rejected {
                    info!(reviewer = %reviewer_name, agent = %state.name, "job request rejected");
                }
            }
            Err(source) => warn!(%source, "job request could not be decided"),
        }
    }
}

impl TaskBehavior for ReviewJobReassignment {
    fn name(&self) -> &'static str {
        "Review Job Reassignment"
    }

    fn phases(&self) -> &'static [TaskPhase] {
        PHASES
    }

    fn stress_modifier(&self) -> f64 {
        -1.0
    }

    fn perform_phase(
        &mut self,
        phase: TaskPhase,
        step: PhaseStep,
        agent: &mut AgentState,
        ctx: &mut ActionContext<'_>,
    ) -> Result<PhaseOutcome, TaskFault> {
        if phase != TaskPhase::Reviewing {
            return Err(TaskFault::UnknownPhase {
                task: self.name(),
                phase,
            });
        }
        let needed = (self.duration - step.phase_elapsed).max(0.0);
        if step.time < needed {
            return Ok(PhaseOutcome::InProgress);
        }
        self.decide_all(agent, ctx);
        Ok(PhaseOutcome::Completed {
            leftover: step.time - needed,
        })
    }

    fn description(&self) -> String {
        "Reviewing job reassignment requests".to_owned()
    }
}
