//! The per-agent controller.
//!
//! A [`Mind`] owns at most one active [`Task`]. Each step it is handed a
//! time budget: when idle it draws a new task (or a mission to start) from
//! one weighted list, then forwards the time to the task. Time left over by
//! a task that ends mid-step goes to the next selection within the same
//! call. A task that faults is ended with the fault as its reason and the
//! agent carries on.

use tracing::{debug, warn};

use crate::agent::AgentState;
use crate::context::ActionContext;
use crate::meta::MetaTaskKind;
use crate::mission::MetaMissionKind;
use crate::selection::select_weighted;
use crate::task::Task;

/// Most selections or task runs one [`Mind::take_action`] call may make.
pub const MAX_ACTION_ITERATIONS: u32 = 64;

/// Remaining time below this is treated as spent.
const TIME_EPSILON: f64 = 1e-9;

/// One entry in the combined selection list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Candidate {
    Task(MetaTaskKind),
    Mission(MetaMissionKind),
}

/// What a selection produced.
#[derive(Debug)]
enum Choice {
    /// A task to run. May already be ended if it turned out inapplicable.
    Task(Task),
    /// A mission start was attempted; no time was used.
    Mission {
        /// Whether the mission got going.
        started: bool,
    },
    /// Nothing is wanted right now.
    Idle,
}

/// Controller holding an agent's active task.
#[derive(Debug, Clone, Default)]
pub struct Mind {
    task: Option<Task>,
}

impl Mind {
    /// An idle mind.
    pub const fn new() -> Self {
        Self { task: None }
    }

    /// The active task.
    pub const fn task(&self) -> Option<&Task> {
        self.task.as_ref()
    }

    /// Whether no task is running.
    pub fn is_idle(&self) -> bool {
        self.task.as_ref().is_none_or(Task::is_ended)
    }

    /// Hand the mind a task. Only used on an idle mind; a running task must
    /// be ended with [`Mind::end_task`] first.
    pub fn assign_task(&mut self, task: Task) {
        if !self.is_idle() {
            warn!(
                replaced = self.task.as_ref().map(Task::name).unwrap_or_default(),
                "task assigned over a running task"
            );
        }
        self.task = Some(task);
    }

    /// End the active task, releasing what it holds.
    pub fn end_task(&mut self, agent: &mut AgentState, ctx: &mut ActionContext<'_>, reason: Option<String>) {
        if let Some(mut task) = self.task.take() {
            task.end_task(agent, ctx, reason);
        }
    }

    /// Spend `time` millisols acting. Returns the time nothing wanted.
    pub fn take_action(&mut self, agent: &mut AgentState, time: f64, ctx: &mut ActionContext<'_>) -> f64 {
        let mut remaining = time.max(0.0);
        let mut missions_allowed = true;
        let mut iterations = 0_u32;

        while remaining > TIME_EPSILON {
            iterations = iterations.saturating_add(1);
            if iterations > MAX_ACTION_ITERATIONS {
                warn!(agent = %agent.name, remaining, "action loop did not settle");
                break;
            }

            if self.is_idle() {
                self.task = None;
                match choose(agent, ctx, missions_allowed) {
                    Choice::Task(task) => {
                        if !task.is_ended() {
                            debug!(agent = %agent.name, task = task.name(), "task selected");
                            self.task = Some(task);
                        }
                        continue;
                    }
                    Choice::Mission { started } => {
                        missions_allowed &= started;
                        continue;
                    }
                    Choice::Idle => break,
                }
            }

            let Some(task) = self.task.as_mut() else {
                break;
            };
            match task.perform(agent, remaining, ctx) {
                Ok(leftover) => {
                    let leftover = leftover.clamp(0.0, remaining);
                    task.add_experience(agent, remaining - leftover);
                    remaining = leftover;
                }
                Err(fault) => {
                    warn!(agent = %agent.name, task = task.name(), %fault, "task fault");
                    task.end_task(agent, ctx, Some(fault.to_string()));
                }
            }
            if task.is_ended() {
                self.task = None;
            }
        }
        remaining
    }
}

/// Draw one task or mission for `agent`. On a mission only personal care
/// is offered, and no new mission.
fn choose(agent: &mut AgentState, ctx: &mut ActionContext<'_>, missions_allowed: bool) -> Choice {
    let rules = ctx.rules;
    let on_mission = agent.mission.is_some();
    let mut candidates: Vec<(Candidate, f64)> = rules
        .meta
        .candidates(agent, ctx, on_mission)
        .into_iter()
        .map(|(kind, weight)| (Candidate::Task(kind), weight))
        .collect();
    if missions_allowed && agent.is_person() && !on_mission {
        for kind in MetaMissionKind::ALL {
            let weight = kind.probability(agent, ctx);
            candidates.push((Candidate::Mission(kind), weight));
        }
    }

    match select_weighted(&candidates, ctx.rng) {
        None => Choice::Idle,
        Some(Candidate::Task(kind)) => Choice::Task(kind.create_task(agent, ctx)),
        Some(Candidate::Mission(kind)) => {
            let mission = kind.start(agent, ctx);
            let started = !mission.is_ended();
            if started {
                ctx.missions.insert(mission);
            } else {
                debug!(
                    agent = %agent.name,
                    mission = kind.name(),
                    reason = mission.end_reason().unwrap_or_default(),
                    "mission did not start"
                );
            }
            Choice::Mission { started }
        }
    }
}
