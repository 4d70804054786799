//! Walking through an airlock.
//!
//! Only ever run as a subtask of an EVA task. The walker waits for a slot,
//! cycles the airlock, and comes out on the other side wearing (or having
//! returned) an EVA suit. Leaving gives up after a bounded wait; coming
//! back in waits as long as it takes.

use marsim_types::{LocationSituation, Part, SettlementId};
use tracing::warn;

use super::{PhaseOutcome, PhaseStep, SubtaskResult, Task, TaskBehavior, TaskKind, TaskPhase};
use crate::agent::AgentState;
use crate::context::ActionContext;
use crate::error::TaskFault;

const PHASES: &[TaskPhase] = &[TaskPhase::AwaitSlot, TaskPhase::Cycle];

/// Which way the walker is going.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AirlockDirection {
    /// From the settlement to the surface.
    Exit,
    /// From the surface into the settlement.
    Enter,
}

/// Cycle through the home settlement's airlock.
#[derive(Debug, Clone)]
pub struct WalkThroughAirlock {
    direction: AirlockDirection,
    settlement: SettlementId,
    holding_slot: bool,
}

impl WalkThroughAirlock {
    /// Start walking out.
    pub fn exit(agent: &AgentState) -> Task {
        Self::create(agent, AirlockDirection::Exit)
    }

    /// Start walking in.
    pub fn enter(agent: &AgentState) -> Task {
        Self::create(agent, AirlockDirection::Enter)
    }

    fn create(agent: &AgentState, direction: AirlockDirection) -> Task {
        match agent.settlement {
            Some(settlement) => Task::new(TaskKind::WalkThroughAirlock(Self {
                direction,
                settlement,
                holding_slot: false,
            })),
            None => Task::inapplicable(
                TaskKind::WalkThroughAirlock(Self {
                    direction,
                    settlement: SettlementId::default(),
                    holding_slot: false,
                }),
                "No settlement airlock.",
            ),
        }
    }

    /// Which way the walker is going.
    pub const fn direction(&self) -> AirlockDirection {
        self.direction
    }

    fn await_slot(
        &mut self,
        step: PhaseStep,
        agent: &AgentState,
        ctx: &mut ActionContext<'_>,
    ) -> Result<PhaseOutcome, TaskFault> {
        let max_wait = ctx.rules.tasks.airlock_max_wait;
        let settlement = ctx
            .world
            .settlement_mut(self.settlement)
            .ok_or(TaskFault::SettlementMissing { task: self.name() })?;

        let leaving = self.direction == AirlockDirection::Exit;
        if leaving
            && agent.is_person()
            && !agent.wearing_suit
            && !settlement.inventory.has_part(Part::EvaSuit)
        {
            return Ok(PhaseOutcome::Blocked {
                reason: "No EVA suit available.".to_owned(),
            });
        }
        if settlement.airlock.try_acquire(agent.id) {
            self.holding_slot = true;
            return Ok(PhaseOutcome::PhaseDone { leftover: step.time });
        }
        if leaving && step.phase_elapsed + step.time >= max_wait {
            return Ok(PhaseOutcome::Blocked {
                reason: "No airlock slot available.".to_owned(),
            });
        }
        Ok(PhaseOutcome::InProgress)
    }

    fn cycle(
        &mut self,
        step: PhaseStep,
        agent: &mut AgentState,
        ctx: &mut ActionContext<'_>,
    ) -> Result<PhaseOutcome, TaskFault> {
        let needed = (ctx.rules.tasks.airlock_cycle_time - step.phase_elapsed).max(0.0);
        if step.time < needed {
            return Ok(PhaseOutcome::InProgress);
        }
        let settlement = ctx
            .world
            .settlement_mut(self.settlement)
            .ok_or(TaskFault::SettlementMissing { task: self.name() })?;

        match self.direction {
            AirlockDirection::Exit => {
                if agent.is_person() && !agent.wearing_suit {
                    if !settlement.inventory.retrieve_parts(Part::EvaSuit, 1, true) {
                        return Ok(PhaseOutcome::Blocked {
                            reason: "No EVA suit available.".to_owned(),
                        });
                    }
                    agent.wearing_suit = true;
                }
                agent.location = LocationSituation::Outside;
            }
            AirlockDirection::Enter => {
                if agent.wearing_suit {
                    if let Err(source) = settlement.inventory.store_parts(Part::EvaSuit, 1) {
                        warn!(agent = %agent.name, %source, "EVA suit could not be stowed");
                    }
                    agent.wearing_suit = false;
                }
                agent.location = LocationSituation::InSettlement;
            }
        }
        settlement.airlock.release(agent.id);
        self.holding_slot = false;
        Ok(PhaseOutcome::Completed {
            leftover: step.time - needed,
        })
    }
}

impl TaskBehavior for WalkThroughAirlock {
    fn name(&self) -> &'static str {
        "Walk Through Airlock"
    }

    fn phases(&self) -> &'static [TaskPhase] {
        PHASES
    }

    fn perform_phase(
        &mut self,
        phase: TaskPhase,
        step: PhaseStep,
        agent: &mut AgentState,
        ctx: &mut ActionContext<'_>,
    ) -> Result<PhaseOutcome, TaskFault> {
        match phase {
            TaskPhase::AwaitSlot => self.await_slot(step, agent, ctx),
            TaskPhase::Cycle => self.cycle(step, agent, ctx),
            _ => Err(TaskFault::UnknownPhase {
                task: self.name(),
                phase,
            }),
        }
    }

    fn release(&mut self, agent: &mut AgentState, ctx: &mut ActionContext<'_>) {
        if !self.holding_slot {
            return;
        }
        self.holding_slot = false;
        if let Some(settlement) = ctx.world.settlement_mut(self.settlement) {
            settlement.airlock.release(agent.id);
        }
    }

    fn description(&self) -> String {
        match self.direction {
            AirlockDirection::Exit => "Walking out through an airlock".to_owned(),
            AirlockDirection::Enter => "Walking in through an airlock".to_owned(),
        }
    }
}

/// Phase body for an EVA task's way out.
pub(crate) fn exit_phase(step: PhaseStep, agent: &AgentState) -> PhaseOutcome {
    if !agent.is_person() || agent.location == LocationSituation::Outside {
        return PhaseOutcome::PhaseDone { leftover: step.time };
    }
    PhaseOutcome::Delegate(Box::new(WalkThroughAirlock::exit(agent)))
}

/// Phase body for an EVA task's way back in.
pub(crate) fn enter_phase(step: PhaseStep, agent: &AgentState) -> PhaseOutcome {
    if agent.location != LocationSituation::Outside {
        return PhaseOutcome::PhaseDone { leftover: step.time };
    }
    PhaseOutcome::Delegate(Box::new(WalkThroughAirlock::enter(agent)))
}

/// How an EVA task reacts to its airlock walk ending. A failed exit aborts
/// the task; a failed entry is retried.
pub(crate) fn airlock_walk_ended(subtask: &Task, agent: &AgentState) -> SubtaskResult {
    let TaskKind::WalkThroughAirlock(walk) = subtask.kind() else {
        return SubtaskResult::Continue;
    };
    if walk.direction == AirlockDirection::Exit && agent.location != LocationSituation::Outside {
        let reason = subtask.end_reason().unwrap_or("Airlock unavailable.");
        return SubtaskResult::Abort(format!("Could not go outside: {reason}"));
    }
    SubtaskResult::Continue
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use marsim_types::RoleType;

    use super::*;
    use crate::task::tests::Fixture;

    #[test]
    fn exit_takes_a_suit_and_frees_the_slot() {
        let mut fx = Fixture::new();
        let mut agent = fx.person("Ana", RoleType::CrewEngineer).state;
        let base = fx.settlement;
        fx.world
            .settlement_mut(base)
            .unwrap()
            .inventory
            .store_parts(Part::EvaSuit, 1)
            .unwrap();

        let mut walk = WalkThroughAirlock::exit(&agent);
        let leftover = walk.perform(&mut agent, 15.0, &mut fx.ctx()).unwrap();
        assert!(walk.is_completed());
        assert!((leftover - 5.0).abs() < 1e-9);
        assert_eq!(agent.location, LocationSituation::Outside);
        assert!(agent.wearing_suit);

        let settlement = fx.world.settlement(base).unwrap();
        assert_eq!(settlement.airlock.occupant_count(), 0);
        assert_eq!(settlement.inventory.part_count(Part::EvaSuit), 0);
    }

    #[test]
    fn exit_without_suit_is_blocked() {
        let mut fx = Fixture::new();
        let mut agent = fx.person("Ana", RoleType::CrewEngineer).state;
        let mut walk = WalkThroughAirlock::exit(&agent);
        let leftover = walk.perform(&mut agent, 15.0, &mut fx.ctx()).unwrap();
        assert!(walk.is_ended() && !walk.is_completed());
        assert_eq!(walk.end_reason(), Some("No EVA suit available."));
        assert!((leftover - 15.0).abs() < 1e-9);
        assert!(agent.is_inside());
    }

    #[test]
    fn ending_midway_releases_the_slot_once() {
        let mut fx = Fixture::new();
        let mut agent = fx.person("Ana", RoleType::CrewEngineer).state;
        let base = fx.settlement;
        fx.world
            .settlement_mut(base)
            .unwrap()
            .inventory
            .store_parts(Part::EvaSuit, 1)
            .unwrap();

        let mut walk = WalkThroughAirlock::exit(&agent);
        walk.perform(&mut agent, 4.0, &mut fx.ctx()).unwrap();
        assert_eq!(fx.world.settlement(base).unwrap().airlock.occupant_count(), 1);

        walk.end_task(&mut agent, &mut fx.ctx(), Some("Interrupted".to_owned()));
        walk.end_task(&mut agent, &mut fx.ctx(), None);
        assert_eq!(fx.world.settlement(base).unwrap().airlock.occupant_count(), 0);
        assert_eq!(walk.end_reason(), Some("Interrupted"));
        assert!(agent.is_inside());
    }
}
