//! Eating a meal.

use marsim_ledger::retrieve_an_resource;
use marsim_types::{Resource, SettlementId};

use super::{PhaseOutcome, PhaseStep, Task, TaskBehavior, TaskKind, TaskPhase};
use crate::agent::AgentState;
use crate::context::ActionContext;
use crate::error::TaskFault;

const PHASES: &[TaskPhase] = &[TaskPhase::Eating];

/// Eat one meal from the settlement's food store.
#[derive(Debug, Clone)]
pub struct EatMeal {
    settlement: Option<SettlementId>,
    served: bool,
}

impl EatMeal {
    /// Sit down to eat. Inapplicable outside a settlement.
    pub fn create(agent: &AgentState) -> Task {
        let task = Self {
            settlement: agent.settlement,
            served: false,
        };
        if !agent.is_inside() || agent.settlement.is_none() {
            return Task::inapplicable(TaskKind::EatMeal(task), "Not inside a settlement.");
        }
        Task::new(TaskKind::EatMeal(task))
    }
}

impl TaskBehavior for EatMeal {
    fn name(&self) -> &'static str {
        "Eat Meal"
    }

    fn phases(&self) -> &'static [TaskPhase] {
        PHASES
    }

    fn stress_modifier(&self) -> f64 {
        -0.2
    }

    fn perform_phase(
        &mut self,
        phase: TaskPhase,
        step: PhaseStep,
        agent: &mut AgentState,
        ctx: &mut ActionContext<'_>,
    ) -> Result<PhaseOutcome, TaskFault> {
        if phase != TaskPhase::Eating {
            return Err(TaskFault::UnknownPhase {
                task: self.name(),
                phase,
            });
        }
        if !self.served {
            let meal = ctx.rules.tasks.meal_mass;
            let settlement = ctx
                .settlement_mut(self.settlement)
                .ok_or(TaskFault::SettlementMissing { task: self.name() })?;
            if !retrieve_an_resource(meal, Resource::Food, &mut settlement.inventory, true) {
                return Ok(PhaseOutcome::Blocked {
                    reason: "No food available.".to_owned(),
                });
            }
            self.served = true;
        }

        let needed = (ctx.rules.tasks.eat_duration - step.phase_elapsed).max(0.0);
        if step.time < needed {
            return Ok(PhaseOutcome::InProgress);
        }
        agent.condition.eat();
        Ok(PhaseOutcome::Completed {
            leftover: step.time - needed,
        })
    }

    fn description(&self) -> String {
        "Eating a meal".to_owned()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use marsim_types::RoleType;

    use super::*;
    use crate::task::tests::Fixture;

    #[test]
    fn meal_returns_leftover_time() {
        let mut fx = Fixture::new();
        let mut agent = fx.person("Ana", RoleType::CrewEngineer).state;
        agent.condition.hunger = 400.0;
        let food_before = fx.world.settlement(fx.settlement).unwrap().inventory.stored(Resource::Food);

        let mut task = EatMeal::create(&agent);
        let leftover = task.perform(&mut agent, 25.0, &mut fx.ctx()).unwrap();

        assert!((leftover - 5.0).abs() < 1e-9);
        assert!(task.is_completed());
        assert!(agent.condition.hunger.abs() < f64::EPSILON);
        let food_after = fx.world.settlement(fx.settlement).unwrap().inventory.stored(Resource::Food);
        assert!((food_before - food_after - 0.62).abs() < 1e-6);
    }

    #[test]
    fn meal_spans_steps_without_eating_twice() {
        let mut fx = Fixture::new();
        let mut agent = fx.person("Ana", RoleType::CrewEngineer).state;
        let food_before = fx.world.settlement(fx.settlement).unwrap().inventory.stored(Resource::Food);

        let mut task = EatMeal::create(&agent);
        assert!(task.perform(&mut agent, 12.0, &mut fx.ctx()).unwrap().abs() < f64::EPSILON);
        assert!(!task.is_ended());
        let leftover = task.perform(&mut agent, 12.0, &mut fx.ctx()).unwrap();
        assert!((leftover - 4.0).abs() < 1e-9);
        let food_after = fx.world.settlement(fx.settlement).unwrap().inventory.stored(Resource::Food);
        assert!((food_before - food_after - 0.62).abs() < 1e-6);
    }

    #[test]
    fn empty_pantry_blocks() {
        let mut fx = Fixture::new();
        let mut agent = fx.person("Ana", RoleType::CrewEngineer).state;
        let base = fx.settlement;
        let stock = fx.world.settlement(base).unwrap().inventory.stored(Resource::Food);
        fx.world
            .settlement_mut(base)
            .unwrap()
            .inventory
            .retrieve(Resource::Food, stock, true);

        let mut task = EatMeal::create(&agent);
        let leftover = task.perform(&mut agent, 25.0, &mut fx.ctx()).unwrap();
        assert!((leftover - 25.0).abs() < 1e-9);
        assert_eq!(task.end_reason(), Some("No food available."));
    }
}
