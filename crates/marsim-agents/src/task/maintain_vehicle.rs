//! Servicing a ground vehicle parked at the settlement.
//!
//! The most worn vehicle that is due for service and held by nobody is
//! reserved for maintenance. Work happens in the garage when the settlement
//! has one, otherwise outside.

use marsim_types::{NaturalAttribute, SettlementId, SkillType, VehicleId};
use marsim_world::{Vehicle, World};
use tracing::{debug, info};

use super::airlock::{airlock_walk_ended, enter_phase, exit_phase};
use super::{PhaseOutcome, PhaseStep, SubtaskResult, Task, TaskBehavior, TaskKind, TaskPhase};
use crate::agent::AgentState;
use crate::context::ActionContext;
use crate::error::TaskFault;

const PHASES: &[TaskPhase] = &[
    TaskPhase::ExitAirlock,
    TaskPhase::Maintain,
    TaskPhase::EnterAirlock,
];

/// Parked vehicles at `settlement` that are due for service and held by
/// neither a mission nor another mechanic.
pub(crate) fn due_vehicles(world: &World, settlement: SettlementId, period: f64) -> impl Iterator<Item = &Vehicle> {
    world.vehicles_at(settlement).filter(move |vehicle| {
        vehicle.status.is_parked()
            && vehicle.needs_maintenance(period)
            && !vehicle.is_reserved_for_mission()
            && !vehicle.is_maintenance_reserved()
    })
}

/// The most worn of the [`due_vehicles`].
fn maintenance_candidate(world: &World, settlement: SettlementId, period: f64) -> Option<VehicleId> {
    due_vehicles(world, settlement, period)
        .max_by(|a, b| a.time_since_maintenance().total_cmp(&b.time_since_maintenance()))
        .map(|vehicle| vehicle.id)
}

/// Service one vehicle.
#[derive(Debug, Clone)]
pub struct MaintainGroundVehicle {
    vehicle: Option<VehicleId>,
    in_garage: bool,
    finished: bool,
}

impl MaintainGroundVehicle {
    /// Reserve the neediest vehicle. Inapplicable when none is due.
    pub fn create(agent: &AgentState, ctx: &mut ActionContext<'_>) -> Task {
        let mut task = Self {
            vehicle: None,
            in_garage: false,
            finished: false,
        };
        if !agent.is_inside() {
            return Task::inapplicable(TaskKind::MaintainGroundVehicle(task), "Must start inside.");
        }
        let Some(settlement) = agent.settlement else {
            return Task::inapplicable(TaskKind::MaintainGroundVehicle(task), "No settlement.");
        };
        task.in_garage = ctx.world.settlement(settlement).is_some_and(|s| s.has_garage());

        let period = ctx.rules.tasks.maintenance_period;
        let Some(id) = maintenance_candidate(ctx.world, settlement, period) else {
            return Task::inapplicable(
                TaskKind::MaintainGroundVehicle(task),
                "No vehicle needs maintenance.",
            );
        };
        match ctx.world.vehicle_mut(id).map(Vehicle::reserve_maintenance) {
            Some(Ok(())) => {
                debug!(agent = %agent.name, vehicle = %id, "vehicle reserved for maintenance");
                task.vehicle = Some(id);
                Task::new(TaskKind::MaintainGroundVehicle(task))
            }
            Some(Err(source)) => Task::inapplicable(TaskKind::MaintainGroundVehicle(task), source.to_string()),
            None => Task::inapplicable(TaskKind::MaintainGroundVehicle(task), "Vehicle not found."),
        }
    }

    /// The vehicle being serviced.
    pub const fn vehicle(&self) -> Option<VehicleId> {
        self.vehicle
    }

    /// Whether the work happens indoors.
    pub const fn in_garage(&self) -> bool {
        self.in_garage
    }

    fn maintain(&mut self, step: PhaseStep, agent: &AgentState, ctx: &mut ActionContext<'_>) -> PhaseOutcome {
        let tasks = &ctx.rules.tasks;
        let (required, shift) = (tasks.maintenance_work, tasks.maintenance_duration);
        let Some(vehicle) = self.vehicle.and_then(|id| ctx.world.vehicle_mut(id)) else {
            return PhaseOutcome::Blocked {
                reason: "Vehicle no longer available.".to_owned(),
            };
        };

        let rate = agent.performance();
        let until_done = (required - vehicle.maintenance_work()).max(0.0);
        let until_shift_end = (shift - step.phase_elapsed).max(0.0);
        let needed = if rate > 0.0 {
            (until_done / rate).min(until_shift_end)
        } else {
            until_shift_end
        };

        if step.time < needed {
            vehicle.add_maintenance_work(step.time * rate, required);
            return PhaseOutcome::InProgress;
        }
        if vehicle.add_maintenance_work(needed * rate, required) {
            info!(agent = %agent.name, vehicle = %vehicle.name, "vehicle maintenance complete");
            self.finished = true;
        }
        PhaseOutcome::PhaseDone {
            leftover: step.time - needed,
        }
    }
}

impl TaskBehavior for MaintainGroundVehicle {
    fn name(&self) -> &'static str {
        "Maintain Ground Vehicle"
    }

    fn phases(&self) -> &'static [TaskPhase] {
        PHASES
    }

    fn stress_modifier(&self) -> f64 {
        0.1
    }

    fn perform_phase(
        &mut self,
        phase: TaskPhase,
        step: PhaseStep,
        agent: &mut AgentState,
        ctx: &mut ActionContext<'_>,
    ) -> Result<PhaseOutcome, TaskFault> {
        match phase {
            TaskPhase::ExitAirlock if self.in_garage => Ok(PhaseOutcome::PhaseDone { leftover: step.time }),
            TaskPhase::ExitAirlock => Ok(exit_phase(step, agent)),
            TaskPhase::Maintain => Ok(self.maintain(step, agent, ctx)),
            TaskPhase::EnterAirlock => Ok(enter_phase(step, agent)),
            _ => Err(TaskFault::UnknownPhase {
                task: self.name(),
                phase,
            }),
        }
    }

    fn add_experience(&self, agent: &mut AgentState, time: f64) {
        let points = time / 100.0 * (1.0 + agent.attributes.modifier(NaturalAttribute::ExperienceAptitude));
        agent.skills.add_experience(SkillType::Mechanics, points);
    }

    fn release(&mut self, _agent: &mut AgentState, ctx: &mut ActionContext<'_>) {
        if let Some(vehicle) = self.vehicle.take().and_then(|id| ctx.world.vehicle_mut(id)) {
            vehicle.release_maintenance();
        }
    }

    fn subtask_ended(&mut self, subtask: &Task, agent: &AgentState) -> SubtaskResult {
        airlock_walk_ended(subtask, agent)
    }

    fn description(&self) -> String {
        if self.finished {
            "Finishing vehicle maintenance".to_owned()
        } else {
            "Maintaining a ground vehicle".to_owned()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use marsim_types::{RoleType, VehicleKind};

    use super::*;
    use crate::task::tests::Fixture;

    fn worn_rover(fx: &mut Fixture, wear: f64) -> VehicleId {
        let mut rover = Vehicle::new("Rover", VehicleKind::ExplorerRover, Some(fx.settlement));
        rover.add_wear(wear);
        fx.world.add_vehicle(rover)
    }

    #[test]
    fn services_the_most_worn_vehicle_in_the_garage() {
        let mut fx = Fixture::new();
        let mut agent = fx.person("Ana", RoleType::CrewEngineer).state;
        let _fresh = worn_rover(&mut fx, 1200.0);
        let worn = worn_rover(&mut fx, 3000.0);

        let mut task = MaintainGroundVehicle::create(&agent, &mut fx.ctx());
        let (vehicle, in_garage) = match task.kind() {
            TaskKind::MaintainGroundVehicle(maintain) => (maintain.vehicle(), maintain.in_garage()),
            _ => (None, false),
        };
        assert_eq!(vehicle, Some(worn));
        assert!(in_garage);
        assert!(fx.world.vehicle(worn).unwrap().is_maintenance_reserved());

        // 100 work at full performance; no airlock with a garage.
        let leftover = task.perform(&mut agent, 120.0, &mut fx.ctx()).unwrap();
        assert!(task.is_completed(), "{:?}", task.end_reason());
        assert!((leftover - 20.0).abs() < 1e-9);
        assert!(agent.is_inside());

        let vehicle = fx.world.vehicle(worn).unwrap();
        assert!(!vehicle.is_maintenance_reserved());
        assert!(vehicle.time_since_maintenance().abs() < f64::EPSILON);
    }

    #[test]
    fn nothing_due_is_inapplicable() {
        let mut fx = Fixture::new();
        let agent = fx.person("Ana", RoleType::CrewEngineer).state;
        worn_rover(&mut fx, 10.0);
        let task = MaintainGroundVehicle::create(&agent, &mut fx.ctx());
        assert_eq!(task.end_reason(), Some("No vehicle needs maintenance."));
    }

    #[test]
    fn ending_early_releases_the_reservation() {
        let mut fx = Fixture::new();
        let mut agent = fx.person("Ana", RoleType::CrewEngineer).state;
        let worn = worn_rover(&mut fx, 3000.0);

        let mut task = MaintainGroundVehicle::create(&agent, &mut fx.ctx());
        task.perform(&mut agent, 30.0, &mut fx.ctx()).unwrap();
        assert!(!task.is_ended());
        task.end_task(&mut agent, &mut fx.ctx(), Some("Interrupted".to_owned()));

        let vehicle = fx.world.vehicle(worn).unwrap();
        assert!(!vehicle.is_maintenance_reserved());
        assert!((vehicle.maintenance_work() - 30.0).abs() < 1e-9);
    }
}
