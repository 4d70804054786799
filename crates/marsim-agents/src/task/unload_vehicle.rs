//! Unloading a parked vehicle's cargo into settlement storage.

use marsim_types::{Resource, SettlementId, SkillType, VehicleId};
use marsim_world::{Vehicle, World};
use tracing::{debug, warn};

use super::{PhaseOutcome, PhaseStep, Task, TaskBehavior, TaskKind, TaskPhase};
use crate::agent::AgentState;
use crate::context::ActionContext;
use crate::error::TaskFault;

const PHASES: &[TaskPhase] = &[TaskPhase::Unloading];

/// Unloading without a garage is this many times slower.
const NO_GARAGE_PENALTY: f64 = 4.0;

/// Cargo below this is treated as empty.
const EMPTY_CARGO: f64 = 1e-5;

/// Parked, mission-free vehicles at `settlement` with something aboard.
pub(crate) fn loaded_vehicles(world: &World, settlement: SettlementId) -> impl Iterator<Item = &Vehicle> {
    world.vehicles_at(settlement).filter(|vehicle| {
        vehicle.status.is_parked()
            && !vehicle.is_reserved_for_mission()
            && (vehicle.cargo.total_mass() > EMPTY_CARGO || vehicle.cargo.parts().next().is_some())
    })
}

/// The fullest of the [`loaded_vehicles`].
fn unload_candidate(world: &World, settlement: SettlementId) -> Option<VehicleId> {
    loaded_vehicles(world, settlement)
        .max_by(|a, b| a.cargo.total_mass().total_cmp(&b.cargo.total_mass()))
        .map(|vehicle| vehicle.id)
}

/// Move a vehicle's cargo into the settlement.
#[derive(Debug, Clone)]
pub struct UnloadVehicle {
    settlement: SettlementId,
    vehicle: VehicleId,
    in_garage: bool,
    unloaded: f64,
}

impl UnloadVehicle {
    /// Pick the fullest vehicle. Inapplicable when nothing needs unloading.
    pub fn create(agent: &AgentState, ctx: &ActionContext<'_>) -> Task {
        let mut task = Self {
            settlement: agent.settlement.unwrap_or_default(),
            vehicle: VehicleId::default(),
            in_garage: false,
            unloaded: 0.0,
        };
        let Some(settlement) = ctx.settlement(agent.settlement).filter(|_| agent.is_inside()) else {
            return Task::inapplicable(TaskKind::UnloadVehicle(task), "Not inside a settlement.");
        };
        task.in_garage = settlement.has_garage();
        let Some(vehicle) = unload_candidate(ctx.world, task.settlement) else {
            return Task::inapplicable(TaskKind::UnloadVehicle(task), "No vehicle to unload.");
        };
        task.vehicle = vehicle;
        Task::new(TaskKind::UnloadVehicle(task))
    }

    /// Mass moved so far.
    pub const fn unloaded(&self) -> f64 {
        self.unloaded
    }

    /// Settlement-bound amounts, capped by free storage and `budget` in kg.
    fn plan(&self, world: &World, budget: f64) -> Option<(Vec<(Resource, f64)>, f64)> {
        let vehicle = world.vehicle(self.vehicle)?;
        let settlement = world.settlement(self.settlement)?;
        let mut left = budget;
        let mut movable = 0.0;
        let mut plan = Vec::new();
        for (resource, amount) in vehicle.cargo.stored_resources() {
            let fits = amount.min(settlement.inventory.remaining_capacity(resource));
            if fits <= EMPTY_CARGO {
                continue;
            }
            movable += fits;
            let take = fits.min(left);
            if take > 0.0 {
                plan.push((resource, take));
                left -= take;
            }
        }
        Some((plan, movable))
    }

    fn unload(&mut self, step: PhaseStep, agent: &AgentState, ctx: &mut ActionContext<'_>) -> PhaseOutcome {
        let mut rate = ctx.rules.tasks.unload_rate * agent.performance();
        if !self.in_garage {
            rate /= NO_GARAGE_PENALTY;
        }
        if rate <= 0.0 {
            return PhaseOutcome::InProgress;
        }

        let Some((plan, movable)) = self.plan(ctx.world, step.time * rate) else {
            return PhaseOutcome::Blocked {
                reason: "Vehicle no longer available.".to_owned(),
            };
        };
        for (resource, amount) in plan {
            let taken = ctx
                .world
                .vehicle_mut(self.vehicle)
                .is_some_and(|vehicle| vehicle.cargo.retrieve(resource, amount, true));
            if !taken {
                continue;
            }
            if let Some(settlement) = ctx.world.settlement_mut(self.settlement) {
                let stored = settlement.inventory.store(resource, amount).unwrap_or(0.0);
                settlement.inventory.flows_mut().record_supply(resource, stored);
                self.unloaded += stored;
            }
        }

        let needed = movable / rate;
        if step.time < needed {
            return PhaseOutcome::InProgress;
        }
        self.unload_parts(ctx);
        debug!(agent = %agent.name, unloaded = self.unloaded, "vehicle unloaded");
        PhaseOutcome::Completed {
            leftover: step.time - needed,
        }
    }

    fn unload_parts(&self, ctx: &mut ActionContext<'_>) {
        let parts: Vec<_> = ctx
            .world
            .vehicle(self.vehicle)
            .map(|vehicle| vehicle.cargo.parts().collect())
            .unwrap_or_default();
        for (part, count) in parts {
            let taken = ctx
                .world
                .vehicle_mut(self.vehicle)
                .is_some_and(|vehicle| vehicle.cargo.retrieve_parts(part, count, true));
            if let Some(settlement) = ctx.world.settlement_mut(self.settlement)
                && taken
                && let Err(source) = settlement.inventory.store_parts(part, count)
            {
                warn!(%source, "unloaded parts could not be stored");
            }
        }
    }
}

impl TaskBehavior for UnloadVehicle {
    fn name(&self) -> &'static str {
        "Unload Vehicle"
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
        if phase != TaskPhase::Unloading {
            return Err(TaskFault::UnknownPhase {
                task: self.name(),
                phase,
            });
        }
        Ok(self.unload(step, agent, ctx))
    }

    fn add_experience(&self, agent: &mut AgentState, time: f64) {
        agent.skills.add_experience(SkillType::Driving, time / 200.0);
    }

    fn description(&self) -> String {
        format!("Unloading a vehicle ({:.0} kg so far)", self.unloaded)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use marsim_types::{JobKind, Part, VehicleKind};

    use super::*;
    use crate::task::tests::Fixture;

    fn loaded_rover(fx: &mut Fixture, ice: f64) -> VehicleId {
        let mut rover = Vehicle::new("Cargo 1", VehicleKind::CargoRover, Some(fx.settlement));
        rover.cargo.store(Resource::Ice, ice).unwrap();
        rover.cargo.store_parts(Part::Bag, 2).unwrap();
        fx.world.add_vehicle(rover)
    }

    #[test]
    fn robot_unloads_in_the_garage() {
        let mut fx = Fixture::new();
        let base = fx.settlement;
        let rover = loaded_rover(&mut fx, 100.0);
        let mut bot = fx
            .manager
            .create_robot("Unit 7", JobKind::DeliveryBot, base, 1)
            .unwrap()
            .state;

        let mut task = UnloadVehicle::create(&bot, &fx.ctx());
        // 100 kg at 10 kg/ms.
        assert!(task.perform(&mut bot, 6.0, &mut fx.ctx()).unwrap().abs() < f64::EPSILON);
        assert!(!task.is_ended());
        let leftover = task.perform(&mut bot, 6.0, &mut fx.ctx()).unwrap();
        assert!(task.is_completed());
        assert!((leftover - 2.0).abs() < 1e-9);

        let settlement = fx.world.settlement(base).unwrap();
        assert!((settlement.inventory.stored(Resource::Ice) - 100.0).abs() < 1e-6);
        assert_eq!(settlement.inventory.part_count(Part::Bag), 2);
        assert!(fx.world.vehicle(rover).unwrap().cargo.total_mass() < 1e-6);
    }

    #[test]
    fn full_storage_leaves_the_rest_aboard() {
        let mut fx = Fixture::new();
        let base = fx.settlement;
        let rover = loaded_rover(&mut fx, 2000.0);
        fx.world
            .settlement_mut(base)
            .unwrap()
            .inventory
            .store(Resource::Ice, 1950.0)
            .unwrap();
        let mut agent = fx.person("Ana", marsim_types::RoleType::CrewEngineer).state;

        let mut task = UnloadVehicle::create(&agent, &fx.ctx());
        let leftover = task.perform(&mut agent, 50.0, &mut fx.ctx()).unwrap();
        assert!(task.is_completed());
        assert!((leftover - 45.0).abs() < 1e-9);
        assert!((fx.world.vehicle(rover).unwrap().cargo.stored(Resource::Ice) - 1950.0).abs() < 1e-6);
    }

    #[test]
    fn empty_vehicles_are_ignored() {
        let mut fx = Fixture::new();
        let base = fx.settlement;
        fx.world
            .add_vehicle(Vehicle::new("Empty", VehicleKind::CargoRover, Some(base)));
        let agent = fx.person("Ana", marsim_types::RoleType::CrewEngineer).state;
        let task = UnloadVehicle::create(&agent, &fx.ctx());
        assert_eq!(task.end_reason(), Some("No vehicle to unload."));
    }
}
