//! The physical world: settlements, vehicles, and surface conditions.

use std::collections::BTreeMap;

use marsim_types::{MissionId, SettlementId, VehicleId};
use tracing::debug;

use crate::error::WorldError;
use crate::settlement::Settlement;
use crate::surface::SurfaceSystem;
use crate::vehicle::Vehicle;

/// All settlements and vehicles, keyed by id for stable iteration order.
#[derive(Debug, Clone)]
pub struct World {
    settlements: BTreeMap<SettlementId, Settlement>,
    vehicles: BTreeMap<VehicleId, Vehicle>,
    /// Sunlight and radiation at the surface.
    pub surface: SurfaceSystem,
}

impl World {
    /// Create an empty world.
    pub const fn new(surface: SurfaceSystem) -> Self {
        Self {
            settlements: BTreeMap::new(),
            vehicles: BTreeMap::new(),
            surface,
        }
    }

    /// Add a settlement, returning its id.
    pub fn add_settlement(&mut self, settlement: Settlement) -> SettlementId {
        let id = settlement.id;
        self.settlements.insert(id, settlement);
        id
    }

    /// Look up a settlement.
    pub fn settlement(&self, id: SettlementId) -> Option<&Settlement> {
        self.settlements.get(&id)
    }

    /// Look up a settlement mutably.
    pub fn settlement_mut(&mut self, id: SettlementId) -> Option<&mut Settlement> {
        self.settlements.get_mut(&id)
    }

    /// Look up a settlement, failing with [`WorldError::SettlementNotFound`].
    pub fn require_settlement_mut(&mut self, id: SettlementId) -> Result<&mut Settlement, WorldError> {
        self.settlements
            .get_mut(&id)
            .ok_or(WorldError::SettlementNotFound(id))
    }

    /// Settlements in id order.
    pub fn settlements(&self) -> impl Iterator<Item = &Settlement> {
        self.settlements.values()
    }

    /// Settlements in id order, mutably.
    pub fn settlements_mut(&mut self) -> impl Iterator<Item = &mut Settlement> {
        self.settlements.values_mut()
    }

    /// Add a vehicle, returning its id.
    pub fn add_vehicle(&mut self, vehicle: Vehicle) -> VehicleId {
        let id = vehicle.id;
        self.vehicles.insert(id, vehicle);
        id
    }

    /// Look up a vehicle.
    pub fn vehicle(&self, id: VehicleId) -> Option<&Vehicle> {
        self.vehicles.get(&id)
    }

    /// Look up a vehicle mutably.
    pub fn vehicle_mut(&mut self, id: VehicleId) -> Option<&mut Vehicle> {
        self.vehicles.get_mut(&id)
    }

    /// Vehicles parked at or garaged in a settlement.
    pub fn vehicles_at(&self, settlement: SettlementId) -> impl Iterator<Item = &Vehicle> {
        self.vehicles
            .values()
            .filter(move |vehicle| vehicle.settlement == Some(settlement))
    }

    /// The first light utility vehicle at a settlement that is free for a
    /// mission.
    pub fn available_utility_vehicle(&self, settlement: SettlementId) -> Option<VehicleId> {
        self.vehicles_at(settlement)
            .find(|vehicle| vehicle.is_available_utility_vehicle())
            .map(|vehicle| vehicle.id)
    }

    /// Reserve a vehicle for a mission.
    pub fn reserve_vehicle(&mut self, id: VehicleId, mission: MissionId) -> Result<(), WorldError> {
        self.vehicles
            .get_mut(&id)
            .ok_or(WorldError::VehicleNotFound(id))?
            .reserve_for_mission(mission)
    }

    /// Release every vehicle held by a mission. Returns how many were freed.
    pub fn release_mission_vehicles(&mut self, mission: MissionId) -> usize {
        let released = self
            .vehicles
            .values_mut()
            .filter_map(|vehicle| vehicle.release_mission(mission).then_some(vehicle.id))
            .count();
        if released > 0 {
            debug!(%mission, released, "mission vehicles released");
        }
        released
    }

    /// Advance surface conditions to a point in time.
    pub fn update_surface(&mut self, total_sols: u64, millisol: f64) {
        self.surface.update(total_sols, millisol);
    }
}
