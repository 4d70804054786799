//! Ground vehicles, their cargo, and their reservations.
//!
//! A vehicle can be held by at most one mission at a time, and separately
//! by at most one maintenance task. Both reservations are explicit flags
//! that the holder must clear on every exit path.

use marsim_ledger::Inventory;
use marsim_types::{AgentId, MissionId, Resource, SettlementId, VehicleId, VehicleKind, VehicleStatus};
use tracing::debug;

use crate::error::WorldError;

/// Cargo capacity in kg for each amount resource a rover may haul.
const ROVER_CARGO_CAPACITY: f64 = 2000.0;

/// A ground vehicle.
#[derive(Debug, Clone)]
pub struct Vehicle {
    /// Vehicle identifier.
    pub id: VehicleId,
    /// Display name.
    pub name: String,
    /// Vehicle type.
    pub kind: VehicleKind,
    /// Operating status.
    pub status: VehicleStatus,
    /// Settlement the vehicle is parked at, if any.
    pub settlement: Option<SettlementId>,
    /// Cargo hold.
    pub cargo: Inventory,
    mission: Option<MissionId>,
    maintenance_reserved: bool,
    crew: Vec<AgentId>,
    /// Millisols of use since the last completed maintenance.
    time_since_maintenance: f64,
    /// Maintenance work accumulated toward the current service.
    maintenance_work: f64,
}

impl Vehicle {
    /// Create a parked vehicle at a settlement.
    ///
    /// Rovers get cargo capacity for every amount resource; light utility
    /// vehicles carry only parts.
    pub fn new(name: impl Into<String>, kind: VehicleKind, settlement: Option<SettlementId>) -> Self {
        let mut cargo = Inventory::new();
        if kind != VehicleKind::LightUtilityVehicle {
            for resource in [
                Resource::Water,
                Resource::Oxygen,
                Resource::Food,
                Resource::Ice,
                Resource::Regolith,
                Resource::Methane,
            ] {
                // Capacity constants are valid, so this cannot fail.
                cargo.add_capacity(resource, ROVER_CARGO_CAPACITY).ok();
            }
        }
        Self {
            id: VehicleId::new(),
            name: name.into(),
            kind,
            status: VehicleStatus::Parked,
            settlement,
            cargo,
            mission: None,
            maintenance_reserved: false,
            crew: Vec::new(),
            time_since_maintenance: 0.0,
            maintenance_work: 0.0,
        }
    }

    // -----------------------------------------------------------------------
    // Mission reservation
    // -----------------------------------------------------------------------

    /// The mission holding this vehicle, if any.
    pub const fn reserved_mission(&self) -> Option<MissionId> {
        self.mission
    }

    /// Whether any mission holds this vehicle.
    pub const fn is_reserved_for_mission(&self) -> bool {
        self.mission.is_some()
    }

    /// Reserve the vehicle for a mission.
    ///
    /// Fails if another mission already holds it, or if it is not parked.
    /// Reserving again for the same mission is a no-op.
    pub fn reserve_for_mission(&mut self, mission: MissionId) -> Result<(), WorldError> {
        match self.mission {
            Some(holder) if holder == mission => return Ok(()),
            Some(holder) => {
                return Err(WorldError::ReservationMismatch {
                    vehicle: self.id,
                    holder,
                });
            }
            None => {}
        }
        if !self.status.is_parked() {
            return Err(WorldError::VehicleUnavailable {
                vehicle: self.id,
                reason: format!("status is {:?}", self.status),
            });
        }
        self.mission = Some(mission);
        debug!(vehicle = %self.id, %mission, "vehicle reserved for mission");
        Ok(())
    }

    /// Release a mission reservation. Returns `false` if `mission` did not
    /// hold it.
    pub fn release_mission(&mut self, mission: MissionId) -> bool {
        if self.mission == Some(mission) {
            self.mission = None;
            debug!(vehicle = %self.id, %mission, "vehicle reservation released");
            return true;
        }
        false
    }

    /// Whether this is a light utility vehicle free for construction:
    /// parked, unreserved, and uncrewed.
    pub fn is_available_utility_vehicle(&self) -> bool {
        self.kind == VehicleKind::LightUtilityVehicle
            && self.status.is_parked()
            && self.mission.is_none()
            && self.crew.is_empty()
    }

    // -----------------------------------------------------------------------
    // Crew
    // -----------------------------------------------------------------------

    /// Agents aboard.
    pub fn crew(&self) -> &[AgentId] {
        &self.crew
    }

    /// Put an agent aboard.
    pub fn board(&mut self, agent: AgentId) {
        if !self.crew.contains(&agent) {
            self.crew.push(agent);
        }
    }

    /// Take an agent off. Returns `false` if it was not aboard.
    pub fn disembark(&mut self, agent: AgentId) -> bool {
        let before = self.crew.len();
        self.crew.retain(|member| *member != agent);
        self.crew.len() != before
    }

    // -----------------------------------------------------------------------
    // Maintenance
    // -----------------------------------------------------------------------

    /// Accumulate wear.
    pub fn add_wear(&mut self, time: f64) {
        if time > 0.0 {
            self.time_since_maintenance += time;
        }
    }

    /// Millisols since the last service.
    pub const fn time_since_maintenance(&self) -> f64 {
        self.time_since_maintenance
    }

    /// Work done toward the current service.
    pub const fn maintenance_work(&self) -> f64 {
        self.maintenance_work
    }

    /// Whether the vehicle is due for service.
    pub fn needs_maintenance(&self, period: f64) -> bool {
        self.time_since_maintenance >= period
    }

    /// Whether a maintenance task holds this vehicle.
    pub const fn is_maintenance_reserved(&self) -> bool {
        self.maintenance_reserved
    }

    /// Reserve the vehicle for a maintenance task.
    pub fn reserve_maintenance(&mut self) -> Result<(), WorldError> {
        if self.maintenance_reserved {
            return Err(WorldError::VehicleUnavailable {
                vehicle: self.id,
                reason: "already reserved for maintenance".to_owned(),
            });
        }
        if self.mission.is_some() || !self.status.is_parked() {
            return Err(WorldError::VehicleUnavailable {
                vehicle: self.id,
                reason: "not parked and free".to_owned(),
            });
        }
        self.maintenance_reserved = true;
        Ok(())
    }

    /// Release a maintenance reservation. Returns `false` if none was held.
    pub const fn release_maintenance(&mut self) -> bool {
        let held = self.maintenance_reserved;
        self.maintenance_reserved = false;
        held
    }

    /// Add maintenance work. When `required` work is reached the service is
    /// complete, wear resets, and `true` is returned.
    pub fn add_maintenance_work(&mut self, work: f64, required: f64) -> bool {
        if work > 0.0 {
            self.maintenance_work += work;
        }
        if self.maintenance_work >= required {
            self.maintenance_work = 0.0;
            self.time_since_maintenance = 0.0;
            return true;
        }
        false
    }
}
