//! Settlements: shared inventory, buildings, airlocks, roster, and
//! construction sites.
//!
//! Adding a building installs its [`StorageSpec`](marsim_ledger::StorageSpec)
//! into the shared inventory and adds its airlocks; removing it reverses
//! both, dropping any stock that no longer fits.

use std::collections::BTreeMap;

use marsim_ledger::Inventory;
use marsim_types::{AgentId, BuildingId, Resource, SettlementId, SiteId};
use tracing::{debug, info, warn};

use crate::airlock::Airlock;
use crate::building::{Building, BuildingCatalog};
use crate::construction::{ConstructionSite, ConstructionValues};
use crate::error::WorldError;

/// A settlement on the surface.
#[derive(Debug, Clone)]
pub struct Settlement {
    /// Settlement identifier.
    pub id: SettlementId,
    /// Display name.
    pub name: String,
    /// The shared resource inventory.
    pub inventory: Inventory,
    /// Pooled airlock slots.
    pub airlock: Airlock,
    /// Cached construction profits.
    pub construction_values: ConstructionValues,
    buildings: Vec<Building>,
    sites: Vec<ConstructionSite>,
    roster: Vec<AgentId>,
    emergency: Option<String>,
    garages: u32,
    population_capacity: u32,
}

impl Settlement {
    /// Create an empty settlement with no buildings.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: SettlementId::new(),
            name: name.into(),
            inventory: Inventory::new(),
            airlock: Airlock::new(0),
            construction_values: ConstructionValues::new(),
            buildings: Vec::new(),
            sites: Vec::new(),
            roster: Vec::new(),
            emergency: None,
            garages: 0,
            population_capacity: 0,
        }
    }

    // -----------------------------------------------------------------------
    // Buildings
    // -----------------------------------------------------------------------

    /// Buildings standing in the settlement.
    pub fn buildings(&self) -> &[Building] {
        &self.buildings
    }

    /// Erect a building, installing its storage, airlocks, and living space.
    pub fn add_building(
        &mut self,
        building_type: &str,
        catalog: &BuildingCatalog,
    ) -> Result<BuildingId, WorldError> {
        let spec = catalog
            .get(building_type)
            .ok_or_else(|| WorldError::UnknownBuildingType(building_type.to_owned()))?;
        let dropped = spec.storage.install(&mut self.inventory)?;
        if !dropped.is_empty() {
            debug!(settlement = %self.name, building_type, ?dropped, "initial stock did not fit");
        }
        self.airlock
            .set_airlock_count(self.airlock.airlock_count().saturating_add(spec.airlocks));
        if spec.garage {
            self.garages = self.garages.saturating_add(1);
        }
        self.population_capacity = self
            .population_capacity
            .saturating_add(spec.population_capacity);

        let building = Building::new(building_type);
        let id = building.id;
        self.buildings.push(building);
        info!(settlement = %self.name, building_type, "building added");
        Ok(id)
    }

    /// Tear down a building. Returns stock lost to the reduced capacity.
    pub fn remove_building(
        &mut self,
        id: BuildingId,
        catalog: &BuildingCatalog,
    ) -> Result<BTreeMap<Resource, f64>, WorldError> {
        let index = self
            .buildings
            .iter()
            .position(|building| building.id == id)
            .ok_or(WorldError::BuildingNotFound(id))?;
        let building = self.buildings.remove(index);
        let spec = catalog
            .get(&building.building_type)
            .ok_or_else(|| WorldError::UnknownBuildingType(building.building_type.clone()))?;

        let lost = spec.storage.uninstall(&mut self.inventory)?;
        self.airlock
            .set_airlock_count(self.airlock.airlock_count().saturating_sub(spec.airlocks));
        if spec.garage {
            self.garages = self.garages.saturating_sub(1);
        }
        self.population_capacity = self
            .population_capacity
            .saturating_sub(spec.population_capacity);
        if !lost.is_empty() {
            warn!(settlement = %self.name, building_type = %building.building_type, ?lost, "stock lost with building");
        }
        Ok(lost)
    }

    /// Whether any building is a vehicle garage.
    pub const fn has_garage(&self) -> bool {
        self.garages > 0
    }

    /// Number of people the buildings can house.
    pub const fn population_capacity(&self) -> u32 {
        self.population_capacity
    }

    // -----------------------------------------------------------------------
    // Roster
    // -----------------------------------------------------------------------

    /// Agents living here, in arrival order.
    pub fn roster(&self) -> &[AgentId] {
        &self.roster
    }

    /// Number of agents on the roster.
    pub fn population(&self) -> usize {
        self.roster.len()
    }

    /// Whether more agents live here than the buildings can house.
    pub fn is_overcrowded(&self) -> bool {
        u32::try_from(self.roster.len()).map_or(true, |count| count > self.population_capacity)
    }

    /// Add an agent to the roster.
    pub fn add_member(&mut self, agent: AgentId) {
        if !self.roster.contains(&agent) {
            self.roster.push(agent);
        }
    }

    /// Remove an agent. Returns `false` if it was not on the roster.
    pub fn remove_member(&mut self, agent: AgentId) -> bool {
        let before = self.roster.len();
        self.roster.retain(|member| *member != agent);
        self.roster.len() != before
    }

    // -----------------------------------------------------------------------
    // Emergencies
    // -----------------------------------------------------------------------

    /// The active emergency, if any.
    pub fn emergency(&self) -> Option<&str> {
        self.emergency.as_deref()
    }

    /// Declare an emergency.
    pub fn set_emergency(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        warn!(settlement = %self.name, %reason, "emergency declared");
        self.emergency = Some(reason);
    }

    /// Clear any emergency.
    pub fn clear_emergency(&mut self) {
        self.emergency = None;
    }

    // -----------------------------------------------------------------------
    // Construction sites
    // -----------------------------------------------------------------------

    /// Sites in creation order.
    pub fn sites(&self) -> &[ConstructionSite] {
        &self.sites
    }

    /// Open a new, empty construction site.
    pub fn create_site(&mut self) -> SiteId {
        let site = ConstructionSite::new(self.id);
        let id = site.id;
        self.sites.push(site);
        id
    }

    /// Look up a site.
    pub fn site(&self, id: SiteId) -> Option<&ConstructionSite> {
        self.sites.iter().find(|site| site.id == id)
    }

    /// Look up a site mutably.
    pub fn site_mut(&mut self, id: SiteId) -> Option<&mut ConstructionSite> {
        self.sites.iter_mut().find(|site| site.id == id)
    }

    /// Move a site's current stage manifest out of the shared inventory.
    ///
    /// Returns whether the materials are on site; all or nothing, like
    /// [`ConstructionStage::load_materials`](crate::ConstructionStage::load_materials).
    pub fn load_site_materials(&mut self, id: SiteId) -> Result<bool, WorldError> {
        let site = self
            .sites
            .iter_mut()
            .find(|site| site.id == id)
            .ok_or(WorldError::SiteNotFound(id))?;
        Ok(site
            .current_stage_mut()
            .is_some_and(|stage| stage.load_materials(&mut self.inventory)))
    }

    /// Remove a site.
    pub fn remove_site(&mut self, id: SiteId) -> Result<ConstructionSite, WorldError> {
        let index = self
            .sites
            .iter()
            .position(|site| site.id == id)
            .ok_or(WorldError::SiteNotFound(id))?;
        Ok(self.sites.remove(index))
    }

    /// Turn a fully built site into a building, removing the site.
    pub fn complete_site(
        &mut self,
        id: SiteId,
        catalog: &BuildingCatalog,
    ) -> Result<BuildingId, WorldError> {
        let site = self.site(id).ok_or(WorldError::SiteNotFound(id))?;
        let Some(stage) = site.current_stage().filter(|_| site.is_all_construction_complete()) else {
            return Err(WorldError::StageOutOfOrder {
                site: id,
                stage: "building".to_owned(),
                after: site.current_stage().map(|stage| stage.info.name.clone()),
            });
        };
        let building_type = stage.info.produced_building().to_owned();
        let building = self.add_building(&building_type, catalog)?;
        self.remove_site(id)?;
        self.construction_values.clear();
        Ok(building)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::construction::ConstructionCatalog;

    fn base() -> (Settlement, BuildingCatalog) {
        let catalog = BuildingCatalog::default();
        let mut settlement = Settlement::new("Schiaparelli Point");
        settlement.add_building("Lander Hab", &catalog).unwrap();
        (settlement, catalog)
    }

    #[test]
    fn buildings_contribute_capacity_and_airlocks() {
        let (mut settlement, catalog) = base();
        assert!((settlement.inventory.capacity(Resource::Water) - 2000.0).abs() < f64::EPSILON);
        assert!((settlement.inventory.stored(Resource::Water) - 1000.0).abs() < f64::EPSILON);
        assert_eq!(settlement.airlock.airlock_count(), 1);
        assert!(!settlement.has_garage());

        settlement.add_building("Garage", &catalog).unwrap();
        assert!(settlement.has_garage());
        assert_eq!(settlement.airlock.airlock_count(), 2);
    }

    #[test]
    fn unknown_building_type_is_rejected() {
        let (mut settlement, catalog) = base();
        assert!(matches!(
            settlement.add_building("Observatory", &catalog),
            Err(WorldError::UnknownBuildingType(_))
        ));
    }

    #[test]
    fn removing_a_building_drops_excess_stock() {
        let (mut settlement, catalog) = base();
        let quarters = settlement.add_building("Residential Quarters", &catalog).unwrap();
        settlement.inventory.store(Resource::Water, 1500.0).unwrap();
        assert!((settlement.inventory.stored(Resource::Water) - 2500.0).abs() < 1e-9);

        let lost = settlement.remove_building(quarters, &catalog).unwrap();
        assert!((lost.get(&Resource::Water).copied().unwrap() - 500.0).abs() < 1e-9);
        assert!((settlement.inventory.stored(Resource::Water) - 2000.0).abs() < 1e-9);
    }

    #[test]
    fn overcrowding_tracks_living_space() {
        let (mut settlement, _) = base();
        for _ in 0..6 {
            settlement.add_member(AgentId::new());
        }
        assert!(!settlement.is_overcrowded());
        settlement.add_member(AgentId::new());
        assert!(settlement.is_overcrowded());
    }

    #[test]
    fn completed_site_becomes_a_building() {
        let (mut settlement, catalog) = base();
        let stages = ConstructionCatalog::default();
        let site = settlement.create_site();
        for name in ["Surface Foundation", "Steel Frame", "Storage Shed"] {
            let info = stages.stage(name).cloned().unwrap();
            let site = settlement.site_mut(site).unwrap();
            site.add_stage(info).unwrap();
            assert!(site.current_stage_mut().unwrap().add_work(1000.0));
        }
        settlement.complete_site(site, &catalog).unwrap();
        assert!(settlement.sites().is_empty());
        assert!(settlement
            .buildings()
            .iter()
            .any(|building| building.building_type == "Storage Shed"));
    }

    #[test]
    fn site_materials_come_out_of_shared_stock() {
        let (mut settlement, catalog) = base();
        settlement.add_building("Storage Shed", &catalog).unwrap();
        let site = settlement.create_site();
        assert!(!settlement.load_site_materials(site).unwrap());

        let foundation = ConstructionCatalog::default()
            .stage("Surface Foundation")
            .cloned()
            .unwrap();
        settlement.site_mut(site).unwrap().add_stage(foundation).unwrap();
        // The shed starts with 800 kg concrete and 300 kg sand.
        assert!(settlement.load_site_materials(site).unwrap());
        assert!((settlement.inventory.stored(Resource::Concrete) - 600.0).abs() < 1e-6);
        assert!((settlement.inventory.stored(Resource::Sand) - 250.0).abs() < 1e-6);
        assert!(settlement.site(site).unwrap().current_stage().unwrap().materials_loaded());
    }

    #[test]
    fn unfinished_site_cannot_complete() {
        let (mut settlement, catalog) = base();
        let site = settlement.create_site();
        assert!(settlement.complete_site(site, &catalog).is_err());
        assert_eq!(settlement.sites().len(), 1);
    }
}
