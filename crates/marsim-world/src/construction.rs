//! Construction sites, stages, the stage-info catalog, and site valuation.
//!
//! A [`ConstructionSite`] grows one [`ConstructionStage`] at a time in the
//! order foundation, frame, building. Each stage instantiates a
//! [`ConstructionStageInfo`] from the [`ConstructionCatalog`], whose
//! `prerequisite` names the stage it must follow.
//!
//! # Valuation
//!
//! A stage's profit is its configured `value` when the settlement holds the
//! full material manifest and the builder is skilled enough, and zero
//! otherwise. [`ConstructionValues`] caches the best profit per site and for
//! a brand-new site; the cache is cleared whenever a stage completes.

use std::collections::BTreeMap;

use marsim_ledger::{Inventory, retrieve_an_resource};
use marsim_types::{ConstructionStageType, Part, Resource, SettlementId, SiteId};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::building::BuildingCatalog;
use crate::error::WorldError;

const fn default_stage_value() -> f64 {
    100.0
}

/// Static description of one kind of construction stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstructionStageInfo {
    /// Unique stage name.
    pub name: String,
    /// Foundation, frame, or building.
    pub stage_type: ConstructionStageType,
    /// Name of the stage this one must follow. `None` for foundations.
    #[serde(default)]
    pub prerequisite: Option<String>,
    /// Work in millisols needed to complete the stage.
    pub work_time: f64,
    /// Minimum construction skill to build this stage.
    #[serde(default)]
    pub skill_required: u32,
    /// Amount resources consumed, in kg.
    #[serde(default)]
    pub resources: BTreeMap<Resource, f64>,
    /// Parts consumed.
    #[serde(default)]
    pub parts: BTreeMap<Part, u32>,
    /// Profit of completing the stage.
    #[serde(default = "default_stage_value")]
    pub value: f64,
    /// Building type produced by a building stage. Defaults to the name.
    #[serde(default)]
    pub building_type: Option<String>,
}

impl ConstructionStageInfo {
    /// Building type a completed building stage produces.
    pub fn produced_building(&self) -> &str {
        self.building_type.as_deref().unwrap_or(&self.name)
    }

    /// Whether an inventory holds the whole manifest.
    pub fn materials_available(&self, inventory: &Inventory) -> bool {
        self.resources
            .iter()
            .all(|(resource, amount)| inventory.has_amount(*resource, *amount))
            && self
                .parts
                .iter()
                .all(|(part, count)| inventory.part_count(*part) >= *count)
    }

    /// Profit of building this stage now: its value if materials and skill
    /// allow, otherwise zero.
    pub fn profit(&self, inventory: &Inventory, construction_skill: u32) -> f64 {
        if construction_skill < self.skill_required || !self.materials_available(inventory) {
            return 0.0;
        }
        self.value.max(0.0)
    }
}

/// The stage-info catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConstructionCatalog {
    stages: Vec<ConstructionStageInfo>,
}

impl ConstructionCatalog {
    /// Build a catalog from explicit entries.
    pub const fn new(stages: Vec<ConstructionStageInfo>) -> Self {
        Self { stages }
    }

    /// Look up a stage info by name.
    pub fn stage(&self, name: &str) -> Option<&ConstructionStageInfo> {
        self.stages.iter().find(|info| info.name == name)
    }

    /// Stage infos a new site can start with.
    pub fn foundations(&self) -> impl Iterator<Item = &ConstructionStageInfo> {
        self.stages.iter().filter(|info| {
            info.stage_type == ConstructionStageType::Foundation && info.prerequisite.is_none()
        })
    }

    /// Stage infos that may follow the named stage.
    pub fn next_stages<'a>(&'a self, after: &'a str) -> impl Iterator<Item = &'a ConstructionStageInfo> {
        self.stages
            .iter()
            .filter(move |info| info.prerequisite.as_deref() == Some(after))
    }

    /// All stage infos in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = &ConstructionStageInfo> {
        self.stages.iter()
    }

    /// Check cross references: names are unique, prerequisites exist and
    /// precede their dependents in stage order, work times are positive,
    /// and building stages produce known building types.
    pub fn validate(&self, buildings: &BuildingCatalog) -> Result<(), WorldError> {
        for (index, info) in self.stages.iter().enumerate() {
            let duplicate = self
                .stages
                .iter()
                .skip(index.saturating_add(1))
                .any(|other| other.name == info.name);
            if duplicate {
                return Err(WorldError::InvalidCatalog {
                    reason: format!("duplicate stage name {}", info.name),
                });
            }
            if !(info.work_time.is_finite() && info.work_time > 0.0) {
                return Err(WorldError::InvalidCatalog {
                    reason: format!("stage {} has non-positive work time", info.name),
                });
            }
            match (&info.prerequisite, info.stage_type) {
                (None, ConstructionStageType::Foundation) => {}
                (None, _) => {
                    return Err(WorldError::InvalidCatalog {
                        reason: format!("stage {} needs a prerequisite", info.name),
                    });
                }
                (Some(prerequisite), stage_type) => {
                    let Some(before) = self.stage(prerequisite) else {
                        return Err(WorldError::UnknownStage(prerequisite.clone()));
                    };
                    if before.stage_type >= stage_type {
                        return Err(WorldError::InvalidCatalog {
                            reason: format!(
                                "stage {} cannot follow {} of the same or later type",
                                info.name, before.name
                            ),
                        });
                    }
                }
            }
            if info.stage_type == ConstructionStageType::Building
                && !buildings.contains(info.produced_building())
            {
                return Err(WorldError::UnknownBuildingType(
                    info.produced_building().to_owned(),
                ));
            }
        }
        Ok(())
    }
}

impl Default for ConstructionCatalog {
    fn default() -> Self {
        Self::new(vec![
            ConstructionStageInfo {
                name: "Surface Foundation".to_owned(),
                stage_type: ConstructionStageType::Foundation,
                prerequisite: None,
                work_time: 150.0,
                skill_required: 0,
                resources: BTreeMap::from([(Resource::Concrete, 200.0), (Resource::Sand, 50.0)]),
                parts: BTreeMap::new(),
                value: 150.0,
                building_type: None,
            },
            ConstructionStageInfo {
                name: "Steel Frame".to_owned(),
                stage_type: ConstructionStageType::Frame,
                prerequisite: Some("Surface Foundation".to_owned()),
                work_time: 200.0,
                skill_required: 0,
                resources: BTreeMap::new(),
                parts: BTreeMap::from([(Part::SteelBeam, 8), (Part::SteelPanel, 4)]),
                value: 250.0,
                building_type: None,
            },
            ConstructionStageInfo {
                name: "Storage Shed".to_owned(),
                stage_type: ConstructionStageType::Building,
                prerequisite: Some("Steel Frame".to_owned()),
                work_time: 250.0,
                skill_required: 1,
                resources: BTreeMap::from([(Resource::Concrete, 100.0)]),
                parts: BTreeMap::from([(Part::AluminumSheet, 6), (Part::Window, 2)]),
                value: 400.0,
                building_type: None,
            },
        ])
    }
}

/// One stage under construction.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstructionStage {
    /// Static stage description.
    pub info: ConstructionStageInfo,
    completed_work: f64,
    materials_loaded: bool,
}

impl ConstructionStage {
    /// Start a stage with no work done.
    pub const fn new(info: ConstructionStageInfo) -> Self {
        Self {
            info,
            completed_work: 0.0,
            materials_loaded: false,
        }
    }

    /// Work done so far, in millisols.
    pub const fn completed_work(&self) -> f64 {
        self.completed_work
    }

    /// Work still needed, never negative.
    pub fn remaining_work(&self) -> f64 {
        (self.info.work_time - self.completed_work).max(0.0)
    }

    /// Whether accumulated work has reached the requirement.
    pub fn is_complete(&self) -> bool {
        self.completed_work >= self.info.work_time
    }

    /// Add work. Returns whether the stage is now complete.
    pub fn add_work(&mut self, work: f64) -> bool {
        if work > 0.0 && !self.is_complete() {
            self.completed_work += work;
        }
        self.is_complete()
    }

    /// Whether the material manifest has been moved onto the site.
    pub const fn materials_loaded(&self) -> bool {
        self.materials_loaded
    }

    /// Move the material manifest from an inventory onto the site.
    ///
    /// All or nothing: returns `false` and takes nothing if anything is
    /// missing. Loading an already-loaded stage is a no-op returning `true`.
    pub fn load_materials(&mut self, inventory: &mut Inventory) -> bool {
        if self.materials_loaded {
            return true;
        }
        if !self.info.materials_available(inventory) {
            debug!(stage = %self.info.name, "construction materials missing");
            return false;
        }
        // Retrieval can still refuse stock within the tolerance; commit only
        // if the whole manifest came out of the copy.
        let mut staged = inventory.clone();
        let resources_taken = self
            .info
            .resources
            .iter()
            .all(|(resource, amount)| retrieve_an_resource(*amount, *resource, &mut staged, true));
        let parts_taken = resources_taken
            && self
                .info
                .parts
                .iter()
                .all(|(part, count)| staged.retrieve_parts(*part, *count, true));
        if !parts_taken {
            debug!(stage = %self.info.name, "construction materials could not be retrieved");
            return false;
        }
        *inventory = staged;
        self.materials_loaded = true;
        true
    }
}

/// A place where a structure is being built.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstructionSite {
    /// Site identifier.
    pub id: SiteId,
    /// Owning settlement.
    pub settlement: SettlementId,
    stages: Vec<ConstructionStage>,
    under_construction: bool,
}

impl ConstructionSite {
    /// Create an empty site.
    pub fn new(settlement: SettlementId) -> Self {
        Self {
            id: SiteId::new(),
            settlement,
            stages: Vec::new(),
            under_construction: false,
        }
    }

    /// Stages in build order.
    pub fn stages(&self) -> &[ConstructionStage] {
        &self.stages
    }

    /// The newest stage, if any.
    pub fn current_stage(&self) -> Option<&ConstructionStage> {
        self.stages.last()
    }

    /// The newest stage, mutably.
    pub fn current_stage_mut(&mut self) -> Option<&mut ConstructionStage> {
        self.stages.last_mut()
    }

    /// Whether the newest stage still needs work.
    pub fn has_unfinished_stage(&self) -> bool {
        self.current_stage().is_some_and(|stage| !stage.is_complete())
    }

    /// Whether the final (building) stage is complete.
    pub fn is_all_construction_complete(&self) -> bool {
        self.current_stage().is_some_and(|stage| {
            stage.info.stage_type == ConstructionStageType::Building && stage.is_complete()
        })
    }

    /// Append the next stage. It must follow the current last stage.
    pub fn add_stage(&mut self, info: ConstructionStageInfo) -> Result<(), WorldError> {
        let after = self.current_stage().map(|stage| stage.info.name.clone());
        let fits = match (&after, &info.prerequisite) {
            (None, None) => info.stage_type == ConstructionStageType::Foundation,
            (Some(last), Some(prerequisite)) => {
                last == prerequisite && !self.has_unfinished_stage()
            }
            _ => false,
        };
        if !fits {
            return Err(WorldError::StageOutOfOrder {
                site: self.id,
                stage: info.name,
                after,
            });
        }
        self.stages.push(ConstructionStage::new(info));
        Ok(())
    }

    /// Whether a mission is currently building here.
    pub const fn is_under_construction(&self) -> bool {
        self.under_construction
    }

    /// Mark the site as (not) being worked on by a mission.
    pub const fn set_under_construction(&mut self, under_construction: bool) {
        self.under_construction = under_construction;
    }

    /// Best profit of continuing this site.
    ///
    /// An unfinished stage is worth its value once its materials are
    /// loaded; otherwise the usual profit rules apply. A finished stage is
    /// worth the best next stage in the catalog.
    pub fn profit(&self, catalog: &ConstructionCatalog, inventory: &Inventory, skill: u32) -> f64 {
        match self.current_stage() {
            None => catalog
                .foundations()
                .map(|info| info.profit(inventory, skill))
                .fold(0.0, f64::max),
            Some(stage) if !stage.is_complete() => {
                if stage.materials_loaded() {
                    stage.info.value.max(0.0)
                } else {
                    stage.info.profit(inventory, skill)
                }
            }
            Some(stage) => catalog
                .next_stages(&stage.info.name)
                .map(|info| info.profit(inventory, skill))
                .fold(0.0, f64::max),
        }
    }
}

/// Cached construction profits for one settlement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConstructionValues {
    new_site_profit: Option<f64>,
    site_profits: BTreeMap<SiteId, f64>,
}

impl ConstructionValues {
    /// Create an empty cache.
    pub const fn new() -> Self {
        Self {
            new_site_profit: None,
            site_profits: BTreeMap::new(),
        }
    }

    /// Best profit of starting a brand-new site.
    pub fn new_site_profit(&mut self, catalog: &ConstructionCatalog, inventory: &Inventory, skill: u32) -> f64 {
        *self.new_site_profit.get_or_insert_with(|| {
            catalog
                .foundations()
                .map(|info| info.profit(inventory, skill))
                .fold(0.0, f64::max)
        })
    }

    /// Best profit of continuing an existing site.
    pub fn site_profit(
        &mut self,
        site: &ConstructionSite,
        catalog: &ConstructionCatalog,
        inventory: &Inventory,
        skill: u32,
    ) -> f64 {
        *self
            .site_profits
            .entry(site.id)
            .or_insert_with(|| site.profit(catalog, inventory, skill))
    }

    /// Forget all cached values.
    pub fn clear(&mut self) {
        self.new_site_profit = None;
        self.site_profits.clear();
    }
}
