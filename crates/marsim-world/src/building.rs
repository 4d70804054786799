//! Building types and the storage-capacity table.
//!
//! The [`BuildingCatalog`] is externally supplied data keyed by building
//! type name. A settlement's capacities are the sum of its buildings'
//! [`StorageSpec`]s; airlocks, garages, and living space come from the same
//! table.

use std::collections::BTreeMap;

use marsim_ledger::StorageSpec;
use marsim_types::{BuildingId, Resource};
use serde::{Deserialize, Serialize};

/// What one building type provides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildingSpec {
    /// Storage capacity and starting stock.
    #[serde(default)]
    pub storage: StorageSpec,
    /// Number of airlocks.
    #[serde(default)]
    pub airlocks: u32,
    /// Whether the building is a vehicle garage.
    #[serde(default)]
    pub garage: bool,
    /// Number of people the building can house.
    #[serde(default)]
    pub population_capacity: u32,
}

/// All known building types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BuildingCatalog {
    specs: BTreeMap<String, BuildingSpec>,
}

impl BuildingCatalog {
    /// Build a catalog from explicit entries.
    pub const fn new(specs: BTreeMap<String, BuildingSpec>) -> Self {
        Self { specs }
    }

    /// Look up a building type.
    pub fn get(&self, building_type: &str) -> Option<&BuildingSpec> {
        self.specs.get(building_type)
    }

    /// Whether a building type is known.
    pub fn contains(&self, building_type: &str) -> bool {
        self.specs.contains_key(building_type)
    }

    /// Number of building types.
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

impl Default for BuildingCatalog {
    fn default() -> Self {
        let lander_hab = BuildingSpec {
            storage: StorageSpec {
                capacities: BTreeMap::from([
                    (Resource::Water, 2000.0),
                    (Resource::Oxygen, 1000.0),
                    (Resource::Food, 1000.0),
                    (Resource::CarbonDioxide, 200.0),
                ]),
                initial: BTreeMap::from([
                    (Resource::Water, 1000.0),
                    (Resource::Oxygen, 500.0),
                    (Resource::Food, 400.0),
                ]),
            },
            airlocks: 1,
            garage: false,
            population_capacity: 6,
        };
        let storage_shed = BuildingSpec {
            storage: StorageSpec {
                capacities: BTreeMap::from([
                    (Resource::Ice, 2000.0),
                    (Resource::Regolith, 2000.0),
                    (Resource::Concrete, 2000.0),
                    (Resource::Sand, 1000.0),
                    (Resource::Methane, 500.0),
                    (Resource::Hydrogen, 200.0),
                ]),
                initial: BTreeMap::from([(Resource::Concrete, 800.0), (Resource::Sand, 300.0)]),
            },
            airlocks: 0,
            garage: false,
            population_capacity: 0,
        };
        let garage = BuildingSpec {
            storage: StorageSpec::default(),
            airlocks: 1,
            garage: true,
            population_capacity: 0,
        };
        let residential = BuildingSpec {
            storage: StorageSpec {
                capacities: BTreeMap::from([(Resource::Water, 500.0), (Resource::Food, 200.0)]),
                initial: BTreeMap::new(),
            },
            airlocks: 1,
            garage: false,
            population_capacity: 8,
        };

        Self::new(BTreeMap::from([
            ("Lander Hab".to_owned(), lander_hab),
            ("Storage Shed".to_owned(), storage_shed),
            ("Garage".to_owned(), garage),
            ("Residential Quarters".to_owned(), residential),
        ]))
    }
}

/// A building standing in a settlement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Building {
    /// Building identifier.
    pub id: BuildingId,
    /// Building type name, a key of the [`BuildingCatalog`].
    pub building_type: String,
}

impl Building {
    /// Create a building of the given type.
    pub fn new(building_type: impl Into<String>) -> Self {
        Self {
            id: BuildingId::new(),
            building_type: building_type.into(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_catalog_has_a_garage_and_a_hab() {
        let catalog = BuildingCatalog::default();
        assert!(catalog.get("Garage").unwrap().garage);
        assert_eq!(catalog.get("Lander Hab").unwrap().airlocks, 1);
        assert!(!catalog.contains("Observatory"));
    }

    #[test]
    fn catalog_parses_from_yaml() {
        let yaml = r"
Greenhouse:
  storage:
    capacities:
      water: 300.0
  population_capacity: 0
Dome:
  airlocks: 2
";
        let catalog: BuildingCatalog = serde_yml::from_str(yaml).unwrap();
        assert_eq!(catalog.len(), 2);
        let greenhouse = catalog.get("Greenhouse").unwrap();
        assert!(
            (greenhouse.storage.capacities.get(&Resource::Water).copied().unwrap() - 300.0).abs()
                < f64::EPSILON
        );
        assert_eq!(catalog.get("Dome").unwrap().airlocks, 2);
    }
}
