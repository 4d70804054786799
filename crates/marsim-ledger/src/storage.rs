//! Settlement-level storage helpers.
//!
//! [`store_an_resource`] and [`retrieve_an_resource`] are the
//! all-or-nothing entry points tasks use against a settlement inventory:
//! unlike [`Inventory::store`], a store that does not fit is refused
//! outright instead of being clamped. Both record flow statistics.
//!
//! [`StorageSpec`] describes what one building type contributes to its
//! settlement's capacity and starting stock. Installing a building adds the
//! capacity; removing it takes the capacity away again along with any stock
//! that no longer fits.

use std::collections::BTreeMap;

use marsim_types::Resource;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::LedgerError;
use crate::inventory::{AMOUNT_EPSILON, Inventory};

/// Store `amount` kg of a resource if it fits entirely.
///
/// Returns `false` and stores nothing when the remaining capacity is less
/// than `amount`.
pub fn store_an_resource(amount: f64, resource: Resource, inventory: &mut Inventory) -> bool {
    let remaining = inventory.remaining_capacity(resource);
    if remaining < amount {
        debug!(
            %resource,
            amount,
            remaining,
            "not enough storage capacity, nothing stored"
        );
        return false;
    }
    match inventory.store(resource, amount) {
        Ok(stored) => {
            inventory.flows_mut().record_supply(resource, stored);
            true
        }
        Err(e) => {
            warn!(%resource, amount, error = %e, "store rejected");
            false
        }
    }
}

/// Retrieve `amount` kg of a resource if enough is stored.
///
/// The stored amount is rounded to five decimals before the check so that
/// floating-point residue does not count as stock. When `is_retrieving` is
/// `false` the call only checks availability.
pub fn retrieve_an_resource(
    amount: f64,
    resource: Resource,
    inventory: &mut Inventory,
    is_retrieving: bool,
) -> bool {
    inventory.flows_mut().record_request(resource, amount);

    let stored = round_to_tolerance(inventory.stored(resource));
    if stored < AMOUNT_EPSILON {
        debug!(%resource, amount, "resource depleted");
        return false;
    }
    if stored < amount {
        debug!(%resource, amount, stored, "not enough stored");
        return false;
    }
    if is_retrieving {
        if !inventory.retrieve(resource, amount, true) {
            return false;
        }
        inventory.flows_mut().record_demand(resource, amount);
    }
    true
}

fn round_to_tolerance(amount: f64) -> f64 {
    (amount * 100_000.0).round() / 100_000.0
}

/// Storage a building type contributes to its settlement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageSpec {
    /// Capacity added per resource, in kg.
    #[serde(default)]
    pub capacities: BTreeMap<Resource, f64>,
    /// Stock delivered with the building, in kg. Clamped to free capacity.
    #[serde(default)]
    pub initial: BTreeMap<Resource, f64>,
}

impl StorageSpec {
    /// Whether this building stores anything at all.
    pub fn is_empty(&self) -> bool {
        self.capacities.is_empty() && self.initial.is_empty()
    }

    /// Add this building's capacity and starting stock to an inventory.
    ///
    /// Starting stock that exceeds the free capacity is dropped; the
    /// dropped amounts are returned per resource.
    pub fn install(&self, inventory: &mut Inventory) -> Result<BTreeMap<Resource, f64>, LedgerError> {
        for (resource, capacity) in &self.capacities {
            inventory.add_capacity(*resource, *capacity)?;
        }

        let mut dropped = BTreeMap::new();
        for (resource, amount) in &self.initial {
            let stored = inventory.store(*resource, *amount)?;
            if stored < *amount {
                let excess = *amount - stored;
                debug!(%resource, excess, "initial stock exceeds capacity");
                dropped.insert(*resource, excess);
            }
        }
        Ok(dropped)
    }

    /// Remove this building's capacity from an inventory.
    ///
    /// Returns the stock that no longer fits and was discarded.
    pub fn uninstall(&self, inventory: &mut Inventory) -> Result<BTreeMap<Resource, f64>, LedgerError> {
        let mut lost = BTreeMap::new();
        for (resource, capacity) in &self.capacities {
            let excess = inventory.remove_capacity(*resource, *capacity)?;
            if excess > 0.0 {
                lost.insert(*resource, excess);
            }
        }
        Ok(lost)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn tank(capacity: f64) -> Inventory {
        let mut inv = Inventory::new();
        inv.add_capacity(Resource::Water, capacity).unwrap();
        inv
    }

    #[test]
    fn store_refuses_when_no_spare_capacity() {
        let mut inv = tank(100.0);
        inv.store(Resource::Water, 100.0).unwrap();
        assert!(!store_an_resource(50.0, Resource::Water, &mut inv));
        assert!((inv.stored(Resource::Water) - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn store_that_fits_is_exact() {
        let mut inv = tank(1000.0);
        assert!(store_an_resource(200.0, Resource::Water, &mut inv));
        assert!((inv.stored(Resource::Water) - 200.0).abs() < f64::EPSILON);
        assert_eq!(inv.flows().flow(Resource::Water).supply_count, 1);
    }

    #[test]
    fn retrieve_checks_without_taking() {
        let mut inv = tank(1000.0);
        inv.store(Resource::Water, 40.0).unwrap();
        assert!(retrieve_an_resource(30.0, Resource::Water, &mut inv, false));
        assert!((inv.stored(Resource::Water) - 40.0).abs() < f64::EPSILON);
        assert!(retrieve_an_resource(30.0, Resource::Water, &mut inv, true));
        assert!((inv.stored(Resource::Water) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn retrieve_ignores_floating_point_residue() {
        let mut inv = tank(1000.0);
        inv.store(Resource::Water, 0.000_001).unwrap();
        assert!(!retrieve_an_resource(0.000_001, Resource::Water, &mut inv, true));
        let flow = inv.flows().flow(Resource::Water);
        assert_eq!(flow.request_count, 1);
        assert_eq!(flow.demand_count, 0);
    }

    #[test]
    fn install_clamps_initial_stock() {
        let spec = StorageSpec {
            capacities: BTreeMap::from([(Resource::Oxygen, 100.0)]),
            initial: BTreeMap::from([(Resource::Oxygen, 150.0)]),
        };
        let mut inv = Inventory::new();
        let dropped = spec.install(&mut inv).unwrap();
        assert!((inv.stored(Resource::Oxygen) - 100.0).abs() < f64::EPSILON);
        assert!((dropped.get(&Resource::Oxygen).copied().unwrap() - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn capacities_sum_across_buildings_and_uninstall_drops_excess() {
        let spec = StorageSpec {
            capacities: BTreeMap::from([(Resource::Ice, 500.0)]),
            initial: BTreeMap::new(),
        };
        let mut inv = Inventory::new();
        spec.install(&mut inv).unwrap();
        spec.install(&mut inv).unwrap();
        assert!((inv.capacity(Resource::Ice) - 1000.0).abs() < f64::EPSILON);

        inv.store(Resource::Ice, 800.0).unwrap();
        let lost = spec.uninstall(&mut inv).unwrap();
        assert!((lost.get(&Resource::Ice).copied().unwrap() - 300.0).abs() < f64::EPSILON);
        assert!((inv.stored(Resource::Ice) - 500.0).abs() < f64::EPSILON);
    }
}
