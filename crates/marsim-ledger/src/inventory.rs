//! Per-container resource capacities and stock.
//!
//! An [`Inventory`] tracks three things:
//!
//! - **Amount resources** ([`Resource`]): a capacity and a stored amount in kg.
//! - **Parts** ([`Part`]): an unbounded integer count.
//! - **Flows**: supply and demand statistics, see [`FlowLedger`].
//!
//! Capacity is added and removed by the buildings (or vehicle) that provide
//! it. Stored amounts are clamped to capacity on every path.

use std::collections::BTreeMap;

use marsim_types::{Part, Resource};

use crate::LedgerError;
use crate::flows::FlowLedger;

/// Amounts at or below this many kilograms count as empty.
pub const AMOUNT_EPSILON: f64 = 0.000_01;

/// Resource capacities, stock, and part counts for one container.
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    /// Capacity in kg per resource. Missing means zero.
    capacity: BTreeMap<Resource, f64>,
    /// Stored kg per resource. Missing means zero.
    stored: BTreeMap<Resource, f64>,
    /// Part counts.
    parts: BTreeMap<Part, u32>,
    /// Supply and demand statistics.
    flows: FlowLedger,
}

fn valid_amount(amount: f64) -> bool {
    amount.is_finite() && amount >= 0.0
}

impl Inventory {
    /// Create an empty inventory with no capacity.
    pub const fn new() -> Self {
        Self {
            capacity: BTreeMap::new(),
            stored: BTreeMap::new(),
            parts: BTreeMap::new(),
            flows: FlowLedger::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Amount resources
    // -----------------------------------------------------------------------

    /// Total capacity for a resource in kg.
    pub fn capacity(&self, resource: Resource) -> f64 {
        self.capacity.get(&resource).copied().unwrap_or(0.0)
    }

    /// Stored amount of a resource in kg.
    pub fn stored(&self, resource: Resource) -> f64 {
        self.stored.get(&resource).copied().unwrap_or(0.0)
    }

    /// Capacity still free for a resource, never negative.
    pub fn remaining_capacity(&self, resource: Resource) -> f64 {
        (self.capacity(resource) - self.stored(resource)).max(0.0)
    }

    /// Increase the capacity for a resource.
    pub fn add_capacity(&mut self, resource: Resource, amount: f64) -> Result<(), LedgerError> {
        if !valid_amount(amount) {
            return Err(LedgerError::InvalidAmount { resource, amount });
        }
        let entry = self.capacity.entry(resource).or_insert(0.0);
        *entry += amount;
        Ok(())
    }

    /// Decrease the capacity for a resource.
    ///
    /// Capacity bottoms out at zero. Any stock above the new capacity is
    /// discarded; the discarded amount is returned.
    pub fn remove_capacity(&mut self, resource: Resource, amount: f64) -> Result<f64, LedgerError> {
        if !valid_amount(amount) {
            return Err(LedgerError::InvalidAmount { resource, amount });
        }
        let new_capacity = (self.capacity(resource) - amount).max(0.0);
        self.capacity.insert(resource, new_capacity);

        let stored = self.stored(resource);
        if stored > new_capacity {
            self.stored.insert(resource, new_capacity);
            return Ok(stored - new_capacity);
        }
        Ok(0.0)
    }

    /// Store up to `amount` kg of a resource.
    ///
    /// The amount is clamped to the remaining capacity. Returns the amount
    /// actually stored, which may be less than requested (or zero).
    pub fn store(&mut self, resource: Resource, amount: f64) -> Result<f64, LedgerError> {
        if !valid_amount(amount) {
            return Err(LedgerError::InvalidAmount { resource, amount });
        }
        let accepted = amount.min(self.remaining_capacity(resource));
        if accepted > 0.0 {
            let entry = self.stored.entry(resource).or_insert(0.0);
            *entry += accepted;
        }
        Ok(accepted)
    }

    /// Retrieve `amount` kg of a resource.
    ///
    /// With `commit == false` this is a dry run: it only reports whether
    /// the amount is available. With `commit == true` the stock is reduced
    /// if and only if it is sufficient; otherwise nothing changes.
    /// Negative or non-finite requests are refused.
    pub fn retrieve(&mut self, resource: Resource, amount: f64, commit: bool) -> bool {
        if !valid_amount(amount) {
            return false;
        }
        let stored = self.stored(resource);
        if stored + AMOUNT_EPSILON < amount {
            return false;
        }
        if commit {
            let mut remaining = stored - amount;
            if remaining < AMOUNT_EPSILON {
                remaining = 0.0;
            }
            self.stored.insert(resource, remaining);
        }
        true
    }

    /// Whether at least `amount` kg of a resource is stored.
    pub fn has_amount(&self, resource: Resource, amount: f64) -> bool {
        valid_amount(amount) && self.stored(resource) + AMOUNT_EPSILON >= amount
    }

    /// Iterate over every resource with a non-negligible stored amount.
    pub fn stored_resources(&self) -> impl Iterator<Item = (Resource, f64)> + '_ {
        self.stored
            .iter()
            .filter(|(_, amount)| **amount > AMOUNT_EPSILON)
            .map(|(resource, amount)| (*resource, *amount))
    }

    /// Iterate over every resource with a configured capacity.
    pub fn capacities(&self) -> impl Iterator<Item = (Resource, f64)> + '_ {
        self.capacity.iter().map(|(resource, cap)| (*resource, *cap))
    }

    /// Total stored mass of amount resources in kg.
    pub fn total_mass(&self) -> f64 {
        self.stored.values().sum()
    }

    // -----------------------------------------------------------------------
    // Parts
    // -----------------------------------------------------------------------

    /// Number of a part on hand.
    pub fn part_count(&self, part: Part) -> u32 {
        self.parts.get(&part).copied().unwrap_or(0)
    }

    /// Whether at least one of a part is on hand.
    pub fn has_part(&self, part: Part) -> bool {
        self.part_count(part) > 0
    }

    /// Add parts.
    pub fn store_parts(&mut self, part: Part, count: u32) -> Result<(), LedgerError> {
        let current = self.part_count(part);
        let updated = current
            .checked_add(count)
            .ok_or(LedgerError::PartOverflow { part })?;
        self.parts.insert(part, updated);
        Ok(())
    }

    /// Remove parts, all or nothing. `commit == false` is a dry run.
    pub fn retrieve_parts(&mut self, part: Part, count: u32, commit: bool) -> bool {
        let Some(remaining) = self.part_count(part).checked_sub(count) else {
            return false;
        };
        if commit {
            if remaining == 0 {
                self.parts.remove(&part);
            } else {
                self.parts.insert(part, remaining);
            }
        }
        true
    }

    /// Iterate over every part with a non-zero count.
    pub fn parts(&self) -> impl Iterator<Item = (Part, u32)> + '_ {
        self.parts.iter().map(|(part, count)| (*part, *count))
    }

    // -----------------------------------------------------------------------
    // Flow statistics
    // -----------------------------------------------------------------------

    /// Supply and demand statistics.
    pub const fn flows(&self) -> &FlowLedger {
        &self.flows
    }

    /// Mutable supply and demand statistics.
    pub const fn flows_mut(&mut self) -> &mut FlowLedger {
        &mut self.flows
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn water_tank(capacity: f64, stored: f64) -> Inventory {
        let mut inv = Inventory::new();
        inv.add_capacity(Resource::Water, capacity).unwrap();
        inv.store(Resource::Water, stored).unwrap();
        inv
    }

    #[test]
    fn committed_retrieve_fails_without_mutation_when_short() {
        let mut inv = water_tank(500.0, 99.0);
        assert!(!inv.retrieve(Resource::Water, 100.0, true));
        assert!((inv.stored(Resource::Water) - 99.0).abs() < f64::EPSILON);
    }

    #[test]
    fn committed_retrieve_decrements_exactly() {
        let mut inv = water_tank(500.0, 150.0);
        assert!(inv.retrieve(Resource::Water, 100.0, true));
        assert!((inv.stored(Resource::Water) - 50.0).abs() < f64::EPSILON);

        let mut exact = water_tank(500.0, 100.0);
        assert!(exact.retrieve(Resource::Water, 100.0, true));
        assert!(exact.stored(Resource::Water).abs() < f64::EPSILON);
    }

    #[test]
    fn dry_run_never_mutates() {
        let mut inv = water_tank(500.0, 150.0);
        assert!(inv.retrieve(Resource::Water, 100.0, false));
        assert!(!inv.retrieve(Resource::Water, 200.0, false));
        assert!((inv.stored(Resource::Water) - 150.0).abs() < f64::EPSILON);
    }

    #[test]
    fn store_clamps_to_capacity() {
        let mut inv = water_tank(100.0, 80.0);
        let accepted = inv.store(Resource::Water, 50.0).unwrap();
        assert!((accepted - 20.0).abs() < f64::EPSILON);
        assert!((inv.stored(Resource::Water) - 100.0).abs() < f64::EPSILON);
        assert!(inv.remaining_capacity(Resource::Water).abs() < f64::EPSILON);
    }

    #[test]
    fn store_without_capacity_stores_nothing() {
        let mut inv = Inventory::new();
        let accepted = inv.store(Resource::Oxygen, 10.0).unwrap();
        assert!(accepted.abs() < f64::EPSILON);
        assert!(inv.stored(Resource::Oxygen).abs() < f64::EPSILON);
    }

    #[test]
    fn negative_amounts_are_rejected() {
        let mut inv = water_tank(100.0, 10.0);
        assert!(inv.store(Resource::Water, -1.0).is_err());
        assert!(inv.add_capacity(Resource::Water, f64::NAN).is_err());
        assert!(!inv.retrieve(Resource::Water, -5.0, true));
        assert!((inv.stored(Resource::Water) - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn residue_below_tolerance_is_zeroed() {
        let mut inv = water_tank(100.0, 10.000_001);
        assert!(inv.retrieve(Resource::Water, 10.0, true));
        assert!(inv.stored(Resource::Water).abs() < f64::EPSILON);
        assert_eq!(inv.stored_resources().count(), 0);
    }

    #[test]
    fn removing_capacity_discards_excess_stock() {
        let mut inv = water_tank(300.0, 250.0);
        let lost = inv.remove_capacity(Resource::Water, 100.0).unwrap();
        assert!((lost - 50.0).abs() < f64::EPSILON);
        assert!((inv.stored(Resource::Water) - 200.0).abs() < f64::EPSILON);
        assert!((inv.capacity(Resource::Water) - 200.0).abs() < f64::EPSILON);
    }

    #[test]
    fn parts_are_all_or_nothing() {
        let mut inv = Inventory::new();
        inv.store_parts(Part::EvaSuit, 2).unwrap();
        assert!(!inv.retrieve_parts(Part::EvaSuit, 3, true));
        assert_eq!(inv.part_count(Part::EvaSuit), 2);
        assert!(inv.retrieve_parts(Part::EvaSuit, 2, true));
        assert!(!inv.has_part(Part::EvaSuit));
    }

    #[test]
    fn part_overflow_is_an_error() {
        let mut inv = Inventory::new();
        inv.store_parts(Part::Bag, u32::MAX).unwrap();
        assert!(inv.store_parts(Part::Bag, 1).is_err());
        assert_eq!(inv.part_count(Part::Bag), u32::MAX);
    }
}
