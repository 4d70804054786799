//! Inventory invariant checks.
//!
//! The inventory API already clamps every mutation, so a healthy inventory
//! always passes. The step loop still audits every container after each
//! step and reports an [`InventoryAnomaly`] if a resource is negative or
//! above capacity, which would mean a bug in a caller that bypassed the API.

use std::collections::BTreeMap;

use marsim_types::Resource;

use crate::inventory::{AMOUNT_EPSILON, Inventory};

/// A violated inventory invariant.
#[derive(Debug, Clone, PartialEq)]
pub struct InventoryAnomaly {
    /// Offending resources: (stored, capacity).
    pub violations: BTreeMap<Resource, (f64, f64)>,
    /// Human-readable description.
    pub message: String,
}

impl core::fmt::Display for InventoryAnomaly {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// The result of auditing one inventory.
#[derive(Debug, Clone, PartialEq)]
pub enum AuditResult {
    /// Every resource is within `[0, capacity]`.
    Consistent,
    /// At least one resource is out of bounds.
    Anomaly(InventoryAnomaly),
}

impl AuditResult {
    /// Whether the audit passed.
    pub const fn is_consistent(&self) -> bool {
        matches!(self, Self::Consistent)
    }
}

/// Check that no stored amount is negative or above capacity.
pub fn audit(inventory: &Inventory) -> AuditResult {
    let mut violations = BTreeMap::new();

    for (resource, capacity) in inventory.capacities() {
        let stored = inventory.stored(resource);
        if stored < -AMOUNT_EPSILON || stored > capacity + AMOUNT_EPSILON {
            violations.insert(resource, (stored, capacity));
        }
    }
    for (resource, stored) in inventory.stored_resources() {
        if inventory.capacity(resource) <= 0.0 && stored > AMOUNT_EPSILON {
            violations.insert(resource, (stored, 0.0));
        }
    }

    if violations.is_empty() {
        return AuditResult::Consistent;
    }

    let details: Vec<String> = violations
        .iter()
        .map(|(resource, (stored, capacity))| format!("{resource}: {stored:.3}/{capacity:.3}"))
        .collect();
    AuditResult::Anomaly(InventoryAnomaly {
        message: format!("inventory out of bounds: {}", details.join(", ")),
        violations,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn api_mutations_keep_inventory_consistent() {
        let mut inv = Inventory::new();
        inv.add_capacity(Resource::Water, 10.0).unwrap();
        inv.store(Resource::Water, 25.0).unwrap();
        inv.retrieve(Resource::Water, 3.0, true);
        inv.remove_capacity(Resource::Water, 5.0).unwrap();
        assert!(audit(&inv).is_consistent());
    }

    #[test]
    fn empty_inventory_is_consistent() {
        assert_eq!(audit(&Inventory::new()), AuditResult::Consistent);
    }
}
