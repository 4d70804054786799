//! Supply and demand statistics per resource.
//!
//! Every successful settlement-level store counts as supply; every retrieval
//! request counts toward demand, with the fulfilled amount tracked
//! separately. Valuation code reads these numbers to judge how scarce a
//! resource is.

use std::collections::BTreeMap;

use marsim_types::Resource;
use serde::{Deserialize, Serialize};

/// Accumulated flow counters for one resource.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceFlow {
    /// Total kg stored.
    pub supply_amount: f64,
    /// Number of successful stores.
    pub supply_count: u64,
    /// Total kg requested.
    pub requested_amount: f64,
    /// Number of retrieval requests, fulfilled or not.
    pub request_count: u64,
    /// Total kg actually retrieved.
    pub demand_amount: f64,
    /// Number of fulfilled retrievals.
    pub demand_count: u64,
}

impl ResourceFlow {
    /// Fraction of requests that were fulfilled, 1.0 when nothing was asked.
    pub fn fulfillment_ratio(&self) -> f64 {
        if self.request_count == 0 {
            return 1.0;
        }
        let fulfilled = u32::try_from(self.demand_count).map_or(f64::from(u32::MAX), f64::from);
        let requested = u32::try_from(self.request_count).map_or(f64::from(u32::MAX), f64::from);
        (fulfilled / requested).clamp(0.0, 1.0)
    }
}

/// Flow counters for every resource of one inventory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlowLedger {
    flows: BTreeMap<Resource, ResourceFlow>,
}

impl FlowLedger {
    /// Create an empty flow ledger.
    pub const fn new() -> Self {
        Self {
            flows: BTreeMap::new(),
        }
    }

    /// Record a successful store of `amount` kg.
    pub fn record_supply(&mut self, resource: Resource, amount: f64) {
        let flow = self.flows.entry(resource).or_default();
        flow.supply_amount += amount;
        flow.supply_count = flow.supply_count.saturating_add(1);
    }

    /// Record a retrieval request for `amount` kg.
    pub fn record_request(&mut self, resource: Resource, amount: f64) {
        let flow = self.flows.entry(resource).or_default();
        flow.requested_amount += amount;
        flow.request_count = flow.request_count.saturating_add(1);
    }

    /// Record a fulfilled retrieval of `amount` kg.
    pub fn record_demand(&mut self, resource: Resource, amount: f64) {
        let flow = self.flows.entry(resource).or_default();
        flow.demand_amount += amount;
        flow.demand_count = flow.demand_count.saturating_add(1);
    }

    /// Counters for a resource; zeroed if it never moved.
    pub fn flow(&self, resource: Resource) -> ResourceFlow {
        self.flows.get(&resource).copied().unwrap_or_default()
    }

    /// Forget all counters, e.g. at the start of a new sol.
    pub fn reset(&mut self) {
        self.flows.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unfulfilled_requests_lower_the_ratio() {
        let mut flows = FlowLedger::new();
        flows.record_request(Resource::Food, 1.0);
        flows.record_request(Resource::Food, 1.0);
        flows.record_demand(Resource::Food, 1.0);
        let food = flows.flow(Resource::Food);
        assert_eq!(food.request_count, 2);
        assert_eq!(food.demand_count, 1);
        assert!((food.fulfillment_ratio() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn untouched_resource_is_fully_satisfied() {
        let flows = FlowLedger::new();
        assert!((flows.flow(Resource::Ice).fulfillment_ratio() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn reset_clears_counters() {
        let mut flows = FlowLedger::new();
        flows.record_supply(Resource::Water, 5.0);
        flows.reset();
        assert_eq!(flows.flow(Resource::Water).supply_count, 0);
    }
}
