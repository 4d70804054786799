//! Airlock occupancy.
//!
//! A settlement's airlocks are pooled: each airlock cycles up to
//! [`SLOTS_PER_AIRLOCK`] agents at once. An agent holds a slot for the whole
//! time it is cycling through and must release it exactly once.

use marsim_types::AgentId;

/// Agents one airlock can cycle at the same time.
pub const SLOTS_PER_AIRLOCK: u32 = 4;

/// Pooled airlock slots of one settlement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Airlock {
    airlocks: u32,
    occupants: Vec<AgentId>,
}

impl Airlock {
    /// Create a pool backed by `airlocks` airlocks.
    pub const fn new(airlocks: u32) -> Self {
        Self {
            airlocks,
            occupants: Vec::new(),
        }
    }

    /// Number of physical airlocks.
    pub const fn airlock_count(&self) -> u32 {
        self.airlocks
    }

    /// Add or remove airlocks as buildings come and go.
    pub const fn set_airlock_count(&mut self, airlocks: u32) {
        self.airlocks = airlocks;
    }

    /// Total simultaneous slots.
    pub const fn capacity(&self) -> u32 {
        self.airlocks.saturating_mul(SLOTS_PER_AIRLOCK)
    }

    /// Number of agents currently cycling.
    pub fn occupant_count(&self) -> usize {
        self.occupants.len()
    }

    /// Whether the agent currently holds a slot.
    pub fn is_occupant(&self, agent: AgentId) -> bool {
        self.occupants.contains(&agent)
    }

    /// Whether a slot is free.
    pub fn has_free_slot(&self) -> bool {
        u32::try_from(self.occupants.len()).is_ok_and(|used| used < self.capacity())
    }

    /// Take a slot. Returns `true` if the agent now holds one, including
    /// when it already did.
    pub fn try_acquire(&mut self, agent: AgentId) -> bool {
        if self.is_occupant(agent) {
            return true;
        }
        if !self.has_free_slot() {
            return false;
        }
        self.occupants.push(agent);
        true
    }

    /// Give a slot back. Returns `false` if the agent held none.
    pub fn release(&mut self, agent: AgentId) -> bool {
        let before = self.occupants.len();
        self.occupants.retain(|occupant| *occupant != agent);
        self.occupants.len() != before
    }
}
