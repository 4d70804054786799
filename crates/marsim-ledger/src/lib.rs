//! Shared resource bookkeeping for settlements and vehicles.
//!
//! Every container that holds resources -- a settlement, a rover's cargo
//! bay -- owns an [`Inventory`]. Tasks and missions move resources only
//! through it, so the two invariants below hold everywhere:
//!
//! 1. The stored amount of a resource never exceeds its capacity.
//! 2. A retrieval never drives a stored amount negative.
//!
//! # Architecture
//!
//! - [`inventory`] -- The [`Inventory`] struct: capacities, stock, parts.
//! - [`storage`] -- Settlement-level store/retrieve helpers and building
//!   storage installation.
//! - [`flows`] -- Supply and demand statistics per resource.
//! - [`audit`] -- End-of-step invariant checks.
//!
//! # Tolerance
//!
//! Amounts below [`AMOUNT_EPSILON`] (1e-5 kg) are treated as zero when
//! deciding whether a resource is depleted. Floating-point residue such as
//! `2.0e-12` kg of water left after a long sequence of withdrawals must not
//! count as "available".
//!
//! # Usage
//!
//! ```
//! use marsim_ledger::Inventory;
//! use marsim_types::Resource;
//!
//! let mut inventory = Inventory::new();
//! inventory.add_capacity(Resource::Water, 1000.0).ok();
//! let stored = inventory.store(Resource::Water, 1200.0).unwrap_or(0.0);
//! assert!((stored - 1000.0).abs() < 1e-9);
//! assert!(inventory.retrieve(Resource::Water, 100.0, true));
//! ```

pub mod audit;
pub mod flows;
pub mod inventory;
pub mod storage;

// Re-export primary types at crate root.
pub use audit::{AuditResult, InventoryAnomaly};
pub use flows::{FlowLedger, ResourceFlow};
pub use inventory::{AMOUNT_EPSILON, Inventory};
pub use storage::{StorageSpec, retrieve_an_resource, store_an_resource};

use marsim_types::{Part, Resource};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur when mutating an inventory.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// An amount was negative, NaN, or infinite.
    #[error("invalid amount {amount} for {resource}")]
    InvalidAmount {
        /// The resource the amount was for.
        resource: Resource,
        /// The rejected amount.
        amount: f64,
    },

    /// A part count would overflow.
    #[error("part count overflow for {part}")]
    PartOverflow {
        /// The part whose count overflowed.
        part: Part,
    },
}
