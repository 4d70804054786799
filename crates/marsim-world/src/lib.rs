//! Settlements, vehicles, construction sites, and surface conditions for the
//! Mars colony simulation.
//!
//! # Modules
//!
//! - [`airlock`] -- Pooled airlock slots per settlement.
//! - [`building`] -- Building types and the storage-capacity catalog.
//! - [`construction`] -- Construction sites, ordered stages, the stage-info
//!   catalog, and profit valuation.
//! - [`error`] -- Error types for world operations.
//! - [`settlement`] -- [`Settlement`]: shared inventory, buildings, roster,
//!   and sites.
//! - [`surface`] -- Daylight and deterministic radiation events.
//! - [`vehicle`] -- Ground vehicles with mission and maintenance
//!   reservations.
//! - [`world`] -- [`World`]: the registry of settlements and vehicles.

pub mod airlock;
pub mod building;
pub mod construction;
pub mod error;
pub mod settlement;
pub mod surface;
pub mod vehicle;
pub mod world;

// Re-export primary types at crate root.
pub use airlock::{Airlock, SLOTS_PER_AIRLOCK};
pub use building::{Building, BuildingCatalog, BuildingSpec};
pub use construction::{
    ConstructionCatalog, ConstructionSite, ConstructionStage, ConstructionStageInfo,
    ConstructionValues,
};
pub use error::WorldError;
pub use settlement::Settlement;
pub use surface::{
    DARKNESS_THRESHOLD, SUNRISE_MILLISOL, SUNSET_MILLISOL, SurfaceConditions, SurfaceConfig,
    SurfaceSystem, daylight_fraction,
};
pub use vehicle::Vehicle;
pub use world::World;
