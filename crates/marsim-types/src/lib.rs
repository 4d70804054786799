//! Shared type definitions for the Mars colony simulation.
//!
//! This crate is the single source of truth for identifiers, catalog enums,
//! and the display snapshots handed to query consumers. Snapshot types flow
//! downstream to `TypeScript` via `ts-rs`.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for all entity identifiers
//! - [`enums`] -- Catalog enumerations (resources, parts, skills, jobs, vehicles)
//! - [`snapshots`] -- Read-only display snapshots (clock, agents, missions)

pub mod enums;
pub mod ids;
pub mod snapshots;

// Re-export all public types at crate root for convenience.
pub use enums::{
    AgentKind, ConstructionStageType, FavoriteActivity, JobAssigner, JobAssignmentStatus,
    JobKind, LocationSituation, NaturalAttribute, Part, Resource, RoleType, SkillType,
    VehicleKind, VehicleStatus,
};
pub use ids::{AgentId, BuildingId, MissionId, SettlementId, SiteId, VehicleId};
pub use snapshots::{AgentSnapshot, ClockSnapshot, MissionSnapshot, SimulationSnapshot};

#[cfg(test)]
mod tests {
    //! `TypeScript` binding generation for display consumers.

    #[test]
    fn export_bindings() {
        // The files are written to the `bindings/` directory relative to
        // the crate root.
        use ts_rs::TS;

        let _ = crate::ids::AgentId::export_all();
        let _ = crate::ids::SettlementId::export_all();
        let _ = crate::ids::MissionId::export_all();

        let _ = crate::enums::AgentKind::export_all();
        let _ = crate::enums::JobKind::export_all();
        let _ = crate::enums::RoleType::export_all();
        let _ = crate::enums::SkillType::export_all();
        let _ = crate::enums::NaturalAttribute::export_all();
        let _ = crate::enums::LocationSituation::export_all();

        let _ = crate::snapshots::ClockSnapshot::export_all();
        let _ = crate::snapshots::AgentSnapshot::export_all();
        let _ = crate::snapshots::MissionSnapshot::export_all();
        let _ = crate::snapshots::SimulationSnapshot::export_all();
    }
}
