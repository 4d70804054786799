//! Error types for the `marsim-world` crate.
//!
//! All fallible operations in this crate return [`WorldError`] through the
//! standard [`Result`] type.

use marsim_ledger::LedgerError;
use marsim_types::{BuildingId, MissionId, SettlementId, SiteId, VehicleId};

/// Errors that can occur while mutating settlements, vehicles, or sites.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// A settlement was not found.
    #[error("settlement not found: {0}")]
    SettlementNotFound(SettlementId),

    /// A vehicle was not found.
    #[error("vehicle not found: {0}")]
    VehicleNotFound(VehicleId),

    /// A construction site was not found.
    #[error("construction site not found: {0}")]
    SiteNotFound(SiteId),

    /// A building was not found in its settlement.
    #[error("building not found: {0}")]
    BuildingNotFound(BuildingId),

    /// A building type is missing from the building catalog.
    #[error("unknown building type: {0}")]
    UnknownBuildingType(String),

    /// A stage name is missing from the construction catalog.
    #[error("unknown construction stage: {0}")]
    UnknownStage(String),

    /// A stage cannot follow the site's current last stage.
    #[error("stage {stage} cannot follow {after:?} at site {site}")]
    StageOutOfOrder {
        /// The site.
        site: SiteId,
        /// The rejected stage name.
        stage: String,
        /// Name of the site's current last stage, if any.
        after: Option<String>,
    },

    /// A vehicle cannot be reserved.
    #[error("vehicle {vehicle} unavailable: {reason}")]
    VehicleUnavailable {
        /// The vehicle.
        vehicle: VehicleId,
        /// Why the reservation was refused.
        reason: String,
    },

    /// A vehicle is reserved by a different mission.
    #[error("vehicle {vehicle} is reserved by mission {holder}")]
    ReservationMismatch {
        /// The vehicle.
        vehicle: VehicleId,
        /// The mission that holds the reservation.
        holder: MissionId,
    },

    /// A catalog failed cross-reference validation.
    #[error("invalid catalog: {reason}")]
    InvalidCatalog {
        /// Description of the problem.
        reason: String,
    },

    /// An inventory operation failed.
    #[error("ledger error: {source}")]
    Ledger {
        /// The underlying ledger error.
        #[from]
        source: LedgerError,
    },
}
