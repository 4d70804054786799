//! Enumeration types shared by every simulation crate.
//!
//! Catalog enums ([`Resource`], [`Part`], [`SkillType`], ...) are closed
//! sets: configuration files name them in `snake_case` and unknown names are
//! rejected at load time instead of being looked up by string at run time.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Agents
// ---------------------------------------------------------------------------

/// Whether an agent is a person or a robot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum AgentKind {
    /// A human colonist with needs (hunger, fatigue, stress).
    Person,
    /// A robot; no physiological needs and a restricted task set.
    Robot,
}

/// Where an agent currently is, relative to shelter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum LocationSituation {
    /// Inside a settlement's pressurized buildings.
    InSettlement,
    /// Inside a vehicle.
    InVehicle,
    /// Outside on the Martian surface (EVA).
    Outside,
}

/// Natural attributes, each scored 0 to 100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum NaturalAttribute {
    /// Physical strength.
    Strength,
    /// Physical endurance.
    Endurance,
    /// Agility and coordination.
    Agility,
    /// Ability to learn from hands-on experience.
    ExperienceAptitude,
    /// Ability to learn from study.
    AcademicAptitude,
    /// Resistance to stress.
    StressResilience,
    /// Emotional stability.
    EmotionalStability,
    /// Leadership.
    Leadership,
    /// Conversational skill.
    Conversation,
    /// Teaching ability.
    Teaching,
}

impl NaturalAttribute {
    /// Every attribute, in declaration order.
    pub const ALL: [Self; 10] = [
        Self::Strength,
        Self::Endurance,
        Self::Agility,
        Self::ExperienceAptitude,
        Self::AcademicAptitude,
        Self::StressResilience,
        Self::EmotionalStability,
        Self::Leadership,
        Self::Conversation,
        Self::Teaching,
    ];
}

/// Trainable skills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum SkillType {
    /// Geology of Mars.
    Areology,
    /// Growing crops.
    Botany,
    /// Building structures.
    Construction,
    /// Preparing meals.
    Cooking,
    /// Operating ground vehicles.
    Driving,
    /// Working outside in an EVA suit.
    EvaOperations,
    /// Materials science.
    MaterialsScience,
    /// Mathematics.
    Mathematics,
    /// Repairing and maintaining machinery.
    Mechanics,
    /// Medicine.
    Medicine,
}

impl SkillType {
    /// Every skill, in declaration order.
    pub const ALL: [Self; 10] = [
        Self::Areology,
        Self::Botany,
        Self::Construction,
        Self::Cooking,
        Self::Driving,
        Self::EvaOperations,
        Self::MaterialsScience,
        Self::Mathematics,
        Self::Mechanics,
        Self::Medicine,
    ];
}

/// Jobs held by persons and robots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum JobKind {
    /// Designs and builds structures.
    Architect,
    /// Studies the geology of Mars.
    Areologist,
    /// Tends greenhouse crops.
    Botanist,
    /// Prepares meals.
    Chef,
    /// Treats the sick and injured.
    Doctor,
    /// Drives vehicles.
    Driver,
    /// Maintains settlement equipment.
    Engineer,
    /// Mathematical research.
    Mathematician,
    /// Repairs and maintains vehicles.
    Technician,
    /// Robot cook.
    ChefBot,
    /// Robot builder.
    ConstructionBot,
    /// Robot hauler.
    DeliveryBot,
    /// Robot mechanic.
    RepairBot,
}

impl JobKind {
    /// Jobs available to persons.
    pub const PERSON_JOBS: [Self; 9] = [
        Self::Architect,
        Self::Areologist,
        Self::Botanist,
        Self::Chef,
        Self::Doctor,
        Self::Driver,
        Self::Engineer,
        Self::Mathematician,
        Self::Technician,
    ];

    /// Jobs available to robots.
    pub const ROBOT_JOBS: [Self; 4] = [
        Self::ChefBot,
        Self::ConstructionBot,
        Self::DeliveryBot,
        Self::RepairBot,
    ];

    /// Whether this job can only be held by a robot.
    pub const fn is_robot_job(self) -> bool {
        matches!(
            self,
            Self::ChefBot | Self::ConstructionBot | Self::DeliveryBot | Self::RepairBot
        )
    }

    /// Whether an agent of the given kind may hold this job.
    pub const fn suits(self, kind: AgentKind) -> bool {
        match kind {
            AgentKind::Person => !self.is_robot_job(),
            AgentKind::Robot => self.is_robot_job(),
        }
    }

    /// Human-readable job title.
    pub const fn title(self) -> &'static str {
        match self {
            Self::Architect => "Architect",
            Self::Areologist => "Areologist",
            Self::Botanist => "Botanist",
            Self::Chef => "Chef",
            Self::Doctor => "Doctor",
            Self::Driver => "Driver",
            Self::Engineer => "Engineer",
            Self::Mathematician => "Mathematician",
            Self::Technician => "Technician",
            Self::ChefBot => "ChefBot",
            Self::ConstructionBot => "ConstructionBot",
            Self::DeliveryBot => "DeliveryBot",
            Self::RepairBot => "RepairBot",
        }
    }
}

impl core::fmt::Display for JobKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.title())
    }
}

/// Settlement roles. A handful of command roles may review job requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum RoleType {
    /// Head of a large multi-settlement colony.
    President,
    /// Head of a large settlement.
    Mayor,
    /// Commander of a small settlement.
    Commander,
    /// Second in command.
    SubCommander,
    /// Crew engineer.
    CrewEngineer,
    /// Crew scientist.
    CrewScientist,
    /// Crew operations officer.
    CrewOperationOfficer,
    /// Crew health and safety specialist.
    CrewHealthAndSafety,
}

impl RoleType {
    /// Whether holders of this role may approve or reject job reassignments.
    pub const fn reviews_job_reassignments(self) -> bool {
        matches!(
            self,
            Self::President | Self::Mayor | Self::Commander | Self::SubCommander
        )
    }
}

/// Review state of a job-change request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum JobAssignmentStatus {
    /// Filed, waiting for a reviewer.
    Pending,
    /// Approved; the job is in effect.
    Approved,
    /// Rejected; the previous job stays in effect.
    Rejected,
}

/// Who originated a job assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum JobAssigner {
    /// The settlement assigned it (initial or automatic assignment).
    Settlement,
    /// The player requested it.
    User,
    /// Mission control requested it.
    MissionControl,
}

/// Activities an agent may favor; a match boosts task probabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum FavoriteActivity {
    /// Outdoor work on the surface.
    FieldWork,
    /// Research.
    Research,
    /// Tinkering with machinery.
    Tinkering,
    /// Cooking.
    Cooking,
    /// Operations and logistics.
    Operations,
    /// Tending plants.
    TendingPlants,
}

impl FavoriteActivity {
    /// Every activity, in declaration order.
    pub const ALL: [Self; 6] = [
        Self::FieldWork,
        Self::Research,
        Self::Tinkering,
        Self::Cooking,
        Self::Operations,
        Self::TendingPlants,
    ];
}

// ---------------------------------------------------------------------------
// Resources
// ---------------------------------------------------------------------------

/// Amount resources, measured in kilograms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum Resource {
    /// Potable water.
    Water,
    /// Breathable oxygen.
    Oxygen,
    /// Packaged food.
    Food,
    /// Water ice dug from the regolith.
    Ice,
    /// Loose surface material.
    Regolith,
    /// Carbon dioxide.
    CarbonDioxide,
    /// Methane fuel.
    Methane,
    /// Hydrogen.
    Hydrogen,
    /// Concrete for foundations.
    Concrete,
    /// Sand.
    Sand,
}

impl Resource {
    /// Display name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Water => "water",
            Self::Oxygen => "oxygen",
            Self::Food => "food",
            Self::Ice => "ice",
            Self::Regolith => "regolith",
            Self::CarbonDioxide => "carbon dioxide",
            Self::Methane => "methane",
            Self::Hydrogen => "hydrogen",
            Self::Concrete => "concrete",
            Self::Sand => "sand",
        }
    }
}

impl core::fmt::Display for Resource {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// Discrete items counted by the unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum Part {
    /// Pressurized suit required for EVA.
    EvaSuit,
    /// Bag for carrying ice or regolith.
    Bag,
    /// Light utility vehicle attachment.
    SoilCompactor,
    /// Light utility vehicle attachment.
    Backhoe,
    /// Light utility vehicle attachment.
    BulldozerBlade,
    /// Light utility vehicle attachment.
    CraneBoom,
    /// Structural beam.
    SteelBeam,
    /// Structural panel.
    SteelPanel,
    /// Aluminum sheet.
    AluminumSheet,
    /// Pressure window.
    Window,
}

impl Part {
    /// Parts that attach to a light utility vehicle for construction work.
    pub const ATTACHMENTS: [Self; 4] = [
        Self::SoilCompactor,
        Self::Backhoe,
        Self::BulldozerBlade,
        Self::CraneBoom,
    ];

    /// Display name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::EvaSuit => "EVA suit",
            Self::Bag => "bag",
            Self::SoilCompactor => "soil compactor",
            Self::Backhoe => "backhoe",
            Self::BulldozerBlade => "bulldozer blade",
            Self::CraneBoom => "crane boom",
            Self::SteelBeam => "steel beam",
            Self::SteelPanel => "steel panel",
            Self::AluminumSheet => "aluminum sheet",
            Self::Window => "window",
        }
    }
}

impl core::fmt::Display for Part {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Vehicles and construction
// ---------------------------------------------------------------------------

/// Vehicle types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum VehicleKind {
    /// Long-range exploration rover.
    ExplorerRover,
    /// Passenger transport rover.
    TransportRover,
    /// Cargo rover.
    CargoRover,
    /// Small open vehicle that carries construction attachments.
    LightUtilityVehicle,
}

/// Operating status of a vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum VehicleStatus {
    /// Parked at a settlement.
    Parked,
    /// Parked inside a garage.
    Garaged,
    /// Moving across the surface.
    Moving,
    /// Being maintained.
    Maintenance,
    /// Broken down.
    Malfunction,
}

impl VehicleStatus {
    /// Whether the vehicle is at rest at its settlement.
    pub const fn is_parked(self) -> bool {
        matches!(self, Self::Parked | Self::Garaged)
    }
}

/// Stage type of a construction stage. Sites progress in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum ConstructionStageType {
    /// Ground preparation and foundation.
    Foundation,
    /// Structural frame.
    Frame,
    /// Finished building.
    Building,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn robot_jobs_only_suit_robots() {
        for job in JobKind::ROBOT_JOBS {
            assert!(job.suits(AgentKind::Robot));
            assert!(!job.suits(AgentKind::Person));
        }
        for job in JobKind::PERSON_JOBS {
            assert!(job.suits(AgentKind::Person));
        }
    }

    #[test]
    fn only_command_roles_review_jobs() {
        assert!(RoleType::Commander.reviews_job_reassignments());
        assert!(RoleType::SubCommander.reviews_job_reassignments());
        assert!(RoleType::Mayor.reviews_job_reassignments());
        assert!(RoleType::President.reviews_job_reassignments());
        assert!(!RoleType::CrewEngineer.reviews_job_reassignments());
    }

    #[test]
    fn resources_use_snake_case_names_in_config() {
        let json = serde_json::to_string(&Resource::CarbonDioxide).unwrap_or_default();
        assert_eq!(json, "\"carbon_dioxide\"");
        let part: Part = serde_json::from_str("\"crane_boom\"").unwrap_or(Part::Bag);
        assert_eq!(part, Part::CraneBoom);
    }

    #[test]
    fn stage_types_order_foundation_first() {
        assert!(ConstructionStageType::Foundation < ConstructionStageType::Frame);
        assert!(ConstructionStageType::Frame < ConstructionStageType::Building);
    }
}
