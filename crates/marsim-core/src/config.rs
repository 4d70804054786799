//! Configuration loading and typed config structures for the colony simulation.
//!
//! One YAML document describes a session: the clock start times, stepping
//! pace and bounds, every catalog and tuning table, and the settlements to
//! create. Every section is optional and falls back to the defaults below,
//! so an empty file is a valid configuration.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use marsim_agents::{
    AgentSeed, ConditionConfig, JobAffinityTable, MetaTaskRegistry, MissionConfig,
    SimulationRules, TaskConfig,
};
use marsim_types::{AgentKind, JobKind, Part, Resource, RoleType, VehicleKind};
use marsim_world::{BuildingCatalog, ConstructionCatalog, SurfaceConfig, WorldError};
use serde::{Deserialize, Serialize};

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A catalog failed its cross-reference checks.
    #[error("invalid catalog: {source}")]
    Catalog {
        /// The underlying world error.
        #[from]
        source: WorldError,
    },

    /// A value is out of range or refers to something unknown.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// Explanation of what is wrong.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level simulation configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Session name, seed, pace, and bounds.
    #[serde(default)]
    pub simulation: SessionConfig,

    /// Start times and the Mars-to-Earth rate.
    #[serde(default)]
    pub clock: ClockConfig,

    /// Log output settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Sunlight and radiation events.
    #[serde(default)]
    pub surface: SurfaceConfig,

    /// Fatigue, hunger, and medical thresholds.
    #[serde(default)]
    pub condition: ConditionConfig,

    /// Task durations and rates.
    #[serde(default)]
    pub tasks: TaskConfig,

    /// Mission crew sizes and pacing.
    #[serde(default)]
    pub missions: MissionConfig,

    /// Building types, their storage and starting stock.
    #[serde(default)]
    pub buildings: BuildingCatalog,

    /// Construction stage infos.
    #[serde(default)]
    pub construction: ConstructionCatalog,

    /// Job-to-task probability multipliers.
    #[serde(default)]
    pub affinities: JobAffinityTable,

    /// Task kinds agents may choose, in selection order.
    #[serde(default)]
    pub meta_tasks: MetaTaskRegistry,

    /// Settlements created at startup.
    #[serde(default = "default_settlements")]
    pub settlements: Vec<SettlementTemplate>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            simulation: SessionConfig::default(),
            clock: ClockConfig::default(),
            logging: LoggingConfig::default(),
            surface: SurfaceConfig::default(),
            condition: ConditionConfig::default(),
            tasks: TaskConfig::default(),
            missions: MissionConfig::default(),
            buildings: BuildingCatalog::default(),
            construction: ConstructionCatalog::default(),
            affinities: JobAffinityTable::default(),
            meta_tasks: MetaTaskRegistry::default(),
            settlements: default_settlements(),
        }
    }
}

impl SimulationConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string. Empty input gives defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yml::from_str(yaml)?;
        Ok(config)
    }

    /// Check cross references and ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let session = &self.simulation;
        if !(session.step_millisols.is_finite() && session.step_millisols > 0.0) {
            return Err(invalid(format!(
                "simulation.step_millisols must be positive, got {}",
                session.step_millisols
            )));
        }

        let missions = &self.missions;
        if missions.min_people == 0 || missions.min_people > missions.max_people {
            return Err(invalid(format!(
                "missions need 1 <= min_people <= max_people, got {} and {}",
                missions.min_people, missions.max_people
            )));
        }
        if !(0.0..=1.0).contains(&missions.work_assignment_probability) {
            return Err(invalid(
                "missions.work_assignment_probability must be within 0 to 1".to_owned(),
            ));
        }

        self.construction.validate(&self.buildings)?;

        let mut settlement_names = BTreeSet::new();
        let mut agent_names = BTreeSet::new();
        for template in &self.settlements {
            if !settlement_names.insert(template.name.as_str()) {
                return Err(invalid(format!("duplicate settlement {}", template.name)));
            }
            template.validate(&self.buildings, &mut agent_names)?;
        }
        Ok(())
    }

    /// Catalogs and tuning for the agents crate.
    pub fn rules(&self) -> SimulationRules {
        SimulationRules {
            buildings: self.buildings.clone(),
            construction: self.construction.clone(),
            affinities: self.affinities.clone(),
            condition: self.condition.clone(),
            tasks: self.tasks.clone(),
            missions: self.missions.clone(),
            meta: self.meta_tasks.clone(),
        }
    }
}

fn invalid(reason: String) -> ConfigError {
    ConfigError::Invalid { reason }
}

/// Session name, seed, pace, and bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Human-readable session name.
    #[serde(default = "default_session_name")]
    pub name: String,

    /// Seed for the session's random source.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Simulated millisols per step.
    #[serde(default = "default_step_millisols")]
    pub step_millisols: f64,

    /// Real-time milliseconds between steps.
    #[serde(default = "default_step_interval_ms")]
    pub step_interval_ms: u64,

    /// Stop after this many steps (0 = unlimited).
    #[serde(default)]
    pub max_steps: u64,

    /// Stop after this many wall-clock seconds (0 = unlimited).
    #[serde(default)]
    pub max_real_time_seconds: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            name: default_session_name(),
            seed: default_seed(),
            step_millisols: default_step_millisols(),
            step_interval_ms: default_step_interval_ms(),
            max_steps: 0,
            max_real_time_seconds: 0,
        }
    }
}

/// Start times and the Mars-to-Earth rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClockConfig {
    /// Mars start time, `orbit-Month-sol:millisol`.
    #[serde(default = "default_mars_start")]
    pub mars_start: String,

    /// Earth start time, `MM/dd/yyyy HH:mm:ss` UTC.
    #[serde(default = "default_earth_start")]
    pub earth_start: String,

    /// Earth seconds that pass per millisol.
    #[serde(default = "default_earth_seconds_per_millisol")]
    pub earth_seconds_per_millisol: f64,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            mars_start: default_mars_start(),
            earth_start: default_earth_start(),
            earth_seconds_per_millisol: default_earth_seconds_per_millisol(),
        }
    }
}

/// Log output settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable text.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// A robot to create in a settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RobotSeed {
    /// Unique name.
    pub name: String,
    /// Robot job.
    pub job: JobKind,
}

/// A vehicle parked at a settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleSeed {
    /// Display name.
    pub name: String,
    /// Vehicle kind.
    pub kind: VehicleKind,
}

/// Everything needed to found one settlement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettlementTemplate {
    /// Settlement name.
    pub name: String,

    /// Building types to erect, in order.
    #[serde(default)]
    pub buildings: Vec<String>,

    /// Named people and their roles.
    #[serde(default)]
    pub crew: Vec<AgentSeed>,

    /// Extra people with generated names.
    #[serde(default)]
    pub colonists: u32,

    /// Robots.
    #[serde(default)]
    pub robots: Vec<RobotSeed>,

    /// Vehicles.
    #[serde(default)]
    pub vehicles: Vec<VehicleSeed>,

    /// Resource stock added on top of the buildings' starting stock, in kg.
    #[serde(default)]
    pub resources: BTreeMap<Resource, f64>,

    /// Parts in storage.
    #[serde(default)]
    pub parts: BTreeMap<Part, u32>,
}

impl SettlementTemplate {
    fn validate<'a>(
        &'a self,
        buildings: &BuildingCatalog,
        agent_names: &mut BTreeSet<&'a str>,
    ) -> Result<(), ConfigError> {
        let name = &self.name;
        if let Some(unknown) = self.buildings.iter().find(|kind| !buildings.contains(kind)) {
            return Err(invalid(format!("settlement {name} uses unknown building type {unknown}")));
        }
        for seed in &self.crew {
            if seed.job.is_some_and(|job| !job.suits(AgentKind::Person)) {
                return Err(invalid(format!("{} cannot hold a robot job", seed.name)));
            }
            if !agent_names.insert(seed.name.as_str()) {
                return Err(invalid(format!("duplicate agent name {}", seed.name)));
            }
        }
        for robot in &self.robots {
            if !robot.job.suits(AgentKind::Robot) {
                return Err(invalid(format!("robot {} cannot hold job {:?}", robot.name, robot.job)));
            }
            if !agent_names.insert(robot.name.as_str()) {
                return Err(invalid(format!("duplicate agent name {}", robot.name)));
            }
        }
        if let Some((resource, amount)) = self
            .resources
            .iter()
            .find(|(_, amount)| !(amount.is_finite() && **amount >= 0.0))
        {
            return Err(invalid(format!("settlement {name} has {amount} kg of {resource}")));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Default value functions (serde default requires named functions)
// ---------------------------------------------------------------------------

fn default_session_name() -> String {
    "Schiaparelli".to_owned()
}

const fn default_seed() -> u64 {
    2043
}

const fn default_step_millisols() -> f64 {
    10.0
}

const fn default_step_interval_ms() -> u64 {
    100
}

fn default_mars_start() -> String {
    "15-Adir-01:000.000".to_owned()
}

fn default_earth_start() -> String {
    "09/30/2043 00:00:00".to_owned()
}

const fn default_earth_seconds_per_millisol() -> f64 {
    88.775_244
}

fn default_log_level() -> String {
    "info".to_owned()
}

fn default_settlements() -> Vec<SettlementTemplate> {
    let crew = [
        ("Ada Reyes", RoleType::Commander),
        ("Tomas Okafor", RoleType::SubCommander),
        ("Ines Lindqvist", RoleType::CrewEngineer),
        ("Ravi Sato", RoleType::CrewScientist),
    ];
    vec![SettlementTemplate {
        name: "Schiaparelli Point".to_owned(),
        buildings: ["Lander Hab", "Storage Shed", "Garage", "Residential Quarters"]
            .map(str::to_owned)
            .to_vec(),
        crew: crew
            .map(|(name, role)| AgentSeed {
                name: name.to_owned(),
                role,
                job: None,
            })
            .to_vec(),
        colonists: 2,
        robots: vec![RobotSeed {
            name: "ConstructionBot 001".to_owned(),
            job: JobKind::ConstructionBot,
        }],
        vehicles: vec![VehicleSeed {
            name: "LUV 1".to_owned(),
            kind: VehicleKind::LightUtilityVehicle,
        }],
        resources: BTreeMap::new(),
        parts: BTreeMap::from([
            (Part::EvaSuit, 6),
            (Part::Bag, 4),
            (Part::Backhoe, 1),
            (Part::BulldozerBlade, 1),
            (Part::SteelBeam, 8),
            (Part::SteelPanel, 4),
            (Part::AluminumSheet, 6),
            (Part::Window, 2),
        ]),
    }]
}
