//! Read-only display snapshots of simulation state.
//!
//! The stepping loop owns all mutable state. Display and query consumers
//! receive these plain values instead, published once per step, so a reader
//! never observes a half-applied step.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{AgentKind, JobKind, LocationSituation, NaturalAttribute, RoleType, SkillType};
use crate::ids::{AgentId, MissionId, SettlementId};

/// Current simulated time on both planets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ClockSnapshot {
    /// Sols elapsed since the Mars calendar epoch.
    pub total_sols: u64,
    /// Orbit number.
    pub orbit: u32,
    /// Month of the Darian calendar (1 to 24).
    pub month: u32,
    /// Sol of the month (starting at 1).
    pub sol_of_month: u32,
    /// Time of day in millisols (0 to 1000).
    pub millisol: f64,
    /// Formatted Mars timestamp, e.g. `15-Adir-01:000.000`.
    pub mars_timestamp: String,
    /// Formatted Earth timestamp, e.g. `2043-Sep-30  00:00:00 (UT)`.
    pub earth_timestamp: String,
    /// Millisols simulated since the session started.
    pub elapsed_millisols: f64,
    /// Whether the clock is paused.
    pub paused: bool,
}

/// Display state of one person or robot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct AgentSnapshot {
    /// Agent identifier.
    pub id: AgentId,
    /// Display name.
    pub name: String,
    /// Person or robot.
    pub kind: AgentKind,
    /// Home settlement, if any.
    pub settlement: Option<SettlementId>,
    /// Where the agent is.
    pub location: LocationSituation,
    /// Current job.
    pub job: JobKind,
    /// Settlement role.
    pub role: RoleType,
    /// Name of the active task, if any.
    pub task_name: Option<String>,
    /// Current phase of the active task, if any.
    pub task_phase: Option<String>,
    /// Human-readable description of the active task.
    pub task_description: Option<String>,
    /// Mission the agent belongs to, if any.
    pub mission: Option<MissionId>,
    /// Fatigue in millisols awake.
    pub fatigue: f64,
    /// Hunger in millisols since the last meal.
    pub hunger: f64,
    /// Stress from 0 to 100.
    pub stress: f64,
    /// Performance rating from 0 to 1.
    pub performance: f64,
    /// Skill levels.
    pub skills: BTreeMap<SkillType, u32>,
    /// Natural attribute scores.
    pub attributes: BTreeMap<NaturalAttribute, u8>,
}

/// Display state of one mission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct MissionSnapshot {
    /// Mission identifier.
    pub id: MissionId,
    /// Mission name.
    pub name: String,
    /// Current phase name, `None` once ended.
    pub phase: Option<String>,
    /// Human-readable description.
    pub description: String,
    /// Settlement that runs the mission.
    pub settlement: SettlementId,
    /// Participating agents, in recruitment order.
    pub participants: Vec<AgentId>,
    /// Why the mission ended, if it has.
    pub end_reason: Option<String>,
}

/// Everything a display consumer needs for one step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SimulationSnapshot {
    /// Step counter.
    pub step: u64,
    /// Clock state.
    pub clock: ClockSnapshot,
    /// Agents in settlement roster order.
    pub agents: Vec<AgentSnapshot>,
    /// Active and recently ended missions.
    pub missions: Vec<MissionSnapshot>,
}
