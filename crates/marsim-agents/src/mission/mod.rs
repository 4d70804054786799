//! Group missions and the registry that steps them.
//!
//! A mission is a phase machine shared by several agents. Missions are
//! stepped once per simulation step, after every agent has acted; the
//! mission being stepped is taken out of the [`MissionRegistry`] for the
//! duration so it can borrow the rest of the context mutably.
//!
//! # Modules
//!
//! - [`construction`] -- The building construction mission.
//! - [`meta`] -- Mission kinds agents can choose to start.

pub mod construction;
pub mod meta;

use std::collections::{BTreeMap, VecDeque};
use std::fmt;

use marsim_types::{AgentId, MissionId, MissionSnapshot, SettlementId};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::context::ActionContext;
use crate::error::MissionError;

pub use construction::BuildingConstructionMission;
pub use meta::MetaMissionKind;

/// Every phase any mission uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissionPhase {
    /// Moving materials onto the site and getting it ready.
    PrepareSite,
    /// Building the current stage.
    Construction,
}

impl MissionPhase {
    /// Display name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::PrepareSite => "Prepare Site",
            Self::Construction => "Construction",
        }
    }
}

impl fmt::Display for MissionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The closed set of missions.
#[derive(Debug, Clone)]
pub enum MissionKind {
    /// Build a stage at a construction site.
    BuildingConstruction(BuildingConstructionMission),
}

impl MissionKind {
    /// Mission identifier.
    pub const fn id(&self) -> MissionId {
        match self {
            Self::BuildingConstruction(mission) => mission.id(),
        }
    }

    /// Display name.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::BuildingConstruction(_) => "Building Construction",
        }
    }

    /// Current phase; `None` once ended.
    pub const fn phase(&self) -> Option<MissionPhase> {
        match self {
            Self::BuildingConstruction(mission) => mission.phase(),
        }
    }

    /// Home settlement.
    pub const fn settlement(&self) -> SettlementId {
        match self {
            Self::BuildingConstruction(mission) => mission.settlement(),
        }
    }

    /// Signed-up agents.
    pub fn participants(&self) -> &[AgentId] {
        match self {
            Self::BuildingConstruction(mission) => mission.participants(),
        }
    }

    /// Whether the mission is over.
    pub const fn is_ended(&self) -> bool {
        match self {
            Self::BuildingConstruction(mission) => mission.is_ended(),
        }
    }

    /// Why the mission ended.
    pub fn end_reason(&self) -> Option<&str> {
        match self {
            Self::BuildingConstruction(mission) => mission.end_reason(),
        }
    }

    /// What the mission is doing, for display.
    pub fn description(&self) -> String {
        match self {
            Self::BuildingConstruction(mission) => mission.description(),
        }
    }

    /// Advance one step.
    pub fn step(&mut self, ctx: &mut ActionContext<'_>) -> Result<(), MissionError> {
        match self {
            Self::BuildingConstruction(mission) => mission.step(ctx),
        }
    }

    /// End the mission, releasing everything it holds. Idempotent.
    pub fn end_mission(&mut self, ctx: &mut ActionContext<'_>, reason: &str) {
        match self {
            Self::BuildingConstruction(mission) => mission.end_mission(ctx, reason),
        }
    }

    /// Display snapshot.
    pub fn snapshot(&self) -> MissionSnapshot {
        MissionSnapshot {
            id: self.id(),
            name: self.name().to_owned(),
            phase: self.phase().map(|phase| phase.to_string()),
            description: self.description(),
            settlement: self.settlement(),
            participants: self.participants().to_vec(),
            end_reason: self.end_reason().map(str::to_owned),
        }
    }
}

/// Active missions plus a short history of ended ones.
#[derive(Debug, Clone, Default)]
pub struct MissionRegistry {
    active: BTreeMap<MissionId, MissionKind>,
    ended: VecDeque<MissionSnapshot>,
}

impl MissionRegistry {
    /// Create an empty registry.
    pub const fn new() -> Self {
        Self {
            active: BTreeMap::new(),
            ended: VecDeque::new(),
        }
    }

    /// Look up an active mission.
    pub fn get(&self, id: MissionId) -> Option<&MissionKind> {
        self.active.get(&id)
    }

    /// Add or put back an active mission.
    pub fn insert(&mut self, mission: MissionKind) {
        self.active.insert(mission.id(), mission);
    }

    /// Take an active mission out.
    pub fn take(&mut self, id: MissionId) -> Option<MissionKind> {
        self.active.remove(&id)
    }

    /// Number of active missions.
    pub fn len(&self) -> usize {
        self.active.len()
    }

    /// Whether no mission is active.
    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Active missions in id order.
    pub fn active(&self) -> impl Iterator<Item = &MissionKind> {
        self.active.values()
    }

    /// Active missions based at `settlement`.
    pub fn active_at(&self, settlement: SettlementId) -> impl Iterator<Item = &MissionKind> {
        self.active
            .values()
            .filter(move |mission| mission.settlement() == settlement)
    }

    /// Keep a snapshot of an ended mission, dropping the oldest beyond
    /// `limit`.
    pub fn record_ended(&mut self, snapshot: MissionSnapshot, limit: usize) {
        self.ended.push_back(snapshot);
        while self.ended.len() > limit {
            self.ended.pop_front();
        }
    }

    /// Recently ended missions, oldest first.
    pub fn ended(&self) -> impl Iterator<Item = &MissionSnapshot> {
        self.ended.iter()
    }

    /// Snapshots of every active mission followed by the ended history.
    pub fn snapshots(&self) -> Vec<MissionSnapshot> {
        self.active
            .values()
            .map(MissionKind::snapshot)
            .chain(self.ended.iter().cloned())
            .collect()
    }
}

/// Step every active mission once. A mission whose step fails is ended with
/// the error as its reason; the rest carry on. Returns how many ended.
pub fn step_missions(ctx: &mut ActionContext<'_>) -> usize {
    let ids: Vec<MissionId> = ctx.missions.active.keys().copied().collect();
    let mut ended = 0_usize;
    for id in ids {
        let Some(mut mission) = ctx.missions.take(id) else {
            continue;
        };
        if let Err(error) = mission.step(ctx) {
            warn!(mission = %id, %error, "mission step failed");
            mission.end_mission(ctx, &error.to_string());
        }
        if mission.is_ended() {
            info!(
                mission = %id,
                reason = mission.end_reason().unwrap_or_default(),
                "mission ended"
            );
            let limit = ctx.rules.missions.ended_history;
            ctx.missions.record_ended(mission.snapshot(), limit);
            ended = ended.saturating_add(1);
        } else {
            ctx.missions.insert(mission);
        }
    }
    ended
}
