//! Building one construction stage as a group.
//!
//! Starting recruits a crew, picks a site and stage, and reserves a light
//! utility vehicle loaded with the settlement's attachment parts. The
//! mission then runs `PrepareSite` followed by `Construction`. Every exit
//! path goes through [`BuildingConstructionMission::end_mission`], which
//! hands back everything the mission holds.

use marsim_ledger::Inventory;
use marsim_types::{
    AgentId, ConstructionStageType, MissionId, Part, SettlementId, SiteId, SkillType, VehicleId,
};
use marsim_world::{
    ConstructionCatalog, ConstructionSite, ConstructionStageInfo, Settlement, World, WorldError,
};
use rand::Rng;
use tracing::{debug, info, warn};

use super::MissionPhase;
use crate::agent::AgentState;
use crate::context::ActionContext;
use crate::error::MissionError;
use crate::selection::select_weighted;
use crate::task::ConstructBuilding;

/// End reason of a mission that built its stage.
pub const SUCCESS: &str = "Successfully ended construction";

const NOT_ENOUGH_MEMBERS: &str = "Not enough members recruited.";
const NO_STAGE: &str = "New construction stage could not be determined.";
const NO_SITE: &str = "Construction site could not be found or created.";
const NO_VEHICLE: &str = "Light utility vehicle not available.";
const NO_MATERIALS: &str = "Construction materials not available.";

/// Where to build, and what.
#[derive(Debug)]
enum SitePlan {
    /// Keep working the site's unfinished stage.
    Continue(SiteId),
    /// Add the next stage to an existing site.
    Extend(SiteId, ConstructionStageInfo),
    /// Open a new site with a foundation.
    New(ConstructionStageInfo),
}

/// A crew building one stage at a settlement.
#[derive(Debug, Clone)]
pub struct BuildingConstructionMission {
    id: MissionId,
    settlement: SettlementId,
    participants: Vec<AgentId>,
    site: Option<SiteId>,
    stage: Option<String>,
    vehicle: Option<VehicleId>,
    attachments: Vec<Part>,
    phase: Option<MissionPhase>,
    phase_start: f64,
    end_reason: Option<String>,
}

impl BuildingConstructionMission {
    /// Start a mission led by `starter`.
    ///
    /// The returned mission has already ended if it could not get going;
    /// its end reason says why. On success the starter and every recruit
    /// are signed up.
    pub fn start(starter: &mut AgentState, ctx: &mut ActionContext<'_>) -> Self {
        let mut mission = Self {
            id: MissionId::new(),
            settlement: starter.settlement.unwrap_or_default(),
            participants: Vec::new(),
            site: None,
            stage: None,
            vehicle: None,
            attachments: Vec::new(),
            phase: Some(MissionPhase::PrepareSite),
            phase_start: ctx.time.now,
            end_reason: None,
        };
        let Some(settlement) = starter.settlement.and_then(|id| ctx.world.settlement(id)) else {
            mission.abort(NO_SITE);
            return mission;
        };

        mission.participants = recruit(starter, settlement, ctx);
        if mission.participants.len() < ctx.rules.missions.min_people {
            mission.abort(NOT_ENOUGH_MEMBERS);
            return mission;
        }
        let Some(vehicle) = ctx.world.available_utility_vehicle(mission.settlement) else {
            mission.abort(NO_VEHICLE);
            return mission;
        };

        let skill = starter.skills.skill_level(SkillType::Construction);
        let plan = plan_site(settlement, &ctx.rules.construction, skill, ctx.rng);
        let plan = match plan {
            Ok(plan) => plan,
            Err(reason) => {
                mission.abort(reason);
                return mission;
            }
        };
        let opened = ctx
            .world
            .require_settlement_mut(mission.settlement)
            .and_then(|settlement| open_site(settlement, plan));
        match opened {
            Ok((site, stage)) => {
                mission.site = Some(site);
                mission.stage = Some(stage);
            }
            Err(error) => {
                warn!(%error, "construction site setup failed");
                mission.abort(NO_SITE);
                return mission;
            }
        }

        if let Err(error) = ctx.world.reserve_vehicle(vehicle, mission.id) {
            debug!(%error, "utility vehicle reservation refused");
            mission.end_mission(ctx, NO_VEHICLE);
            return mission;
        }
        mission.vehicle = Some(vehicle);
        mission.load_attachments(ctx.world);

        if let Some(site) = mission.site_mut(ctx.world) {
            site.set_under_construction(true);
        }
        starter.mission = Some(mission.id);
        for id in &mission.participants {
            if let Some(agent) = ctx.agents.get_mut(id) {
                agent.state.mission = Some(mission.id);
            }
        }
        info!(
            mission = %mission.id,
            starter = %starter.name,
            stage = mission.stage.as_deref().unwrap_or_default(),
            crew = mission.participants.len(),
            "construction mission started"
        );
        mission
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// Mission identifier.
    pub const fn id(&self) -> MissionId {
        self.id
    }

    /// Home settlement.
    pub const fn settlement(&self) -> SettlementId {
        self.settlement
    }

    /// Crew, starter first.
    pub fn participants(&self) -> &[AgentId] {
        &self.participants
    }

    /// Current phase; `None` once ended.
    pub const fn phase(&self) -> Option<MissionPhase> {
        self.phase
    }

    /// Whether the mission is over.
    pub const fn is_ended(&self) -> bool {
        self.end_reason.is_some()
    }

    /// Why the mission ended.
    pub fn end_reason(&self) -> Option<&str> {
        self.end_reason.as_deref()
    }

    /// The site being built on.
    pub const fn site(&self) -> Option<SiteId> {
        self.site
    }

    /// Name of the stage being built.
    pub fn stage(&self) -> Option<&str> {
        self.stage.as_deref()
    }

    /// The reserved utility vehicle.
    pub const fn vehicle(&self) -> Option<VehicleId> {
        self.vehicle
    }

    /// Attachment parts loaded into the vehicle.
    pub fn attachments(&self) -> &[Part] {
        &self.attachments
    }

    /// What the crew is up to.
    pub fn description(&self) -> String {
        let stage = self.stage.as_deref().unwrap_or("a new structure");
        match self.phase {
            Some(MissionPhase::PrepareSite) => format!("Preparing the site for {stage}"),
            Some(MissionPhase::Construction) => format!("Constructing {stage}"),
            None => format!("Construction of {stage} is over"),
        }
    }

    // -----------------------------------------------------------------------
    // Phases
    // -----------------------------------------------------------------------

    /// Advance one step.
    pub fn step(&mut self, ctx: &mut ActionContext<'_>) -> Result<(), MissionError> {
        if self.is_ended() {
            return Ok(());
        }
        match self.phase.ok_or(MissionError::MissingPhase { mission: self.id })? {
            MissionPhase::PrepareSite => self.prepare_site(ctx),
            MissionPhase::Construction => self.construction(ctx),
        }
    }

    fn prepare_site(&mut self, ctx: &mut ActionContext<'_>) -> Result<(), MissionError> {
        let site = self.site.ok_or(MissionError::MissingSite { mission: self.id })?;
        let loaded = ctx
            .world
            .require_settlement_mut(self.settlement)?
            .load_site_materials(site)?;
        if !loaded {
            self.end_mission(ctx, NO_MATERIALS);
            return Ok(());
        }
        if ctx.time.now - self.phase_start < ctx.rules.missions.site_preparation_time {
            return Ok(());
        }
        self.phase = Some(MissionPhase::Construction);
        self.phase_start = ctx.time.now;
        info!(mission = %self.id, "site prepared, construction under way");
        Ok(())
    }

    fn construction(&mut self, ctx: &mut ActionContext<'_>) -> Result<(), MissionError> {
        let site_id = self.site.ok_or(MissionError::MissingSite { mission: self.id })?;
        if let Some(reason) = self.emergency(ctx) {
            self.end_mission(ctx, &reason);
            return Ok(());
        }

        let settlement = ctx.world.require_settlement_mut(self.settlement)?;
        let stage = settlement
            .site(site_id)
            .and_then(ConstructionSite::current_stage)
            .ok_or(MissionError::MissingSite { mission: self.id })?;
        if !stage.is_complete() {
            self.assign_work(ctx, site_id);
            return Ok(());
        }

        let final_stage = stage.info.stage_type == ConstructionStageType::Building;
        settlement.construction_values.clear();
        if final_stage {
            let building = settlement.complete_site(site_id, &ctx.rules.buildings)?;
            info!(mission = %self.id, %building, "construction site became a building");
        }
        self.end_mission(ctx, SUCCESS);
        Ok(())
    }

    /// A settlement emergency or a participant's serious medical problem.
    fn emergency(&self, ctx: &ActionContext<'_>) -> Option<String> {
        if let Some(reason) = ctx.world.settlement(self.settlement).and_then(Settlement::emergency) {
            return Some(format!("Settlement emergency: {reason}"));
        }
        self.participants
            .iter()
            .filter_map(|id| ctx.agents.get(id))
            .find_map(|agent| {
                agent
                    .state
                    .condition
                    .serious_medical_problem()
                    .map(|problem| format!("Medical emergency: {} has {problem}", agent.state.name))
            })
    }

    /// Put idle participants to work, each with the configured chance.
    fn assign_work(&self, ctx: &mut ActionContext<'_>, site: SiteId) {
        let chance = ctx.rules.missions.work_assignment_probability;
        let chance = if chance.is_finite() { chance.clamp(0.0, 1.0) } else { 0.0 };
        for id in &self.participants {
            if !ctx.rng.random_bool(chance) {
                continue;
            }
            let Some(agent) = ctx.agents.get_mut(id) else {
                continue;
            };
            if !agent.mind.is_idle() || agent.state.mission != Some(self.id) {
                continue;
            }
            let task = ConstructBuilding::create(&agent.state, self.id, self.settlement, site);
            if !task.is_ended() {
                debug!(agent = %agent.state.name, mission = %self.id, "construction work assigned");
                agent.mind.assign_task(task);
            }
        }
    }

    // -----------------------------------------------------------------------
    // Ending
    // -----------------------------------------------------------------------

    /// End the mission, handing back the vehicle, the attachment parts, and
    /// the site, and signing off every participant. Idempotent.
    pub fn end_mission(&mut self, ctx: &mut ActionContext<'_>, reason: &str) {
        if self.is_ended() {
            return;
        }
        self.return_attachments(ctx.world);
        ctx.world.release_mission_vehicles(self.id);
        if let Some(site) = self.site_mut(ctx.world) {
            site.set_under_construction(false);
        }
        for id in &self.participants {
            if let Some(agent) = ctx.agents.get_mut(id)
                && agent.state.mission == Some(self.id)
            {
                agent.state.mission = None;
            }
        }
        self.phase = None;
        self.end_reason = Some(reason.to_owned());
        debug!(mission = %self.id, %reason, "construction mission wound down");
    }

    /// End before anything was reserved.
    fn abort(&mut self, reason: &str) {
        debug!(mission = %self.id, %reason, "construction mission could not start");
        self.phase = None;
        self.end_reason = Some(reason.to_owned());
    }

    fn site_mut<'w>(&self, world: &'w mut World) -> Option<&'w mut ConstructionSite> {
        let site = self.site?;
        world.settlement_mut(self.settlement)?.site_mut(site)
    }

    /// Move one of each attachment part the settlement holds into the
    /// vehicle.
    fn load_attachments(&mut self, world: &mut World) {
        let Some(vehicle) = self.vehicle else {
            return;
        };
        for part in Part::ATTACHMENTS {
            let taken = world
                .settlement_mut(self.settlement)
                .is_some_and(|settlement| settlement.inventory.retrieve_parts(part, 1, true));
            if !taken {
                continue;
            }
            match world.vehicle_mut(vehicle).map(|luv| luv.cargo.store_parts(part, 1)) {
                Some(Ok(())) => self.attachments.push(part),
                _ => put_back(world, self.settlement, part),
            }
        }
    }

    fn return_attachments(&mut self, world: &mut World) {
        let attachments = std::mem::take(&mut self.attachments);
        let Some(vehicle) = self.vehicle else {
            return;
        };
        for part in attachments {
            let taken = world
                .vehicle_mut(vehicle)
                .is_some_and(|luv| luv.cargo.retrieve_parts(part, 1, true));
            if taken {
                put_back(world, self.settlement, part);
            } else {
                warn!(mission = %self.id, part = part.name(), "attachment missing from vehicle");
            }
        }
    }
}

fn put_back(world: &mut World, settlement: SettlementId, part: Part) {
    if let Some(Err(source)) = world
        .settlement_mut(settlement)
        .map(|settlement| settlement.inventory.store_parts(part, 1))
    {
        warn!(%source, part = part.name(), "attachment could not be stored");
    }
}

/// Whether a settlement member can be signed up.
fn is_recruitable(agent: &AgentState) -> bool {
    agent.is_person()
        && agent.is_inside()
        && agent.mission.is_none()
        && !agent.condition.has_serious_medical_problem()
}

/// The starter plus settlement members in roster order, up to the smaller
/// of the crew limit and the number of EVA suits.
fn recruit(starter: &AgentState, settlement: &Settlement, ctx: &ActionContext<'_>) -> Vec<AgentId> {
    let suits = usize::try_from(settlement.inventory.part_count(Part::EvaSuit)).unwrap_or(usize::MAX);
    let limit = ctx.rules.missions.max_people.min(suits);
    let mut crew = vec![starter.id];
    for id in settlement.roster() {
        if crew.len() >= limit {
            break;
        }
        if *id != starter.id
            && ctx
                .agents
                .get(id)
                .is_some_and(|agent| is_recruitable(&agent.state))
        {
            crew.push(*id);
        }
    }
    if crew.len() > limit {
        crew.clear();
    }
    crew
}

/// Pick the most profitable open site, or plan a new one.
fn plan_site(
    settlement: &Settlement,
    catalog: &ConstructionCatalog,
    skill: u32,
    rng: &mut impl Rng,
) -> Result<SitePlan, &'static str> {
    let inventory = &settlement.inventory;
    let best = settlement
        .sites()
        .iter()
        .filter(|site| !site.is_under_construction() && !site.is_all_construction_complete())
        .map(|site| (site, site.profit(catalog, inventory, skill)))
        .filter(|(_, profit)| *profit > 0.0)
        .fold(None, |best: Option<(&ConstructionSite, f64)>, (site, profit)| match best {
            Some((_, top)) if top >= profit => best,
            _ => Some((site, profit)),
        });

    let Some((site, _)) = best else {
        return draw_stage(catalog.foundations(), inventory, skill, rng)
            .map(SitePlan::New)
            .ok_or(NO_STAGE);
    };
    match site.current_stage() {
        Some(stage) if !stage.is_complete() => Ok(SitePlan::Continue(site.id)),
        Some(stage) => draw_stage(catalog.next_stages(&stage.info.name), inventory, skill, rng)
            .map(|info| SitePlan::Extend(site.id, info))
            .ok_or(NO_STAGE),
        None => draw_stage(catalog.foundations(), inventory, skill, rng)
            .map(|info| SitePlan::Extend(site.id, info))
            .ok_or(NO_STAGE),
    }
}

/// Weighted-profit draw over candidate stage infos.
fn draw_stage<'a>(
    stages: impl Iterator<Item = &'a ConstructionStageInfo>,
    inventory: &Inventory,
    skill: u32,
    rng: &mut impl Rng,
) -> Option<ConstructionStageInfo> {
    let stages: Vec<&ConstructionStageInfo> = stages.collect();
    let weights: Vec<(usize, f64)> = stages
        .iter()
        .enumerate()
        .map(|(index, info)| (index, info.profit(inventory, skill)))
        .collect();
    select_weighted(&weights, rng)
        .and_then(|index| stages.get(index))
        .map(|info| (*info).clone())
}

/// Carry out a plan. Returns the site and the name of its working stage.
fn open_site(settlement: &mut Settlement, plan: SitePlan) -> Result<(SiteId, String), WorldError> {
    let (site, info, fresh) = match plan {
        SitePlan::Continue(site) => (site, None, false),
        SitePlan::Extend(site, info) => (site, Some(info), false),
        SitePlan::New(info) => (settlement.create_site(), Some(info), true),
    };
    let target = settlement.site_mut(site).ok_or(WorldError::SiteNotFound(site))?;
    if let Some(info) = info
        && let Err(error) = target.add_stage(info)
    {
        if fresh {
            settlement.remove_site(site)?;
        }
        return Err(error);
    }
    let stage = target
        .current_stage()
        .map(|stage| stage.info.name.clone())
        .ok_or(WorldError::SiteNotFound(site))?;
    Ok((site, stage))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use marsim_types::{RoleType, VehicleKind};
    use marsim_world::Vehicle;

    use super::*;
    use crate::mission::{MissionKind, step_missions};
    use crate::task::TaskKind;
    use crate::task::tests::Fixture;

    /// A stocked settlement with `crew` members, suits for everyone, and a
    /// utility vehicle. Returns the starter, who is not in the agent map.
    fn crewed(fx: &mut Fixture, crew: usize) -> (AgentState, VehicleId) {
        let base = fx.settlement;
        let starter = fx.person("Lead", RoleType::Commander).state;
        for index in 1..crew {
            let agent = fx.person(&format!("Crew {index}"), RoleType::CrewEngineer);
            fx.agents.insert(agent.id(), agent);
        }
        let inventory = &mut fx.world.settlement_mut(base).unwrap().inventory;
        inventory.store_parts(Part::EvaSuit, 10).unwrap();
        inventory.store_parts(Part::Backhoe, 1).unwrap();
        inventory.store_parts(Part::CraneBoom, 2).unwrap();
        let luv = fx.world.add_vehicle(Vehicle::new(
            "LUV 1",
            VehicleKind::LightUtilityVehicle,
            Some(base),
        ));
        (starter, luv)
    }

    #[test]
    fn start_recruits_and_reserves() {
        let mut fx = Fixture::new();
        let (mut starter, luv) = crewed(&mut fx, 4);
        let mission = BuildingConstructionMission::start(&mut starter, &mut fx.ctx());

        assert!(!mission.is_ended(), "{:?}", mission.end_reason());
        assert_eq!(mission.participants().len(), 4);
        assert_eq!(mission.stage(), Some("Surface Foundation"));
        assert_eq!(mission.vehicle(), Some(luv));
        assert_eq!(starter.mission, Some(mission.id()));
        assert!(fx.agents.values().all(|agent| agent.state.mission == Some(mission.id())));

        let vehicle = fx.world.vehicle(luv).unwrap();
        assert_eq!(vehicle.reserved_mission(), Some(mission.id()));
        assert_eq!(vehicle.cargo.part_count(Part::Backhoe), 1);
        assert_eq!(vehicle.cargo.part_count(Part::CraneBoom), 1);
        let settlement = fx.world.settlement(fx.settlement).unwrap();
        assert_eq!(settlement.inventory.part_count(Part::CraneBoom), 1);
        assert!(settlement.sites().first().unwrap().is_under_construction());
    }

    #[test]
    fn too_few_members_ends_at_start() {
        let mut fx = Fixture::new();
        let (mut starter, luv) = crewed(&mut fx, 2);
        let mission = BuildingConstructionMission::start(&mut starter, &mut fx.ctx());
        assert_eq!(mission.end_reason(), Some(NOT_ENOUGH_MEMBERS));
        assert!(starter.mission.is_none());
        assert!(!fx.world.vehicle(luv).unwrap().is_reserved_for_mission());
        assert!(fx.world.settlement(fx.settlement).unwrap().sites().is_empty());
    }

    #[test]
    fn suits_cap_the_crew() {
        let mut fx = Fixture::new();
        let (mut starter, _) = crewed(&mut fx, 6);
        let inventory = &mut fx.world.settlement_mut(fx.settlement).unwrap().inventory;
        assert!(inventory.retrieve_parts(Part::EvaSuit, 7, true));
        let mission = BuildingConstructionMission::start(&mut starter, &mut fx.ctx());
        assert_eq!(mission.participants().len(), 3);
        assert_eq!(
            fx.agents.values().filter(|agent| agent.state.mission.is_some()).count(),
            2
        );
    }

    #[test]
    fn no_utility_vehicle_ends_at_start() {
        let mut fx = Fixture::new();
        let (mut starter, luv) = crewed(&mut fx, 3);
        fx.world.reserve_vehicle(luv, MissionId::new()).unwrap();
        let mission = BuildingConstructionMission::start(&mut starter, &mut fx.ctx());
        assert_eq!(mission.end_reason(), Some(NO_VEHICLE));
    }

    #[test]
    fn no_affordable_stage_ends_at_start() {
        let mut fx = Fixture::new();
        let (mut starter, _) = crewed(&mut fx, 3);
        let inventory = &mut fx.world.settlement_mut(fx.settlement).unwrap().inventory;
        assert!(inventory.retrieve(marsim_types::Resource::Concrete, 800.0, true));
        let mission = BuildingConstructionMission::start(&mut starter, &mut fx.ctx());
        assert_eq!(mission.end_reason(), Some(NO_STAGE));
    }

    /// Start a mission and register it, putting the starter in the map.
    fn registered(fx: &mut Fixture) -> (MissionId, VehicleId) {
        let (mut starter, luv) = crewed(fx, 3);
        let mission = BuildingConstructionMission::start(&mut starter, &mut fx.ctx());
        let id = mission.id();
        fx.missions.insert(MissionKind::BuildingConstruction(mission));
        fx.agents.insert(starter.id, crate::agent::Agent::new(starter));
        (id, luv)
    }

    #[test]
    fn site_preparation_waits_then_construction_assigns_work() {
        let mut fx = Fixture::new();
        let (id, _) = registered(&mut fx);

        assert_eq!(step_missions(&mut fx.ctx_at(1200.0)), 0);
        assert_eq!(fx.missions.get(id).unwrap().phase(), Some(MissionPhase::PrepareSite));
        let settlement = fx.world.settlement(fx.settlement).unwrap();
        assert!(settlement.sites().first().unwrap().current_stage().unwrap().materials_loaded());

        step_missions(&mut fx.ctx_at(1500.0));
        assert_eq!(fx.missions.get(id).unwrap().phase(), Some(MissionPhase::Construction));

        // Enough steps that every idle participant gets work.
        for _ in 0..20 {
            step_missions(&mut fx.ctx_at(1600.0));
        }
        for agent in fx.agents.values() {
            let assigned = agent
                .mind
                .task()
                .is_some_and(|task| matches!(task.kind(), TaskKind::ConstructBuilding(work) if work.mission() == id));
            assert!(assigned, "{} has no construction work", agent.state.name);
        }
    }

    #[test]
    fn building_work_completes_the_stage() {
        let mut fx = Fixture::new();
        let (id, luv) = registered(&mut fx);
        step_missions(&mut fx.ctx_at(1000.0));
        step_missions(&mut fx.ctx_at(1500.0));

        let site = fx.world.settlement(fx.settlement).unwrap().sites().first().unwrap().id;
        let builder_id = *fx.agents.keys().next().unwrap();
        let mut builder = fx.agents.remove(&builder_id).unwrap();
        let mut task = ConstructBuilding::create(&builder.state, id, fx.settlement, site);
        task.perform(&mut builder.state, 500.0, &mut fx.ctx_at(1600.0)).unwrap();
        fx.agents.insert(builder_id, builder);

        let stage_done = fx
            .world
            .settlement(fx.settlement)
            .unwrap()
            .site(site)
            .unwrap()
            .current_stage()
            .unwrap()
            .is_complete();
        assert!(stage_done);

        assert_eq!(step_missions(&mut fx.ctx_at(1700.0)), 1);
        assert!(fx.missions.get(id).is_none());
        let ended: Vec<_> = fx.missions.ended().collect();
        assert_eq!(ended.first().unwrap().end_reason.as_deref(), Some(SUCCESS));
        assert!(!fx.world.vehicle(luv).unwrap().is_reserved_for_mission());
        assert!(fx.agents.values().all(|agent| agent.state.mission.is_none()));
        let settlement = fx.world.settlement(fx.settlement).unwrap();
        assert_eq!(settlement.inventory.part_count(Part::CraneBoom), 2);
        assert!(!settlement.sites().first().unwrap().is_under_construction());
    }

    #[test]
    fn emergency_ends_the_mission_and_unreserves_the_vehicle() {
        let mut fx = Fixture::new();
        let (id, luv) = registered(&mut fx);
        step_missions(&mut fx.ctx_at(1000.0));
        step_missions(&mut fx.ctx_at(1500.0));
        assert!(fx.world.vehicle(luv).unwrap().is_reserved_for_mission());

        let patient = fx.agents.values_mut().next().unwrap();
        patient
            .state
            .condition
            .set_medical_problem(Some("decompression sickness".to_owned()));

        assert_eq!(step_missions(&mut fx.ctx_at(1600.0)), 1);
        let ended: Vec<_> = fx.missions.ended().collect();
        assert!(ended.first().unwrap().end_reason.as_deref().unwrap().starts_with("Medical emergency"));
        assert!(fx.missions.get(id).is_none());
        assert!(!fx.world.vehicle(luv).unwrap().is_reserved_for_mission());
        assert!(fx.agents.values().all(|agent| agent.state.mission.is_none()));
        let settlement = fx.world.settlement(fx.settlement).unwrap();
        assert!(!settlement.sites().first().unwrap().is_under_construction());
        assert_eq!(settlement.inventory.part_count(Part::Backhoe), 1);
    }

    #[test]
    fn settlement_emergency_also_ends_it() {
        let mut fx = Fixture::new();
        registered(&mut fx);
        step_missions(&mut fx.ctx_at(1000.0));
        step_missions(&mut fx.ctx_at(1500.0));
        fx.world
            .settlement_mut(fx.settlement)
            .unwrap()
            .set_emergency("Dust storm");
        assert_eq!(step_missions(&mut fx.ctx_at(1600.0)), 1);
        let ended: Vec<_> = fx.missions.ended().collect();
        assert_eq!(
            ended.first().unwrap().end_reason.as_deref(),
            Some("Settlement emergency: Dust storm")
        );
    }

    #[test]
    fn a_failing_step_ends_the_mission_and_hands_everything_back() {
        let mut fx = Fixture::new();
        let (id, luv) = registered(&mut fx);
        step_missions(&mut fx.ctx_at(1000.0));
        step_missions(&mut fx.ctx_at(1500.0));
        assert_eq!(fx.missions.get(id).unwrap().phase(), Some(MissionPhase::Construction));

        // The site disappears from under the mission.
        let settlement = fx.world.settlement_mut(fx.settlement).unwrap();
        let site = settlement.sites().first().unwrap().id;
        settlement.remove_site(site).unwrap();

        assert_eq!(step_missions(&mut fx.ctx_at(1600.0)), 1);
        assert!(fx.missions.get(id).is_none());
        let ended: Vec<_> = fx.missions.ended().collect();
        let expected = MissionError::MissingSite { mission: id }.to_string();
        assert_eq!(ended.first().unwrap().end_reason.as_deref(), Some(expected.as_str()));
        assert!(!fx.world.vehicle(luv).unwrap().is_reserved_for_mission());
        assert!(fx.agents.values().all(|agent| agent.state.mission.is_none()));
        let settlement = fx.world.settlement(fx.settlement).unwrap();
        assert_eq!(settlement.inventory.part_count(Part::Backhoe), 1);
    }

    #[test]
    fn ending_twice_changes_nothing() {
        let mut fx = Fixture::new();
        let (mut starter, luv) = crewed(&mut fx, 3);
        let mut mission = BuildingConstructionMission::start(&mut starter, &mut fx.ctx());
        mission.end_mission(&mut fx.ctx(), "Called off");
        let other = MissionId::new();
        fx.world.reserve_vehicle(luv, other).unwrap();
        mission.end_mission(&mut fx.ctx(), "Again");
        assert_eq!(mission.end_reason(), Some("Called off"));
        assert_eq!(fx.world.vehicle(luv).unwrap().reserved_mission(), Some(other));
    }
}
