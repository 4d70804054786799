//! Agent state and creation.
//!
//! An [`Agent`] is split into its [`AgentState`] (everything tasks read and
//! mutate) and its [`Mind`] (the controller that owns the active task), so
//! the mind can drive a task against the state without aliasing.
//!
//! The [`AgentManager`] creates persons and robots with unique names and
//! rolled attributes, skills, and preferences.

use std::collections::{BTreeMap, BTreeSet};

use marsim_types::{
    AgentId, AgentKind, AgentSnapshot, FavoriteActivity, JobAssigner, JobKind, LocationSituation,
    MissionId, RoleType, SettlementId,
};
use rand::Rng;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};

use crate::attributes::NaturalAttributes;
use crate::condition::{ConditionConfig, PhysicalCondition};
use crate::error::AgentError;
use crate::job::{JobHistory, best_job};
use crate::meta::MetaTaskKind;
use crate::mind::Mind;
use crate::skills::SkillManager;

/// Strongest like or dislike of a task kind.
pub const MAX_PREFERENCE: i8 = 5;

/// Everything about an agent except its controller.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentState {
    /// Agent identifier.
    pub id: AgentId,
    /// Display name.
    pub name: String,
    /// Person or robot.
    pub kind: AgentKind,
    /// Home settlement.
    pub settlement: Option<SettlementId>,
    /// Where the agent currently is.
    pub location: LocationSituation,
    /// Natural attribute scores.
    pub attributes: NaturalAttributes,
    /// Skill levels and experience.
    pub skills: SkillManager,
    /// Fatigue, hunger, stress.
    pub condition: PhysicalCondition,
    /// Active job and assignment history.
    pub jobs: JobHistory,
    /// Settlement role.
    pub role: RoleType,
    /// Favorite activity.
    pub favorite: FavoriteActivity,
    /// Task likes and dislikes in `-5..=5`.
    pub preferences: BTreeMap<MetaTaskKind, i8>,
    /// Mission the agent is signed up for.
    pub mission: Option<MissionId>,
    /// Whether the agent is wearing an EVA suit.
    pub wearing_suit: bool,
}

impl AgentState {
    /// Whether this is a person.
    pub fn is_person(&self) -> bool {
        self.kind == AgentKind::Person
    }

    /// Whether the agent is inside its settlement.
    pub fn is_inside(&self) -> bool {
        self.location == LocationSituation::InSettlement
    }

    /// Current performance rating. Robots always perform fully.
    pub fn performance(&self) -> f64 {
        match self.kind {
            AgentKind::Person => self.condition.performance(),
            AgentKind::Robot => 1.0,
        }
    }

    /// Preference score for a task kind.
    pub fn preference(&self, task: MetaTaskKind) -> i8 {
        self.preferences
            .get(&task)
            .copied()
            .unwrap_or(0)
            .clamp(-MAX_PREFERENCE, MAX_PREFERENCE)
    }

    /// Let time pass. Robots do not tire, hunger, or stress.
    pub fn time_passing(&mut self, time: f64, config: &ConditionConfig) {
        if self.is_person() {
            self.condition.time_passing(time, config);
        }
    }

    /// File a job-change request for review.
    ///
    /// The request is recorded as pending whatever the job; reviewers reject
    /// jobs this kind of agent cannot hold.
    pub fn request_job_change(&mut self, job: JobKind, assigner: JobAssigner, sol: u64) -> Result<(), AgentError> {
        let initiator = match assigner {
            JobAssigner::Settlement => self.name.clone(),
            JobAssigner::User => "User".to_owned(),
            JobAssigner::MissionControl => "Mission Control".to_owned(),
        };
        self.jobs.request_change(self.id, job, initiator, assigner, sol)
    }

    /// Adjust stress. Ignored for robots.
    pub fn adjust_stress(&mut self, delta: f64) {
        if self.is_person() {
            self.condition.adjust_stress(delta);
        }
    }
}

/// A person or robot: state plus controller.
#[derive(Debug, Clone)]
pub struct Agent {
    /// What the agent is.
    pub state: AgentState,
    /// What the agent is doing.
    pub mind: Mind,
}

impl Agent {
    /// Wrap a state with an idle mind.
    pub const fn new(state: AgentState) -> Self {
        Self {
            state,
            mind: Mind::new(),
        }
    }

    /// Agent identifier.
    pub const fn id(&self) -> AgentId {
        self.state.id
    }

    /// Display snapshot.
    pub fn snapshot(&self) -> AgentSnapshot {
        let state = &self.state;
        let task = self.mind.task();
        AgentSnapshot {
            id: state.id,
            name: state.name.clone(),
            kind: state.kind,
            settlement: state.settlement,
            location: state.location,
            job: state.jobs.active(),
            role: state.role,
            task_name: task.map(|task| task.name().to_owned()),
            task_phase: task.and_then(|task| task.phase()).map(|phase| phase.to_string()),
            task_description: task.map(crate::task::Task::description),
            mission: state.mission,
            fatigue: state.condition.fatigue,
            hunger: state.condition.hunger,
            stress: state.condition.stress(),
            performance: state.performance(),
            skills: state.skills.levels(),
            attributes: state.attributes.iter().collect(),
        }
    }
}

/// Creates agents with unique names.
#[derive(Debug, Default)]
pub struct AgentManager {
    names_in_use: BTreeSet<String>,
}

/// Serialized form of an agent seed, used by settlement templates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentSeed {
    /// Display name.
    pub name: String,
    /// Role to hold.
    pub role: RoleType,
    /// Job to start with. Picked by capability if absent.
    #[serde(default)]
    pub job: Option<JobKind>,
}

impl AgentManager {
    /// Create an empty manager.
    pub const fn new() -> Self {
        Self {
            names_in_use: BTreeSet::new(),
        }
    }

    /// Number of names handed out.
    pub fn count(&self) -> usize {
        self.names_in_use.len()
    }

    fn claim_name(&mut self, name: &str) -> Result<(), AgentError> {
        if !self.names_in_use.insert(name.to_owned()) {
            return Err(AgentError::DuplicateName(name.to_owned()));
        }
        Ok(())
    }

    /// Create a person with rolled attributes, skills, and preferences.
    ///
    /// When `job` is `None` the most capable person job is chosen.
    pub fn create_person(
        &mut self,
        seed: &AgentSeed,
        settlement: SettlementId,
        sol: u64,
        rng: &mut impl Rng,
    ) -> Result<Agent, AgentError> {
        if let Some(job) = seed.job
            && !job.suits(AgentKind::Person)
        {
            return Err(AgentError::JobNotSuitable {
                job,
                kind: AgentKind::Person,
            });
        }
        self.claim_name(&seed.name)?;

        let attributes = NaturalAttributes::random(rng);
        let skills = SkillManager::random(rng);
        let condition = PhysicalCondition::new();
        let job = seed
            .job
            .unwrap_or_else(|| best_job(AgentKind::Person, &skills, &attributes, &condition));
        let preferences = MetaTaskKind::ALL
            .iter()
            .map(|task| (*task, rng.random_range(-2..=2)))
            .collect();
        let favorite = FavoriteActivity::ALL
            .choose(rng)
            .copied()
            .unwrap_or(FavoriteActivity::FieldWork);

        Ok(Agent::new(AgentState {
            id: AgentId::new(),
            name: seed.name.clone(),
            kind: AgentKind::Person,
            settlement: Some(settlement),
            location: LocationSituation::InSettlement,
            attributes,
            skills,
            condition,
            jobs: JobHistory::new(job, JobAssigner::Settlement, sol),
            role: seed.role,
            favorite,
            preferences,
            mission: None,
            wearing_suit: false,
        }))
    }

    /// Create a robot holding a robot job.
    pub fn create_robot(
        &mut self,
        name: &str,
        job: JobKind,
        settlement: SettlementId,
        sol: u64,
    ) -> Result<Agent, AgentError> {
        if !job.suits(AgentKind::Robot) {
            return Err(AgentError::JobNotSuitable {
                job,
                kind: AgentKind::Robot,
            });
        }
        self.claim_name(name)?;
        Ok(Agent::new(AgentState {
            id: AgentId::new(),
            name: name.to_owned(),
            kind: AgentKind::Robot,
            settlement: Some(settlement),
            location: LocationSituation::InSettlement,
            attributes: NaturalAttributes::neutral(),
            skills: SkillManager::new(),
            condition: PhysicalCondition::new(),
            jobs: JobHistory::new(job, JobAssigner::Settlement, sol),
            role: RoleType::CrewEngineer,
            favorite: FavoriteActivity::Tinkering,
            preferences: BTreeMap::new(),
            mission: None,
            wearing_suit: false,
        }))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;

    fn seed(name: &str) -> AgentSeed {
        AgentSeed {
            name: name.to_owned(),
            role: RoleType::CrewScientist,
            job: None,
        }
    }

    #[test]
    fn names_must_be_unique() {
        let mut manager = AgentManager::new();
        let mut rng = SmallRng::seed_from_u64(1);
        let base = SettlementId::new();
        manager.create_person(&seed("Ana"), base, 1, &mut rng).unwrap();
        assert!(matches!(
            manager.create_person(&seed("Ana"), base, 1, &mut rng),
            Err(AgentError::DuplicateName(_))
        ));
        assert!(manager.create_robot("Ana", JobKind::RepairBot, base, 1).is_err());
        assert_eq!(manager.count(), 1);
    }

    #[test]
    fn robots_cannot_take_person_jobs() {
        let mut manager = AgentManager::new();
        assert!(matches!(
            manager.create_robot("Unit 1", JobKind::Chef, SettlementId::new(), 1),
            Err(AgentError::JobNotSuitable { .. })
        ));
    }

    #[test]
    fn robots_do_not_tire() {
        let mut manager = AgentManager::new();
        let mut robot = manager
            .create_robot("Unit 1", JobKind::RepairBot, SettlementId::new(), 1)
            .unwrap();
        robot.state.time_passing(500.0, &ConditionConfig::default());
        assert!(robot.state.condition.fatigue.abs() < f64::EPSILON);
        assert!((robot.state.performance() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn job_requests_name_their_initiator() {
        let mut manager = AgentManager::new();
        let mut rng = SmallRng::seed_from_u64(3);
        let mut person = manager
            .create_person(&seed("Cam"), SettlementId::new(), 1, &mut rng)
            .unwrap()
            .state;
        let before = person.jobs.active();

        person
            .request_job_change(JobKind::Botanist, JobAssigner::Settlement, 4)
            .unwrap();
        let pending = person.jobs.pending().unwrap();
        assert_eq!(pending.initiator, "Cam");
        assert_eq!(pending.filed_sol, 4);
        assert_eq!(person.jobs.active(), before);

        assert!(matches!(
            person.request_job_change(JobKind::Chef, JobAssigner::User, 4),
            Err(AgentError::RequestAlreadyPending { .. })
        ));
        person.jobs.decide(person.id, false, AgentId::new(), 5).unwrap();
        person
            .request_job_change(JobKind::Chef, JobAssigner::MissionControl, 6)
            .unwrap();
        assert_eq!(person.jobs.pending().unwrap().initiator, "Mission Control");
    }

    #[test]
    fn new_person_snapshot_is_idle() {
        let mut manager = AgentManager::new();
        let mut rng = SmallRng::seed_from_u64(2);
        let person = manager
            .create_person(&seed("Ben"), SettlementId::new(), 1, &mut rng)
            .unwrap();
        let snapshot = person.snapshot();
        assert_eq!(snapshot.name, "Ben");
        assert!(snapshot.task_name.is_none());
        assert!(snapshot.job.suits(AgentKind::Person));
        assert_eq!(snapshot.attributes.len(), 10);
    }
}
