//! The task state machine.
//!
//! A [`Task`] runs one agent behavior through a fixed, forward-only
//! sequence of [`TaskPhase`]s. [`Task::perform`] takes a time budget and
//! returns what it did not use; when a phase finishes early its leftover
//! time rolls straight into the next phase within the same call. The loop
//! is bounded by [`MAX_PHASE_ITERATIONS`] so a misconfigured zero-length
//! phase faults the task instead of hanging the step.
//!
//! Each concrete behavior implements [`TaskBehavior`] and is one variant of
//! the closed [`TaskKind`] sum.
//!
//! # Behaviors
//!
//! - [`eat`] -- Eat a meal from settlement stores.
//! - [`sleep`] -- Sleep off fatigue.
//! - [`relax`] -- Unwind for a while.
//! - [`dig_ice`] -- Collect ice outside and bring it in.
//! - [`maintain_vehicle`] -- Service a ground vehicle.
//! - [`unload_vehicle`] -- Move a parked vehicle's cargo into storage.
//! - [`review_job`] -- Decide pending job-change requests.
//! - [`construct`] -- Work on a mission's construction stage.
//! - [`airlock`] -- Walk through an airlock; only ever run as a subtask.

pub mod airlock;
pub mod construct;
pub mod dig_ice;
pub mod eat;
pub mod maintain_vehicle;
pub mod relax;
pub mod review_job;
pub mod sleep;
pub mod unload_vehicle;

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::agent::AgentState;
use crate::context::ActionContext;
use crate::error::TaskFault;

pub use airlock::{AirlockDirection, WalkThroughAirlock};
pub use construct::ConstructBuilding;
pub use dig_ice::DigLocalIce;
pub use eat::EatMeal;
pub use maintain_vehicle::MaintainGroundVehicle;
pub use relax::Relax;
pub use review_job::ReviewJobReassignment;
pub use sleep::Sleep;
pub use unload_vehicle::UnloadVehicle;

/// Most phase steps one [`Task::perform`] call may take.
pub const MAX_PHASE_ITERATIONS: u32 = 64;

/// Remaining time below this is treated as spent.
const TIME_EPSILON: f64 = 1e-9;

/// Every phase any task uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPhase {
    /// Eating a meal.
    Eating,
    /// Sleeping.
    Sleeping,
    /// Relaxing.
    Relaxing,
    /// Leaving the settlement through an airlock.
    ExitAirlock,
    /// Collecting ice outside.
    CollectIce,
    /// Servicing a vehicle.
    Maintain,
    /// Unloading cargo.
    Unloading,
    /// Reviewing job requests.
    Reviewing,
    /// Building a construction stage.
    Construct,
    /// Returning through an airlock.
    EnterAirlock,
    /// Waiting for an airlock slot.
    AwaitSlot,
    /// Cycling the airlock.
    Cycle,
}

impl TaskPhase {
    /// Display name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Eating => "Eating",
            Self::Sleeping => "Sleeping",
            Self::Relaxing => "Relaxing",
            Self::ExitAirlock => "Exiting Airlock",
            Self::CollectIce => "Collecting Ice",
            Self::Maintain => "Maintaining",
            Self::Unloading => "Unloading",
            Self::Reviewing => "Reviewing",
            Self::Construct => "Constructing",
            Self::EnterAirlock => "Entering Airlock",
            Self::AwaitSlot => "Waiting for Airlock",
            Self::Cycle => "Cycling Airlock",
        }
    }
}

impl fmt::Display for TaskPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Input to one phase function call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseStep {
    /// Time available, in millisols.
    pub time: f64,
    /// Time already spent in this phase before this call.
    pub phase_elapsed: f64,
}

/// What a phase function did with its time.
#[derive(Debug)]
pub enum PhaseOutcome {
    /// Used all the time; the phase continues.
    InProgress,
    /// The phase finished with `leftover` time unused.
    PhaseDone {
        /// Unused time.
        leftover: f64,
    },
    /// The whole task finished with `leftover` time unused.
    Completed {
        /// Unused time.
        leftover: f64,
    },
    /// The task cannot go on. No time was used.
    Blocked {
        /// Why.
        reason: String,
    },
    /// Run a subtask until it ends. No time was used.
    Delegate(Box<Task>),
}

/// How a parent reacts to its subtask ending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubtaskResult {
    /// Resume the current phase.
    Continue,
    /// End the parent with a reason.
    Abort(String),
}

/// One concrete task behavior.
pub trait TaskBehavior {
    /// Display name.
    fn name(&self) -> &'static str;

    /// The forward-only phase sequence.
    fn phases(&self) -> &'static [TaskPhase];

    /// Stress change per millisol of work.
    fn stress_modifier(&self) -> f64 {
        0.0
    }

    /// Run one phase for up to `step.time` millisols.
    fn perform_phase(
        &mut self,
        phase: TaskPhase,
        step: PhaseStep,
        agent: &mut AgentState,
        ctx: &mut ActionContext<'_>,
    ) -> Result<PhaseOutcome, TaskFault>;

    /// Turn working time into skill experience.
    fn add_experience(&self, _agent: &mut AgentState, _time: f64) {}

    /// Give back anything held. Called exactly once when the task ends.
    fn release(&mut self, _agent: &mut AgentState, _ctx: &mut ActionContext<'_>) {}

    /// React to a delegated subtask ending.
    fn subtask_ended(&mut self, _subtask: &Task, _agent: &AgentState) -> SubtaskResult {
        SubtaskResult::Continue
    }

    /// What the agent is doing, for display.
    fn description(&self) -> String;
}

/// The closed set of task behaviors.
#[derive(Debug, Clone)]
pub enum TaskKind {
    /// Eat a meal.
    EatMeal(EatMeal),
    /// Sleep.
    Sleep(Sleep),
    /// Relax.
    Relax(Relax),
    /// Collect ice outside.
    DigLocalIce(DigLocalIce),
    /// Service a vehicle.
    MaintainGroundVehicle(MaintainGroundVehicle),
    /// Unload a vehicle.
    UnloadVehicle(UnloadVehicle),
    /// Review job requests.
    ReviewJobReassignment(ReviewJobReassignment),
    /// Work on a construction stage.
    ConstructBuilding(ConstructBuilding),
    /// Walk through an airlock.
    WalkThroughAirlock(WalkThroughAirlock),
}

impl TaskKind {
    fn behavior(&self) -> &dyn TaskBehavior {
        match self {
            Self::EatMeal(task) => task,
            Self::Sleep(task) => task,
            Self::Relax(task) => task,
            Self::DigLocalIce(task) => task,
            Self::MaintainGroundVehicle(task) => task,
            Self::UnloadVehicle(task) => task,
            Self::ReviewJobReassignment(task) => task,
            Self::ConstructBuilding(task) => task,
            Self::WalkThroughAirlock(task) => task,
        }
    }

    fn behavior_mut(&mut self) -> &mut dyn TaskBehavior {
        match self {
            Self::EatMeal(task) => task,
            Self::Sleep(task) => task,
            Self::Relax(task) => task,
            Self::DigLocalIce(task) => task,
            Self::MaintainGroundVehicle(task) => task,
            Self::UnloadVehicle(task) => task,
            Self::ReviewJobReassignment(task) => task,
            Self::ConstructBuilding(task) => task,
            Self::WalkThroughAirlock(task) => task,
        }
    }
}

/// A running task.
#[derive(Debug, Clone)]
pub struct Task {
    kind: TaskKind,
    phase: Option<TaskPhase>,
    phase_elapsed: f64,
    elapsed: f64,
    subtask: Option<Box<Self>>,
    ended: bool,
    completed: bool,
    end_reason: Option<String>,
}

impl Task {
    /// Start a task in its first phase.
    pub fn new(kind: TaskKind) -> Self {
        let phase = kind.behavior().phases().first().copied();
        Self {
            kind,
            phase,
            phase_elapsed: 0.0,
            elapsed: 0.0,
            subtask: None,
            ended: false,
            completed: false,
            end_reason: None,
        }
    }

    /// A task that ended before it began because it cannot apply now.
    pub fn inapplicable(kind: TaskKind, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        debug!(task = kind.behavior().name(), %reason, "task not applicable");
        Self {
            phase: None,
            ended: true,
            end_reason: Some(reason),
            ..Self::new(kind)
        }
    }

    /// The behavior.
    pub const fn kind(&self) -> &TaskKind {
        &self.kind
    }

    /// Display name.
    pub fn name(&self) -> &'static str {
        self.kind.behavior().name()
    }

    /// Current phase; `None` once ended.
    pub const fn phase(&self) -> Option<TaskPhase> {
        self.phase
    }

    /// Total time worked.
    pub const fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// The running subtask, if any.
    pub fn subtask(&self) -> Option<&Self> {
        self.subtask.as_deref()
    }

    /// Whether the task has ended, successfully or not.
    pub const fn is_ended(&self) -> bool {
        self.ended
    }

    /// Whether the task ran to completion.
    pub const fn is_completed(&self) -> bool {
        self.completed
    }

    /// Why the task ended early, if it did.
    pub fn end_reason(&self) -> Option<&str> {
        self.end_reason.as_deref()
    }

    /// What the agent is doing. A running subtask speaks for its parent.
    pub fn description(&self) -> String {
        self.subtask().map_or_else(
            || self.kind.behavior().description(),
            Self::description,
        )
    }

    /// Spend up to `time` millisols on the task. Returns the unused time.
    ///
    /// Leftover time from a finished phase carries into the next one. The
    /// call returns when the time is spent or the task ends.
    pub fn perform(
        &mut self,
        agent: &mut AgentState,
        time: f64,
        ctx: &mut ActionContext<'_>,
    ) -> Result<f64, TaskFault> {
        let mut remaining = time.max(0.0);
        let mut iterations = 0_u32;

        while remaining > TIME_EPSILON && !self.ended {
            iterations = iterations.saturating_add(1);
            if iterations > MAX_PHASE_ITERATIONS {
                return Err(TaskFault::IterationLimit {
                    task: self.name(),
                    iterations: MAX_PHASE_ITERATIONS,
                });
            }

            if let Some(subtask) = self.subtask.as_mut() {
                let leftover = subtask.perform(agent, remaining, ctx)?;
                let subtask_ended = subtask.is_ended();
                self.record_time(agent, remaining - leftover);
                remaining = leftover;
                if subtask_ended {
                    self.finish_subtask(agent, ctx);
                }
                continue;
            }

            let phase = self.phase.ok_or(TaskFault::MissingPhase { task: self.name() })?;
            let behavior = self.kind.behavior_mut();
            if !behavior.phases().contains(&phase) {
                return Err(TaskFault::UnknownPhase {
                    task: behavior.name(),
                    phase,
                });
            }
            let step = PhaseStep {
                time: remaining,
                phase_elapsed: self.phase_elapsed,
            };
            match behavior.perform_phase(phase, step, agent, ctx)? {
                PhaseOutcome::InProgress => {
                    self.record_time(agent, remaining);
                    remaining = 0.0;
                }
                PhaseOutcome::PhaseDone { leftover } => {
                    let leftover = leftover.clamp(0.0, remaining);
                    self.record_time(agent, remaining - leftover);
                    remaining = leftover;
                    self.advance_phase(phase, agent, ctx);
                }
                PhaseOutcome::Completed { leftover } => {
                    let leftover = leftover.clamp(0.0, remaining);
                    self.record_time(agent, remaining - leftover);
                    remaining = leftover;
                    self.complete(agent, ctx);
                }
                PhaseOutcome::Blocked { reason } => {
                    self.end_task(agent, ctx, Some(reason));
                }
                PhaseOutcome::Delegate(subtask) => {
                    self.subtask = Some(subtask);
                    if self.subtask.as_ref().is_some_and(|subtask| subtask.is_ended()) {
                        self.finish_subtask(agent, ctx);
                    }
                }
            }
        }
        Ok(remaining)
    }

    /// Award skill experience for `time` millisols of work.
    pub fn add_experience(&self, agent: &mut AgentState, time: f64) {
        if time > 0.0 {
            self.kind.behavior().add_experience(agent, time);
        }
    }

    /// End the task, releasing whatever it holds. Idempotent.
    pub fn end_task(
        &mut self,
        agent: &mut AgentState,
        ctx: &mut ActionContext<'_>,
        reason: Option<String>,
    ) {
        if self.ended {
            return;
        }
        self.ended = true;
        if let Some(mut subtask) = self.subtask.take() {
            subtask.end_task(agent, ctx, None);
        }
        self.kind.behavior_mut().release(agent, ctx);
        if let Some(reason) = &reason {
            debug!(agent = %agent.name, task = self.name(), %reason, "task ended early");
        }
        self.end_reason = reason;
        self.phase = None;
    }

    fn complete(&mut self, agent: &mut AgentState, ctx: &mut ActionContext<'_>) {
        self.completed = true;
        self.end_task(agent, ctx, None);
    }

    fn record_time(&mut self, agent: &mut AgentState, consumed: f64) {
        if consumed <= 0.0 {
            return;
        }
        self.elapsed += consumed;
        self.phase_elapsed += consumed;
        agent.adjust_stress(self.kind.behavior().stress_modifier() * consumed);
    }

    fn advance_phase(&mut self, current: TaskPhase, agent: &mut AgentState, ctx: &mut ActionContext<'_>) {
        let phases = self.kind.behavior().phases();
        let next = phases
            .iter()
            .position(|phase| *phase == current)
            .and_then(|index| phases.get(index.saturating_add(1)))
            .copied();
        self.phase_elapsed = 0.0;
        match next {
            Some(phase) => self.phase = Some(phase),
            None => self.complete(agent, ctx),
        }
    }

    fn finish_subtask(&mut self, agent: &mut AgentState, ctx: &mut ActionContext<'_>) {
        let Some(subtask) = self.subtask.take() else {
            return;
        };
        if let SubtaskResult::Abort(reason) = self.kind.behavior_mut().subtask_ended(&subtask, agent) {
            self.end_task(agent, ctx, Some(reason));
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    //! Shared fixtures for task tests, and the phase loop's fault paths.

    use std::collections::BTreeMap;

    use marsim_types::{JobKind, LocationSituation, Part, RoleType, SettlementId};
    use marsim_world::{Settlement, SurfaceConditions, SurfaceConfig, SurfaceSystem, World};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::agent::{Agent, AgentManager, AgentSeed};
    use crate::context::{ActionContext, SimTime};
    use crate::mission::MissionRegistry;
    use crate::rules::SimulationRules;

    /// A world with one settlement built from the default catalog.
    pub(crate) struct Fixture {
        pub world: World,
        pub agents: BTreeMap<marsim_types::AgentId, Agent>,
        pub missions: MissionRegistry,
        pub rules: SimulationRules,
        pub rng: StdRng,
        pub settlement: SettlementId,
        pub manager: AgentManager,
    }

    impl Fixture {
        #[allow(clippy::unwrap_used)]
        pub(crate) fn new() -> Self {
            let rules = SimulationRules::default();
            let mut world = World::new(SurfaceSystem::new(9, SurfaceConfig::default()));
            let mut settlement = Settlement::new("Base");
            for building in ["Lander Hab", "Storage Shed", "Garage"] {
                settlement.add_building(building, &rules.buildings).unwrap();
            }
            let settlement = world.add_settlement(settlement);
            world.surface.set_conditions(SurfaceConditions {
                irradiance: 500.0,
                ..SurfaceConditions::default()
            });
            Self {
                world,
                agents: BTreeMap::new(),
                missions: MissionRegistry::new(),
                rules,
                rng: StdRng::seed_from_u64(17),
                settlement,
                manager: AgentManager::new(),
            }
        }

        #[allow(clippy::unwrap_used)]
        pub(crate) fn person(&mut self, name: &str, role: RoleType) -> Agent {
            let seed = AgentSeed {
                name: name.to_owned(),
                role,
                job: Some(JobKind::Technician),
            };
            let agent = self
                .manager
                .create_person(&seed, self.settlement, 1, &mut self.rng)
                .unwrap();
            self.world
                .settlement_mut(self.settlement)
                .unwrap()
                .add_member(agent.id());
            agent
        }

        pub(crate) fn ctx(&mut self) -> ActionContext<'_> {
            self.ctx_at(1000.0)
        }

        /// Midday of sol 1, `now` millisols into the session.
        pub(crate) fn ctx_at(&mut self, now: f64) -> ActionContext<'_> {
            ActionContext {
                world: &mut self.world,
                agents: &mut self.agents,
                missions: &mut self.missions,
                rules: &self.rules,
                rng: &mut self.rng,
                time: SimTime {
                    now,
                    sol: 1,
                    millisol: 500.0,
                },
            }
        }
    }

    /// Force a task into `phase`, valid or not.
    pub(crate) fn in_phase(mut task: Task, phase: Option<TaskPhase>) -> Task {
        task.phase = phase;
        task
    }

    #[test]
    fn a_phase_outside_the_sequence_faults() {
        let mut fx = Fixture::new();
        let mut agent = fx.person("Ana", RoleType::CrewEngineer).state;
        let mut task = in_phase(EatMeal::create(&agent), Some(TaskPhase::Cycle));

        let fault = task.perform(&mut agent, 10.0, &mut fx.ctx()).unwrap_err();
        assert!(matches!(
            fault,
            TaskFault::UnknownPhase {
                task: "Eat Meal",
                phase: TaskPhase::Cycle
            }
        ));
        assert!(task.elapsed().abs() < f64::EPSILON);
    }

    #[test]
    fn a_running_task_without_a_phase_faults() {
        let mut fx = Fixture::new();
        let mut agent = fx.person("Ana", RoleType::CrewEngineer).state;
        let mut task = in_phase(Sleep::create(&agent), None);
        assert!(!task.is_ended());

        let fault = task.perform(&mut agent, 10.0, &mut fx.ctx()).unwrap_err();
        assert!(matches!(fault, TaskFault::MissingPhase { task: "Sleep" }));
    }

    #[test]
    fn zero_time_phases_hit_the_iteration_guard() {
        let mut fx = Fixture::new();
        let base = fx.settlement;
        fx.world
            .settlement_mut(base)
            .unwrap()
            .inventory
            .store_parts(Part::Bag, 1)
            .unwrap();
        let mut agent = fx.person("Ana", RoleType::CrewScientist).state;
        let task = DigLocalIce::create(&agent, &mut fx.ctx());
        assert_eq!(fx.world.settlement(base).unwrap().inventory.part_count(Part::Bag), 0);

        // Outside with no airlock to come back through: every walk in ends
        // at once without using time, and the entry is retried.
        agent.location = LocationSituation::Outside;
        agent.settlement = None;
        let mut task = in_phase(task, Some(TaskPhase::EnterAirlock));

        let fault = task.perform(&mut agent, 30.0, &mut fx.ctx()).unwrap_err();
        assert!(matches!(
            fault,
            TaskFault::IterationLimit {
                task: "Dig Local Ice",
                iterations: MAX_PHASE_ITERATIONS
            }
        ));
        assert!(task.elapsed().abs() < f64::EPSILON);

        task.end_task(&mut agent, &mut fx.ctx(), Some(fault.to_string()));
        task.end_task(&mut agent, &mut fx.ctx(), None);
        assert!(task.is_ended() && !task.is_completed());
        assert!(task.end_reason().unwrap().contains("did not settle after 64"));
        assert_eq!(fx.world.settlement(base).unwrap().inventory.part_count(Part::Bag), 1);
    }
}
