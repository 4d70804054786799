//! Agents, their tasks, and the missions they run together.
//!
//! This crate is the behavior layer of the Mars colony simulation. It reads
//! and mutates the physical world from `marsim-world` through an
//! [`ActionContext`] and never touches I/O or clocks itself; the stepping
//! loop in `marsim-core` builds the context once per agent and mission.
//!
//! # Modules
//!
//! - [`agent`] -- Agent state and creation ([`AgentManager`]).
//! - [`attributes`] -- Natural attribute scores and their modifiers.
//! - [`condition`] -- Fatigue, hunger, stress, and performance.
//! - [`context`] -- The mutable simulation view handed to tasks and missions.
//! - [`error`] -- [`AgentError`], [`TaskFault`], and [`MissionError`].
//! - [`job`] -- Job history, the reassignment workflow, and task affinities.
//! - [`meta`] -- Selectable task kinds and their probabilities.
//! - [`mind`] -- The per-agent controller ([`Mind`]).
//! - [`mission`] -- Group missions and the [`MissionRegistry`].
//! - [`rules`] -- Catalogs and tuning ([`SimulationRules`]).
//! - [`selection`] -- Cumulative-weight random selection.
//! - [`skills`] -- Skill levels and experience.
//! - [`task`] -- The task state machine and every concrete task.

pub mod agent;
pub mod attributes;
pub mod condition;
pub mod context;
pub mod error;
pub mod job;
pub mod meta;
pub mod mind;
pub mod mission;
pub mod rules;
pub mod selection;
pub mod skills;
pub mod task;

// Re-export primary types at crate root.
pub use agent::{Agent, AgentManager, AgentSeed, AgentState, MAX_PREFERENCE};
pub use attributes::NaturalAttributes;
pub use condition::{ConditionConfig, MAX_STRESS, PhysicalCondition};
pub use context::{ActionContext, SimTime};
pub use error::{AgentError, MissionError, TaskFault};
pub use job::{JobAffinityTable, JobAssignment, JobHistory, best_job, job_capability};
pub use meta::{MetaTaskKind, MetaTaskRegistry};
pub use mind::{MAX_ACTION_ITERATIONS, Mind};
pub use mission::{
    BuildingConstructionMission, MetaMissionKind, MissionKind, MissionPhase, MissionRegistry,
    step_missions,
};
pub use rules::{MissionConfig, SimulationRules, TaskConfig};
pub use selection::{select_weighted, total_weight};
pub use skills::{MAX_SKILL_LEVEL, SkillManager, experience_to_next};
pub use task::{MAX_PHASE_ITERATIONS, Task, TaskKind, TaskPhase};
