//! Error types for the `marsim-agents` crate.
//!
//! Three families, matching the three places failures are isolated:
//!
//! - [`AgentError`] -- Bookkeeping on one agent (jobs, lookups).
//! - [`TaskFault`] -- A task broke an invariant. The owning mind ends that
//!   task and the agent carries on.
//! - [`MissionError`] -- A mission broke an invariant or a world operation
//!   failed mid-phase. The mission is ended with the error as its reason.

use marsim_types::{AgentId, AgentKind, JobKind, MissionId};
use marsim_world::WorldError;

use crate::task::TaskPhase;

/// Errors from agent bookkeeping.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// Agent with the given ID was not found.
    #[error("agent not found: {0}")]
    AgentNotFound(AgentId),

    /// Agent name already exists in the manager.
    #[error("duplicate agent name: {0}")]
    DuplicateName(String),

    /// A job was requested that this kind of agent cannot hold.
    #[error("{kind:?} cannot hold job {job}")]
    JobNotSuitable {
        /// The requested job.
        job: JobKind,
        /// The requester's kind.
        kind: AgentKind,
    },

    /// A job-change request is already awaiting review.
    #[error("agent {agent} already has a pending job request")]
    RequestAlreadyPending {
        /// The requesting agent.
        agent: AgentId,
    },

    /// There is no pending request to decide.
    #[error("agent {agent} has no pending job request")]
    NoPendingRequest {
        /// The agent whose history was checked.
        agent: AgentId,
    },
}

/// A task invariant was violated. Fatal for the task, never for the step.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskFault {
    /// The task was asked to run a phase its kind does not define.
    #[error("{task} has no phase {phase}")]
    UnknownPhase {
        /// Task name.
        task: &'static str,
        /// The offending phase.
        phase: TaskPhase,
    },

    /// A running task had no current phase.
    #[error("{task} is running without a phase")]
    MissingPhase {
        /// Task name.
        task: &'static str,
    },

    /// Leftover-time chaining did not settle.
    #[error("{task} did not settle after {iterations} phase iterations")]
    IterationLimit {
        /// Task name.
        task: &'static str,
        /// Iterations performed.
        iterations: u32,
    },

    /// The task's home settlement disappeared.
    #[error("{task} lost its settlement")]
    SettlementMissing {
        /// Task name.
        task: &'static str,
    },
}

/// A mission invariant was violated or a world operation failed.
#[derive(Debug, thiserror::Error)]
pub enum MissionError {
    /// The mission was stepped without a phase.
    #[error("mission {mission} is running without a phase")]
    MissingPhase {
        /// The mission.
        mission: MissionId,
    },

    /// A construction mission lost track of its site or stage.
    #[error("mission {mission} has no construction stage to work on")]
    MissingSite {
        /// The mission.
        mission: MissionId,
    },

    /// A world mutation failed.
    #[error("world error: {source}")]
    World {
        /// The underlying world error.
        #[from]
        source: WorldError,
    },
}
