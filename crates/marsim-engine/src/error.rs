//! Error types for the simulation binary.
//!
//! [`EngineError`] wraps every failure mode of startup and the run so
//! `main` can propagate with `?`.

/// Top-level error for the simulation binary.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading or validation failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: marsim_core::config::ConfigError,
    },

    /// Master clock initialization failed.
    #[error("clock error: {source}")]
    Clock {
        /// The underlying clock error.
        #[from]
        source: marsim_core::clock::ClockError,
    },

    /// Settlement construction failed.
    #[error("world error: {source}")]
    World {
        /// The underlying world error.
        #[from]
        source: marsim_world::WorldError,
    },

    /// Stocking a settlement failed.
    #[error("ledger error: {source}")]
    Ledger {
        /// The underlying ledger error.
        #[from]
        source: marsim_ledger::LedgerError,
    },

    /// Creating an agent failed.
    #[error("agent error: {source}")]
    Agent {
        /// The underlying agent error.
        #[from]
        source: marsim_agents::AgentError,
    },

    /// The stepping loop failed.
    #[error("runner error: {source}")]
    Runner {
        /// The underlying runner error.
        #[from]
        source: marsim_core::runner::RunnerError,
    },

    /// Settlement bootstrap failed.
    #[error("bootstrap error: {message}")]
    Bootstrap {
        /// Description of the bootstrap failure.
        message: String,
    },
}
