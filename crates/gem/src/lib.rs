//! # gem
//!
//! Agent-set lifecycle contract for parallel multi-agent environments.
//!
//! ## Overview
//!
//! gem provides:
//! - The `ParallelEnv` trait: every active agent acts on each tick, action maps
//!   are validated against the active agents, and finished agents are retired
//!   before the next tick
//! - `AgentRoster`, the owned possible/active agent sets plus the last tick's
//!   per-agent signals
//! - Wrappers for episode statistics and time limits
//! - An episode driver and pluggable metric loggers
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use gem::prelude::*;
//! use gem_envs::SimpleParallel;
//!
//! let mut env = SimpleParallel::new();
//! let (obs, _infos) = env.reset(Some(42))?;
//!
//! let actions: AgentMap<String> = env
//!     .agents()
//!     .iter()
//!     .map(|agent| (agent.clone(), "good".to_string()))
//!     .collect();
//! let outcome = env.step(&actions)?;
//! ```

pub mod log;
pub mod multiagent;
pub mod rollout;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::log::{CompositeLogger, ConsoleLogger, EpisodeReport, MetricLogger, NoOpLogger};
    pub use crate::multiagent::{
        AgentId, AgentInfo, AgentMap, AgentRoster, EnvMetadata, EpisodeStats, ParallelEnv,
        ResetOutcome, StepOutcome, TimeLimit,
    };
    pub use crate::rollout::{run_episode, EpisodeSummary, RolloutConfig};
    pub use crate::{GemError, Result};
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

use crate::multiagent::AgentId;

/// Error types for the library
#[derive(Debug, thiserror::Error)]
pub enum GemError {
    /// Action map keys differ from the active agents
    #[error("{}", mismatch_message(.missing, .extra))]
    ActionMismatch {
        /// Active agents without an action, sorted
        missing: Vec<AgentId>,
        /// Keys that are not active agents, sorted
        extra: Vec<AgentId>,
    },

    #[error("{method} is not implemented for this environment")]
    NotImplemented { method: &'static str },

    #[error("Duplicate agent in roster: {0}")]
    DuplicateAgent(AgentId),

    #[error("Environment error: {0}")]
    Env(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = core::result::Result<T, GemError>;

fn mismatch_message(missing: &[AgentId], extra: &[AgentId]) -> String {
    let quoted = |ids: &[AgentId]| {
        format!("{:?}", ids.iter().map(AgentId::as_str).collect::<Vec<_>>())
    };

    let mut parts = Vec::with_capacity(2);
    if !missing.is_empty() {
        parts.push(format!("Missing actions for agents: {}", quoted(missing)));
    }
    if !extra.is_empty() {
        parts.push(format!(
            "Actions provided for non-active agents: {}",
            quoted(extra)
        ));
    }
    parts.join(". ")
}
