//! Parallel multi-agent environments.
//!
//! Provides the `ParallelEnv` trait that concrete environments implement, the
//! `AgentRoster` that keeps the active-agent set consistent across ticks, and
//! wrappers that layer episode statistics and time limits on top.

mod agents;
mod info;
mod parallel;
mod wrappers;

pub use agents::{AgentId, AgentMap, AgentRoster};
pub use info::AgentInfo;
pub use parallel::{EnvMetadata, ParallelEnv, ResetOutcome, StepOutcome};
pub use wrappers::{EpisodeStats, TimeLimit};
