//! Agent identifiers and the per-episode agent roster.

use std::borrow::Borrow;
use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use super::info::AgentInfo;
use super::parallel::StepOutcome;
use crate::{GemError, Result};

/// Opaque token identifying one agent within an episode.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(String);

impl AgentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl Borrow<str> for AgentId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AgentId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for AgentId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Per-agent mapping used for actions, observations and every signal.
pub type AgentMap<T> = HashMap<AgentId, T>;

/// Possible agents, active agents and the signals from the last tick.
///
/// Owned by exactly one environment instance. Active agents are always the
/// possible agents filtered in place, so their order never changes within an
/// episode.
#[derive(Clone, Debug)]
pub struct AgentRoster {
    possible_agents: Vec<AgentId>,
    agents: Vec<AgentId>,
    rewards: AgentMap<f32>,
    terminations: AgentMap<bool>,
    truncations: AgentMap<bool>,
    infos: AgentMap<AgentInfo>,
}

impl AgentRoster {
    /// Build a roster from the full set of agents the environment can field.
    ///
    /// Every agent starts active.
    pub fn new<I, A>(possible_agents: I) -> Result<Self>
    where
        I: IntoIterator<Item = A>,
        A: Into<AgentId>,
    {
        let possible_agents: Vec<AgentId> = possible_agents.into_iter().map(Into::into).collect();

        let mut seen = HashSet::with_capacity(possible_agents.len());
        for agent in &possible_agents {
            if !seen.insert(agent) {
                return Err(GemError::DuplicateAgent(agent.clone()));
            }
        }

        Ok(Self::from_unique(possible_agents))
    }

    /// Roster of `count` agents named `{prefix}1` through `{prefix}{count}`.
    pub fn numbered(prefix: &str, count: usize) -> Self {
        Self::from_unique(
            (1..=count)
                .map(|i| AgentId::new(format!("{prefix}{i}")))
                .collect(),
        )
    }

    fn from_unique(possible_agents: Vec<AgentId>) -> Self {
        let mut roster = Self {
            agents: Vec::new(),
            possible_agents,
            rewards: AgentMap::new(),
            terminations: AgentMap::new(),
            truncations: AgentMap::new(),
            infos: AgentMap::new(),
        };
        roster.restore();
        roster
    }

    /// Every agent the environment can instantiate, in canonical order.
    pub fn possible_agents(&self) -> &[AgentId] {
        &self.possible_agents
    }

    /// Agents eligible to act on the next tick.
    pub fn agents(&self) -> &[AgentId] {
        &self.agents
    }

    pub fn is_active(&self, agent: &str) -> bool {
        self.agents.iter().any(|a| a.as_str() == agent)
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn rewards(&self) -> &AgentMap<f32> {
        &self.rewards
    }

    pub fn terminations(&self) -> &AgentMap<bool> {
        &self.terminations
    }

    pub fn truncations(&self) -> &AgentMap<bool> {
        &self.truncations
    }

    pub fn infos(&self) -> &AgentMap<AgentInfo> {
        &self.infos
    }

    /// Start a fresh episode: every possible agent is active again and the
    /// stored signals hold their defaults.
    pub fn restore(&mut self) {
        self.agents = self.possible_agents.clone();
        self.rewards = self.agents.iter().map(|a| (a.clone(), 0.0)).collect();
        self.terminations = self.agents.iter().map(|a| (a.clone(), false)).collect();
        self.truncations = self.agents.iter().map(|a| (a.clone(), false)).collect();
        self.infos = self
            .agents
            .iter()
            .map(|a| (a.clone(), AgentInfo::new()))
            .collect();
    }

    /// Check that `actions` is keyed by exactly the active agents.
    pub fn validate_actions<A>(&self, actions: &AgentMap<A>) -> Result<()> {
        let mut missing: Vec<AgentId> = self
            .agents
            .iter()
            .filter(|a| !actions.contains_key(*a))
            .cloned()
            .collect();
        let mut extra: Vec<AgentId> = actions
            .keys()
            .filter(|a| !self.is_active(a.as_str()))
            .cloned()
            .collect();

        if missing.is_empty() && extra.is_empty() {
            return Ok(());
        }

        missing.sort();
        extra.sort();
        Err(GemError::ActionMismatch { missing, extra })
    }

    /// Keep the signals of the tick that just ran.
    pub fn record<O>(&mut self, outcome: &StepOutcome<O>) {
        self.rewards = outcome.rewards.clone();
        self.terminations = outcome.terminations.clone();
        self.truncations = outcome.truncations.clone();
        self.infos = outcome.infos.clone();
    }

    /// Drop every active agent flagged terminated or truncated on the last
    /// tick. Returns the agents that were retired.
    pub fn retire_done(&mut self) -> Vec<AgentId> {
        let (retired, remaining): (Vec<AgentId>, Vec<AgentId>) =
            std::mem::take(&mut self.agents).into_iter().partition(|agent| {
                self.terminations.get(agent).copied().unwrap_or(false)
                    || self.truncations.get(agent).copied().unwrap_or(false)
            });
        self.agents = remaining;

        if !retired.is_empty() {
            tracing::debug!(
                retired = ?retired,
                remaining = self.agents.len(),
                "Retired finished agents"
            );
        }

        retired
    }
}
