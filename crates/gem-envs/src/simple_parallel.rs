//! Scripted parallel environment driven by string actions.

use gem::multiagent::{
    AgentId, AgentInfo, AgentMap, AgentRoster, ParallelEnv, ResetOutcome, StepOutcome,
};
use gem::{GemError, Result};
use serde::{Deserialize, Serialize};

/// Configuration for [`SimpleParallel`]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimpleParallelConfig {
    /// Number of agents, named `agent1..agentN`
    pub num_agents: usize,
    /// Tick on which every remaining agent is truncated
    pub max_steps: u32,
}

impl Default for SimpleParallelConfig {
    fn default() -> Self {
        Self {
            num_agents: 3,
            max_steps: 10,
        }
    }
}

/// Global view returned by [`SimpleParallel::state`](ParallelEnv::state)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimpleState {
    pub step_count: u32,
    pub agents: Vec<AgentId>,
    pub terminations: AgentMap<bool>,
    pub truncations: AgentMap<bool>,
}

/// Every agent sends a string each tick.
///
/// - `"good"` earns 1.0, `"bad"` earns -1.0, anything else 0.0
/// - `"terminate"` ends that agent's episode
/// - all remaining agents are truncated once `max_steps` ticks have run
pub struct SimpleParallel {
    roster: AgentRoster,
    step_count: u32,
    max_steps: u32,
}

impl SimpleParallel {
    /// Three agents, truncated after ten ticks
    pub fn new() -> Self {
        Self::from_parts(SimpleParallelConfig::default())
    }

    /// Create with full configuration
    pub fn with_config(config: SimpleParallelConfig) -> Result<Self> {
        if config.num_agents == 0 {
            return Err(GemError::Config("num_agents must be positive".into()));
        }
        if config.max_steps == 0 {
            return Err(GemError::Config("max_steps must be positive".into()));
        }
        Ok(Self::from_parts(config))
    }

    fn from_parts(config: SimpleParallelConfig) -> Self {
        Self {
            roster: AgentRoster::numbered("agent", config.num_agents),
            step_count: 0,
            max_steps: config.max_steps,
        }
    }

    pub fn step_count(&self) -> u32 {
        self.step_count
    }

    pub fn set_max_steps(&mut self, max_steps: u32) {
        self.max_steps = max_steps;
    }
}

impl Default for SimpleParallel {
    fn default() -> Self {
        Self::new()
    }
}

impl ParallelEnv for SimpleParallel {
    type Observation = String;
    type Action = String;
    type State = SimpleState;

    fn roster(&self) -> &AgentRoster {
        &self.roster
    }

    fn roster_mut(&mut self) -> &mut AgentRoster {
        &mut self.roster
    }

    fn reset_agents(&mut self, _seed: Option<u64>) -> Result<ResetOutcome<String>> {
        self.step_count = 0;

        let mut observations = AgentMap::new();
        let mut infos = AgentMap::new();
        for agent in self.roster.agents() {
            observations.insert(agent.clone(), format!("Initial observation for {agent}"));
            infos.insert(agent.clone(), AgentInfo::new().with_extra("initial", true));
        }

        Ok((observations, infos))
    }

    fn step_agents(&mut self, actions: &AgentMap<String>) -> Result<StepOutcome<String>> {
        self.step_count += 1;
        let truncated = self.step_count >= self.max_steps;

        let mut outcome = StepOutcome::new();
        for agent in self.roster.agents() {
            let Some(action) = actions.get(agent) else {
                continue;
            };

            let reward = match action.as_str() {
                "good" => 1.0,
                "bad" => -1.0,
                _ => 0.0,
            };

            outcome.insert(
                agent.clone(),
                format!("Step {} result for {agent} after {action}", self.step_count),
                reward,
                action == "terminate",
                truncated,
                AgentInfo::new().with_extra("step", self.step_count),
            );
        }

        Ok(outcome)
    }

    fn state(&self) -> Result<SimpleState> {
        Ok(SimpleState {
            step_count: self.step_count,
            agents: self.roster.agents().to_vec(),
            terminations: self.roster.terminations().clone(),
            truncations: self.roster.truncations().clone(),
        })
    }

    fn render(&self) -> Option<String> {
        let active: Vec<&str> = self.roster.agents().iter().map(AgentId::as_str).collect();
        Some(format!(
            "SimpleParallel: step {}/{}, active [{}]",
            self.step_count,
            self.max_steps,
            active.join(", ")
        ))
    }
}
