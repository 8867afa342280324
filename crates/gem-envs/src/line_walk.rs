//! Walkers on a 1D line racing to a goal distance.

use std::collections::BTreeMap;

use gem::multiagent::{
    AgentId, AgentInfo, AgentMap, AgentRoster, ParallelEnv, ResetOutcome, StepOutcome,
};
use gem::{GemError, Result};
use ndarray::{arr1, ArrayD};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Direction chosen by one walker on one tick
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Move {
    Left,
    Stay,
    Right,
}

impl Move {
    pub const ALL: [Move; 3] = [Move::Left, Move::Stay, Move::Right];

    fn delta(self) -> f32 {
        match self {
            Move::Left => -1.0,
            Move::Stay => 0.0,
            Move::Right => 1.0,
        }
    }
}

/// Configuration for [`LineWalk`]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineWalkConfig {
    /// Number of walkers, named `walker1..walkerN`
    pub num_agents: usize,
    /// Distance from the origin at which a walker finishes
    pub goal_distance: f32,
    /// Maximum uniform drift added to every move
    pub noise: f32,
    /// Reward on every tick a walker has not reached the goal
    pub step_penalty: f32,
    /// Tick on which every remaining walker is truncated
    pub max_ticks: u32,
}

impl Default for LineWalkConfig {
    fn default() -> Self {
        Self {
            num_agents: 4,
            goal_distance: 5.0,
            noise: 0.25,
            step_penalty: -0.01,
            max_ticks: 50,
        }
    }
}

/// Global view returned by [`LineWalk::state`](ParallelEnv::state)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LineWalkState {
    pub tick: u32,
    pub positions: BTreeMap<AgentId, f32>,
}

/// Cells on each side of the origin in a rendered row
const RENDER_HALF_WIDTH: i32 = 20;

/// Walkers start at the origin and move one unit per tick, plus drift.
///
/// A walker whose distance from the origin reaches `goal_distance` is
/// terminated with reward 1.0. Everyone else pays `step_penalty` per tick and
/// is truncated at `max_ticks`.
///
/// Observation: [position, elapsed fraction of `max_ticks`]
pub struct LineWalk {
    config: LineWalkConfig,
    roster: AgentRoster,
    positions: AgentMap<f32>,
    tick: u32,
    rng: StdRng,
}

impl LineWalk {
    /// Create with the default configuration
    pub fn new() -> Self {
        Self::from_parts(LineWalkConfig::default())
    }

    /// Create with full configuration
    pub fn with_config(config: LineWalkConfig) -> Result<Self> {
        if config.num_agents == 0 {
            return Err(GemError::Config("num_agents must be positive".into()));
        }
        if !(config.goal_distance.is_finite()
            && config.noise.is_finite()
            && config.step_penalty.is_finite())
        {
            return Err(GemError::Config(
                "goal_distance, noise and step_penalty must be finite".into(),
            ));
        }
        if config.goal_distance <= 0.0 {
            return Err(GemError::Config("goal_distance must be positive".into()));
        }
        if config.noise < 0.0 {
            return Err(GemError::Config("noise must not be negative".into()));
        }
        if config.max_ticks == 0 {
            return Err(GemError::Config("max_ticks must be positive".into()));
        }
        Ok(Self::from_parts(config))
    }

    fn from_parts(config: LineWalkConfig) -> Self {
        let roster = AgentRoster::numbered("walker", config.num_agents);
        let positions = roster.agents().iter().map(|a| (a.clone(), 0.0)).collect();
        Self {
            config,
            roster,
            positions,
            tick: 0,
            rng: StdRng::from_entropy(),
        }
    }

    pub fn position(&self, agent: &str) -> Option<f32> {
        self.positions.get(agent).copied()
    }

    fn observe(&self, position: f32) -> ArrayD<f32> {
        let elapsed = self.tick as f32 / self.config.max_ticks as f32;
        arr1(&[position, elapsed]).into_dyn()
    }
}

impl Default for LineWalk {
    fn default() -> Self {
        Self::new()
    }
}

impl ParallelEnv for LineWalk {
    type Observation = ArrayD<f32>;
    type Action = Move;
    type State = LineWalkState;

    fn roster(&self) -> &AgentRoster {
        &self.roster
    }

    fn roster_mut(&mut self) -> &mut AgentRoster {
        &mut self.roster
    }

    fn reset_agents(&mut self, seed: Option<u64>) -> Result<ResetOutcome<ArrayD<f32>>> {
        if let Some(s) = seed {
            self.rng = StdRng::seed_from_u64(s);
        }

        self.tick = 0;
        self.positions = self
            .roster
            .agents()
            .iter()
            .map(|a| (a.clone(), 0.0))
            .collect();

        let mut observations = AgentMap::new();
        let mut infos = AgentMap::new();
        for agent in self.roster.agents() {
            observations.insert(agent.clone(), self.observe(0.0));
            infos.insert(agent.clone(), AgentInfo::new());
        }

        Ok((observations, infos))
    }

    fn step_agents(&mut self, actions: &AgentMap<Move>) -> Result<StepOutcome<ArrayD<f32>>> {
        self.tick += 1;
        let truncated = self.tick >= self.config.max_ticks;

        let mut outcome = StepOutcome::new();
        for agent in self.roster.agents() {
            let Some(&action) = actions.get(agent) else {
                continue;
            };

            let drift = if self.config.noise > 0.0 {
                self.rng.gen_range(-self.config.noise..=self.config.noise)
            } else {
                0.0
            };

            let position = self.positions.entry(agent.clone()).or_insert(0.0);
            *position += action.delta() + drift;
            let position = *position;

            let reached = position.abs() >= self.config.goal_distance;
            let reward = if reached {
                tracing::debug!(agent = %agent, position, tick = self.tick, "Walker reached goal");
                1.0
            } else {
                self.config.step_penalty
            };

            outcome.insert(
                agent.clone(),
                self.observe(position),
                reward,
                reached,
                truncated,
                AgentInfo::new().with_extra("position", position),
            );
        }

        Ok(outcome)
    }

    fn state(&self) -> Result<LineWalkState> {
        Ok(LineWalkState {
            tick: self.tick,
            positions: self
                .positions
                .iter()
                .map(|(a, p)| (a.clone(), *p))
                .collect(),
        })
    }

    fn render(&self) -> Option<String> {
        // One row per walker scaled so the goals sit at both ends
        let half = RENDER_HALF_WIDTH;
        let rows: Vec<String> = self
            .roster
            .possible_agents()
            .iter()
            .map(|agent| {
                let position = self.positions.get(agent).copied().unwrap_or(0.0);
                let scaled = (position / self.config.goal_distance * half as f32).round();
                let cell = (scaled.clamp(-half as f32, half as f32) as i32 + half) as usize;
                let mut line = vec!['.'; (2 * half + 1) as usize];
                line[cell] = if self.roster.is_active(agent.as_str()) {
                    '@'
                } else {
                    'x'
                };
                format!("{:>8} |{}|", agent, line.iter().collect::<String>())
            })
            .collect();

        Some(format!("tick {}\n{}", self.tick, rows.join("\n")))
    }
}
