//! The parallel step/reset contract.

use super::agents::{AgentId, AgentMap, AgentRoster};
use super::info::AgentInfo;
use crate::{GemError, Result};

/// Observations and infos returned from `reset`.
pub type ResetOutcome<O> = (AgentMap<O>, AgentMap<AgentInfo>);

/// Result of one synchronized tick.
///
/// Every mapping is keyed by the agents that were active when the tick
/// started, including the ones retired by it.
#[derive(Clone, Debug)]
pub struct StepOutcome<O> {
    /// Observations for each agent
    pub observations: AgentMap<O>,
    /// Rewards for each agent
    pub rewards: AgentMap<f32>,
    /// Termination flags for each agent
    pub terminations: AgentMap<bool>,
    /// Truncation flags for each agent
    pub truncations: AgentMap<bool>,
    /// Additional info for each agent
    pub infos: AgentMap<AgentInfo>,
}

impl<O> Default for StepOutcome<O> {
    fn default() -> Self {
        Self {
            observations: AgentMap::new(),
            rewards: AgentMap::new(),
            terminations: AgentMap::new(),
            truncations: AgentMap::new(),
            infos: AgentMap::new(),
        }
    }
}

impl<O> StepOutcome<O> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert every signal for one agent at once.
    pub fn insert(
        &mut self,
        agent: AgentId,
        observation: O,
        reward: f32,
        terminated: bool,
        truncated: bool,
        info: AgentInfo,
    ) {
        self.observations.insert(agent.clone(), observation);
        self.rewards.insert(agent.clone(), reward);
        self.terminations.insert(agent.clone(), terminated);
        self.truncations.insert(agent.clone(), truncated);
        self.infos.insert(agent, info);
    }

    /// Whether `agent` was terminated or truncated on this tick.
    pub fn done(&self, agent: &str) -> bool {
        self.terminations.get(agent).copied().unwrap_or(false)
            || self.truncations.get(agent).copied().unwrap_or(false)
    }

    /// Agents terminated or truncated on this tick, sorted.
    pub fn done_agents(&self) -> Vec<AgentId> {
        let mut done: Vec<AgentId> = self
            .rewards
            .keys()
            .filter(|agent| self.done(agent.as_str()))
            .cloned()
            .collect();
        done.sort();
        done
    }

    pub fn len(&self) -> usize {
        self.rewards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rewards.is_empty()
    }
}

/// Static capabilities an environment declares.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EnvMetadata {
    /// All active agents act within the same tick
    pub is_parallelizable: bool,
}

impl Default for EnvMetadata {
    fn default() -> Self {
        Self {
            is_parallelizable: true,
        }
    }
}

/// Core trait for environments where every active agent acts on each tick.
///
/// Implementors supply the roster and the per-agent logic in
/// [`reset_agents`] and [`step_agents`]. The provided [`reset`] and [`step`]
/// wrap that logic: `step` rejects action maps that are not keyed by exactly
/// the active agents before anything runs, and retires terminated or
/// truncated agents before it returns.
///
/// # Example
///
/// ```rust
/// use gem::multiagent::{AgentInfo, AgentMap, AgentRoster, ParallelEnv, ResetOutcome, StepOutcome};
/// use gem::Result;
///
/// struct Echo {
///     roster: AgentRoster,
/// }
///
/// impl ParallelEnv for Echo {
///     type Observation = u32;
///     type Action = u32;
///     type State = ();
///
///     fn roster(&self) -> &AgentRoster {
///         &self.roster
///     }
///
///     fn roster_mut(&mut self) -> &mut AgentRoster {
///         &mut self.roster
///     }
///
///     fn reset_agents(&mut self, _seed: Option<u64>) -> Result<ResetOutcome<u32>> {
///         let agents = self.roster.agents();
///         Ok((
///             agents.iter().map(|a| (a.clone(), 0)).collect(),
///             agents.iter().map(|a| (a.clone(), AgentInfo::new())).collect(),
///         ))
///     }
///
///     fn step_agents(&mut self, actions: &AgentMap<u32>) -> Result<StepOutcome<u32>> {
///         let mut outcome = StepOutcome::new();
///         for (agent, &action) in actions {
///             outcome.insert(agent.clone(), action, 0.0, action == 0, false, AgentInfo::new());
///         }
///         Ok(outcome)
///     }
/// }
///
/// let mut env = Echo { roster: AgentRoster::numbered("echo", 2) };
/// env.reset(None)?;
/// let actions: AgentMap<u32> = [("echo1".into(), 0), ("echo2".into(), 5)].into_iter().collect();
/// env.step(&actions)?;
/// assert_eq!(env.agents().len(), 1);
/// # Ok::<(), gem::GemError>(())
/// ```
///
/// [`reset_agents`]: ParallelEnv::reset_agents
/// [`step_agents`]: ParallelEnv::step_agents
/// [`reset`]: ParallelEnv::reset
/// [`step`]: ParallelEnv::step
pub trait ParallelEnv {
    /// Per-agent observation
    type Observation;
    /// Per-agent action
    type Action;
    /// Global view returned by [`ParallelEnv::state`]
    type State;

    /// Roster holding the possible agents, active agents and last signals.
    fn roster(&self) -> &AgentRoster;

    fn roster_mut(&mut self) -> &mut AgentRoster;

    /// Environment-specific reset.
    ///
    /// Called after the roster has been restored; must return observations and
    /// infos keyed by exactly the active agents.
    fn reset_agents(&mut self, seed: Option<u64>) -> Result<ResetOutcome<Self::Observation>>;

    /// Environment-specific tick.
    ///
    /// `actions` has already been validated against the active agents. The
    /// outcome must be keyed by exactly those agents.
    fn step_agents(
        &mut self,
        actions: &AgentMap<Self::Action>,
    ) -> Result<StepOutcome<Self::Observation>>;

    /// Reset the environment to the start of a new episode
    ///
    /// # Arguments
    /// * `seed` - Optional random seed for reproducibility
    ///
    /// # Returns
    /// Initial observations and infos for every possible agent
    fn reset(&mut self, seed: Option<u64>) -> Result<ResetOutcome<Self::Observation>> {
        self.roster_mut().restore();
        let (observations, infos) = self.reset_agents(seed)?;

        debug_assert!(keyed_by(&observations, self.agents()));
        debug_assert!(keyed_by(&infos, self.agents()));
        tracing::trace!(agents = self.agents().len(), seed = ?seed, "Episode reset");

        Ok((observations, infos))
    }

    /// Advance every active agent by one tick
    ///
    /// # Errors
    /// [`GemError::ActionMismatch`] if `actions` is not keyed by exactly the
    /// active agents. Nothing is mutated in that case.
    fn step(
        &mut self,
        actions: &AgentMap<Self::Action>,
    ) -> Result<StepOutcome<Self::Observation>> {
        self.roster().validate_actions(actions)?;
        let entry_agents = self.agents().to_vec();

        let outcome = self.step_agents(actions)?;
        debug_assert!(keyed_by(&outcome.rewards, &entry_agents));
        debug_assert!(keyed_by(&outcome.terminations, &entry_agents));
        debug_assert!(keyed_by(&outcome.truncations, &entry_agents));

        let roster = self.roster_mut();
        roster.record(&outcome);
        roster.retire_done();

        Ok(outcome)
    }

    /// Agents eligible to act on the next tick.
    fn agents(&self) -> &[AgentId] {
        self.roster().agents()
    }

    /// Every agent the environment can instantiate.
    fn possible_agents(&self) -> &[AgentId] {
        self.roster().possible_agents()
    }

    fn num_agents(&self) -> usize {
        self.agents().len()
    }

    fn max_num_agents(&self) -> usize {
        self.possible_agents().len()
    }

    /// Check if every agent has finished and the environment needs a reset
    fn is_done(&self) -> bool {
        self.roster().is_empty()
    }

    fn metadata(&self) -> EnvMetadata {
        EnvMetadata::default()
    }

    /// Global view of the episode
    fn state(&self) -> Result<Self::State> {
        Err(GemError::NotImplemented { method: "state" })
    }

    /// Optional: Render the environment
    fn render(&self) -> Option<String> {
        None
    }

    /// Optional: Close the environment and free resources
    fn close(&mut self) {}
}

fn keyed_by<T>(map: &AgentMap<T>, agents: &[AgentId]) -> bool {
    map.len() == agents.len() && agents.iter().all(|a| map.contains_key(a))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Agents finish when they send 0; everyone is truncated on tick 3.
    struct Countdown {
        roster: AgentRoster,
        tick: u32,
        closed: u32,
    }

    impl Countdown {
        fn new(n: usize) -> Self {
            Self {
                roster: AgentRoster::numbered("agent", n),
                tick: 0,
                closed: 0,
            }
        }
    }

    impl ParallelEnv for Countdown {
        type Observation = u32;
        type Action = u32;
        type State = ();

        fn roster(&self) -> &AgentRoster {
            &self.roster
        }

        fn roster_mut(&mut self) -> &mut AgentRoster {
            &mut self.roster
        }

        fn reset_agents(&mut self, _seed: Option<u64>) -> Result<ResetOutcome<u32>> {
            self.tick = 0;
            let agents = self.roster.agents();
            Ok((
                agents.iter().map(|a| (a.clone(), 0)).collect(),
                agents.iter().map(|a| (a.clone(), AgentInfo::new())).collect(),
            ))
        }

        fn step_agents(&mut self, actions: &AgentMap<u32>) -> Result<StepOutcome<u32>> {
            self.tick += 1;
            let mut outcome = StepOutcome::new();
            for (agent, &action) in actions {
                outcome.insert(
                    agent.clone(),
                    self.tick,
                    action as f32,
                    action == 0,
                    self.tick >= 3,
                    AgentInfo::new(),
                );
            }
            Ok(outcome)
        }

        fn close(&mut self) {
            self.closed += 1;
        }
    }

    fn all(env: &Countdown, action: u32) -> AgentMap<u32> {
        env.agents().iter().map(|a| (a.clone(), action)).collect()
    }

    #[test]
    fn test_metadata_is_parallel() {
        let env = Countdown::new(2);
        assert!(env.metadata().is_parallelizable);
    }

    #[test]
    fn test_default_state_not_implemented() {
        let env = Countdown::new(2);
        let err = env.state().unwrap_err();
        assert!(matches!(err, GemError::NotImplemented { method: "state" }));
    }

    #[test]
    fn test_default_render_and_close() {
        let mut env = Countdown::new(2);
        assert!(env.render().is_none());
        env.close();
        env.close();
        assert_eq!(env.closed, 2);
    }

    #[test]
    fn test_mismatch_leaves_state_untouched() {
        let mut env = Countdown::new(3);
        env.reset(None).unwrap();

        let mut actions = all(&env, 1);
        actions.remove("agent2");
        assert!(env.step(&actions).is_err());
        assert_eq!(env.tick, 0);
        assert_eq!(env.agents().len(), 3);
    }

    #[test]
    fn test_outcome_keyed_by_agents_at_entry() {
        let mut env = Countdown::new(3);
        env.reset(None).unwrap();

        let mut actions = all(&env, 1);
        actions.insert("agent1".into(), 0);
        let outcome = env.step(&actions).unwrap();

        assert_eq!(outcome.len(), 3);
        assert!(outcome.observations.contains_key("agent1"));
        assert_eq!(outcome.done_agents(), vec![AgentId::from("agent1")]);
        assert!(!env.roster().is_active("agent1"));
        assert_eq!(env.num_agents(), 2);
        assert_eq!(env.max_num_agents(), 3);
    }

    #[test]
    fn test_episode_runs_to_completion() {
        let mut env = Countdown::new(2);
        env.reset(Some(1)).unwrap();

        for _ in 0..3 {
            let actions = all(&env, 1);
            env.step(&actions).unwrap();
        }
        assert!(env.is_done());

        // A finished episode only accepts an empty action map
        let outcome = env.step(&AgentMap::new()).unwrap();
        assert!(outcome.is_empty());

        env.reset(None).unwrap();
        assert_eq!(env.agents(), env.possible_agents());
        assert!(!env.is_done());
    }
}
