//! Environment wrappers for common functionality.
//!
//! Wrappers hand out the inner environment's roster, so agents retired inside
//! the wrapped `step` are already gone when the wrapper's own envelope prunes.

use super::{AgentMap, AgentRoster, EnvMetadata, ParallelEnv, ResetOutcome, StepOutcome};
use crate::Result;

/// Wrapper that tracks per-agent episode statistics (return and length).
///
/// Adds `episode_return` and `episode_length` to an agent's info on the tick
/// it terminates or is truncated.
pub struct EpisodeStats<E: ParallelEnv> {
    env: E,
    episode_returns: AgentMap<f32>,
    episode_lengths: AgentMap<u32>,
}

impl<E: ParallelEnv> EpisodeStats<E> {
    /// Wrap an environment with episode statistics tracking
    pub fn new(env: E) -> Self {
        Self {
            env,
            episode_returns: AgentMap::new(),
            episode_lengths: AgentMap::new(),
        }
    }

    /// Get a reference to the inner environment
    pub fn inner(&self) -> &E {
        &self.env
    }

    /// Get a mutable reference to the inner environment
    pub fn inner_mut(&mut self) -> &mut E {
        &mut self.env
    }

    pub fn into_inner(self) -> E {
        self.env
    }
}

impl<E: ParallelEnv> ParallelEnv for EpisodeStats<E> {
    type Observation = E::Observation;
    type Action = E::Action;
    type State = E::State;

    fn roster(&self) -> &AgentRoster {
        self.env.roster()
    }

    fn roster_mut(&mut self) -> &mut AgentRoster {
        self.env.roster_mut()
    }

    fn reset_agents(&mut self, seed: Option<u64>) -> Result<ResetOutcome<E::Observation>> {
        self.episode_returns.clear();
        self.episode_lengths.clear();
        self.env.reset(seed)
    }

    fn step_agents(&mut self, actions: &AgentMap<E::Action>) -> Result<StepOutcome<E::Observation>> {
        let mut outcome = self.env.step(actions)?;

        for (agent, reward) in &outcome.rewards {
            *self.episode_returns.entry(agent.clone()).or_insert(0.0) += reward;
            *self.episode_lengths.entry(agent.clone()).or_insert(0) += 1;
        }

        for agent in outcome.done_agents() {
            let ret = self.episode_returns.remove(&agent).unwrap_or(0.0);
            let len = self.episode_lengths.remove(&agent).unwrap_or(0);
            if let Some(info) = outcome.infos.remove(&agent) {
                outcome
                    .infos
                    .insert(agent, info.with_episode_stats(ret, len));
            }
        }

        Ok(outcome)
    }

    fn metadata(&self) -> EnvMetadata {
        self.env.metadata()
    }

    fn state(&self) -> Result<E::State> {
        self.env.state()
    }

    fn render(&self) -> Option<String> {
        self.env.render()
    }

    fn close(&mut self) {
        self.env.close()
    }
}

/// Wrapper that truncates every remaining agent once an episode has lasted
/// `max_ticks` ticks.
///
/// Truncations are set after the inner `step` returns, so wrappers inside a
/// `TimeLimit` never see them. Stack [`EpisodeStats`] outside:
/// `EpisodeStats::new(TimeLimit::new(env, n))`.
pub struct TimeLimit<E: ParallelEnv> {
    env: E,
    max_ticks: u32,
    elapsed: u32,
}

impl<E: ParallelEnv> TimeLimit<E> {
    pub fn new(env: E, max_ticks: u32) -> Self {
        Self {
            env,
            max_ticks,
            elapsed: 0,
        }
    }

    /// Ticks taken since the last reset
    pub fn elapsed(&self) -> u32 {
        self.elapsed
    }

    pub fn inner(&self) -> &E {
        &self.env
    }

    pub fn inner_mut(&mut self) -> &mut E {
        &mut self.env
    }
}

impl<E: ParallelEnv> ParallelEnv for TimeLimit<E> {
    type Observation = E::Observation;
    type Action = E::Action;
    type State = E::State;

    fn roster(&self) -> &AgentRoster {
        self.env.roster()
    }

    fn roster_mut(&mut self) -> &mut AgentRoster {
        self.env.roster_mut()
    }

    fn reset_agents(&mut self, seed: Option<u64>) -> Result<ResetOutcome<E::Observation>> {
        self.elapsed = 0;
        self.env.reset(seed)
    }

    fn step_agents(&mut self, actions: &AgentMap<E::Action>) -> Result<StepOutcome<E::Observation>> {
        let mut outcome = self.env.step(actions)?;
        self.elapsed += 1;

        if self.elapsed >= self.max_ticks {
            tracing::debug!(ticks = self.elapsed, "Time limit reached");
            for truncated in outcome.truncations.values_mut() {
                *truncated = true;
            }
        }

        Ok(outcome)
    }

    fn metadata(&self) -> EnvMetadata {
        self.env.metadata()
    }

    fn state(&self) -> Result<E::State> {
        self.env.state()
    }

    fn render(&self) -> Option<String> {
        self.env.render()
    }

    fn close(&mut self) {
        self.env.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::multiagent::{AgentId, AgentInfo};
    use serde_json::json;

    /// Rewards each agent with its action; agents finish by sending a negative value.
    struct Scorer {
        roster: AgentRoster,
    }

    impl ParallelEnv for Scorer {
        type Observation = ();
        type Action = f32;
        type State = usize;

        fn roster(&self) -> &AgentRoster {
            &self.roster
        }

        fn roster_mut(&mut self) -> &mut AgentRoster {
            &mut self.roster
        }

        fn reset_agents(&mut self, _seed: Option<u64>) -> Result<ResetOutcome<()>> {
            let agents = self.roster.agents();
            Ok((
                agents.iter().map(|a| (a.clone(), ())).collect(),
                agents.iter().map(|a| (a.clone(), AgentInfo::new())).collect(),
            ))
        }

        fn step_agents(&mut self, actions: &AgentMap<f32>) -> Result<StepOutcome<()>> {
            let mut outcome = StepOutcome::new();
            for (agent, &action) in actions {
                outcome.insert(agent.clone(), (), action, action < 0.0, false, AgentInfo::new());
            }
            Ok(outcome)
        }

        fn state(&self) -> Result<usize> {
            Ok(self.roster.agents().len())
        }
    }

    fn scorer(n: usize) -> Scorer {
        Scorer {
            roster: AgentRoster::numbered("agent", n),
        }
    }

    fn uniform(agents: &[AgentId], value: f32) -> AgentMap<f32> {
        agents.iter().map(|a| (a.clone(), value)).collect()
    }

    #[test]
    fn test_episode_stats() {
        let mut wrapped = EpisodeStats::new(scorer(2));
        wrapped.reset(None).unwrap();

        for _ in 0..3 {
            let actions = uniform(wrapped.agents(), 1.0);
            let outcome = wrapped.step(&actions).unwrap();
            assert!(outcome.infos.values().all(AgentInfo::is_empty));
        }

        let mut actions = uniform(wrapped.agents(), 2.0);
        actions.insert("agent2".into(), -1.0);
        let outcome = wrapped.step(&actions).unwrap();

        assert_eq!(outcome.infos["agent2"].get("episode_return"), Some(json!(2.0)));
        assert_eq!(outcome.infos["agent2"].get("episode_length"), Some(json!(4)));
        assert!(outcome.infos["agent1"].get("episode_return").is_none());
        assert_eq!(wrapped.agents(), &[AgentId::from("agent1")]);
        assert_eq!(wrapped.inner().agents().len(), 1);
        assert_eq!(wrapped.state().unwrap(), 1);
    }

    #[test]
    fn test_time_limit_truncates_remaining_agents() {
        let mut env = TimeLimit::new(scorer(3), 2);
        env.reset(None).unwrap();

        let outcome = env.step(&uniform(env.agents(), 1.0)).unwrap();
        assert!(outcome.truncations.values().all(|t| !t));
        assert_eq!(env.agents().len(), 3);

        let outcome = env.step(&uniform(env.agents(), 1.0)).unwrap();
        assert_eq!(outcome.truncations.len(), 3);
        assert!(outcome.truncations.values().all(|t| *t));
        assert!(env.is_done());
        assert!(env.inner().is_done());
        assert_eq!(env.elapsed(), 2);

        env.reset(None).unwrap();
        assert_eq!(env.elapsed(), 0);
        assert_eq!(env.agents().len(), 3);
    }

    #[test]
    fn test_stacked_wrappers_share_roster() {
        let mut env = EpisodeStats::new(TimeLimit::new(scorer(2), 1));
        env.reset(Some(7)).unwrap();

        let outcome = env.step(&uniform(env.agents(), 0.5)).unwrap();
        assert!(env.is_done());
        for agent in ["agent1", "agent2"] {
            assert_eq!(outcome.infos[agent].get("episode_length"), Some(json!(1)));
        }

        // Validation runs against the shared, pruned roster
        assert!(env.step(&uniform(&[AgentId::from("agent1")], 1.0)).is_err());
    }

    #[test]
    fn test_episode_stats_inside_time_limit_misses_truncations() {
        let mut env = TimeLimit::new(EpisodeStats::new(scorer(2)), 1);
        env.reset(None).unwrap();

        let outcome = env.step(&uniform(env.agents(), 0.5)).unwrap();
        assert!(env.is_done());
        assert!(outcome.truncations.values().all(|t| *t));
        assert!(outcome.infos.values().all(AgentInfo::is_empty));
    }
}
